//! H.265 HRD 参数解析.
//!
//! 探测只需要跳过 HRD, 这里保留各子层的速率协商结果供调试.

use esprobe_core::bitreader::BitReader;
use esprobe_core::{ProbeError, ProbeResult};

/// 每个子层 CPB 数量上限
pub const MAX_CPB_COUNT: u32 = 32;

/// 子层 HRD 协商结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HevcSubLayerHrd {
    /// fixed_pic_rate_general_flag 或 fixed_pic_rate_within_cvs_flag
    pub fixed_pic_rate: bool,
    /// elemental_duration_in_tc_minus1
    pub elemental_duration_in_tc_minus1: u32,
    /// low_delay_hrd_flag
    pub low_delay_hrd_flag: bool,
    /// cpb_cnt_minus1 + 1
    pub cpb_cnt: u32,
}

/// HRD 参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HevcHrd {
    pub nal_hrd_parameters_present_flag: bool,
    pub vcl_hrd_parameters_present_flag: bool,
    pub sub_pic_hrd_params_present_flag: bool,
    pub sub_layers: Vec<HevcSubLayerHrd>,
}

/// 解析 hrd_parameters()
pub fn decode_hrd(
    br: &mut BitReader,
    common_inf_present: bool,
    max_sub_layers: u32,
) -> ProbeResult<HevcHrd> {
    let mut hrd = HevcHrd::default();

    if common_inf_present {
        hrd.nal_hrd_parameters_present_flag = br.read_flag();
        hrd.vcl_hrd_parameters_present_flag = br.read_flag();

        if hrd.nal_hrd_parameters_present_flag || hrd.vcl_hrd_parameters_present_flag {
            hrd.sub_pic_hrd_params_present_flag = br.read_flag();
            if hrd.sub_pic_hrd_params_present_flag {
                br.skip_bits(8); // tick_divisor_minus2
                br.skip_bits(5); // du_cpb_removal_delay_increment_length_minus1
                br.skip_bits(1); // sub_pic_cpb_params_in_pic_timing_sei_flag
                br.skip_bits(5); // dpb_output_delay_du_length_minus1
            }

            br.skip_bits(4); // bit_rate_scale
            br.skip_bits(4); // cpb_size_scale
            if hrd.sub_pic_hrd_params_present_flag {
                br.skip_bits(4); // cpb_size_du_scale
            }

            br.skip_bits(5); // initial_cpb_removal_delay_length_minus1
            br.skip_bits(5); // au_cpb_removal_delay_length_minus1
            br.skip_bits(5); // dpb_output_delay_length_minus1
        }
    }

    for _ in 0..max_sub_layers {
        let mut layer = HevcSubLayerHrd {
            cpb_cnt: 1,
            ..HevcSubLayerHrd::default()
        };

        layer.fixed_pic_rate = br.read_flag();
        if !layer.fixed_pic_rate {
            layer.fixed_pic_rate = br.read_flag();
        }

        if layer.fixed_pic_rate {
            layer.elemental_duration_in_tc_minus1 = br.read_ue()?;
        } else {
            layer.low_delay_hrd_flag = br.read_flag();
        }

        if !layer.low_delay_hrd_flag {
            layer.cpb_cnt = br.read_ue()?.saturating_add(1);
            if !(1..=MAX_CPB_COUNT).contains(&layer.cpb_cnt) {
                return Err(ProbeError::InvalidData(format!(
                    "H.265: HRD cpb_cnt 非法, value={}",
                    layer.cpb_cnt
                )));
            }
        }

        if hrd.nal_hrd_parameters_present_flag {
            skip_sub_layer_hrd(br, layer.cpb_cnt, hrd.sub_pic_hrd_params_present_flag)?;
        }
        if hrd.vcl_hrd_parameters_present_flag {
            skip_sub_layer_hrd(br, layer.cpb_cnt, hrd.sub_pic_hrd_params_present_flag)?;
        }

        hrd.sub_layers.push(layer);
    }

    Ok(hrd)
}

fn skip_sub_layer_hrd(br: &mut BitReader, cpb_cnt: u32, sub_pic_params: bool) -> ProbeResult<()> {
    for _ in 0..cpb_cnt {
        br.read_ue()?; // bit_rate_value_minus1
        br.read_ue()?; // cpb_size_value_minus1
        if sub_pic_params {
            br.read_ue()?; // cpb_size_du_value_minus1
            br.read_ue()?; // bit_rate_du_value_minus1
        }
        br.skip_bits(1); // cbr_flag
    }
    Ok(())
}
