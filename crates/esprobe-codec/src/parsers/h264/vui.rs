//! H.264 VUI (Video Usability Information) 与 HRD 参数解析.

use esprobe_core::bitreader::BitReader;
use esprobe_core::color::{self, ColorPrimaries, ColorRange, ColorSpace, ColorTransfer};
use esprobe_core::{ProbeError, ProbeResult, Rational};
use log::{debug, warn};

use crate::parsers::h2645::{EXTENDED_SAR, SAR_TABLE};

/// num_reorder_frames 上限
pub const MAX_REORDER_FRAMES: u32 = 16;
/// cpb_cnt 上限
pub const MAX_CPB_COUNT: u32 = 32;

/// HRD 参数中与 SEI 解析相关的字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct H264Hrd {
    /// cpb_cnt_minus1 + 1
    pub cpb_cnt: u32,
    /// initial_cpb_removal_delay_length_minus1 + 1
    pub initial_cpb_removal_delay_length: u32,
    /// cpb_removal_delay_length_minus1 + 1
    pub cpb_removal_delay_length: u32,
    /// dpb_output_delay_length_minus1 + 1
    pub dpb_output_delay_length: u32,
    /// time_offset_length
    pub time_offset_length: u32,
}

/// VUI 参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H264Vui {
    /// 采样宽高比, 未给出时为 0/0
    pub sar: Rational,
    /// overscan_info_present_flag
    pub overscan_info_present_flag: bool,
    /// overscan_appropriate_flag
    pub overscan_appropriate_flag: bool,
    /// video_signal_type_present_flag
    pub video_signal_type_present_flag: bool,
    /// video_format (3 位)
    pub video_format: u8,
    /// video_full_range_flag
    pub full_range: bool,
    /// colour_description_present_flag
    pub colour_description_present_flag: bool,
    /// colour_primaries (已钳位)
    pub colour_primaries: u8,
    /// transfer_characteristics (已钳位)
    pub transfer_characteristics: u8,
    /// matrix_coefficients (已钳位)
    pub matrix_coefficients: u8,
    /// timing_info_present_flag (任一计时字段为 0 时被清除)
    pub timing_info_present_flag: bool,
    /// num_units_in_tick
    pub num_units_in_tick: u32,
    /// time_scale
    pub time_scale: u32,
    /// fixed_frame_rate_flag
    pub fixed_frame_rate_flag: bool,
    /// nal_hrd_parameters_present_flag
    pub nal_hrd_parameters_present_flag: bool,
    /// vcl_hrd_parameters_present_flag
    pub vcl_hrd_parameters_present_flag: bool,
    /// 最后一次解析得到的 HRD 参数
    pub hrd: H264Hrd,
    /// low_delay_hrd_flag
    pub low_delay_hrd_flag: bool,
    /// pic_struct_present_flag
    pub pic_struct_present_flag: bool,
    /// bitstream_restriction_flag
    pub bitstream_restriction_flag: bool,
    /// num_reorder_frames
    pub num_reorder_frames: u32,
    /// max_dec_frame_buffering
    pub max_dec_frame_buffering: u32,
}

impl Default for H264Vui {
    fn default() -> Self {
        Self {
            sar: Rational::UNDEFINED,
            overscan_info_present_flag: false,
            overscan_appropriate_flag: false,
            video_signal_type_present_flag: false,
            video_format: 5,
            full_range: false,
            colour_description_present_flag: false,
            colour_primaries: color::CODE_UNSPECIFIED,
            transfer_characteristics: color::CODE_UNSPECIFIED,
            matrix_coefficients: color::CODE_UNSPECIFIED,
            timing_info_present_flag: false,
            num_units_in_tick: 0,
            time_scale: 0,
            fixed_frame_rate_flag: false,
            nal_hrd_parameters_present_flag: false,
            vcl_hrd_parameters_present_flag: false,
            hrd: H264Hrd::default(),
            low_delay_hrd_flag: false,
            pic_struct_present_flag: false,
            bitstream_restriction_flag: false,
            num_reorder_frames: 0,
            max_dec_frame_buffering: 0,
        }
    }
}

impl H264Vui {
    /// 帧率 time_scale / (2 * num_units_in_tick)
    pub fn frame_rate(&self) -> Option<Rational> {
        if !self.timing_info_present_flag {
            return None;
        }
        Some(Rational::from_u64(
            u64::from(self.time_scale),
            2 * u64::from(self.num_units_in_tick),
        ))
    }

    /// 是否存在 NAL 或 VCL HRD 参数
    pub fn hrd_present(&self) -> bool {
        self.nal_hrd_parameters_present_flag || self.vcl_hrd_parameters_present_flag
    }

    /// 色彩原色
    pub fn color_primaries(&self) -> ColorPrimaries {
        ColorPrimaries::from_code(self.colour_primaries)
    }

    /// 传递特性
    pub fn color_transfer(&self) -> ColorTransfer {
        ColorTransfer::from_code(self.transfer_characteristics)
    }

    /// 矩阵系数
    pub fn color_space(&self) -> ColorSpace {
        ColorSpace::from_code(self.matrix_coefficients)
    }

    /// 色彩范围
    pub fn color_range(&self) -> ColorRange {
        if self.video_signal_type_present_flag {
            ColorRange::from_full_range_flag(self.full_range)
        } else {
            ColorRange::Unspecified
        }
    }
}

/// 解析 HRD 参数
pub fn parse_hrd(br: &mut BitReader) -> ProbeResult<H264Hrd> {
    let cpb_count = br.read_ue()?.saturating_add(1);
    if cpb_count > MAX_CPB_COUNT {
        return Err(ProbeError::InvalidData(format!(
            "H.264: cpb_count 非法, value={}",
            cpb_count
        )));
    }

    br.skip_bits(4); // bit_rate_scale
    br.skip_bits(4); // cpb_size_scale
    for _ in 0..cpb_count {
        br.read_ue()?; // bit_rate_value_minus1
        br.read_ue()?; // cpb_size_value_minus1
        br.skip_bits(1); // cbr_flag
    }

    Ok(H264Hrd {
        cpb_cnt: cpb_count,
        initial_cpb_removal_delay_length: br.read_bits(5) + 1,
        cpb_removal_delay_length: br.read_bits(5) + 1,
        dpb_output_delay_length: br.read_bits(5) + 1,
        time_offset_length: br.read_bits(5),
    })
}

/// 解析 VUI 参数, 结果写入调用方持有的 `vui`
///
/// num_reorder_frames 超限时先钳位到 16 再返回错误, 钳位值对调用方可见.
pub fn parse_vui(br: &mut BitReader, vui: &mut H264Vui) -> ProbeResult<()> {
    if br.read_flag() {
        let idc = br.read_bits(8);
        if idc == EXTENDED_SAR {
            let num = br.read_bits(16) as i32;
            let den = br.read_bits(16) as i32;
            vui.sar = Rational::new(num, den);
        } else if let Some(sar) = SAR_TABLE.get(idc as usize) {
            vui.sar = *sar;
        } else {
            return Err(ProbeError::InvalidData(format!(
                "H.264: VUI aspect_ratio_idc 非法, value={}",
                idc
            )));
        }
    } else {
        vui.sar = Rational::UNDEFINED;
    }

    vui.overscan_info_present_flag = br.read_flag();
    if vui.overscan_info_present_flag {
        vui.overscan_appropriate_flag = br.read_flag();
    }

    vui.video_signal_type_present_flag = br.read_flag();
    if vui.video_signal_type_present_flag {
        vui.video_format = br.read_bits(3) as u8;
        vui.full_range = br.read_flag();
        vui.colour_description_present_flag = br.read_flag();
        if vui.colour_description_present_flag {
            let primaries = br.read_bits(8) as i32;
            let transfer = br.read_bits(8) as i32;
            let matrix = br.read_bits(8) as i32;
            vui.colour_primaries = color::clamp_code_h264(primaries, color::PRIMARIES_NB);
            vui.transfer_characteristics = color::clamp_code_h264(transfer, color::TRANSFER_NB);
            vui.matrix_coefficients = color::clamp_code_h264(matrix, color::MATRIX_NB);
        }
    }

    // chroma_loc_info_present_flag
    if br.read_flag() {
        br.read_ue()?; // chroma_sample_loc_type_top_field
        br.read_ue()?; // chroma_sample_loc_type_bottom_field
    }

    if br.show_bits(1) == 1 && br.bits_left() < 10 {
        warn!("H.264: VUI 被截断, 剩余 {} 位", br.bits_left());
        return Ok(());
    }

    vui.timing_info_present_flag = br.read_flag();
    if vui.timing_info_present_flag {
        let num_units_in_tick = br.read_bits(32);
        let time_scale = br.read_bits(32);
        if num_units_in_tick == 0 || time_scale == 0 {
            warn!(
                "H.264: time_scale/num_units_in_tick 非法, num_units_in_tick={}, time_scale={}",
                num_units_in_tick, time_scale
            );
            vui.timing_info_present_flag = false;
        } else {
            vui.num_units_in_tick = num_units_in_tick;
            vui.time_scale = time_scale;
        }
        vui.fixed_frame_rate_flag = br.read_flag();
    }

    vui.nal_hrd_parameters_present_flag = br.read_flag();
    if vui.nal_hrd_parameters_present_flag {
        vui.hrd = parse_hrd(br)?;
    }
    vui.vcl_hrd_parameters_present_flag = br.read_flag();
    if vui.vcl_hrd_parameters_present_flag {
        vui.hrd = parse_hrd(br)?;
    }
    if vui.hrd_present() {
        vui.low_delay_hrd_flag = br.read_flag();
    }
    vui.pic_struct_present_flag = br.read_flag();

    if br.bits_left() == 0 {
        return Ok(());
    }

    vui.bitstream_restriction_flag = br.read_flag();
    if vui.bitstream_restriction_flag {
        match read_bitstream_restriction(br) {
            Ok((num_reorder_frames, max_dec_frame_buffering)) if !br.is_overread() => {
                vui.num_reorder_frames = num_reorder_frames;
                vui.max_dec_frame_buffering = max_dec_frame_buffering;
            }
            Ok(_) => {
                vui.num_reorder_frames = 0;
                vui.bitstream_restriction_flag = false;
            }
            Err(e) if e.is_truncated() => {
                vui.num_reorder_frames = 0;
                vui.bitstream_restriction_flag = false;
            }
            Err(e) => return Err(e),
        }

        if vui.num_reorder_frames > MAX_REORDER_FRAMES {
            warn!(
                "H.264: num_reorder_frames 非法 ({}), 钳位到 {}",
                vui.num_reorder_frames, MAX_REORDER_FRAMES
            );
            vui.num_reorder_frames = MAX_REORDER_FRAMES;
            return Err(ProbeError::InvalidData(
                "H.264: num_reorder_frames 超出范围".into(),
            ));
        }
    }

    debug!(
        "H.264: VUI sar={}, timing={}, pic_struct_present={}, reorder={}",
        vui.sar, vui.timing_info_present_flag, vui.pic_struct_present_flag, vui.num_reorder_frames
    );
    Ok(())
}

/// 读取 bitstream_restriction 块, 返回 (num_reorder_frames, max_dec_frame_buffering)
fn read_bitstream_restriction(br: &mut BitReader) -> ProbeResult<(u32, u32)> {
    br.skip_bits(1); // motion_vectors_over_pic_boundaries_flag
    br.read_ue()?; // max_bytes_per_pic_denom
    br.read_ue()?; // max_bits_per_mb_denom
    br.read_ue()?; // log2_max_mv_length_horizontal
    br.read_ue()?; // log2_max_mv_length_vertical
    let num_reorder_frames = br.read_ue()?;
    let max_dec_frame_buffering = br.read_ue()?;
    Ok((num_reorder_frames, max_dec_frame_buffering))
}
