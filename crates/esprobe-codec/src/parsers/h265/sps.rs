//! H.265/HEVC SPS (Sequence Parameter Set) 解析器.
//!
//! 只支持 8/10 位 4:2:0, 其他合法组合 (4:2:2, 4:4:4, 12 位等) 返回 Unsupported.
//! 输入为包含 2 字节 NAL 头部、已去除 emulation prevention 的 RBSP.

use esprobe_core::bitreader::BitReader;
use esprobe_core::{PixelFormat, ProbeError, ProbeResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::ptl::{Ptl, parse_ptl};
use super::rps::{ShortTermRps, decode_short_term_rps};
use super::scaling::{ScalingList, scaling_list_data};
use super::vui::{HevcVui, parse_vui};

/// 子层数量上限
pub const MAX_SUB_LAYERS: u32 = 7;
/// SPS ID 上限 (不含)
pub const MAX_SPS_COUNT: u32 = 16;
/// DPB 容量上限
pub const MAX_DPB_SIZE: u32 = 16;
/// SPS 中短期 RPS 数量上限
pub const MAX_SHORT_TERM_RPS: u32 = 64;
/// SPS 中长期参考图像数量上限
pub const MAX_LONG_TERM_REF_PICS: u32 = 32;
/// log2_ctb_size 上限
pub const MAX_LOG2_CTB_SIZE: u32 = 6;

const SUB_WIDTH_C: [u32; 4] = [1, 2, 2, 1];
const SUB_HEIGHT_C: [u32; 4] = [1, 2, 1, 1];

/// 色度水平下采样倍数
pub(crate) fn sub_width_c(chroma_format_idc: u32) -> u32 {
    SUB_WIDTH_C.get(chroma_format_idc as usize).copied().unwrap_or(1)
}

/// 色度垂直下采样倍数
pub(crate) fn sub_height_c(chroma_format_idc: u32) -> u32 {
    SUB_HEIGHT_C.get(chroma_format_idc as usize).copied().unwrap_or(1)
}

/// SPS 解析选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HevcSpsOptions {
    /// 将 VUI default_display_window 合并进输出窗口
    pub apply_default_display_window: bool,
    /// 忽略裁剪窗口, 输出完整编码尺寸
    pub ignore_crop: bool,
}

/// 裁剪 / 显示窗口 (像素单位)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HevcWindow {
    pub left_offset: u32,
    pub right_offset: u32,
    pub top_offset: u32,
    pub bottom_offset: u32,
}

/// 子层排序信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemporalLayer {
    /// sps_max_dec_pic_buffering_minus1 + 1
    pub max_dec_pic_buffering: u32,
    pub num_reorder_pics: u32,
    /// sps_max_latency_increase_plus1 - 1 (0 表示无限制时为 -1)
    pub max_latency_increase: i64,
}

/// PCM 参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcmParams {
    pub bit_depth: u32,
    pub bit_depth_chroma: u32,
    pub log2_min_pcm_cb_size: u32,
    pub log2_max_pcm_cb_size: u32,
    pub loop_filter_disable_flag: bool,
}

/// SPS 中的长期参考图像
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LongTermRefPic {
    pub poc_lsb: u32,
    pub used_by_curr_pic: bool,
}

/// sps_range_extension 标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeExtension {
    pub transform_skip_rotation_enabled_flag: bool,
    pub transform_skip_context_enabled_flag: bool,
    pub implicit_rdpcm_enabled_flag: bool,
    pub explicit_rdpcm_enabled_flag: bool,
    pub extended_precision_processing_flag: bool,
    pub intra_smoothing_disabled_flag: bool,
    pub high_precision_offsets_enabled_flag: bool,
    pub persistent_rice_adaptation_enabled_flag: bool,
    pub cabac_bypass_alignment_enabled_flag: bool,
}

/// 解析后的 HEVC SPS
#[derive(Debug, Clone, Default)]
pub struct HevcSps {
    pub vps_id: u8,
    /// sps_max_sub_layers_minus1 + 1
    pub max_sub_layers: u32,
    pub temporal_id_nesting_flag: bool,
    pub ptl: Ptl,
    pub sps_id: u32,
    /// 分离色彩平面时强制为 0
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    /// pic_width_in_luma_samples
    pub width: u32,
    /// pic_height_in_luma_samples
    pub height: u32,
    pub conformance_window_flag: bool,
    /// 一致性裁剪窗口 (已乘色度下采样倍数)
    pub pic_conf_win: HevcWindow,
    /// 输出窗口, 初值为一致性窗口
    pub output_window: HevcWindow,
    /// 裁剪后的输出尺寸
    pub output_width: u32,
    pub output_height: u32,
    pub bit_depth: u32,
    pub bit_depth_chroma: u32,
    /// 像素格式标记, 位深与色度格式受支持时设置
    pub pix_fmt: PixelFormat,
    pub log2_max_poc_lsb: u32,
    pub temporal_layer: [TemporalLayer; MAX_SUB_LAYERS as usize],
    pub log2_min_cb_size: u32,
    pub log2_diff_max_min_coding_block_size: u32,
    pub log2_min_tb_size: u32,
    pub log2_max_trafo_size: u32,
    pub max_transform_hierarchy_depth_inter: u32,
    pub max_transform_hierarchy_depth_intra: u32,
    pub scaling_list_enable_flag: bool,
    pub scaling_list: ScalingList,
    pub amp_enabled_flag: bool,
    pub sao_enabled_flag: bool,
    pub pcm_enabled_flag: bool,
    pub pcm: PcmParams,
    pub st_rps: Vec<ShortTermRps>,
    pub long_term_ref_pics_present_flag: bool,
    pub long_term_ref_pics: Vec<LongTermRefPic>,
    pub temporal_mvp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub vui: Option<HevcVui>,
    pub range_extension_flag: bool,
    pub range_extension: RangeExtension,

    // 推导值
    pub log2_ctb_size: u32,
    pub log2_min_pu_size: u32,
    pub ctb_width: u32,
    pub ctb_height: u32,
    pub ctb_size: u32,
    pub min_cb_width: u32,
    pub min_cb_height: u32,
    pub min_tb_width: u32,
    pub min_tb_height: u32,
    pub min_pu_width: u32,
    pub min_pu_height: u32,
    pub tb_mask: u32,
    pub qp_bd_offset: i32,
}

impl HevcSps {
    /// VUI 声明逐场编码
    pub fn field_seq(&self) -> bool {
        self.vui.as_ref().is_some_and(|v| v.field_seq_flag)
    }
}

/// 解析 SPS
///
/// `buf` 以 2 字节 NAL 头部开始.
pub fn parse_sps(buf: &[u8], opts: &HevcSpsOptions) -> ProbeResult<HevcSps> {
    let mut br = BitReader::new(buf);
    let mut sps = HevcSps::default();

    br.skip_bits(16); // NAL 头部

    sps.vps_id = br.read_bits(4) as u8;
    sps.max_sub_layers = br.read_bits(3) + 1;
    if sps.max_sub_layers > MAX_SUB_LAYERS {
        return Err(ProbeError::InvalidData(format!(
            "H.265: sps_max_sub_layers 超出范围, value={}",
            sps.max_sub_layers
        )));
    }
    sps.temporal_id_nesting_flag = br.read_flag();

    sps.ptl = parse_ptl(&mut br, sps.max_sub_layers)?;

    sps.sps_id = br.read_ue()?;
    if sps.sps_id >= MAX_SPS_COUNT {
        return Err(ProbeError::InvalidData(format!(
            "H.265: sps_id 超出范围, value={}",
            sps.sps_id
        )));
    }

    sps.chroma_format_idc = br.read_ue()?;
    if sps.chroma_format_idc > 3 {
        return Err(ProbeError::InvalidData(format!(
            "H.265: chroma_format_idc 非法, value={}",
            sps.chroma_format_idc
        )));
    }
    if sps.chroma_format_idc == 3 {
        sps.separate_colour_plane_flag = br.read_flag();
    }
    if sps.separate_colour_plane_flag {
        sps.chroma_format_idc = 0;
    }

    sps.width = br.read_ue()?;
    sps.height = br.read_ue()?;
    check_image_size(sps.width, sps.height)?;

    sps.conformance_window_flag = br.read_flag();
    if sps.conformance_window_flag {
        let horiz = sub_width_c(sps.chroma_format_idc);
        let vert = sub_height_c(sps.chroma_format_idc);
        sps.pic_conf_win = HevcWindow {
            left_offset: br.read_ue()?.saturating_mul(horiz),
            right_offset: br.read_ue()?.saturating_mul(horiz),
            top_offset: br.read_ue()?.saturating_mul(vert),
            bottom_offset: br.read_ue()?.saturating_mul(vert),
        };
        if opts.ignore_crop {
            debug!("H.265: 忽略一致性裁剪窗口 {:?}", sps.pic_conf_win);
            sps.pic_conf_win = HevcWindow::default();
        }
        sps.output_window = sps.pic_conf_win;
    }

    sps.bit_depth = br.read_ue()?.saturating_add(8);
    sps.bit_depth_chroma = br.read_ue()?.saturating_add(8);
    if sps.chroma_format_idc != 0 && sps.bit_depth != sps.bit_depth_chroma {
        return Err(ProbeError::InvalidData(format!(
            "H.265: 亮度与色度位深不同, luma={}, chroma={}",
            sps.bit_depth, sps.bit_depth_chroma
        )));
    }
    if !matches!(sps.bit_depth, 8 | 10) || sps.chroma_format_idc != 1 {
        return Err(ProbeError::Unsupported(format!(
            "H.265: 不支持的格式, bit_depth={}, chroma_format_idc={}",
            sps.bit_depth, sps.chroma_format_idc
        )));
    }
    sps.pix_fmt = PixelFormat::from_chroma_format(sps.chroma_format_idc, sps.bit_depth);

    sps.log2_max_poc_lsb = br.read_ue()?.saturating_add(4);
    if sps.log2_max_poc_lsb > 16 {
        return Err(ProbeError::InvalidData(format!(
            "H.265: log2_max_pic_order_cnt_lsb 超出范围, value={}",
            sps.log2_max_poc_lsb
        )));
    }

    parse_sub_layer_ordering(&mut br, &mut sps)?;
    parse_block_sizes(&mut br, &mut sps)?;

    sps.scaling_list_enable_flag = br.read_flag();
    if sps.scaling_list_enable_flag {
        sps.scaling_list = ScalingList::default();
        // sps_scaling_list_data_present_flag
        if br.read_flag() {
            scaling_list_data(&mut br, &mut sps.scaling_list, sps.chroma_format_idc)?;
        }
    }

    sps.amp_enabled_flag = br.read_flag();
    sps.sao_enabled_flag = br.read_flag();

    sps.pcm_enabled_flag = br.read_flag();
    if sps.pcm_enabled_flag {
        sps.pcm.bit_depth = br.read_bits(4) + 1;
        sps.pcm.bit_depth_chroma = br.read_bits(4) + 1;
        sps.pcm.log2_min_pcm_cb_size = br.read_ue()?.saturating_add(3);
        sps.pcm.log2_max_pcm_cb_size = sps.pcm.log2_min_pcm_cb_size.saturating_add(br.read_ue()?);
        if sps.pcm.bit_depth.max(sps.pcm.bit_depth_chroma) > sps.bit_depth {
            return Err(ProbeError::InvalidData(format!(
                "H.265: PCM 位深 ({}, {}) 大于序列位深 {}",
                sps.pcm.bit_depth, sps.pcm.bit_depth_chroma, sps.bit_depth
            )));
        }
        sps.pcm.loop_filter_disable_flag = br.read_flag();
    }

    let nb_st_rps = br.read_ue()?;
    if nb_st_rps > MAX_SHORT_TERM_RPS {
        return Err(ProbeError::InvalidData(format!(
            "H.265: num_short_term_ref_pic_sets 超出范围, value={}",
            nb_st_rps
        )));
    }
    sps.st_rps.reserve(nb_st_rps as usize);
    for _ in 0..nb_st_rps {
        let rps = decode_short_term_rps(&mut br, &sps.st_rps, false)?;
        sps.st_rps.push(rps);
    }

    sps.long_term_ref_pics_present_flag = br.read_flag();
    if sps.long_term_ref_pics_present_flag {
        let count = br.read_ue()?;
        if count > MAX_LONG_TERM_REF_PICS {
            return Err(ProbeError::InvalidData(format!(
                "H.265: num_long_term_ref_pics_sps 超出范围, value={}",
                count
            )));
        }
        for _ in 0..count {
            let poc_lsb = br.read_bits(sps.log2_max_poc_lsb);
            let used_by_curr_pic = br.read_flag();
            sps.long_term_ref_pics.push(LongTermRefPic {
                poc_lsb,
                used_by_curr_pic,
            });
        }
    }

    sps.temporal_mvp_enabled_flag = br.read_flag();
    sps.strong_intra_smoothing_enabled_flag = br.read_flag();

    // vui_parameters_present_flag
    if br.read_flag() {
        sps.vui = Some(parse_vui(&mut br, &sps, opts)?);
    }

    // sps_extension_present_flag
    if br.read_flag() {
        sps.range_extension_flag = br.read_flag();
        br.skip_bits(7); // sps_extension_7bits
        if sps.range_extension_flag {
            sps.range_extension = parse_range_extension(&mut br);
        }
    }

    if let (true, Some(vui)) = (opts.apply_default_display_window, sps.vui.as_ref()) {
        let ddw = vui.def_disp_win;
        let ow = &mut sps.output_window;
        ow.left_offset = ow.left_offset.saturating_add(ddw.left_offset);
        ow.right_offset = ow.right_offset.saturating_add(ddw.right_offset);
        ow.top_offset = ow.top_offset.saturating_add(ddw.top_offset);
        ow.bottom_offset = ow.bottom_offset.saturating_add(ddw.bottom_offset);
    }

    let ow = sps.output_window;
    if u64::from(ow.left_offset) + u64::from(ow.right_offset) >= u64::from(sps.width)
        || u64::from(ow.top_offset) + u64::from(ow.bottom_offset) >= u64::from(sps.height)
    {
        warn!(
            "H.265: 裁剪偏移非法 {}/{}/{}/{}, 输出完整图像",
            ow.left_offset, ow.right_offset, ow.top_offset, ow.bottom_offset
        );
        sps.output_window = HevcWindow::default();
        sps.pic_conf_win = HevcWindow::default();
    }
    sps.output_width = sps.width - sps.output_window.left_offset - sps.output_window.right_offset;
    sps.output_height =
        sps.height - sps.output_window.top_offset - sps.output_window.bottom_offset;

    derive_and_validate(&mut sps)?;

    br.check_overread("H.265: SPS")?;

    debug!(
        "H.265: SPS id={}, profile={}, level={}, {}x{} (输出 {}x{}), depth={}, ctb={}",
        sps.sps_id,
        sps.ptl.general.profile_idc,
        sps.ptl.general.level_idc,
        sps.width,
        sps.height,
        sps.output_width,
        sps.output_height,
        sps.bit_depth,
        1u32 << sps.log2_ctb_size
    );
    Ok(sps)
}

fn check_image_size(width: u32, height: u32) -> ProbeResult<()> {
    let area = (u64::from(width) + 128) * (u64::from(height) + 128);
    if width == 0 || height == 0 || area >= (i32::MAX / 8) as u64 {
        return Err(ProbeError::InvalidData(format!(
            "H.265: 图像尺寸非法, {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn parse_sub_layer_ordering(br: &mut BitReader, sps: &mut HevcSps) -> ProbeResult<()> {
    let layers = sps.max_sub_layers as usize;
    let info_present = br.read_flag();
    let start = if info_present { 0 } else { layers - 1 };

    for i in start..layers {
        let layer = &mut sps.temporal_layer[i];
        layer.max_dec_pic_buffering = br.read_ue()?.saturating_add(1);
        layer.num_reorder_pics = br.read_ue()?;
        layer.max_latency_increase = i64::from(br.read_ue()?) - 1;

        if layer.max_dec_pic_buffering > MAX_DPB_SIZE {
            return Err(ProbeError::InvalidData(format!(
                "H.265: sps_max_dec_pic_buffering 超出范围, value={}",
                layer.max_dec_pic_buffering - 1
            )));
        }
        if layer.num_reorder_pics > layer.max_dec_pic_buffering - 1 {
            warn!(
                "H.265: sps_max_num_reorder_pics 超出范围 ({} > {}), 放大 DPB",
                layer.num_reorder_pics,
                layer.max_dec_pic_buffering - 1
            );
            if layer.num_reorder_pics > MAX_DPB_SIZE - 1 {
                return Err(ProbeError::InvalidData(format!(
                    "H.265: sps_max_num_reorder_pics 超出范围, value={}",
                    layer.num_reorder_pics
                )));
            }
            layer.max_dec_pic_buffering = layer.num_reorder_pics + 1;
        }
    }

    if !info_present {
        let last = sps.temporal_layer[start];
        for layer in sps.temporal_layer.iter_mut().take(start) {
            *layer = last;
        }
    }
    Ok(())
}

fn parse_block_sizes(br: &mut BitReader, sps: &mut HevcSps) -> ProbeResult<()> {
    sps.log2_min_cb_size = br.read_ue()?.saturating_add(3);
    sps.log2_diff_max_min_coding_block_size = br.read_ue()?;
    sps.log2_min_tb_size = br.read_ue()?.saturating_add(2);
    let log2_diff_max_min_tb_size = br.read_ue()?;
    sps.log2_max_trafo_size = log2_diff_max_min_tb_size.saturating_add(sps.log2_min_tb_size);

    if !(3..=30).contains(&sps.log2_min_cb_size) {
        return Err(ProbeError::InvalidData(format!(
            "H.265: log2_min_cb_size 非法, value={}",
            sps.log2_min_cb_size
        )));
    }
    if sps.log2_diff_max_min_coding_block_size > 30 {
        return Err(ProbeError::InvalidData(format!(
            "H.265: log2_diff_max_min_coding_block_size 非法, value={}",
            sps.log2_diff_max_min_coding_block_size
        )));
    }
    if sps.log2_min_tb_size >= sps.log2_min_cb_size || sps.log2_min_tb_size < 2 {
        return Err(ProbeError::InvalidData(format!(
            "H.265: log2_min_tb_size 非法, value={}, log2_min_cb_size={}",
            sps.log2_min_tb_size, sps.log2_min_cb_size
        )));
    }
    if log2_diff_max_min_tb_size > 30 {
        return Err(ProbeError::InvalidData(format!(
            "H.265: log2_diff_max_min_transform_block_size 非法, value={}",
            log2_diff_max_min_tb_size
        )));
    }

    sps.max_transform_hierarchy_depth_inter = br.read_ue()?;
    sps.max_transform_hierarchy_depth_intra = br.read_ue()?;
    Ok(())
}

fn parse_range_extension(br: &mut BitReader) -> RangeExtension {
    let mut ext = RangeExtension {
        transform_skip_rotation_enabled_flag: br.read_flag(),
        transform_skip_context_enabled_flag: br.read_flag(),
        implicit_rdpcm_enabled_flag: br.read_flag(),
        explicit_rdpcm_enabled_flag: br.read_flag(),
        extended_precision_processing_flag: br.read_flag(),
        ..RangeExtension::default()
    };
    if ext.extended_precision_processing_flag {
        warn!("H.265: extended_precision_processing_flag 尚未实现");
    }
    ext.intra_smoothing_disabled_flag = br.read_flag();
    ext.high_precision_offsets_enabled_flag = br.read_flag();
    if ext.high_precision_offsets_enabled_flag {
        warn!("H.265: high_precision_offsets_enabled_flag 尚未实现");
    }
    ext.persistent_rice_adaptation_enabled_flag = br.read_flag();
    ext.cabac_bypass_alignment_enabled_flag = br.read_flag();
    if ext.cabac_bypass_alignment_enabled_flag {
        warn!("H.265: cabac_bypass_alignment_enabled_flag 尚未实现");
    }
    ext
}

/// 计算推导尺寸并做跨字段检查
fn derive_and_validate(sps: &mut HevcSps) -> ProbeResult<()> {
    sps.log2_ctb_size = sps.log2_min_cb_size + sps.log2_diff_max_min_coding_block_size;
    sps.log2_min_pu_size = sps.log2_min_cb_size - 1;

    if sps.log2_ctb_size > MAX_LOG2_CTB_SIZE {
        return Err(ProbeError::InvalidData(format!(
            "H.265: CTB 尺寸超出范围, log2_ctb_size={}",
            sps.log2_ctb_size
        )));
    }
    if sps.log2_ctb_size < 4 {
        return Err(ProbeError::Unsupported(format!(
            "H.265: 不支持 CTB 尺寸 {}",
            1u32 << sps.log2_ctb_size
        )));
    }

    let ctb = 1u32 << sps.log2_ctb_size;
    sps.ctb_width = sps.width.div_ceil(ctb);
    sps.ctb_height = sps.height.div_ceil(ctb);
    sps.ctb_size = sps.ctb_width * sps.ctb_height;

    sps.min_cb_width = sps.width >> sps.log2_min_cb_size;
    sps.min_cb_height = sps.height >> sps.log2_min_cb_size;
    sps.min_tb_width = sps.width >> sps.log2_min_tb_size;
    sps.min_tb_height = sps.height >> sps.log2_min_tb_size;
    sps.min_pu_width = sps.width >> sps.log2_min_pu_size;
    sps.min_pu_height = sps.height >> sps.log2_min_pu_size;
    sps.tb_mask = (1 << (sps.log2_ctb_size - sps.log2_min_tb_size)) - 1;
    sps.qp_bd_offset = 6 * (sps.bit_depth as i32 - 8);

    let min_cb_mask = (1u32 << sps.log2_min_cb_size) - 1;
    if sps.width & min_cb_mask != 0 || sps.height & min_cb_mask != 0 {
        return Err(ProbeError::InvalidData(format!(
            "H.265: 编码尺寸 {}x{} 不是最小 CB ({}) 的整数倍",
            sps.width,
            sps.height,
            min_cb_mask + 1
        )));
    }

    let max_depth = sps.log2_ctb_size - sps.log2_min_tb_size;
    if sps.max_transform_hierarchy_depth_inter > max_depth {
        return Err(ProbeError::InvalidData(format!(
            "H.265: max_transform_hierarchy_depth_inter 超出范围, value={}",
            sps.max_transform_hierarchy_depth_inter
        )));
    }
    if sps.max_transform_hierarchy_depth_intra > max_depth {
        return Err(ProbeError::InvalidData(format!(
            "H.265: max_transform_hierarchy_depth_intra 超出范围, value={}",
            sps.max_transform_hierarchy_depth_intra
        )));
    }
    if sps.log2_max_trafo_size > sps.log2_ctb_size.max(5) {
        return Err(ProbeError::InvalidData(format!(
            "H.265: log2_max_trafo_size 超出范围, value={}",
            sps.log2_max_trafo_size
        )));
    }
    Ok(())
}
