//! H.265 VUI 解析.
//!
//! 部分码流把 timing_info 写在 default_display_window 的位置上.
//! 解析 default_display_window 之前保存读取器与 VUI 快照, 遇到可疑布局时
//! 回退到快照并按备用语法从 timing_info 重新解析, 最多重试一次.

use esprobe_core::bitreader::BitReader;
use esprobe_core::color::{self, ColorPrimaries, ColorRange, ColorSpace, ColorTransfer};
use esprobe_core::{PixelFormat, ProbeError, ProbeResult, Rational};
use log::{debug, info, warn};

use super::hrd::{HevcHrd, decode_hrd};
use super::sps::{HevcSps, HevcSpsOptions, HevcWindow, sub_height_c, sub_width_c};
use crate::parsers::h2645::{EXTENDED_SAR, SAR_TABLE};

/// 无效 default_display_window 的特征位
const INVALID_DDW_PATTERN: u32 = 0x10_0000;

/// VUI 参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcVui {
    /// 采样宽高比, 未给出时为 0/0
    pub sar: Rational,
    pub overscan_info_present_flag: bool,
    pub overscan_appropriate_flag: bool,
    pub video_signal_type_present_flag: bool,
    pub video_format: u8,
    pub full_range: bool,
    pub colour_description_present_flag: bool,
    /// colour_primaries (已钳位)
    pub colour_primaries: u8,
    /// transfer_characteristics (已钳位)
    pub transfer_characteristics: u8,
    /// matrix_coeffs (已钳位)
    pub matrix_coefficients: u8,
    pub chroma_loc_info_present_flag: bool,
    pub chroma_sample_loc_type_top_field: u32,
    pub chroma_sample_loc_type_bottom_field: u32,
    pub neutral_chroma_indication_flag: bool,
    /// field_seq_flag, 置位表示逐场编码
    pub field_seq_flag: bool,
    pub frame_field_info_present_flag: bool,
    pub default_display_window_flag: bool,
    /// 默认显示窗口, 已乘色度下采样倍数
    pub def_disp_win: HevcWindow,
    pub timing_info_present_flag: bool,
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub poc_proportional_to_timing_flag: bool,
    pub num_ticks_poc_diff_one_minus1: u32,
    pub hrd_parameters_present_flag: bool,
    pub hrd: Option<HevcHrd>,
    pub bitstream_restriction_flag: bool,
    pub tiles_fixed_structure_flag: bool,
    pub motion_vectors_over_pic_boundaries_flag: bool,
    pub restricted_ref_pic_lists_flag: bool,
    pub min_spatial_segmentation_idc: u32,
    pub max_bytes_per_pic_denom: u32,
    pub max_bits_per_min_cu_denom: u32,
    pub log2_max_mv_length_horizontal: u32,
    pub log2_max_mv_length_vertical: u32,
    /// 是否经过备用语法重试
    pub alternate_syntax: bool,
}

impl Default for HevcVui {
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
            chroma_loc_info_present_flag: false,
            chroma_sample_loc_type_top_field: 0,
            chroma_sample_loc_type_bottom_field: 0,
            neutral_chroma_indication_flag: false,
            field_seq_flag: false,
            frame_field_info_present_flag: false,
            default_display_window_flag: false,
            def_disp_win: HevcWindow::default(),
            timing_info_present_flag: false,
            num_units_in_tick: 0,
            time_scale: 0,
            poc_proportional_to_timing_flag: false,
            num_ticks_poc_diff_one_minus1: 0,
            hrd_parameters_present_flag: false,
            hrd: None,
            bitstream_restriction_flag: false,
            tiles_fixed_structure_flag: false,
            motion_vectors_over_pic_boundaries_flag: false,
            restricted_ref_pic_lists_flag: false,
            min_spatial_segmentation_idc: 0,
            max_bytes_per_pic_denom: 0,
            max_bits_per_min_cu_denom: 0,
            log2_max_mv_length_horizontal: 0,
            log2_max_mv_length_vertical: 0,
            alternate_syntax: false,
        }
    }
}

impl HevcVui {
    /// 帧率 time_scale / num_units_in_tick
    pub fn frame_rate(&self) -> Option<Rational> {
        if !self.timing_info_present_flag || self.num_units_in_tick == 0 || self.time_scale == 0 {
            return None;
        }
        Some(Rational::from_u64(
            u64::from(self.time_scale),
            u64::from(self.num_units_in_tick),
        ))
    }

    pub fn color_primaries(&self) -> ColorPrimaries {
        ColorPrimaries::from_code(self.colour_primaries)
    }

    pub fn color_transfer(&self) -> ColorTransfer {
        ColorTransfer::from_code(self.transfer_characteristics)
    }

    pub fn color_space(&self) -> ColorSpace {
        ColorSpace::from_code(self.matrix_coefficients)
    }

    pub fn color_range(&self) -> ColorRange {
        if self.video_signal_type_present_flag {
            ColorRange::from_full_range_flag(self.full_range)
        } else {
            ColorRange::Unspecified
        }
    }
}

/// timing_info 之后部分的解析结果
enum Tail {
    Done,
    Retry(&'static str),
}

/// 解析 vui_parameters()
///
/// `sps` 提供 chroma_format_idc, max_sub_layers 与像素格式.
pub fn parse_vui(
    br: &mut BitReader,
    sps: &HevcSps,
    opts: &HevcSpsOptions,
) -> ProbeResult<HevcVui> {
    let mut vui = HevcVui::default();

    if br.read_flag() {
        let idc = br.read_bits(8);
        if let Some(sar) = SAR_TABLE.get(idc as usize) {
            vui.sar = *sar;
        } else if idc == EXTENDED_SAR {
            let num = br.read_bits(16) as i32;
            let den = br.read_bits(16) as i32;
            vui.sar = Rational::new(num, den);
        } else {
            warn!("H.265: 未知 SAR 索引 {}", idc);
        }
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
            vui.colour_primaries = color::clamp_code_hevc(primaries, color::PRIMARIES_NB);
            vui.transfer_characteristics = color::clamp_code_hevc(transfer, color::TRANSFER_NB);
            vui.matrix_coefficients = color::clamp_code_hevc(matrix, color::MATRIX_NB);

            if vui.matrix_coefficients == color::MATRIX_RGB && sps.pix_fmt != PixelFormat::None {
                return Err(ProbeError::Unsupported(format!(
                    "H.265: 像素格式 {} 不支持 RGB 矩阵系数",
                    sps.pix_fmt
                )));
            }
        }
    }

    vui.chroma_loc_info_present_flag = br.read_flag();
    if vui.chroma_loc_info_present_flag {
        vui.chroma_sample_loc_type_top_field = br.read_ue()?;
        vui.chroma_sample_loc_type_bottom_field = br.read_ue()?;
    }

    vui.neutral_chroma_indication_flag = br.read_flag();
    vui.field_seq_flag = br.read_flag();
    vui.frame_field_info_present_flag = br.read_flag();

    let saved_reader = *br;
    let saved_vui = vui.clone();

    if br.bits_left() >= 68 && br.show_bits(21) == INVALID_DDW_PATTERN {
        warn!("H.265: default_display_window 无效, 忽略");
        vui.default_display_window_flag = false;
    } else {
        vui.default_display_window_flag = br.read_flag();
    }

    if vui.default_display_window_flag {
        let horiz = sub_width_c(sps.chroma_format_idc);
        let vert = sub_height_c(sps.chroma_format_idc);
        vui.def_disp_win = HevcWindow {
            left_offset: br.read_ue()?.saturating_mul(horiz),
            right_offset: br.read_ue()?.saturating_mul(horiz),
            top_offset: br.read_ue()?.saturating_mul(vert),
            bottom_offset: br.read_ue()?.saturating_mul(vert),
        };
        if opts.apply_default_display_window && opts.ignore_crop {
            vui.def_disp_win = HevcWindow::default();
        }
    }

    let mut alt = false;
    loop {
        let outcome = match parse_from_timing_info(br, &mut vui, sps.max_sub_layers, alt) {
            Ok(outcome) => outcome,
            Err(e) if e.is_truncated() && !alt => Tail::Retry("VUI 越界读取"),
            Err(e) => return Err(e),
        };
        match outcome {
            Tail::Done => break,
            Tail::Retry(reason) => {
                warn!("H.265: {}, 从 timing_info 按备用语法重试", reason);
                *br = saved_reader;
                vui = saved_vui.clone();
                alt = true;
                vui.alternate_syntax = true;
            }
        }
    }

    debug!(
        "H.265: VUI sar={}, timing={}, field_seq={}, alt={}",
        vui.sar, vui.timing_info_present_flag, vui.field_seq_flag, vui.alternate_syntax
    );
    Ok(vui)
}

/// 从 vui_timing_info_present_flag 开始解析
fn parse_from_timing_info(
    br: &mut BitReader,
    vui: &mut HevcVui,
    max_sub_layers: u32,
    alt: bool,
) -> ProbeResult<Tail> {
    vui.timing_info_present_flag = br.read_flag();
    if vui.timing_info_present_flag {
        if br.bits_left() < 66 && !alt {
            return Ok(Tail::Retry("VUI timing_info 可疑"));
        }
        vui.num_units_in_tick = br.read_bits(32);
        vui.time_scale = br.read_bits(32);
        if alt {
            info!(
                "H.265: 重试得到 {}/{} fps",
                vui.time_scale, vui.num_units_in_tick
            );
        }
        vui.poc_proportional_to_timing_flag = br.read_flag();
        if vui.poc_proportional_to_timing_flag {
            vui.num_ticks_poc_diff_one_minus1 = br.read_ue()?;
        }
        vui.hrd_parameters_present_flag = br.read_flag();
        if vui.hrd_parameters_present_flag {
            vui.hrd = Some(decode_hrd(br, true, max_sub_layers)?);
        }
    }

    vui.bitstream_restriction_flag = br.read_flag();
    if vui.bitstream_restriction_flag {
        if br.bits_left() < 8 && !alt {
            return Ok(Tail::Retry("VUI bitstream_restriction 可疑"));
        }
        vui.tiles_fixed_structure_flag = br.read_flag();
        vui.motion_vectors_over_pic_boundaries_flag = br.read_flag();
        vui.restricted_ref_pic_lists_flag = br.read_flag();
        vui.min_spatial_segmentation_idc = br.read_ue()?;
        vui.max_bytes_per_pic_denom = br.read_ue()?;
        vui.max_bits_per_min_cu_denom = br.read_ue()?;
        vui.log2_max_mv_length_horizontal = br.read_ue()?;
        vui.log2_max_mv_length_vertical = br.read_ue()?;
    }

    if br.bits_left() < 1 && !alt {
        return Ok(Tail::Retry("VUI 越界读取"));
    }
    Ok(Tail::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esprobe_core::bitwriter::BitWriter;

    fn sps_420() -> HevcSps {
        HevcSps {
            chroma_format_idc: 1,
            max_sub_layers: 1,
            pix_fmt: PixelFormat::Yuv420p,
            ..HevcSps::default()
        }
    }

    /// VUI 头部: SAR 1:1, 无 overscan, 可选色彩描述, 无 chroma_loc, 3 个标志
    fn write_head(bw: &mut BitWriter, matrix: Option<u32>, field_seq: bool) {
        bw.write_flag(true);
        bw.write_bits(1, 8);
        bw.write_flag(false);
        match matrix {
            Some(m) => {
                bw.write_flag(true);
                bw.write_bits(5, 3);
                bw.write_flag(false);
                bw.write_flag(true);
                bw.write_bits(1, 8);
                bw.write_bits(99, 8); // 超出范围 → 未指定
                bw.write_bits(m, 8);
            }
            None => bw.write_flag(false),
        }
        bw.write_flag(false); // chroma_loc
        bw.write_flag(false); // neutral_chroma
        bw.write_flag(field_seq);
        bw.write_flag(false); // frame_field_info
    }

    fn write_timing(bw: &mut BitWriter, num_units: u32, time_scale: u32) {
        bw.write_flag(true);
        bw.write_bits(num_units, 32);
        bw.write_bits(time_scale, 32);
        bw.write_flag(false); // poc_proportional
        bw.write_flag(false); // hrd
    }

    #[test]
    fn test_vui_normal_layout() {
        let mut bw = BitWriter::new();
        write_head(&mut bw, Some(1), true);
        bw.write_flag(true); // default_display_window_flag
        bw.write_ue(1);
        bw.write_ue(2);
        bw.write_ue(3);
        bw.write_ue(4);
        write_timing(&mut bw, 1001, 30000);
        bw.write_flag(false); // bitstream_restriction
        bw.write_flag(false); // sps_extension
        bw.write_rbsp_trailing_bits();
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        let vui = parse_vui(&mut br, &sps_420(), &HevcSpsOptions::default()).unwrap();
        assert_eq!(vui.sar, Rational::new(1, 1));
        assert_eq!(vui.transfer_characteristics, color::CODE_UNSPECIFIED);
        assert_eq!(vui.matrix_coefficients, 1);
        assert!(vui.field_seq_flag);
        assert!(vui.default_display_window_flag);
        assert_eq!(
            vui.def_disp_win,
            HevcWindow {
                left_offset: 2,
                right_offset: 4,
                top_offset: 6,
                bottom_offset: 8,
            }
        );
        assert_eq!(vui.frame_rate(), Some(Rational::new(30000, 1001)));
        assert!(!vui.alternate_syntax);
    }

    #[test]
    fn test_vui_invalid_default_display_window() {
        // timing_info 直接写在 default_display_window_flag 的位置,
        // num_units_in_tick=1 形成 1 + 20 个 0 的特征位
        let mut bw = BitWriter::new();
        write_head(&mut bw, None, false);
        write_timing(&mut bw, 1, 25);
        bw.write_flag(false); // bitstream_restriction
        bw.write_flag(false); // sps_extension
        bw.write_rbsp_trailing_bits();
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        let vui = parse_vui(&mut br, &sps_420(), &HevcSpsOptions::default()).unwrap();
        assert!(!vui.default_display_window_flag);
        assert_eq!(vui.def_disp_win, HevcWindow::default());
        assert!(!vui.alternate_syntax);
        assert!(vui.timing_info_present_flag);
        assert_eq!(vui.num_units_in_tick, 1);
        assert_eq!(vui.time_scale, 25);
    }

    #[test]
    fn test_vui_alternate_timing_retry() {
        // 首次解析: ddw_flag=1, 4 个 ue=0, timing 标志=1 后剩余不足 66 位 → 重试
        let mut bw = BitWriter::new();
        write_head(&mut bw, None, false);
        let head_bits = bw.bits_written();
        write_timing(&mut bw, 0xF800_0000, 0x0001_5F90);
        bw.write_flag(false); // bitstream_restriction
        let vui_bits = bw.bits_written();
        bw.write_rbsp_trailing_bits();
        let data = bw.finish();
        assert_eq!(vui_bits - head_bits, 68);

        let mut br = BitReader::with_bit_len(&data, vui_bits);
        let vui = parse_vui(&mut br, &sps_420(), &HevcSpsOptions::default()).unwrap();
        assert!(vui.alternate_syntax);
        assert!(!vui.default_display_window_flag);
        assert!(vui.timing_info_present_flag);
        assert_eq!(vui.num_units_in_tick, 0xF800_0000);
        assert_eq!(vui.time_scale, 90000);
        assert!(!vui.bitstream_restriction_flag);
        assert_eq!(br.bits_left(), 0);
    }

    #[test]
    fn test_vui_discard_default_display_window() {
        let mut bw = BitWriter::new();
        write_head(&mut bw, None, false);
        bw.write_flag(true);
        for _ in 0..4 {
            bw.write_ue(8);
        }
        bw.write_flag(false); // timing
        bw.write_flag(false); // restriction
        bw.write_flag(false);
        bw.write_rbsp_trailing_bits();
        let data = bw.finish();

        let opts = HevcSpsOptions {
            apply_default_display_window: true,
            ignore_crop: true,
        };
        let mut br = BitReader::new(&data);
        let vui = parse_vui(&mut br, &sps_420(), &opts).unwrap();
        assert!(vui.default_display_window_flag);
        assert_eq!(vui.def_disp_win, HevcWindow::default());
    }

    #[test]
    fn test_vui_reject_rgb_matrix() {
        let mut bw = BitWriter::new();
        write_head(&mut bw, Some(u32::from(color::MATRIX_RGB)), false);
        bw.write_bits(0, 16);
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        let err = parse_vui(&mut br, &sps_420(), &HevcSpsOptions::default())
            .expect_err("4:2:0 使用 RGB 矩阵应失败");
        assert!(format!("{err}").contains("RGB"));
    }

    #[test]
    fn test_vui_matrix_out_of_range_clamped() {
        let mut bw = BitWriter::new();
        write_head(&mut bw, Some(200), false);
        bw.write_flag(false);
        bw.write_flag(false);
        bw.write_flag(false);
        bw.write_flag(false);
        bw.write_rbsp_trailing_bits();
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        let vui = parse_vui(&mut br, &sps_420(), &HevcSpsOptions::default()).unwrap();
        assert_eq!(vui.matrix_coefficients, color::CODE_UNSPECIFIED);
        assert_eq!(vui.color_range(), ColorRange::Limited);
    }
}
