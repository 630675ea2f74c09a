//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! SPS 包含编码视频序列的全局参数, 包括:
//! - Profile / Level 与 constraint_set 标志
//! - 色度格式与位深 (High 系列 profile)
//! - 图像尺寸 (以宏块为单位, 需要 cropping 调整)
//! - POC 参数、参考帧数量
//! - 量化矩阵与 VUI
//!
//! 输入为包含 1 字节 NAL 头部、已去除 emulation prevention 的 RBSP.

use bitflags::bitflags;
use esprobe_core::bitreader::BitReader;
use esprobe_core::{PixelFormat, ProbeError, ProbeResult};
use log::debug;

use super::scaling::{FLAT_4X4, FLAT_8X8, decode_scaling_matrices};
use super::vui::{H264Vui, parse_vui};

/// SPS ID 上限 (不含)
pub const MAX_SPS_COUNT: u32 = 32;
/// 参考帧数量上限
pub const MAX_DPB_FRAMES: u32 = 16;
/// POC 周期中参考帧偏移数量上限 (不含)
pub const MAX_POC_CYCLE_LENGTH: u32 = 256;

bitflags! {
    /// constraint_set0..5 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConstraintSetFlags: u8 {
        /// constraint_set0_flag
        const SET0 = 1 << 0;
        /// constraint_set1_flag
        const SET1 = 1 << 1;
        /// constraint_set2_flag
        const SET2 = 1 << 2;
        /// constraint_set3_flag
        const SET3 = 1 << 3;
        /// constraint_set4_flag
        const SET4 = 1 << 4;
        /// constraint_set5_flag
        const SET5 = 1 << 5;
    }
}

/// 图像顺序计数 (POC) 参数, 三种类型互斥
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PocType {
    /// pic_order_cnt_type = 0
    Type0 {
        /// log2_max_pic_order_cnt_lsb_minus4 + 4
        log2_max_poc_lsb: u32,
    },
    /// pic_order_cnt_type = 1
    Type1 {
        /// delta_pic_order_always_zero_flag
        delta_pic_order_always_zero: bool,
        /// offset_for_non_ref_pic
        offset_for_non_ref_pic: i32,
        /// offset_for_top_to_bottom_field
        offset_for_top_to_bottom_field: i32,
        /// offset_for_ref_frame (最多 255 项)
        offset_for_ref_frame: Vec<i32>,
    },
    /// pic_order_cnt_type = 2, 无额外字段
    Type2,
}

impl Default for PocType {
    fn default() -> Self {
        Self::Type0 {
            log2_max_poc_lsb: 4,
        }
    }
}

/// SPS 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H264Sps {
    /// profile_idc (66=Baseline, 77=Main, 100=High, ...)
    pub profile_idc: u8,
    /// constraint_set 标志位
    pub constraint_set_flags: ConstraintSetFlags,
    /// level_idc (30=3.0, 41=4.1, ...)
    pub level_idc: u8,
    /// seq_parameter_set_id
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// 亮度位深
    pub bit_depth_luma: u32,
    /// 色度位深
    pub bit_depth_chroma: u32,
    /// qpprime_y_zero_transform_bypass_flag
    pub transform_bypass: bool,
    /// log2(max_frame_num)
    pub log2_max_frame_num: u32,
    /// POC 参数
    pub poc_type: PocType,
    /// max_num_ref_frames
    pub ref_frame_count: u32,
    /// gaps_in_frame_num_value_allowed_flag
    pub gaps_in_frame_num_allowed_flag: bool,
    /// 宽度 (宏块)
    pub mb_width: u32,
    /// 高度 (宏块, 场编码时已乘 2)
    pub mb_height: u32,
    /// frame_mbs_only_flag
    pub frame_mbs_only_flag: bool,
    /// mb_adaptive_frame_field_flag
    pub mb_aff: bool,
    /// direct_8x8_inference_flag
    pub direct_8x8_inference_flag: bool,
    /// frame_cropping_flag
    pub crop: bool,
    /// 左裁剪 (像素, 已乘裁剪单位)
    pub crop_left: u32,
    /// 右裁剪 (像素)
    pub crop_right: u32,
    /// 上裁剪 (像素)
    pub crop_top: u32,
    /// 下裁剪 (像素)
    pub crop_bottom: u32,
    /// 图像宽度 (像素, 已应用 cropping)
    pub width: u32,
    /// 图像高度 (像素, 已应用 cropping)
    pub height: u32,
    /// seq_scaling_matrix_present_flag
    pub scaling_matrix_present: bool,
    /// 4x4 量化矩阵 (Intra Y/Cr/Cb, Inter Y/Cr/Cb)
    pub scaling_matrix4: [[u8; 16]; 6],
    /// 8x8 量化矩阵 (Intra Y/Cr/Cb, Inter Y/Cr/Cb)
    pub scaling_matrix8: [[u8; 64]; 6],
    /// VUI 参数
    pub vui: Option<H264Vui>,
    /// 由色度格式与位深推导的像素格式
    pub pix_fmt: PixelFormat,
}

impl Default for H264Sps {
    fn default() -> Self {
        Self {
            profile_idc: 0,
            constraint_set_flags: ConstraintSetFlags::empty(),
            level_idc: 0,
            sps_id: 0,
            chroma_format_idc: 1,
            bit_depth_luma: 8,
            bit_depth_chroma: 8,
            transform_bypass: false,
            log2_max_frame_num: 4,
            poc_type: PocType::default(),
            ref_frame_count: 0,
            gaps_in_frame_num_allowed_flag: false,
            mb_width: 0,
            mb_height: 0,
            frame_mbs_only_flag: true,
            mb_aff: false,
            direct_8x8_inference_flag: false,
            crop: false,
            crop_left: 0,
            crop_right: 0,
            crop_top: 0,
            crop_bottom: 0,
            width: 0,
            height: 0,
            scaling_matrix_present: false,
            scaling_matrix4: FLAT_4X4,
            scaling_matrix8: FLAT_8X8,
            vui: None,
            pix_fmt: PixelFormat::None,
        }
    }
}

impl H264Sps {
    /// pic_struct_present_flag (无 VUI 时为 false)
    pub fn pic_struct_present(&self) -> bool {
        self.vui.as_ref().is_some_and(|v| v.pic_struct_present_flag)
    }
}

/// High 系列 profile (携带 chroma_format_idc / 位深 / 量化矩阵)
pub fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135 | 144
    )
}

/// 解析 SPS
///
/// `buf` 以 1 字节 NAL 头部开始.
pub fn parse_sps(buf: &[u8]) -> ProbeResult<H264Sps> {
    let mut br = BitReader::new(buf);
    let mut sps = H264Sps::default();

    br.skip_bits(8); // NAL 头部

    sps.profile_idc = br.read_bits(8) as u8;
    let mut flags = 0u8;
    for i in 0..6 {
        flags |= (br.read_bit() as u8) << i;
    }
    sps.constraint_set_flags = ConstraintSetFlags::from_bits_truncate(flags);
    br.skip_bits(2); // reserved_zero_2bits
    sps.level_idc = br.read_bits(8) as u8;

    sps.sps_id = br.read_ue()?;
    if sps.sps_id >= MAX_SPS_COUNT {
        return Err(ProbeError::InvalidData(format!(
            "H.264: sps_id 超出范围, value={}",
            sps.sps_id
        )));
    }

    if is_high_profile(sps.profile_idc) {
        sps.chroma_format_idc = br.read_ue()?;
        if sps.chroma_format_idc > 3 {
            return Err(ProbeError::InvalidData(format!(
                "H.264: chroma_format_idc 非法, value={}",
                sps.chroma_format_idc
            )));
        }
        if sps.chroma_format_idc == 3 && br.read_flag() {
            return Err(ProbeError::Unsupported(
                "H.264: residual_color_transform_flag (分离色彩平面)".into(),
            ));
        }

        sps.bit_depth_luma = br.read_ue()?.saturating_add(8);
        sps.bit_depth_chroma = br.read_ue()?.saturating_add(8);
        if sps.bit_depth_luma != sps.bit_depth_chroma {
            return Err(ProbeError::Unsupported(format!(
                "H.264: 亮度与色度位深不同, luma={}, chroma={}",
                sps.bit_depth_luma, sps.bit_depth_chroma
            )));
        }
        if !(8..=12).contains(&sps.bit_depth_luma) {
            return Err(ProbeError::InvalidData(format!(
                "H.264: bit_depth 非法, value={}",
                sps.bit_depth_luma
            )));
        }

        sps.transform_bypass = br.read_flag();
        sps.scaling_matrix_present = decode_scaling_matrices(
            &mut br,
            sps.chroma_format_idc,
            &mut sps.scaling_matrix4,
            &mut sps.scaling_matrix8,
        )?;
    }

    let log2_max_frame_num_minus4 = br.read_ue()?;
    if log2_max_frame_num_minus4 > 12 {
        return Err(ProbeError::InvalidData(format!(
            "H.264: log2_max_frame_num_minus4 超出范围, value={}",
            log2_max_frame_num_minus4
        )));
    }
    sps.log2_max_frame_num = log2_max_frame_num_minus4 + 4;

    sps.poc_type = parse_poc(&mut br)?;

    sps.ref_frame_count = br.read_ue()?;
    if sps.ref_frame_count > MAX_DPB_FRAMES {
        return Err(ProbeError::InvalidData(format!(
            "H.264: max_num_ref_frames 超出范围, value={}",
            sps.ref_frame_count
        )));
    }
    sps.gaps_in_frame_num_allowed_flag = br.read_flag();

    sps.mb_width = br.read_ue()?.saturating_add(1);
    sps.mb_height = br.read_ue()?.saturating_add(1);
    sps.frame_mbs_only_flag = br.read_flag();
    if !sps.frame_mbs_only_flag {
        sps.mb_height = sps.mb_height.saturating_mul(2);
        sps.mb_aff = br.read_flag();
    }
    if sps.mb_width >= i32::MAX as u32 / 16 || sps.mb_height >= i32::MAX as u32 / 16 {
        return Err(ProbeError::InvalidData(format!(
            "H.264: 宏块尺寸溢出, mb_width={}, mb_height={}",
            sps.mb_width, sps.mb_height
        )));
    }
    sps.direct_8x8_inference_flag = br.read_flag();

    let raw_width = sps.mb_width * 16;
    let raw_height = sps.mb_height * 16;

    sps.crop = br.read_flag();
    if sps.crop {
        let crop_left = br.read_ue()?;
        let crop_right = br.read_ue()?;
        let crop_top = br.read_ue()?;
        let crop_bottom = br.read_ue()?;

        let (step_x, step_y) = crop_unit(sps.chroma_format_idc, sps.frame_mbs_only_flag);
        let crop_x = u64::from(crop_left) + u64::from(crop_right);
        let crop_y = u64::from(crop_top) + u64::from(crop_bottom);
        if crop_x * u64::from(step_x) >= u64::from(raw_width)
            || crop_y * u64::from(step_y) >= u64::from(raw_height)
        {
            return Err(ProbeError::InvalidData(format!(
                "H.264: 裁剪参数非法, raw={}x{}, crop=({}, {}, {}, {})",
                raw_width, raw_height, crop_left, crop_right, crop_top, crop_bottom
            )));
        }
        sps.crop_left = crop_left * step_x;
        sps.crop_right = crop_right * step_x;
        sps.crop_top = crop_top * step_y;
        sps.crop_bottom = crop_bottom * step_y;
    }
    sps.width = raw_width - sps.crop_left - sps.crop_right;
    sps.height = raw_height - sps.crop_top - sps.crop_bottom;

    if br.read_flag() {
        let mut vui = H264Vui::default();
        parse_vui(&mut br, &mut vui)?;
        sps.vui = Some(vui);
    }

    br.check_overread("H.264: SPS")?;

    sps.pix_fmt = PixelFormat::from_chroma_format(sps.chroma_format_idc, sps.bit_depth_luma);

    debug!(
        "H.264: SPS id={}, profile={}, level={}, {}x{}, chroma={}, depth={}, frame_mbs_only={}",
        sps.sps_id,
        sps.profile_idc,
        sps.level_idc,
        sps.width,
        sps.height,
        sps.chroma_format_idc,
        sps.bit_depth_luma,
        sps.frame_mbs_only_flag
    );
    Ok(sps)
}

fn parse_poc(br: &mut BitReader) -> ProbeResult<PocType> {
    let poc_type = br.read_ue()?;
    match poc_type {
        0 => {
            let log2_max_poc_lsb_minus4 = br.read_ue()?;
            if log2_max_poc_lsb_minus4 > 12 {
                return Err(ProbeError::InvalidData(format!(
                    "H.264: log2_max_pic_order_cnt_lsb_minus4 超出范围, value={}",
                    log2_max_poc_lsb_minus4
                )));
            }
            Ok(PocType::Type0 {
                log2_max_poc_lsb: log2_max_poc_lsb_minus4 + 4,
            })
        }
        1 => {
            let delta_pic_order_always_zero = br.read_flag();
            let offset_for_non_ref_pic = br.read_se()?;
            let offset_for_top_to_bottom_field = br.read_se()?;
            let cycle_length = br.read_ue()?;
            if cycle_length >= MAX_POC_CYCLE_LENGTH {
                return Err(ProbeError::InvalidData(format!(
                    "H.264: num_ref_frames_in_pic_order_cnt_cycle 超出范围, value={}",
                    cycle_length
                )));
            }
            let offset_for_ref_frame = (0..cycle_length)
                .map(|_| br.read_se())
                .collect::<ProbeResult<Vec<_>>>()?;
            Ok(PocType::Type1 {
                delta_pic_order_always_zero,
                offset_for_non_ref_pic,
                offset_for_top_to_bottom_field,
                offset_for_ref_frame,
            })
        }
        2 => Ok(PocType::Type2),
        _ => Err(ProbeError::InvalidData(format!(
            "H.264: pic_order_cnt_type 非法, value={}",
            poc_type
        ))),
    }
}

/// 裁剪单位 (step_x, step_y)
fn crop_unit(chroma_format_idc: u32, frame_mbs_only: bool) -> (u32, u32) {
    let hsub = u32::from(chroma_format_idc == 1 || chroma_format_idc == 2);
    let vsub = u32::from(chroma_format_idc == 1);
    let step_x = 1 << hsub;
    let step_y = (2 - u32::from(frame_mbs_only)) << vsub;
    (step_x, step_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::h264::scaling::DEFAULT_SCALING_4X4;
    use esprobe_core::Rational;
    use esprobe_core::bitwriter::BitWriter;

    /// 测试 SPS 参数
    #[derive(Clone)]
    struct SpsParams {
        profile_idc: u8,
        chroma_format_idc: u32,
        bit_depth: u32,
        width: u32,
        height: u32,
        frame_mbs_only: bool,
        poc_type: u32,
        ref_frames: u32,
        vui_timing: Option<(u32, u32)>,
    }

    impl Default for SpsParams {
        fn default() -> Self {
            Self {
                profile_idc: 66,
                chroma_format_idc: 1,
                bit_depth: 8,
                width: 1920,
                height: 1080,
                frame_mbs_only: true,
                poc_type: 0,
                ref_frames: 4,
                vui_timing: None,
            }
        }
    }

    fn build_sps(p: &SpsParams) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(0x67, 8); // NAL 头部
        bw.write_bits(u32::from(p.profile_idc), 8);
        bw.write_bits(0b1100_0000, 8); // constraint_set0/1
        bw.write_bits(40, 8); // level_idc
        bw.write_ue(0); // sps_id

        if is_high_profile(p.profile_idc) {
            bw.write_ue(p.chroma_format_idc);
            if p.chroma_format_idc == 3 {
                bw.write_flag(false); // residual_color_transform_flag
            }
            bw.write_ue(p.bit_depth - 8);
            bw.write_ue(p.bit_depth - 8);
            bw.write_flag(false); // transform_bypass
            bw.write_flag(false); // seq_scaling_matrix_present_flag
        }

        bw.write_ue(0); // log2_max_frame_num_minus4
        bw.write_ue(p.poc_type);
        match p.poc_type {
            0 => bw.write_ue(2),
            1 => {
                bw.write_flag(false);
                bw.write_se(-2);
                bw.write_se(1);
                bw.write_ue(3);
                for v in [1, -1, 2] {
                    bw.write_se(v);
                }
            }
            _ => {}
        }
        bw.write_ue(p.ref_frames);
        bw.write_flag(false); // gaps

        let (step_x, step_y) = crop_unit(p.chroma_format_idc, p.frame_mbs_only);
        let map_unit_h = if p.frame_mbs_only { 16 } else { 32 };
        let mbs_w = p.width.div_ceil(16);
        let map_units_h = p.height.div_ceil(map_unit_h);
        bw.write_ue(mbs_w - 1);
        bw.write_ue(map_units_h - 1);
        bw.write_flag(p.frame_mbs_only);
        if !p.frame_mbs_only {
            bw.write_flag(true); // mb_adaptive_frame_field_flag
        }
        bw.write_flag(true); // direct_8x8_inference_flag

        let pad_x = mbs_w * 16 - p.width;
        let pad_y = map_units_h * map_unit_h - p.height;
        if pad_x != 0 || pad_y != 0 {
            bw.write_flag(true);
            bw.write_ue(0);
            bw.write_ue(pad_x / step_x);
            bw.write_ue(0);
            bw.write_ue(pad_y / step_y);
        } else {
            bw.write_flag(false);
        }

        match p.vui_timing {
            Some((num_units, time_scale)) => {
                bw.write_flag(true);
                for _ in 0..4 {
                    bw.write_flag(false);
                }
                bw.write_flag(true);
                bw.write_bits(num_units, 32);
                bw.write_bits(time_scale, 32);
                bw.write_flag(true);
                for _ in 0..4 {
                    bw.write_flag(false);
                }
            }
            None => bw.write_flag(false),
        }
        bw.write_rbsp_trailing_bits();
        bw.finish()
    }

    #[test]
    fn test_sps_baseline_profile() {
        let sps = parse_sps(&build_sps(&SpsParams::default())).unwrap();
        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.level_idc, 40);
        assert!(sps.constraint_set_flags.contains(ConstraintSetFlags::SET0));
        assert!(sps.constraint_set_flags.contains(ConstraintSetFlags::SET1));
        assert!(!sps.constraint_set_flags.contains(ConstraintSetFlags::SET2));
        assert_eq!(sps.width, 1920);
        assert_eq!(sps.height, 1080);
        assert_eq!(sps.crop_bottom, 8);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!(sps.pix_fmt, PixelFormat::Yuv420p);
        assert_eq!(sps.poc_type, PocType::Type0 { log2_max_poc_lsb: 6 });
        assert_eq!(sps.scaling_matrix4, FLAT_4X4);
        assert!(sps.vui.is_none());
    }

    #[test]
    fn test_sps_high_profile_family_roundtrip() {
        let profiles = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135, 144];
        for profile_idc in profiles {
            for (chroma_format_idc, bit_depth, width, height) in
                [(1, 8, 1280, 720), (2, 10, 720, 576), (3, 12, 352, 288), (0, 9, 176, 144)]
            {
                let p = SpsParams {
                    profile_idc,
                    chroma_format_idc,
                    bit_depth,
                    width,
                    height,
                    ..SpsParams::default()
                };
                let sps = parse_sps(&build_sps(&p))
                    .unwrap_or_else(|e| panic!("profile={profile_idc}, chroma={chroma_format_idc}: {e}"));
                assert_eq!(sps.chroma_format_idc, chroma_format_idc);
                assert_eq!(sps.bit_depth_luma, bit_depth);
                assert_eq!(sps.bit_depth_chroma, bit_depth);
                assert_eq!((sps.width, sps.height), (width, height));
            }
        }
    }

    #[test]
    fn test_sps_field_coding_doubles_height() {
        let p = SpsParams {
            frame_mbs_only: false,
            ..SpsParams::default()
        };
        let sps = parse_sps(&build_sps(&p)).unwrap();
        assert!(!sps.frame_mbs_only_flag);
        assert!(sps.mb_aff);
        assert_eq!(sps.mb_height, 68);
        assert_eq!(sps.height, 1080);
        assert_eq!(sps.crop_bottom, 8);
    }

    #[test]
    fn test_sps_poc_type1_and_type2() {
        let p = SpsParams {
            poc_type: 1,
            ..SpsParams::default()
        };
        let sps = parse_sps(&build_sps(&p)).unwrap();
        assert_eq!(
            sps.poc_type,
            PocType::Type1 {
                delta_pic_order_always_zero: false,
                offset_for_non_ref_pic: -2,
                offset_for_top_to_bottom_field: 1,
                offset_for_ref_frame: vec![1, -1, 2],
            }
        );

        let p = SpsParams {
            poc_type: 2,
            ..SpsParams::default()
        };
        assert_eq!(parse_sps(&build_sps(&p)).unwrap().poc_type, PocType::Type2);
    }

    #[test]
    fn test_sps_with_vui_frame_rate() {
        let p = SpsParams {
            vui_timing: Some((1001, 60000)),
            ..SpsParams::default()
        };
        let sps = parse_sps(&build_sps(&p)).unwrap();
        let vui = sps.vui.as_ref().expect("应解析 VUI");
        assert_eq!(vui.frame_rate(), Some(Rational::new(30000, 1001)));
        assert!(!sps.pic_struct_present());
    }

    #[test]
    fn test_sps_reject_invalid_poc_type() {
        let p = SpsParams {
            poc_type: 3,
            ..SpsParams::default()
        };
        let err = parse_sps(&build_sps(&p)).expect_err("poc_type=3 应失败");
        assert!(format!("{err}").contains("pic_order_cnt_type"));
    }

    #[test]
    fn test_sps_reject_too_many_ref_frames() {
        let p = SpsParams {
            ref_frames: 17,
            ..SpsParams::default()
        };
        let err = parse_sps(&build_sps(&p)).expect_err("ref_frames=17 应失败");
        assert!(format!("{err}").contains("max_num_ref_frames"));
    }

    #[test]
    fn test_sps_reject_bit_depth_out_of_range() {
        let p = SpsParams {
            profile_idc: 100,
            bit_depth: 13,
            ..SpsParams::default()
        };
        let err = parse_sps(&build_sps(&p)).expect_err("bit_depth=13 应失败");
        assert!(format!("{err}").contains("bit_depth"));
    }

    #[test]
    fn test_sps_reject_bit_depth_mismatch() {
        let mut bw = BitWriter::new();
        bw.write_bits(0x67, 8);
        bw.write_bits(100, 8);
        bw.write_bits(0, 8);
        bw.write_bits(40, 8);
        bw.write_ue(0);
        bw.write_ue(1); // chroma_format_idc
        bw.write_ue(0); // luma 8
        bw.write_ue(2); // chroma 10
        bw.write_rbsp_trailing_bits();
        let err = parse_sps(&bw.finish()).expect_err("位深不一致应失败");
        assert!(matches!(err, ProbeError::Unsupported(_)), "actual={err}");
    }

    #[test]
    fn test_sps_reject_invalid_chroma_format_idc() {
        let mut bw = BitWriter::new();
        bw.write_bits(0x67, 8);
        bw.write_bits(100, 8);
        bw.write_bits(0, 8);
        bw.write_bits(40, 8);
        bw.write_ue(0);
        bw.write_ue(4);
        bw.write_rbsp_trailing_bits();
        let err = parse_sps(&bw.finish()).expect_err("chroma_format_idc=4 应失败");
        assert!(format!("{err}").contains("chroma_format_idc"));
    }

    #[test]
    fn test_sps_reject_residual_color_transform() {
        let mut bw = BitWriter::new();
        bw.write_bits(0x67, 8);
        bw.write_bits(244, 8);
        bw.write_bits(0, 8);
        bw.write_bits(40, 8);
        bw.write_ue(0);
        bw.write_ue(3);
        bw.write_flag(true);
        bw.write_rbsp_trailing_bits();
        let err = parse_sps(&bw.finish()).expect_err("residual_color_transform_flag=1 应失败");
        assert!(matches!(err, ProbeError::Unsupported(_)), "actual={err}");
    }

    #[test]
    fn test_sps_reject_sps_id_out_of_range() {
        let mut bw = BitWriter::new();
        bw.write_bits(0x67, 8);
        bw.write_bits(66, 8);
        bw.write_bits(0, 8);
        bw.write_bits(30, 8);
        bw.write_ue(32);
        bw.write_rbsp_trailing_bits();
        let err = parse_sps(&bw.finish()).expect_err("sps_id=32 应失败");
        assert!(format!("{err}").contains("sps_id"));
    }

    #[test]
    fn test_sps_reject_truncated() {
        let rbsp = build_sps(&SpsParams::default());
        let err = parse_sps(&rbsp[..6]).expect_err("截断的 SPS 应失败");
        assert!(err.is_truncated(), "actual={err}");
    }

    #[test]
    fn test_sps_high_profile_with_scaling_matrices() {
        let mut bw = BitWriter::new();
        bw.write_bits(0x67, 8);
        bw.write_bits(100, 8);
        bw.write_bits(0, 8);
        bw.write_bits(40, 8);
        bw.write_ue(0);
        bw.write_ue(1);
        bw.write_ue(0);
        bw.write_ue(0);
        bw.write_flag(false);
        bw.write_flag(true); // seq_scaling_matrix_present_flag
        for _ in 0..8 {
            bw.write_flag(false);
        }
        bw.write_ue(0); // log2_max_frame_num_minus4
        bw.write_ue(2); // poc_type
        bw.write_ue(1); // ref frames
        bw.write_flag(false);
        bw.write_ue(19); // 320
        bw.write_ue(14); // 240
        bw.write_flag(true);
        bw.write_flag(true);
        bw.write_flag(false); // crop
        bw.write_flag(false); // vui
        bw.write_rbsp_trailing_bits();

        let sps = parse_sps(&bw.finish()).unwrap();
        assert!(sps.scaling_matrix_present);
        assert_eq!(sps.scaling_matrix4[2], DEFAULT_SCALING_4X4[0]);
        assert_eq!(sps.scaling_matrix4[5], DEFAULT_SCALING_4X4[1]);
        assert_eq!((sps.width, sps.height), (320, 240));
    }
}
