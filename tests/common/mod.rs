//! 集成测试共用的码流构造工具

#![allow(dead_code)]

use esprobe::core::BitWriter;

/// 插入防竞争字节 (00 00 0x → 00 00 03 0x, x <= 3)
pub fn escape_rbsp(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 64);
    let mut zeros = 0;
    for &byte in rbsp {
        if zeros >= 2 && byte <= 3 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }
    out
}

/// 拼接 Annex B 码流, 奇数位置使用 3 字节起始码
pub fn annexb(nals: &[Vec<u8>]) -> Vec<u8> {
    let mut data = Vec::new();
    for (i, nal) in nals.iter().enumerate() {
        if i % 2 == 0 {
            data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        } else {
            data.extend_from_slice(&[0x00, 0x00, 0x01]);
        }
        data.extend_from_slice(&escape_rbsp(nal));
    }
    data
}

// ============================================================
// H.264
// ============================================================

/// H.264 SPS 构造参数
#[derive(Clone)]
pub struct H264SpsParams {
    pub profile_idc: u8,
    pub chroma_format_idc: u32,
    pub bit_depth: u32,
    pub width: u32,
    pub height: u32,
    pub frame_mbs_only: bool,
    /// (num_units_in_tick, time_scale)
    pub timing: Option<(u32, u32)>,
    pub sar_idc: Option<u8>,
    pub pic_struct_present: bool,
}

impl Default for H264SpsParams {
    fn default() -> Self {
        Self {
            profile_idc: 100,
            chroma_format_idc: 1,
            bit_depth: 8,
            width: 1920,
            height: 1080,
            frame_mbs_only: true,
            timing: None,
            sar_idc: None,
            pic_struct_present: false,
        }
    }
}

fn is_high_profile(profile_idc: u8) -> bool {
    matches!(profile_idc, 100 | 110 | 122 | 244)
}

/// 构造 H.264 SPS (RBSP, 含 1 字节 NAL 头部)
pub fn h264_sps(p: &H264SpsParams) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(0x67, 8);
    bw.write_bits(u32::from(p.profile_idc), 8);
    bw.write_bits(0, 8); // constraint_set 标志
    bw.write_bits(40, 8); // level 4.0
    bw.write_ue(0); // sps_id

    if is_high_profile(p.profile_idc) {
        bw.write_ue(p.chroma_format_idc);
        if p.chroma_format_idc == 3 {
            bw.write_flag(false);
        }
        bw.write_ue(p.bit_depth - 8);
        bw.write_ue(p.bit_depth - 8);
        bw.write_flag(false); // transform_bypass
        bw.write_flag(false); // seq_scaling_matrix_present_flag
    }

    bw.write_ue(0); // log2_max_frame_num_minus4
    bw.write_ue(0); // poc_type
    bw.write_ue(2); // log2_max_poc_lsb_minus4
    bw.write_ue(4); // max_num_ref_frames
    bw.write_flag(false);

    let map_unit_h = if p.frame_mbs_only { 16 } else { 32 };
    let mbs_w = p.width.div_ceil(16);
    let map_units_h = p.height.div_ceil(map_unit_h);
    bw.write_ue(mbs_w - 1);
    bw.write_ue(map_units_h - 1);
    bw.write_flag(p.frame_mbs_only);
    if !p.frame_mbs_only {
        bw.write_flag(false); // mb_adaptive_frame_field_flag
    }
    bw.write_flag(true); // direct_8x8_inference_flag

    // 4:2:0 裁剪单位
    let step_x = 2;
    let step_y = if p.frame_mbs_only { 2 } else { 4 };
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

    let vui = p.timing.is_some() || p.sar_idc.is_some() || p.pic_struct_present;
    bw.write_flag(vui);
    if vui {
        match p.sar_idc {
            Some(idc) => {
                bw.write_flag(true);
                bw.write_bits(u32::from(idc), 8);
            }
            None => bw.write_flag(false),
        }
        bw.write_flag(false); // overscan
        bw.write_flag(false); // video_signal_type
        bw.write_flag(false); // chroma_loc
        match p.timing {
            Some((num_units, time_scale)) => {
                bw.write_flag(true);
                bw.write_bits(num_units, 32);
                bw.write_bits(time_scale, 32);
                bw.write_flag(true); // fixed_frame_rate_flag
            }
            None => bw.write_flag(false),
        }
        bw.write_flag(false); // nal_hrd
        bw.write_flag(false); // vcl_hrd
        bw.write_flag(p.pic_struct_present);
        bw.write_flag(false); // bitstream_restriction
    }

    bw.write_rbsp_trailing_bits();
    bw.finish()
}

/// 构造只含 pic_timing 的 SEI (SPS 无 HRD)
pub fn h264_sei_pic_timing(pic_struct: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(0x06, 8);
    bw.write_bits(1, 8); // payload_type = pic_timing
    bw.write_bits(1, 8); // payload_size
    bw.write_bits(pic_struct, 4);
    bw.write_flag(false); // clock_timestamp_flag
    bw.write_bits(0, 3);
    bw.write_rbsp_trailing_bits();
    bw.finish()
}

pub fn h264_pps() -> Vec<u8> {
    vec![0x68, 0xCE, 0x38, 0x80]
}

pub fn h264_idr() -> Vec<u8> {
    vec![0x65, 0x88, 0x84, 0x21, 0xA0]
}

pub fn h264_slice() -> Vec<u8> {
    vec![0x41, 0x9A, 0x01, 0x02, 0x03]
}

// ============================================================
// H.265
// ============================================================

/// H.265 SPS 构造参数
#[derive(Clone)]
pub struct HevcSpsParams {
    pub chroma_format_idc: u32,
    pub bit_depth: u32,
    pub width: u32,
    pub height: u32,
    /// 一致性窗口 (左, 右, 上, 下), 色度单位
    pub conf_win: Option<[u32; 4]>,
    /// (num_units_in_tick, time_scale)
    pub timing: Option<(u32, u32)>,
    pub field_seq: bool,
    /// 默认显示窗口 (左, 右, 上, 下), 色度单位
    pub default_display_window: Option<[u32; 4]>,
}

impl Default for HevcSpsParams {
    fn default() -> Self {
        Self {
            chroma_format_idc: 1,
            bit_depth: 8,
            width: 1920,
            height: 1088,
            conf_win: Some([0, 0, 0, 4]),
            timing: None,
            field_seq: false,
            default_display_window: None,
        }
    }
}

/// 构造 H.265 SPS (RBSP, 含 2 字节 NAL 头部)
pub fn hevc_sps(p: &HevcSpsParams) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(0x4201, 16);
    bw.write_bits(0, 4); // vps_id
    bw.write_bits(0, 3); // max_sub_layers_minus1
    bw.write_flag(true); // temporal_id_nesting

    // profile_tier_level: Main / Main 10
    let profile = if p.bit_depth == 10 { 2 } else { 1 };
    bw.write_bits(0, 2);
    bw.write_flag(false);
    bw.write_bits(profile, 5);
    bw.write_bits(0x6000_0000, 32);
    bw.write_bits(0b1001, 4);
    bw.write_bits_u64(0, 43);
    bw.write_flag(false);
    bw.write_bits(120, 8); // level 4.0

    bw.write_ue(0); // sps_id
    bw.write_ue(p.chroma_format_idc);
    if p.chroma_format_idc == 3 {
        bw.write_flag(false);
    }
    bw.write_ue(p.width);
    bw.write_ue(p.height);
    match p.conf_win {
        Some(win) => {
            bw.write_flag(true);
            for v in win {
                bw.write_ue(v);
            }
        }
        None => bw.write_flag(false),
    }
    bw.write_ue(p.bit_depth - 8);
    bw.write_ue(p.bit_depth - 8);
    bw.write_ue(4); // log2_max_poc_lsb_minus4

    bw.write_flag(false); // sub_layer_ordering_info_present
    bw.write_ue(4);
    bw.write_ue(2);
    bw.write_ue(0);

    bw.write_ue(0); // log2_min_cb_size = 3
    bw.write_ue(3); // CTB 64
    bw.write_ue(0); // log2_min_tb_size = 2
    bw.write_ue(3); // log2_max_trafo_size = 5
    bw.write_ue(1);
    bw.write_ue(1);

    bw.write_flag(false); // scaling_list
    bw.write_flag(true); // amp
    bw.write_flag(true); // sao
    bw.write_flag(false); // pcm

    bw.write_ue(1); // num_short_term_ref_pic_sets
    bw.write_ue(1);
    bw.write_ue(0);
    bw.write_ue(0);
    bw.write_flag(true);

    bw.write_flag(false); // long_term_ref_pics_present
    bw.write_flag(true); // temporal_mvp
    bw.write_flag(true); // strong_intra_smoothing

    let vui = p.timing.is_some() || p.field_seq || p.default_display_window.is_some();
    bw.write_flag(vui);
    if vui {
        bw.write_flag(false); // sar
        bw.write_flag(false); // overscan
        bw.write_flag(false); // video_signal_type
        bw.write_flag(false); // chroma_loc
        bw.write_flag(false); // neutral_chroma
        bw.write_flag(p.field_seq);
        bw.write_flag(false); // frame_field_info
        match p.default_display_window {
            Some(win) => {
                bw.write_flag(true);
                for v in win {
                    bw.write_ue(v);
                }
            }
            None => bw.write_flag(false),
        }
        match p.timing {
            Some((num_units, time_scale)) => {
                bw.write_flag(true);
                bw.write_bits(num_units, 32);
                bw.write_bits(time_scale, 32);
                bw.write_flag(false); // poc_proportional
                bw.write_flag(false); // hrd
            }
            None => bw.write_flag(false),
        }
        bw.write_flag(false); // bitstream_restriction
    }

    bw.write_flag(false); // sps_extension_present
    bw.write_rbsp_trailing_bits();
    bw.finish()
}

pub fn hevc_vps() -> Vec<u8> {
    vec![0x40, 0x01, 0x0C, 0x01, 0xFF, 0xFF]
}

pub fn hevc_idr() -> Vec<u8> {
    vec![0x26, 0x01, 0xAF, 0x08, 0x40]
}

// ============================================================
// VP9 / IVF
// ============================================================

/// 构造 IVF 文件头 + 首帧
pub fn ivf_file(header_len: u16, width: u16, height: u16, fps: (u32, u32), frame: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"DKIF");
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&header_len.to_le_bytes());
    data.extend_from_slice(b"VP90");
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&fps.0.to_le_bytes());
    data.extend_from_slice(&fps.1.to_le_bytes());
    data.extend_from_slice(&10u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&(frame.len() as u32).to_le_bytes());
    data.extend_from_slice(&0u64.to_le_bytes());
    data.extend_from_slice(frame);
    data
}

/// VP9 关键帧开头: frame_marker, profile, 同步码, 位深, color_space = BT.709
pub fn vp9_key_frame(profile: u32, twelve_bit: bool) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(2, 2);
    bw.write_bits(profile & 1, 1);
    bw.write_bits(profile >> 1, 1);
    bw.write_flag(false); // show_existing_frame
    bw.write_flag(false); // frame_type = KEY_FRAME
    bw.write_flag(true); // show_frame
    bw.write_flag(false); // error_resilient_mode
    bw.write_bits(0x49_83_42, 24);
    if profile >= 2 {
        bw.write_flag(twelve_bit);
    }
    bw.write_bits(2, 3);
    bw.write_bytes(&[0; 8]);
    bw.finish()
}
