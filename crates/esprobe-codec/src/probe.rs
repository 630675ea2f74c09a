//! 码流几何信息探测.
//!
//! 在打开解码会话之前, 从原始码流中恢复分辨率、位深、色度格式、
//! 隔行标志与帧率. H.264 / H.265 扫描 Annex B 字节流中的参数集,
//! VP9 读取 IVF 容器头与首帧标记.

use bytes::Bytes;
use esprobe_core::{PixelFormat, ProbeError, ProbeResult, Rational};
use log::{debug, warn};

use crate::codec_id::CodecId;
use crate::config::ProbeConfig;
use crate::parsers::annexb::{NalCodec, NalScanner, remove_emulation_prevention};
use crate::parsers::h264::{self, H264Sps, NalHeader, NalUnitType};
use crate::parsers::h265::{self, HevcNalHeader, HevcNalUnitType};
use crate::parsers::vp9;

/// 打开解码会话所需的码流几何信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGeometry {
    pub codec: CodecId,
    /// 显示宽度 (已应用裁剪)
    pub width: u32,
    /// 显示高度 (已应用裁剪)
    pub height: u32,
    pub bit_depth: u32,
    pub chroma_format_idc: u32,
    pub pixel_format: PixelFormat,
    /// 是否为隔行 / 逐场内容
    pub interlaced: bool,
    /// 帧率, 码流未给出时为 [`Rational::UNDEFINED`]
    pub frame_rate: Rational,
    /// 采样宽高比, 码流未给出时为 [`Rational::UNDEFINED`]
    pub sar: Rational,
}

/// 按编码类型分派探测
pub fn probe(codec: CodecId, data: &[u8], cfg: &ProbeConfig) -> ProbeResult<StreamGeometry> {
    match codec {
        CodecId::H264 => probe_h264(data, cfg),
        CodecId::H265 => probe_h265(data, cfg),
        CodecId::Vp9 => probe_vp9(data, cfg),
    }
}

/// 探测 H.264 Annex B 码流
///
/// 解析 SPS, 并在 SPS 声明 pic_struct_present_flag 时继续扫描 SEI
/// pic_timing 以确定是否隔行. 隔行内容返回 [`ProbeError::Unsupported`].
pub fn probe_h264(data: &[u8], cfg: &ProbeConfig) -> ProbeResult<StreamGeometry> {
    let mut scanner =
        NalScanner::new(Bytes::copy_from_slice(data), NalCodec::H264).with_loops(cfg.loop_count);

    let mut sps: Option<H264Sps> = None;
    let mut interlaced: Option<bool> = None;
    let mut vcl_units = 0u32;

    while let Some((_, payload)) = scanner.next_payload() {
        let header = match NalHeader::parse(&payload) {
            Ok(h) => h,
            Err(err) => {
                warn!("H.264: 跳过非法 NAL: {}", err);
                continue;
            }
        };
        let rbsp = remove_emulation_prevention(&payload);

        match header.nal_type {
            NalUnitType::Sps => {
                let parsed = h264::parse_sps(&rbsp)?;
                // 没有 pic_timing 可用时由 frame_mbs_only_flag 判定
                if !parsed.pic_struct_present() {
                    interlaced = Some(!parsed.frame_mbs_only_flag);
                }
                sps = Some(parsed);
            }
            NalUnitType::Sei => {
                let Some(active) = sps.as_ref() else {
                    debug!("H.264: SPS 之前的 SEI, 跳过");
                    continue;
                };
                match h264::parse_sei(&rbsp, active) {
                    Ok(outcome) => {
                        if let Some(v) = outcome.interlaced() {
                            interlaced = Some(v);
                        }
                    }
                    Err(err) => warn!("H.264: SEI 解析失败, 忽略: {}", err),
                }
            }
            t if t.is_vcl() => {
                if sps.is_none() {
                    warn!("H.264: 在 SPS 之前遇到 slice, type={}", t.type_id());
                }
                vcl_units += 1;
                if vcl_units >= cfg.max_vcl_units {
                    debug!("H.264: 达到 VCL 扫描上限 {}", cfg.max_vcl_units);
                    break;
                }
            }
            _ => {}
        }

        if sps.is_some() && interlaced.is_some() {
            break;
        }
    }

    let sps = sps.ok_or_else(|| ProbeError::InvalidData("H.264: 码流中未找到 SPS".into()))?;
    let interlaced = match interlaced {
        Some(v) => v,
        None => {
            warn!("H.264: 未能确定场/帧结构, 按逐行处理");
            false
        }
    };
    if interlaced {
        return Err(ProbeError::Unsupported("H.264: 不支持隔行内容".into()));
    }

    let vui = sps.vui.as_ref();
    let geometry = StreamGeometry {
        codec: CodecId::H264,
        width: sps.width,
        height: sps.height,
        bit_depth: sps.bit_depth_luma,
        chroma_format_idc: sps.chroma_format_idc,
        pixel_format: sps.pix_fmt,
        interlaced,
        frame_rate: vui
            .and_then(|v| v.frame_rate())
            .unwrap_or(Rational::UNDEFINED),
        sar: vui.map(|v| v.sar).unwrap_or(Rational::UNDEFINED),
    };
    debug!("H.264: 探测结果 {:?}", geometry);
    Ok(geometry)
}

/// 探测 H.265 Annex B 码流, 遇到首个 SPS 即返回
pub fn probe_h265(data: &[u8], cfg: &ProbeConfig) -> ProbeResult<StreamGeometry> {
    let mut scanner =
        NalScanner::new(Bytes::copy_from_slice(data), NalCodec::Hevc).with_loops(cfg.loop_count);
    let mut vcl_units = 0u32;

    while let Some((_, payload)) = scanner.next_payload() {
        let header = match HevcNalHeader::parse(&payload) {
            Ok(h) => h,
            Err(err) => {
                warn!("H.265: 跳过非法 NAL: {}", err);
                continue;
            }
        };
        let rbsp = remove_emulation_prevention(&payload);

        match header.nal_type {
            HevcNalUnitType::Sps => {
                let sps = h265::parse_sps(&rbsp, &cfg.hevc)?;
                let vui = sps.vui.as_ref();
                let geometry = StreamGeometry {
                    codec: CodecId::H265,
                    width: sps.output_width,
                    height: sps.output_height,
                    bit_depth: sps.bit_depth,
                    chroma_format_idc: sps.chroma_format_idc,
                    pixel_format: sps.pix_fmt,
                    interlaced: sps.field_seq(),
                    frame_rate: vui
                        .and_then(|v| v.frame_rate())
                        .unwrap_or(Rational::UNDEFINED),
                    sar: vui.map(|v| v.sar).unwrap_or(Rational::UNDEFINED),
                };
                debug!("H.265: 探测结果 {:?}", geometry);
                return Ok(geometry);
            }
            t if t.is_vcl() => {
                warn!(
                    "H.265: 在 SPS 之前遇到 slice, type={}, tid={}",
                    t.type_id(),
                    header.temporal_id
                );
                vcl_units += 1;
                if vcl_units >= cfg.max_vcl_units {
                    debug!("H.265: 达到 VCL 扫描上限 {}", cfg.max_vcl_units);
                    break;
                }
            }
            _ => {}
        }
    }

    Err(ProbeError::InvalidData("H.265: 码流中未找到 SPS".into()))
}

/// 探测 IVF 封装的 VP9 码流
pub fn probe_vp9(data: &[u8], _cfg: &ProbeConfig) -> ProbeResult<StreamGeometry> {
    let info = vp9::parse_ivf_header(data)?;
    // profile 0 / 2 均为 4:2:0
    let chroma_format_idc = 1;
    Ok(StreamGeometry {
        codec: CodecId::Vp9,
        width: info.width,
        height: info.height,
        bit_depth: info.bit_depth,
        chroma_format_idc,
        pixel_format: PixelFormat::from_chroma_format(chroma_format_idc, info.bit_depth),
        interlaced: false,
        frame_rate: info.frame_rate,
        sar: Rational::UNDEFINED,
    })
}
