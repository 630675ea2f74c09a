//! # esprobe-codec
//!
//! 视频基本流头部解析库. 在打开解码会话之前, 从码流中恢复几何信息
//! (分辨率、位深、色度格式、隔行标志、帧率).
//!
//! ## 支持的码流
//!
//! - **H.264**: Annex B 字节流, SPS / VUI / HRD / 量化矩阵 / SEI pic_timing
//! - **H.265**: Annex B 字节流, SPS / PTL / VUI / HRD / 短期 RPS / 缩放列表
//! - **VP9**: IVF 封装, 容器头与首帧 profile
//!
//! ## 使用示例
//!
//! ```rust
//! use esprobe_codec::{CodecId, ProbeConfig, probe};
//!
//! let cfg = ProbeConfig::default();
//! // 没有 SPS 的码流无法探测
//! let err = probe(CodecId::H264, &[0, 0, 1, 0x65, 0x88], &cfg).unwrap_err();
//! assert!(err.to_string().contains("SPS"));
//! ```

pub mod codec_id;
pub mod config;
pub mod parsers;
pub mod probe;

// 重导出常用类型
pub use codec_id::CodecId;
pub use config::ProbeConfig;
pub use parsers::h265::HevcSpsOptions;
pub use probe::{StreamGeometry, probe, probe_h264, probe_h265, probe_vp9};
