//! 码流头部解析器.
//!
//! - [`annexb`]: Annex B 起始码扫描与防竞争字节去除
//! - [`h264`]: H.264 SPS / VUI / HRD / SEI
//! - [`h265`]: H.265 SPS / PTL / VUI / HRD / RPS / 缩放列表
//! - [`vp9`]: IVF 容器头与 VP9 首帧标记

pub mod annexb;
pub mod h2645;
pub mod h264;
pub mod h265;
pub mod vp9;
