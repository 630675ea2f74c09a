//! # esprobe
//!
//! 纯 Rust 实现的视频基本流头部探测库.
//!
//! 在打开解码会话之前, 从码流中恢复所需的几何信息:
//! - **H.264**: Annex B 字节流, SPS / VUI / HRD / 量化矩阵, SEI pic_timing 隔行判定
//! - **H.265**: Annex B 字节流, SPS / PTL / VUI / HRD / 短期 RPS / 缩放列表
//! - **VP9**: IVF 容器头与首帧 profile
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use esprobe::codec::{CodecId, ProbeConfig, probe};
//!
//! let data = std::fs::read("input.h264").unwrap();
//! let geometry = probe(CodecId::H264, &data, &ProbeConfig::default()).unwrap();
//! println!("{}x{} @ {}", geometry.width, geometry.height, geometry.frame_rate);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `esprobe-core` | 比特流读写、错误类型、有理数、像素格式、色彩代码 |
//! | `esprobe-codec` | NAL 扫描、H.264 / H.265 / VP9 解析、探测入口 |

/// 核心类型与工具
pub use esprobe_core as core;

/// 码流解析与探测
pub use esprobe_codec as codec;

pub mod logging;

pub use esprobe_codec::{CodecId, ProbeConfig, StreamGeometry, probe};

/// 获取 esprobe 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
