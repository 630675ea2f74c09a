//! # esprobe-core
//!
//! esprobe 核心库, 提供比特流读写、错误类型与基础媒体类型定义.
//!
//! 码流解析相关的 crate 均构建在本 crate 之上.

pub mod bitreader;
pub mod bitwriter;
pub mod color;
pub mod error;
pub mod pixel_format;
pub mod rational;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{ProbeError, ProbeResult};
pub use pixel_format::PixelFormat;
pub use rational::Rational;
