//! VP9 码流头部解析.
//!
//! 只读取 IVF 容器头与首帧开头的 frame_marker / profile (关键帧时附带位深),
//! 不涉及帧内容解码.

pub mod ivf;

pub use ivf::{IVF_FRAME_HEADER_LEN, IVF_HEADER_LEN, Vp9HeaderInfo, parse_ivf_header};
