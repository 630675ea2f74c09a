//! H.265/HEVC 参数集解析.
//!
//! - NAL 单元类型识别 (2 字节 NAL 头)
//! - SPS / PTL / VUI / HRD 解析
//! - 短期参考图像集与缩放列表
//!
//! # HEVC NAL 头部 (2 字节)
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ forbidden(1) | type(6) | layer_id(6) | tid(3) │
//! └────────────────────────────────────────────┘
//! ```

pub mod hrd;
pub mod nal;
pub mod ptl;
pub mod rps;
pub mod scaling;
pub mod sps;
pub mod vui;

pub use hrd::{HevcHrd, HevcSubLayerHrd, decode_hrd};
pub use nal::{HevcNalHeader, HevcNalUnitType};
pub use ptl::{Ptl, PtlCommon, decode_profile_tier_level, parse_ptl};
pub use rps::{ShortTermRps, decode_short_term_rps};
pub use scaling::{ScalingList, scaling_list_data};
pub use sps::{HevcSps, HevcSpsOptions, HevcWindow, TemporalLayer, parse_sps};
pub use vui::{HevcVui, parse_vui};
