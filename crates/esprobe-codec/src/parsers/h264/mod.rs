//! H.264/AVC 参数集解析.
//!
//! - NAL 单元类型识别
//! - SPS / VUI / HRD / 量化矩阵解析
//! - SEI pic_timing 扫描 (隔行判定)

pub mod nal;
pub mod scaling;
pub mod sei;
pub mod sps;
pub mod vui;

pub use nal::{NalHeader, NalUnitType};
pub use sei::{PicStruct, SeiOutcome, SeiPayloadType, parse_sei};
pub use sps::{ConstraintSetFlags, H264Sps, PocType, parse_sps};
pub use vui::{H264Hrd, H264Vui, parse_hrd, parse_vui};
