//! 探测配置.

use serde::{Deserialize, Serialize};

use crate::parsers::h265::HevcSpsOptions;

/// 码流探测配置
///
/// 所有字段都有默认值, 反序列化时可以只给出需要覆盖的部分.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// 最多扫描的 VCL NAL 单元数
    #[serde(default = "default_max_vcl_units")]
    pub max_vcl_units: u32,
    /// 扫描循环次数 (含首轮), 用于循环回放的码流
    #[serde(default = "default_loop_count")]
    pub loop_count: u32,
    /// H.265 SPS 解析选项
    #[serde(default)]
    pub hevc: HevcSpsOptions,
}

fn default_max_vcl_units() -> u32 {
    100
}

fn default_loop_count() -> u32 {
    1
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_vcl_units: default_max_vcl_units(),
            loop_count: default_loop_count(),
            hevc: HevcSpsOptions::default(),
        }
    }
}
