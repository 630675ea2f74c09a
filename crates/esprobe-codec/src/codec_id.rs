//! 编解码器标识符.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 可探测的视频编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecId {
    /// H.264 / AVC / MPEG-4 Part 10
    H264,
    /// H.265 / HEVC / MPEG-H Part 2
    #[serde(alias = "hevc")]
    H265,
    /// VP9 (IVF 封装)
    Vp9,
}

impl CodecId {
    /// 获取编解码器名称 (与 FFmpeg 一致)
    pub const fn name(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Vp9 => "vp9",
        }
    }

    /// 是否为 Annex B 字节流 (NAL 单元) 编码
    pub const fn is_annexb(&self) -> bool {
        matches!(self, Self::H264 | Self::H265)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
