//! 像素格式定义.
//!
//! 由参数集中的 chroma_format_idc 与位深推导, 对标 FFmpeg 的 `AVPixelFormat` 子集.

use std::fmt;

/// 像素格式
///
/// 仅包含 H.264/H.265 参数集能表达的平面 YUV 与灰度格式.
/// 命名规则: 颜色空间 + 位深 + 排列方式 (p=Planar, le=小端).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定 / 无法表达
    #[default]
    None,

    // ========================
    // 灰度格式 (chroma_format_idc = 0)
    // ========================
    /// 灰度 8 位
    Gray8,
    /// 灰度 9 位小端
    Gray9le,
    /// 灰度 10 位小端
    Gray10le,
    /// 灰度 12 位小端
    Gray12le,

    // ========================
    // YUV 平面格式
    // ========================
    /// YUV 4:2:0, 8 位
    Yuv420p,
    /// YUV 4:2:2, 8 位
    Yuv422p,
    /// YUV 4:4:4, 8 位
    Yuv444p,
    /// YUV 4:2:0, 9 位小端
    Yuv420p9le,
    /// YUV 4:2:2, 9 位小端
    Yuv422p9le,
    /// YUV 4:4:4, 9 位小端
    Yuv444p9le,
    /// YUV 4:2:0, 10 位小端
    Yuv420p10le,
    /// YUV 4:2:2, 10 位小端
    Yuv422p10le,
    /// YUV 4:4:4, 10 位小端
    Yuv444p10le,
    /// YUV 4:2:0, 12 位小端
    Yuv420p12le,
    /// YUV 4:2:2, 12 位小端
    Yuv422p12le,
    /// YUV 4:4:4, 12 位小端
    Yuv444p12le,
}

impl PixelFormat {
    /// 由 chroma_format_idc 与位深推导像素格式
    ///
    /// 无对应格式时 (如 11 位) 返回 [`PixelFormat::None`].
    pub const fn from_chroma_format(chroma_format_idc: u32, bit_depth: u32) -> Self {
        match (chroma_format_idc, bit_depth) {
            (0, 8) => Self::Gray8,
            (0, 9) => Self::Gray9le,
            (0, 10) => Self::Gray10le,
            (0, 12) => Self::Gray12le,
            (1, 8) => Self::Yuv420p,
            (2, 8) => Self::Yuv422p,
            (3, 8) => Self::Yuv444p,
            (1, 9) => Self::Yuv420p9le,
            (2, 9) => Self::Yuv422p9le,
            (3, 9) => Self::Yuv444p9le,
            (1, 10) => Self::Yuv420p10le,
            (2, 10) => Self::Yuv422p10le,
            (3, 10) => Self::Yuv444p10le,
            (1, 12) => Self::Yuv420p12le,
            (2, 12) => Self::Yuv422p12le,
            (3, 12) => Self::Yuv444p12le,
            _ => Self::None,
        }
    }

    /// 单个分量的位深
    pub const fn bits_per_component(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Gray8 | Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => 8,
            Self::Gray9le | Self::Yuv420p9le | Self::Yuv422p9le | Self::Yuv444p9le => 9,
            Self::Gray10le | Self::Yuv420p10le | Self::Yuv422p10le | Self::Yuv444p10le => 10,
            Self::Gray12le | Self::Yuv420p12le | Self::Yuv422p12le | Self::Yuv444p12le => 12,
        }
    }

    /// 获取色度子采样 (log2 水平, log2 垂直)
    ///
    /// 例如 YUV420 返回 (1, 1), 表示色度分辨率为亮度的 1/2 x 1/2.
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Yuv420p9le | Self::Yuv420p10le | Self::Yuv420p12le => (1, 1),
            Self::Yuv422p | Self::Yuv422p9le | Self::Yuv422p10le | Self::Yuv422p12le => (1, 0),
            _ => (0, 0),
        }
    }

    /// 平面数量
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Gray8 | Self::Gray9le | Self::Gray10le | Self::Gray12le => 1,
            _ => 3,
        }
    }

    /// 计算整帧的字节数
    ///
    /// 高于 8 位的格式每分量占 2 字节. 格式为 None 时返回 `None`.
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        if *self == Self::None {
            return None;
        }
        let bytes = if self.bits_per_component() > 8 { 2 } else { 1 };
        let (w, h) = (width as usize, height as usize);
        let (sub_h, sub_v) = self.chroma_subsampling();
        let luma = w * h;
        let chroma = (w >> sub_h) * (h >> sub_v);
        let planes = if self.plane_count() == 3 {
            luma + 2 * chroma
        } else {
            luma
        };
        Some(planes * bytes)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Gray8 => "gray8",
            Self::Gray9le => "gray9le",
            Self::Gray10le => "gray10le",
            Self::Gray12le => "gray12le",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuv420p9le => "yuv420p9le",
            Self::Yuv422p9le => "yuv422p9le",
            Self::Yuv444p9le => "yuv444p9le",
            Self::Yuv420p10le => "yuv420p10le",
            Self::Yuv422p10le => "yuv422p10le",
            Self::Yuv444p10le => "yuv444p10le",
            Self::Yuv420p12le => "yuv420p12le",
            Self::Yuv422p12le => "yuv422p12le",
            Self::Yuv444p12le => "yuv444p12le",
        };
        write!(f, "{name}")
    }
}
