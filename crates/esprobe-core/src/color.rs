//! 色彩相关类型定义.
//!
//! VUI 中的 colour_primaries / transfer_characteristics / matrix_coeffs 均为
//! ITU-T H.273 码点. 参数集结构体保存钳位后的原始码点, 这里提供码点常量、
//! 两种钳位规则以及面向使用者的枚举视图.

/// 码点 0 (primaries/transfer 中为保留值, matrix 中为 RGB)
pub const CODE_RESERVED0: i32 = 0;
/// "未指定" 码点
pub const CODE_UNSPECIFIED: u8 = 2;
/// matrix_coeffs: RGB (GBR)
pub const MATRIX_RGB: u8 = 0;

/// colour_primaries 码点上界 (不含)
pub const PRIMARIES_NB: i32 = 23;
/// transfer_characteristics 码点上界 (不含)
pub const TRANSFER_NB: i32 = 19;
/// matrix_coeffs 码点上界 (不含)
pub const MATRIX_NB: i32 = 15;

/// H.264 钳位规则: 小于保留值 0 或不小于上界时视为未指定
pub fn clamp_code_h264(code: i32, nb: i32) -> u8 {
    if code < CODE_RESERVED0 || code >= nb {
        CODE_UNSPECIFIED
    } else {
        code as u8
    }
}

/// H.265 钳位规则: 仅检查上界
pub fn clamp_code_hevc(code: i32, nb: i32) -> u8 {
    if code >= nb {
        CODE_UNSPECIFIED
    } else {
        code as u8
    }
}

/// 色彩原色 (色域)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ColorPrimaries {
    /// 未指定
    #[default]
    Unspecified,
    /// ITU-R BT.709
    Bt709,
    /// ITU-R BT.470 M
    Bt470m,
    /// ITU-R BT.470 BG (PAL)
    Bt470bg,
    /// SMPTE 170M (NTSC)
    Smpte170m,
    /// SMPTE 240M
    Smpte240m,
    /// Generic Film
    Film,
    /// ITU-R BT.2020
    Bt2020,
    /// SMPTE ST 428-1
    Smpte428,
    /// DCI-P3
    SmpteP3dci,
    /// Display P3
    SmpteP3d65,
    /// EBU Tech 3213-E
    Ebu3213,
}

impl ColorPrimaries {
    /// 由 H.273 码点转换
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Bt709,
            4 => Self::Bt470m,
            5 => Self::Bt470bg,
            6 => Self::Smpte170m,
            7 => Self::Smpte240m,
            8 => Self::Film,
            9 => Self::Bt2020,
            10 => Self::Smpte428,
            11 => Self::SmpteP3dci,
            12 => Self::SmpteP3d65,
            22 => Self::Ebu3213,
            _ => Self::Unspecified,
        }
    }
}

/// 色彩传递特性 (伽马/EOTF)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ColorTransfer {
    /// 未指定
    #[default]
    Unspecified,
    /// ITU-R BT.709
    Bt709,
    /// ITU-R BT.470 M (伽马 2.2)
    Gamma22,
    /// ITU-R BT.470 BG (伽马 2.8)
    Gamma28,
    /// SMPTE 170M
    Smpte170m,
    /// SMPTE 240M
    Smpte240m,
    /// 线性传递
    Linear,
    /// IEC 61966-2-1 (sRGB)
    Srgb,
    /// ITU-R BT.2020 10 位
    Bt202010bit,
    /// ITU-R BT.2020 12 位
    Bt202012bit,
    /// SMPTE ST 2084 (PQ)
    SmpteSt2084,
    /// ARIB STD-B67 (HLG)
    AribStdB67,
}

impl ColorTransfer {
    /// 由 H.273 码点转换
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Bt709,
            4 => Self::Gamma22,
            5 => Self::Gamma28,
            6 => Self::Smpte170m,
            7 => Self::Smpte240m,
            8 => Self::Linear,
            13 => Self::Srgb,
            14 => Self::Bt202010bit,
            15 => Self::Bt202012bit,
            16 => Self::SmpteSt2084,
            18 => Self::AribStdB67,
            _ => Self::Unspecified,
        }
    }
}

/// YCbCr 色彩空间 (矩阵系数)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ColorSpace {
    /// 未指定
    #[default]
    Unspecified,
    /// RGB (GBR)
    Rgb,
    /// ITU-R BT.709
    Bt709,
    /// FCC 73.682
    Fcc,
    /// ITU-R BT.470 BG
    Bt470bg,
    /// SMPTE 170M
    Smpte170m,
    /// SMPTE 240M
    Smpte240m,
    /// YCgCo
    Ycgco,
    /// ITU-R BT.2020 非恒定亮度
    Bt2020Ncl,
    /// ITU-R BT.2020 恒定亮度
    Bt2020Cl,
    /// ICtCp
    Ictcp,
}

impl ColorSpace {
    /// 由 H.273 码点转换
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Rgb,
            1 => Self::Bt709,
            4 => Self::Fcc,
            5 => Self::Bt470bg,
            6 => Self::Smpte170m,
            7 => Self::Smpte240m,
            8 => Self::Ycgco,
            9 => Self::Bt2020Ncl,
            10 => Self::Bt2020Cl,
            14 => Self::Ictcp,
            _ => Self::Unspecified,
        }
    }
}

/// 色彩范围
///
/// - Limited: Y 16-235, Cb/Cr 16-240 (8 位)
/// - Full: Y/Cb/Cr 0-255 (8 位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorRange {
    /// 未指定
    #[default]
    Unspecified,
    /// 有限范围 (广播/TV)
    Limited,
    /// 完整范围 (JPEG/PC)
    Full,
}

impl ColorRange {
    /// 由 video_full_range_flag 转换
    pub fn from_full_range_flag(full: bool) -> Self {
        if full { Self::Full } else { Self::Limited }
    }
}
