//! H.264 与 H.265 共用的 VUI 常量.

use esprobe_core::Rational;

/// aspect_ratio_idc = 255 表示随后显式给出 sar_width / sar_height
pub const EXTENDED_SAR: u32 = 255;

/// 预定义的 SAR 表 (H.264 表 E-1 / H.265 表 E-1)
pub const SAR_TABLE: [Rational; 17] = [
    Rational::new(0, 1),    // 0: 未指定
    Rational::new(1, 1),    // 1: 1:1
    Rational::new(12, 11),  // 2
    Rational::new(10, 11),  // 3
    Rational::new(16, 11),  // 4
    Rational::new(40, 33),  // 5
    Rational::new(24, 11),  // 6
    Rational::new(20, 11),  // 7
    Rational::new(32, 11),  // 8
    Rational::new(80, 33),  // 9
    Rational::new(18, 11),  // 10
    Rational::new(15, 11),  // 11
    Rational::new(64, 33),  // 12
    Rational::new(160, 99), // 13
    Rational::new(4, 3),    // 14
    Rational::new(3, 2),    // 15
    Rational::new(2, 1),    // 16
];
