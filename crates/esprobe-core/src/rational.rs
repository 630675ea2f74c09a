//! 有理数类型, 用于帧率、采样宽高比 (SAR) 等场景.
//!
//! 对标 FFmpeg 的 `AVRational`.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 例如: 帧率 30000/1001 表示 29.97fps, SAR 16/11 表示非方形像素.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 零值
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 由无符号宽值构造并约分
    ///
    /// 码流中的 time_scale / num_units_in_tick 是 32 位无符号数, 约分后仍超出
    /// i32 范围时同步右移分子分母 (损失少量精度).
    pub fn from_u64(num: u64, den: u64) -> Self {
        if den == 0 {
            return Self::UNDEFINED;
        }
        let g = gcd_u64(num, den).max(1);
        let (mut n, mut d) = (num / g, den / g);
        while n > i32::MAX as u64 || d > i32::MAX as u64 {
            n >>= 1;
            d >>= 1;
        }
        Self::new(n as i32, d.max(1) as i32)
    }

    /// 转换为 f64 浮点数
    ///
    /// 如果分母为 0, 返回 `f64::NAN`.
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// 对有理数进行约分
    pub fn reduce(self) -> Self {
        if self.den == 0 {
            return self;
        }
        let g = gcd_u64(
            u64::from(self.num.unsigned_abs()),
            u64::from(self.den.unsigned_abs()),
        );
        if g == 0 {
            return self;
        }
        let g = g as i32;
        // 保证分母为正
        let sign = if self.den < 0 { -1 } else { 1 };
        Self {
            num: sign * (self.num / g),
            den: sign * (self.den / g),
        }
    }

    /// 求倒数
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self { num, den }
    }
}

/// 求最大公约数 (欧几里得算法)
fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
