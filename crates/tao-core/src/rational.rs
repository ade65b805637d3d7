//! 有理数, 用于像素宽高比与帧率.

use std::fmt;

/// 有理数
///
/// 例如 SAR 16/11 表示非方形像素, 帧率 30000/1001 即 29.97fps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 由码流中的无符号字段构造并约分, 约分后超出 `i32` 时为 `None`
    pub fn from_u32(num: u32, den: u32) -> Option<Self> {
        let g = gcd(num, den).max(1);
        Some(Self {
            num: i32::try_from(num / g).ok()?,
            den: i32::try_from(den / g).ok()?,
        })
    }

    /// 分母不为 0
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u32_约分() {
        assert_eq!(Rational::from_u32(60000, 2002), Some(Rational::new(30000, 1001)));
        assert_eq!(
            Rational::from_u32(4_000_000_000, 2_000_000_000),
            Some(Rational::new(2, 1))
        );
        assert_eq!(Rational::from_u32(u32::MAX, 2), None);
        assert_eq!(Rational::from_u32(0, 0), Some(Rational::UNDEFINED));
    }

    #[test]
    fn test_有效性与显示() {
        assert!(!Rational::UNDEFINED.is_valid());
        assert!(Rational::new(1, 1).is_valid());
        assert_eq!(Rational::new(30000, 1001).to_string(), "30000/1001");
    }
}
