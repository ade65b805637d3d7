//! 色彩范围定义.

/// 色彩范围
///
/// - Limited: Y 16-235, Cb/Cr 16-240 (8 位) - 广播标准
/// - Full: Y/Cb/Cr 0-255 (8 位) - JPEG/PC 标准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorRange {
    /// 未指定
    #[default]
    Unspecified,
    /// 有限范围 (广播/TV) Y 16-235
    Limited,
    /// 完整范围 (JPEG/PC) Y 0-255
    Full,
}

impl ColorRange {
    /// 由 VUI video_full_range_flag 转换
    pub fn from_full_range_flag(full_range: bool) -> Self {
        if full_range { Self::Full } else { Self::Limited }
    }

    /// 是否为完整范围
    pub fn is_full(self) -> bool {
        self == Self::Full
    }
}
