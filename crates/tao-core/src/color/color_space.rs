//! 色彩空间 (YCbCr 矩阵系数).

/// YCbCr 色彩空间 (矩阵系数)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ColorSpace {
    /// 未指定
    #[default]
    Unspecified,
    /// ITU-R BT.709 (高清)
    Bt709,
    /// ITU-R BT.470 BG (PAL/SECAM)
    Bt470bg,
    /// SMPTE 170M (NTSC)
    Smpte170m,
    /// SMPTE 240M
    Smpte240m,
    /// ITU-R BT.2020 非恒定亮度
    Bt2020Ncl,
    /// ITU-R BT.2020 恒定亮度
    Bt2020Cl,
    /// 恒等矩阵 (GBR)
    Rgb,
}

impl ColorSpace {
    /// 由 VUI matrix_coefficients 码点转换, 未知码点为 `Unspecified`
    pub fn from_iso_code(code: u8) -> Self {
        match code {
            0 => Self::Rgb,
            1 => Self::Bt709,
            5 => Self::Bt470bg,
            6 => Self::Smpte170m,
            7 => Self::Smpte240m,
            9 => Self::Bt2020Ncl,
            10 => Self::Bt2020Cl,
            _ => Self::Unspecified,
        }
    }
}
