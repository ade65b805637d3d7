//! 色彩原色定义.
//!
//! 码点取值见 ISO/IEC 23001-8 (与 H.264/HEVC VUI 的 colour_primaries 一致).

/// 色彩原色 (色域)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ColorPrimaries {
    /// 未指定
    #[default]
    Unspecified,
    /// ITU-R BT.709 (sRGB, 高清)
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
    /// ITU-R BT.2020 (超高清/HDR)
    Bt2020,
    /// DCI-P3 (D65 白点)
    SmpteP3d65,
}

impl ColorPrimaries {
    /// 由 VUI colour_primaries 码点转换, 未知码点为 `Unspecified`
    pub fn from_iso_code(code: u8) -> Self {
        match code {
            1 => Self::Bt709,
            4 => Self::Bt470m,
            5 => Self::Bt470bg,
            6 => Self::Smpte170m,
            7 => Self::Smpte240m,
            8 => Self::Film,
            9 => Self::Bt2020,
            12 => Self::SmpteP3d65,
            _ => Self::Unspecified,
        }
    }
}
