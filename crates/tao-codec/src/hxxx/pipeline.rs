//! 分帧转换管线.
//!
//! 管线在配置阶段按 (源是否为长度前缀, 消费方是否需要长度前缀) 选定, 之后不再改变.
//!
//! | 源 | 消费方 | 管线 |
//! |----|--------|------|
//! | 长度前缀 | 长度前缀 | 按长度前缀扫描, 原样输出 |
//! | 长度前缀 | Annex B | 先转为 Annex B, 再扫描 |
//! | Annex B | 长度前缀 | 按 Annex B 扫描, 再转为长度前缀 |
//! | Annex B | Annex B | 按 Annex B 扫描, 原样输出 |

use bytes::Bytes;
use tao_core::TaoResult;

use crate::parsers::nal::{NalFraming, annex_b_to_length_prefixed, length_prefixed_to_annex_b};

/// 分帧转换管线
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// 长度前缀直通
    LengthPrefixed,
    /// 长度前缀转 Annex B
    LengthPrefixedToAnnexB,
    /// Annex B 转长度前缀
    AnnexBToLengthPrefixed,
    /// Annex B 直通
    AnnexB,
}

impl Pipeline {
    /// 选择管线
    pub fn select(source_length_prefixed: bool, need_length_prefixed: bool) -> Self {
        match (source_length_prefixed, need_length_prefixed) {
            (true, true) => Self::LengthPrefixed,
            (true, false) => Self::LengthPrefixedToAnnexB,
            (false, true) => Self::AnnexBToLengthPrefixed,
            (false, false) => Self::AnnexB,
        }
    }

    /// 扫描参数集时的分帧方式
    pub fn scan_framing(self, nal_length_size: usize) -> NalFraming {
        match self {
            Self::LengthPrefixed => NalFraming::LengthPrefixed(nal_length_size),
            Self::LengthPrefixedToAnnexB | Self::AnnexBToLengthPrefixed | Self::AnnexB => {
                NalFraming::AnnexB
            }
        }
    }

    /// 输出给消费方的分帧方式
    pub fn output_framing(self, nal_length_size: usize) -> NalFraming {
        match self {
            Self::LengthPrefixed | Self::AnnexBToLengthPrefixed => {
                NalFraming::LengthPrefixed(nal_length_size)
            }
            Self::LengthPrefixedToAnnexB | Self::AnnexB => NalFraming::AnnexB,
        }
    }

    /// 扫描之前的转换
    pub(crate) fn before_scan(self, data: Bytes, nal_length_size: usize) -> TaoResult<Bytes> {
        match self {
            Self::LengthPrefixedToAnnexB => {
                Ok(Bytes::from(length_prefixed_to_annex_b(&data, nal_length_size)?))
            }
            Self::LengthPrefixed | Self::AnnexBToLengthPrefixed | Self::AnnexB => Ok(data),
        }
    }

    /// 扫描之后的转换
    pub(crate) fn after_scan(self, data: Bytes, nal_length_size: usize) -> TaoResult<Bytes> {
        match self {
            Self::AnnexBToLengthPrefixed => {
                Ok(Bytes::from(annex_b_to_length_prefixed(&data, nal_length_size)?))
            }
            Self::LengthPrefixed | Self::LengthPrefixedToAnnexB | Self::AnnexB => Ok(data),
        }
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LengthPrefixed => "length-prefixed",
            Self::LengthPrefixedToAnnexB => "length-prefixed -> annex-b",
            Self::AnnexBToLengthPrefixed => "annex-b -> length-prefixed",
            Self::AnnexB => "annex-b",
        };
        write!(f, "{}", name)
    }
}
