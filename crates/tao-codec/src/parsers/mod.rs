//! 码流解析器模块.
//!
//! - [`nal`]: 两种 NAL 封装 (Annex B / 长度前缀) 的迭代与转换
//! - [`h264`]: H.264 NAL 头部、avcC、SPS/PPS、slice 头
//! - [`h265`]: HEVC NAL 头部、hvcC、VPS/SPS/PPS、slice 头

pub mod h264;
pub mod h265;
pub mod nal;

#[cfg(test)]
pub(crate) mod testutil;

use tao_core::bitreader::BitReader;
use tao_core::{Rational, TaoError, TaoResult};

/// aspect_ratio_idc 1..=16 对应的 SAR, 下标 0 表示未指定
#[rustfmt::skip]
const SAR_TABLE: [(u32, u32); 17] = [
    (0, 1), (1, 1), (12, 11), (10, 11), (16, 11), (40, 33), (24, 11), (20, 11), (32, 11),
    (80, 33), (18, 11), (15, 11), (64, 33), (160, 99), (4, 3), (3, 2), (2, 1),
];

/// 读取 VUI 中 aspect_ratio_idc 之后的字段
///
/// 调用方已读取 aspect_ratio_info_present_flag. idc=0 (未指定) 返回 `None`.
pub(crate) fn read_aspect_ratio(br: &mut BitReader, codec: &str) -> TaoResult<Option<Rational>> {
    const EXTENDED_SAR: usize = 255;

    let ar_idc = br.read_bits(8)? as usize;
    if ar_idc == EXTENDED_SAR {
        let sar_w = br.read_bits(16)?;
        let sar_h = br.read_bits(16)?;
        if sar_w == 0 || sar_h == 0 {
            return Err(TaoError::InvalidData(format!(
                "{}: VUI Extended_SAR 非法, sar_w={}, sar_h={}",
                codec, sar_w, sar_h
            )));
        }
        return Ok(Rational::from_u32(sar_w, sar_h));
    }

    match SAR_TABLE.get(ar_idc) {
        Some(&(0, _)) => Ok(None),
        Some(&(w, h)) => Ok(Rational::from_u32(w, h)),
        None => Err(TaoError::InvalidData(format!(
            "{}: VUI aspect_ratio_idc 非法, value={}",
            codec, ar_idc
        ))),
    }
}
