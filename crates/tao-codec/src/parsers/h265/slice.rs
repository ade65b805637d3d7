//! HEVC slice segment 头部的最小解析.

use tao_core::bitreader::BitReader;
use tao_core::{TaoError, TaoResult};

use super::nal::HevcNalUnitType;
use super::pps::MAX_PPS_ID;
use crate::parsers::nal::remove_emulation_prevention;

/// 读取 PPS ID 只需要头部开头的少量字节
const SLICE_HEADER_PEEK_BYTES: usize = 16;

/// 从完整 slice segment NAL (含 2 字节头部) 读取
/// `(first_slice_segment_in_pic_flag, slice_pic_parameter_set_id)`
pub fn parse_slice_segment_prefix(nal: &[u8]) -> TaoResult<(bool, u32)> {
    if nal.len() < 3 {
        return Err(TaoError::InvalidData("HEVC: slice NAL 太短".into()));
    }
    let nal_type = HevcNalUnitType::from_type_id((nal[0] >> 1) & 0x3F);
    if !nal_type.is_slice_segment() {
        return Err(TaoError::InvalidData(format!(
            "HEVC: NAL 不是 slice segment, type={}",
            nal_type
        )));
    }

    let end = nal.len().min(2 + SLICE_HEADER_PEEK_BYTES);
    let rbsp = remove_emulation_prevention(&nal[2..end]);
    let mut br = BitReader::new(&rbsp);

    let first_slice_segment_in_pic = br.read_flag()?;
    if nal_type.is_irap() {
        br.skip_bits(1)?; // no_output_of_prior_pics_flag
    }
    let pps_id = br.read_ue()?;
    if pps_id > MAX_PPS_ID {
        return Err(TaoError::InvalidData(format!(
            "HEVC: slice 引用的 pps_id 超出范围, pps_id={}",
            pps_id
        )));
    }
    Ok((first_slice_segment_in_pic, pps_id))
}

/// 读取 slice segment 引用的 PPS ID
pub fn slice_pps_id(nal: &[u8]) -> TaoResult<u32> {
    parse_slice_segment_prefix(nal).map(|(_, pps_id)| pps_id)
}
