//! H.264 slice 头部的最小解析.
//!
//! 只读取到 pic_parameter_set_id, 用于确定当前图像使用的参数集.

use tao_core::bitreader::BitReader;
use tao_core::{TaoError, TaoResult};

use super::pps::MAX_PPS_ID;
use crate::parsers::nal::remove_emulation_prevention;

/// slice 头部前 3 个 ue(v) 最长 3*63 位, 预留 32 字节足够
const SLICE_HEADER_PEEK_BYTES: usize = 32;

/// slice 头部的前缀字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceHeaderPrefix {
    /// first_mb_in_slice
    pub first_mb_in_slice: u32,
    /// slice_type (0-9)
    pub slice_type: u32,
    /// pic_parameter_set_id
    pub pps_id: u32,
}

/// 从完整 slice NAL (含 1 字节头部) 解析头部前缀
pub fn parse_slice_header_prefix(nal: &[u8]) -> TaoResult<SliceHeaderPrefix> {
    if nal.len() < 2 {
        return Err(TaoError::InvalidData("H.264: slice NAL 太短".into()));
    }
    let end = nal.len().min(1 + SLICE_HEADER_PEEK_BYTES);
    let rbsp = remove_emulation_prevention(&nal[1..end]);
    let mut br = BitReader::new(&rbsp);

    let first_mb_in_slice = br.read_ue()?;
    let slice_type = br.read_ue()?;
    if slice_type > 9 {
        return Err(TaoError::InvalidData(format!(
            "H.264: slice_type 非法, value={}",
            slice_type
        )));
    }
    let pps_id = br.read_ue()?;
    if pps_id > MAX_PPS_ID {
        return Err(TaoError::InvalidData(format!(
            "H.264: slice 引用的 pps_id 超出范围, pps_id={}",
            pps_id
        )));
    }

    Ok(SliceHeaderPrefix {
        first_mb_in_slice,
        slice_type,
        pps_id,
    })
}

/// 读取 slice 引用的 PPS ID
pub fn slice_pps_id(nal: &[u8]) -> TaoResult<u32> {
    parse_slice_header_prefix(nal).map(|h| h.pps_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::testutil::h264_slice_nal;

    #[test]
    fn test_slice_pps_id() {
        assert_eq!(slice_pps_id(&h264_slice_nal(true, 0)).unwrap(), 0);
        assert_eq!(slice_pps_id(&h264_slice_nal(false, 17)).unwrap(), 17);
        assert_eq!(slice_pps_id(&h264_slice_nal(true, 255)).unwrap(), 255);
    }

    #[test]
    fn test_slice_header_prefix() {
        let header = parse_slice_header_prefix(&h264_slice_nal(true, 4)).unwrap();
        assert_eq!(header.first_mb_in_slice, 0);
        assert_eq!(header.slice_type, 7); // I (全部 slice 同类型)
        assert_eq!(header.pps_id, 4);

        let header = parse_slice_header_prefix(&h264_slice_nal(false, 4)).unwrap();
        assert_eq!(header.slice_type, 5); // P
    }

    #[test]
    fn test_slice_截断与非法输入() {
        assert!(slice_pps_id(&[0x65]).is_err());
        // 全零: ue(v) 前导零过多
        assert!(slice_pps_id(&[0x65, 0x00, 0x00, 0x00, 0x00, 0x00]).is_err());
        // slice_type=10: 1 0001011
        assert!(slice_pps_id(&[0x65, 0b1000_1011, 0b1000_0000]).is_err());
    }
}
