//! H.264 NAL 头部与 avcC 配置记录.
//!
//! NAL 头部 1 字节: `forbidden(1) | nal_ref_idc(2) | nal_unit_type(5)`.
//!
//! AVCDecoderConfigurationRecord:
//! ```text
//! version(8) profile(8) compat(8) level(8)
//! reserved(6) lengthSizeMinusOne(2)
//! reserved(3) numOfSPS(5) { len(16) sps }*
//! numOfPPS(8) { len(16) pps }*
//! ```

use bytes::{Buf, BufMut};
use tao_core::{TaoError, TaoResult};

/// avcC 记录的最小长度 (到 numOfPPS 为止)
pub const AVCC_MIN_SIZE: usize = 7;

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NalUnitType {
    /// 非 IDR slice
    Slice,
    /// 数据分区 A
    SliceDpa,
    /// 数据分区 B
    SliceDpb,
    /// 数据分区 C
    SliceDpc,
    /// IDR slice
    SliceIdr,
    Sei,
    Sps,
    Pps,
    /// 访问单元分隔符
    Aud,
    EndOfSequence,
    EndOfStream,
    FillerData,
    SpsExtension,
    Unknown(u8),
}

/// 已命名的类型: (编号, 类型, 显示名)
const NAMED_TYPES: [(u8, NalUnitType, &str); 13] = [
    (1, NalUnitType::Slice, "Slice"),
    (2, NalUnitType::SliceDpa, "SliceDPA"),
    (3, NalUnitType::SliceDpb, "SliceDPB"),
    (4, NalUnitType::SliceDpc, "SliceDPC"),
    (5, NalUnitType::SliceIdr, "IDR"),
    (6, NalUnitType::Sei, "SEI"),
    (7, NalUnitType::Sps, "SPS"),
    (8, NalUnitType::Pps, "PPS"),
    (9, NalUnitType::Aud, "AUD"),
    (10, NalUnitType::EndOfSequence, "EndOfSeq"),
    (11, NalUnitType::EndOfStream, "EndOfStream"),
    (12, NalUnitType::FillerData, "Filler"),
    (13, NalUnitType::SpsExtension, "SPSExt"),
];

impl NalUnitType {
    /// 由 5 位类型编号构造
    pub fn from_type_id(type_id: u8) -> Self {
        NAMED_TYPES
            .iter()
            .find(|(id, _, _)| *id == type_id)
            .map_or(Self::Unknown(type_id), |&(_, t, _)| t)
    }

    pub fn type_id(&self) -> u8 {
        match *self {
            Self::Unknown(id) => id,
            named => NAMED_TYPES
                .iter()
                .find(|(_, t, _)| *t == named)
                .map_or(0, |&(id, _, _)| id),
        }
    }

    /// slice 或数据分区 (类型 1..=5)
    pub fn is_vcl(&self) -> bool {
        (1..=5).contains(&self.type_id())
    }

    pub fn is_idr(&self) -> bool {
        *self == Self::SliceIdr
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match NAMED_TYPES.iter().find(|(_, t, _)| t == self) {
            Some((_, _, name)) => f.write_str(name),
            None => write!(f, "Unknown({})", self.type_id()),
        }
    }
}

/// NAL 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    pub nal_type: NalUnitType,
    /// nal_ref_idc (0-3)
    pub ref_idc: u8,
}

impl NalHeader {
    /// 解析 NAL 的首字节, 拒绝 forbidden_zero_bit 置位的数据
    pub fn parse(nal: &[u8]) -> TaoResult<Self> {
        match nal.first() {
            None => Err(TaoError::InvalidData("H.264: NAL 单元数据为空".into())),
            Some(&b) if b & 0x80 != 0 => Err(TaoError::InvalidData(format!(
                "H.264: forbidden_zero_bit 非法, header=0x{:02X}",
                b
            ))),
            Some(&b) => Ok(Self {
                nal_type: NalUnitType::from_type_id(b & 0x1F),
                ref_idc: (b >> 5) & 0x03,
            }),
        }
    }
}

/// 读取 NAL 类型 (不校验 forbidden 位)
pub fn nal_unit_type(nal: &[u8]) -> Option<NalUnitType> {
    nal.first().map(|b| NalUnitType::from_type_id(b & 0x1F))
}

/// avcC 配置解析结果
#[derive(Debug, Clone)]
pub struct AvccConfig {
    /// AVCProfileIndication
    pub profile_idc: u8,
    pub profile_compatibility: u8,
    /// AVCLevelIndication
    pub level_idc: u8,
    /// NAL 长度前缀宽度 (1, 2 或 4)
    pub length_size: usize,
    /// 含 NAL 头部
    pub sps_list: Vec<Vec<u8>>,
    /// 含 NAL 头部
    pub pps_list: Vec<Vec<u8>>,
}

/// 是否具有 avcC 记录的外形
///
/// 只看长度与 configurationVersion, 内部结构由 [`parse_avcc_config`] 校验.
pub fn is_avcc(data: &[u8]) -> bool {
    data.len() >= AVCC_MIN_SIZE && data[0] == 1
}

/// 解析 AVCDecoderConfigurationRecord
pub fn parse_avcc_config(data: &[u8]) -> TaoResult<AvccConfig> {
    if data.len() < AVCC_MIN_SIZE {
        return Err(TaoError::InvalidData(format!(
            "H.264: avcC 数据太短, len={}",
            data.len()
        )));
    }

    let mut buf = &data[1..];
    let profile_idc = buf.get_u8();
    let profile_compatibility = buf.get_u8();
    let level_idc = buf.get_u8();
    let length_size = usize::from(buf.get_u8() & 0x03) + 1;
    if length_size == 3 {
        return Err(TaoError::InvalidData(
            "H.264: avcC lengthSizeMinusOne 非法, length_size=3".into(),
        ));
    }

    let num_sps = usize::from(buf.get_u8() & 0x1F);
    let sps_list = read_parameter_sets(&mut buf, num_sps, "SPS")?;
    if !buf.has_remaining() {
        return Err(TaoError::InvalidData(
            "H.264: avcC 缺少 numOfPictureParameterSets 字段".into(),
        ));
    }
    let num_pps = usize::from(buf.get_u8());
    let pps_list = read_parameter_sets(&mut buf, num_pps, "PPS")?;

    Ok(AvccConfig {
        profile_idc,
        profile_compatibility,
        level_idc,
        length_size,
        sps_list,
        pps_list,
    })
}

fn read_parameter_sets(buf: &mut &[u8], count: usize, kind: &str) -> TaoResult<Vec<Vec<u8>>> {
    let mut list = Vec::new();
    list.try_reserve_exact(count)?;
    for index in 0..count {
        if buf.remaining() < 2 {
            return Err(TaoError::InvalidData(format!(
                "H.264: avcC {} 长度字段截断, index={}",
                kind, index
            )));
        }
        let len = usize::from(buf.get_u16());
        if len == 0 || len > buf.remaining() {
            return Err(TaoError::InvalidData(format!(
                "H.264: avcC {} 数据截断, index={}, declared_len={}, remain={}",
                kind,
                index,
                len,
                buf.remaining()
            )));
        }
        list.push(buf[..len].to_vec());
        buf.advance(len);
    }
    Ok(list)
}

/// 构建 AVCDecoderConfigurationRecord
///
/// profile/level 取自第一个 SPS 的头部字段.
pub fn build_avcc_config(
    sps_list: &[&[u8]],
    pps_list: &[&[u8]],
    length_size: usize,
) -> TaoResult<Vec<u8>> {
    let Some(sps0) = sps_list.first() else {
        return Err(TaoError::InvalidData(
            "H.264: 构建 avcC 需要至少一个 SPS".into(),
        ));
    };
    if sps0.len() < 4 {
        return Err(TaoError::InvalidData("H.264: SPS 数据太短".into()));
    }
    if !matches!(length_size, 1 | 2 | 4) {
        return Err(TaoError::InvalidData(format!(
            "H.264: avcC length_size 非法, value={}",
            length_size
        )));
    }
    if sps_list.len() > 31 || pps_list.len() > 255 {
        return Err(TaoError::InvalidData(format!(
            "H.264: avcC 参数集数量超出范围, sps={}, pps={}",
            sps_list.len(),
            pps_list.len()
        )));
    }

    let payload: usize = sps_list.iter().chain(pps_list).map(|ps| ps.len() + 2).sum();
    let mut out = Vec::new();
    out.try_reserve(AVCC_MIN_SIZE + payload)?;
    out.put_u8(1); // configurationVersion
    out.put_slice(&sps0[1..4]); // profile, compat, level
    out.put_u8(0xFC | (length_size as u8 - 1));
    out.put_u8(0xE0 | sps_list.len() as u8);
    write_parameter_sets(&mut out, sps_list)?;
    out.put_u8(pps_list.len() as u8);
    write_parameter_sets(&mut out, pps_list)?;
    Ok(out)
}

fn write_parameter_sets(out: &mut Vec<u8>, list: &[&[u8]]) -> TaoResult<()> {
    for ps in list {
        let len = u16::try_from(ps.len()).map_err(|_| {
            TaoError::InvalidData(format!("H.264: 参数集过长, len={}", ps.len()))
        })?;
        out.put_u16(len);
        out.put_slice(ps);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_类型编号互逆() {
        for id in 0..32u8 {
            assert_eq!(NalUnitType::from_type_id(id).type_id(), id);
        }
        assert_eq!(NalUnitType::from_type_id(7), NalUnitType::Sps);
        assert_eq!(NalUnitType::from_type_id(24), NalUnitType::Unknown(24));
        assert_eq!(NalUnitType::SliceIdr.to_string(), "IDR");
        assert_eq!(NalUnitType::Unknown(30).to_string(), "Unknown(30)");
    }

    #[test]
    fn test_vcl_判定() {
        assert!(NalUnitType::SliceDpa.is_vcl());
        assert!(NalUnitType::SliceIdr.is_idr());
        assert!(!NalUnitType::Sei.is_vcl());
        assert!(!NalUnitType::Unknown(20).is_vcl());
    }

    #[test]
    fn test_nal_头部() {
        let header = NalHeader::parse(&[0x67, 0x42]).unwrap();
        assert_eq!(header.nal_type, NalUnitType::Sps);
        assert_eq!(header.ref_idc, 3);
        assert_eq!(nal_unit_type(&[0x09]), Some(NalUnitType::Aud));
        assert_eq!(nal_unit_type(&[]), None);

        let err = NalHeader::parse(&[0xE7]).expect_err("forbidden 位置位应失败");
        assert!(err.to_string().contains("forbidden_zero_bit"));
        assert!(NalHeader::parse(&[]).is_err());
    }

    #[test]
    fn test_is_avcc() {
        assert!(is_avcc(&[0x01, 0x64, 0x00, 0x1E, 0xFF, 0xE0, 0x00]));
        assert!(!is_avcc(&[0x01, 0x64, 0x00]));
        assert!(!is_avcc(&[0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00]));
    }

    #[test]
    fn test_avcc_构建与解析() {
        let sps = [0x67, 0x4D, 0x40, 0x28, 0xAB];
        let pps = [0x68, 0xEE, 0x3C, 0x80];

        let record = build_avcc_config(&[&sps], &[&pps, &pps], 2).unwrap();
        assert_eq!(&record[..6], &[0x01, 0x4D, 0x40, 0x28, 0xFD, 0xE1]);

        let config = parse_avcc_config(&record).unwrap();
        assert_eq!(config.length_size, 2);
        assert_eq!((config.profile_idc, config.level_idc), (0x4D, 0x28));
        assert_eq!(config.profile_compatibility, 0x40);
        assert_eq!(config.sps_list, vec![sps.to_vec()]);
        assert_eq!(config.pps_list.len(), 2);

        assert!(build_avcc_config(&[], &[], 4).is_err());
        assert!(build_avcc_config(&[&sps], &[], 3).is_err());
    }

    #[test]
    fn test_avcc_长度宽度() {
        let mut data = vec![0x01, 0x64, 0x00, 0x1E, 0xFC, 0xE0, 0x00];
        assert_eq!(parse_avcc_config(&data).unwrap().length_size, 1);
        data[4] = 0xFF;
        assert_eq!(parse_avcc_config(&data).unwrap().length_size, 4);
        data[4] = 0xFE;
        let err = parse_avcc_config(&data).expect_err("length_size=3 应失败");
        assert!(matches!(err, TaoError::InvalidData(_)), "err={:?}", err);
    }

    #[test]
    fn test_avcc_截断() {
        let cases: [(&[u8], &str); 4] = [
            (&[0x01, 0x64, 0x00, 0x1E, 0xFF, 0xE1, 0x00], "SPS 长度字段截断"),
            (
                &[0x01, 0x64, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x04, 0x67, 0x64],
                "SPS 数据截断",
            ),
            (
                &[0x01, 0x64, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x01, 0x67],
                "numOfPictureParameterSets",
            ),
            (
                &[0x01, 0x64, 0x00, 0x1E, 0xFF, 0xE0, 0x01, 0x00, 0x02, 0x68],
                "PPS 数据截断",
            ),
        ];
        for (data, expected) in cases {
            let err = parse_avcc_config(data).expect_err("截断的 avcC 应失败");
            assert!(
                err.to_string().contains(expected),
                "期望包含 {}, 实际 {}",
                expected,
                err
            );
        }
    }
}
