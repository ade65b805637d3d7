//! H.265/HEVC NAL 头部与 hvcC 配置记录.
//!
//! NAL 头部 2 字节:
//! `forbidden(1) | nal_unit_type(6) | nuh_layer_id(6) | nuh_temporal_id_plus1(3)`.

use tao_core::{TaoError, TaoResult};

use crate::parsers::nal::START_CODE;

/// hvcC 记录的最小长度 (22 字节固定头部 + numOfArrays)
pub const HVCC_MIN_SIZE: usize = 23;

/// HEVC NAL 单元类型
///
/// 0..=21 为 slice segment, 32..=40 为参数集与辅助 NAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HevcNalUnitType {
    TrailN,
    TrailR,
    TsaN,
    TsaR,
    StsaN,
    StsaR,
    RadlN,
    RadlR,
    RaslN,
    RaslR,
    BlaWLp,
    BlaWRadl,
    BlaNLp,
    IdrWRadl,
    IdrNLp,
    /// CRA_NUT
    Cra,
    Vps,
    Sps,
    Pps,
    Aud,
    /// 序列结束
    Eos,
    /// 码流结束
    Eob,
    FillerData,
    PrefixSei,
    SuffixSei,
    /// 保留或未定义的编号
    Unknown(u8),
}

/// 已命名的类型: (编号, 类型, 显示名)
const NAMED_TYPES: [(u8, HevcNalUnitType, &str); 25] = [
    (0, HevcNalUnitType::TrailN, "TRAIL_N"),
    (1, HevcNalUnitType::TrailR, "TRAIL_R"),
    (2, HevcNalUnitType::TsaN, "TSA_N"),
    (3, HevcNalUnitType::TsaR, "TSA_R"),
    (4, HevcNalUnitType::StsaN, "STSA_N"),
    (5, HevcNalUnitType::StsaR, "STSA_R"),
    (6, HevcNalUnitType::RadlN, "RADL_N"),
    (7, HevcNalUnitType::RadlR, "RADL_R"),
    (8, HevcNalUnitType::RaslN, "RASL_N"),
    (9, HevcNalUnitType::RaslR, "RASL_R"),
    (16, HevcNalUnitType::BlaWLp, "BLA_W_LP"),
    (17, HevcNalUnitType::BlaWRadl, "BLA_W_RADL"),
    (18, HevcNalUnitType::BlaNLp, "BLA_N_LP"),
    (19, HevcNalUnitType::IdrWRadl, "IDR_W_RADL"),
    (20, HevcNalUnitType::IdrNLp, "IDR_N_LP"),
    (21, HevcNalUnitType::Cra, "CRA"),
    (32, HevcNalUnitType::Vps, "VPS"),
    (33, HevcNalUnitType::Sps, "SPS"),
    (34, HevcNalUnitType::Pps, "PPS"),
    (35, HevcNalUnitType::Aud, "AUD"),
    (36, HevcNalUnitType::Eos, "EOS"),
    (37, HevcNalUnitType::Eob, "EOB"),
    (38, HevcNalUnitType::FillerData, "Filler"),
    (39, HevcNalUnitType::PrefixSei, "PREFIX_SEI"),
    (40, HevcNalUnitType::SuffixSei, "SUFFIX_SEI"),
];

impl HevcNalUnitType {
    /// 由 6 位类型编号构造
    pub fn from_type_id(id: u8) -> Self {
        NAMED_TYPES
            .iter()
            .find(|(type_id, _, _)| *type_id == id)
            .map_or(Self::Unknown(id), |&(_, t, _)| t)
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

    /// 编号小于 32
    pub fn is_vcl(&self) -> bool {
        self.type_id() < 32
    }

    /// 携带 slice segment 的类型 (0..=23, 含保留的 IRAP 编号)
    pub fn is_slice_segment(&self) -> bool {
        self.type_id() <= 23
    }

    /// IRAP (16..=23)
    pub fn is_irap(&self) -> bool {
        (16..=23).contains(&self.type_id())
    }

    pub fn is_idr(&self) -> bool {
        matches!(self, Self::IdrWRadl | Self::IdrNLp)
    }
}

impl std::fmt::Display for HevcNalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match NAMED_TYPES.iter().find(|(_, t, _)| t == self) {
            Some((_, _, name)) => f.write_str(name),
            None => write!(f, "Unknown({})", self.type_id()),
        }
    }
}

/// HEVC NAL 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HevcNalHeader {
    pub nal_type: HevcNalUnitType,
    /// nuh_layer_id, 0 为基本层
    pub layer_id: u8,
    pub temporal_id_plus1: u8,
}

impl HevcNalHeader {
    /// 解析 NAL 的前 2 字节
    pub fn parse(nal: &[u8]) -> TaoResult<Self> {
        let [b0, b1, ..] = *nal else {
            return Err(TaoError::InvalidData(format!(
                "HEVC: NAL 头部需要 2 字节, len={}",
                nal.len()
            )));
        };
        if b0 & 0x80 != 0 {
            return Err(TaoError::InvalidData(format!(
                "HEVC: forbidden_zero_bit 非法, header=0x{:02X}{:02X}",
                b0, b1
            )));
        }
        Ok(Self {
            nal_type: HevcNalUnitType::from_type_id((b0 >> 1) & 0x3F),
            layer_id: nal_layer_id(nal),
            temporal_id_plus1: b1 & 0x07,
        })
    }
}

/// 读取 NAL 类型 (不校验头部其余字段)
pub fn nal_unit_type(nal: &[u8]) -> Option<HevcNalUnitType> {
    nal.first()
        .map(|b| HevcNalUnitType::from_type_id((b >> 1) & 0x3F))
}

/// 读取 nuh_layer_id, 数据不足 2 字节时为 0
pub fn nal_layer_id(nal: &[u8]) -> u8 {
    match nal {
        [b0, b1, ..] => ((b0 & 1) << 5) | (b1 >> 3),
        _ => 0,
    }
}

// ============================================================
// HEVCDecoderConfigurationRecord
// ============================================================

/// hvcC 中的一个 NAL 数组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HvccArray {
    /// array_completeness
    pub completeness: bool,
    /// NAL_unit_type
    pub nal_type: u8,
    /// NAL 单元 (含 2 字节头)
    pub nals: Vec<Vec<u8>>,
}

/// hvcC 配置
#[derive(Debug, Clone)]
pub struct HvccConfig {
    /// configurationVersion
    pub version: u8,
    /// general_profile_idc
    pub general_profile_idc: u8,
    /// general_tier_flag
    pub general_tier_flag: bool,
    /// general_level_idc
    pub general_level_idc: u8,
    /// chromaFormat
    pub chroma_format_idc: u8,
    /// NAL 长度字段大小 (字节)
    pub length_size: usize,
    /// NAL 数组 (保持记录中的顺序)
    pub arrays: Vec<HvccArray>,
}

impl HvccConfig {
    /// 指定类型的全部 NAL, 按记录顺序
    pub fn nals_of_type(&self, nal_type: HevcNalUnitType) -> impl Iterator<Item = &[u8]> {
        let type_id = nal_type.type_id();
        self.arrays
            .iter()
            .filter(move |a| a.nal_type == type_id)
            .flat_map(|a| a.nals.iter().map(Vec::as_slice))
    }
}

/// 判断数据是否具有 hvcC 记录的外形
///
/// configurationVersion 为 1; 部分封装器写入 0, 此时要求数据不以起始码开头,
/// 且首个数组 (若有) 的类型为参数集或 SEI.
pub fn is_hvcc(data: &[u8]) -> bool {
    if data.len() < HVCC_MIN_SIZE {
        return false;
    }
    match data[0] {
        1 => true,
        0 => {
            let looks_annex_b = data.starts_with(&[0, 0, 1]) || data.starts_with(&START_CODE);
            let first_array_ok = data[22] == 0
                || data
                    .get(HVCC_MIN_SIZE)
                    .is_some_and(|b| matches!(b & 0x3F, 32..=34 | 39 | 40));
            !looks_annex_b && first_array_ok
        }
        _ => false,
    }
}

/// 解析 HEVCDecoderConfigurationRecord
pub fn parse_hvcc_config(data: &[u8]) -> TaoResult<HvccConfig> {
    if data.len() < HVCC_MIN_SIZE {
        return Err(TaoError::InvalidData("HEVC: hvcC 数据太短".into()));
    }

    // bytes 2-5: general_profile_compatibility_flags
    // bytes 6-11: general_constraint_indicator_flags
    // bytes 13-20: 分段/并行/位深/平均帧率
    // byte 21: constantFrameRate(2) | numTemporalLayers(3) | temporalIdNested(1) | lengthSizeMinusOne(2)
    let length_size = usize::from(data[21] & 0x03) + 1;
    if length_size == 3 {
        return Err(TaoError::InvalidData(
            "HEVC: hvcC lengthSizeMinusOne 非法, length_size=3".into(),
        ));
    }
    let num_arrays = data[22];

    let mut arrays = Vec::with_capacity(usize::from(num_arrays));
    let mut pos = HVCC_MIN_SIZE;
    for array_idx in 0..num_arrays {
        if pos + 3 > data.len() {
            return Err(TaoError::InvalidData(format!(
                "HEVC: hvcC 数组头截断, index={}",
                array_idx
            )));
        }
        let completeness = data[pos] & 0x80 != 0;
        let nal_type = data[pos] & 0x3F;
        let num_nalus = usize::from(u16::from_be_bytes([data[pos + 1], data[pos + 2]]));
        pos += 3;

        let mut nals = Vec::with_capacity(num_nalus.min(64));
        for nal_idx in 0..num_nalus {
            if pos + 2 > data.len() {
                return Err(TaoError::InvalidData(format!(
                    "HEVC: hvcC NAL 长度字段截断, array={}, index={}",
                    array_idx, nal_idx
                )));
            }
            let nal_len = usize::from(u16::from_be_bytes([data[pos], data[pos + 1]]));
            pos += 2;
            if pos + nal_len > data.len() {
                return Err(TaoError::InvalidData(format!(
                    "HEVC: hvcC NAL 数据截断, array={}, index={}, declared_len={}, remain={}",
                    array_idx,
                    nal_idx,
                    nal_len,
                    data.len() - pos
                )));
            }
            nals.push(data[pos..pos + nal_len].to_vec());
            pos += nal_len;
        }

        arrays.push(HvccArray {
            completeness,
            nal_type,
            nals,
        });
    }

    Ok(HvccConfig {
        version: data[0],
        general_profile_idc: data[1] & 0x1F,
        general_tier_flag: data[1] & 0x20 != 0,
        general_level_idc: data[12],
        chroma_format_idc: data[16] & 0x03,
        length_size,
        arrays,
    })
}

/// 将 hvcC 中的全部 NAL 渲染为 Annex B 字节流 (4 字节起始码)
///
/// 空的 NAL 条目被跳过.
pub fn hvcc_to_annex_b(data: &[u8]) -> TaoResult<Vec<u8>> {
    let config = parse_hvcc_config(data)?;
    let nals = config.arrays.iter().flat_map(|a| &a.nals).filter(|n| !n.is_empty());

    let total: usize = nals.clone().map(|n| n.len() + START_CODE.len()).sum();
    let mut out = Vec::new();
    out.try_reserve(total)?;
    for nal in nals {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nal);
    }
    Ok(out)
}

/// 构建 HEVCDecoderConfigurationRecord
///
/// profile/tier/level 取自第一个 SPS 的 profile_tier_level, 色度格式与位深取自该 SPS 的解析结果,
/// 数组顺序为 VPS, SPS, PPS.
pub fn build_hvcc_config(
    vps_list: &[&[u8]],
    sps_list: &[&[u8]],
    pps_list: &[&[u8]],
    length_size: usize,
) -> TaoResult<Vec<u8>> {
    let Some(sps0) = sps_list.first() else {
        return Err(TaoError::InvalidData(
            "HEVC: 构建 hvcC 需要至少一个 SPS".into(),
        ));
    };
    if !matches!(length_size, 1 | 2 | 4) {
        return Err(TaoError::InvalidData(format!(
            "HEVC: hvcC length_size 非法, value={}",
            length_size
        )));
    }

    let sps = super::sps::HevcSps::from_nal(sps0).map_err(|e| e.eof_as_invalid("HEVC SPS"))?;
    // hvcC 的位深字段只有 3 位
    if sps.bit_depth_luma > 15 || sps.bit_depth_chroma > 15 {
        return Err(TaoError::Unsupported(format!(
            "HEVC: hvcC 无法表示位深, luma={}, chroma={}",
            sps.bit_depth_luma, sps.bit_depth_chroma
        )));
    }

    // SPS NAL 头 (2 字节) 之后: vps_id(4) max_sub_layers(3) nesting(1), 随后是 12 字节 general PTL
    let rbsp = crate::parsers::nal::remove_emulation_prevention(&sps0[2.min(sps0.len())..]);
    let Some(ptl) = rbsp.get(1..13) else {
        return Err(TaoError::InvalidData("HEVC: SPS 数据太短".into()));
    };
    let max_sub_layers = ((rbsp[0] >> 1) & 0x07) + 1;
    let temporal_id_nested = rbsp[0] & 0x01;

    let arrays: Vec<(u8, &[&[u8]])> = [(32u8, vps_list), (33, sps_list), (34, pps_list)]
        .into_iter()
        .filter(|(_, list)| !list.is_empty())
        .collect();

    let payload: usize = arrays
        .iter()
        .map(|(_, list)| 3 + list.iter().map(|n| n.len() + 2).sum::<usize>())
        .sum();
    let mut out = Vec::new();
    out.try_reserve(HVCC_MIN_SIZE + payload)?;

    out.push(1); // configurationVersion
    out.push(ptl[0]); // profile_space | tier | profile_idc
    out.extend_from_slice(&ptl[1..5]); // general_profile_compatibility_flags
    out.extend_from_slice(&ptl[5..11]); // general_constraint_indicator_flags
    out.push(ptl[11]); // general_level_idc
    out.extend_from_slice(&[0xF0, 0x00]); // min_spatial_segmentation_idc
    out.push(0xFC); // parallelismType
    out.push(0xFC | sps.chroma_format_idc as u8); // chromaFormat
    out.push(0xF8 | (sps.bit_depth_luma - 8) as u8); // bitDepthLumaMinus8
    out.push(0xF8 | (sps.bit_depth_chroma - 8) as u8); // bitDepthChromaMinus8
    out.extend_from_slice(&[0, 0]); // avgFrameRate
    out.push((max_sub_layers << 3) | (temporal_id_nested << 2) | (length_size as u8 - 1));
    out.push(arrays.len() as u8);

    for (nal_type, list) in arrays {
        let count = u16::try_from(list.len()).map_err(|_| {
            TaoError::InvalidData(format!("HEVC: hvcC NAL 数量过多, count={}", list.len()))
        })?;
        out.push(0x80 | nal_type); // array_completeness=1
        out.extend_from_slice(&count.to_be_bytes());
        for nal in list {
            let len = u16::try_from(nal.len()).map_err(|_| {
                TaoError::InvalidData(format!("HEVC: 参数集过长, len={}", nal.len()))
            })?;
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(nal);
        }
    }

    Ok(out)
}
