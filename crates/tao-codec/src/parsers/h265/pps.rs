//! H.265/HEVC PPS 解析器.
//!
//! 只解析到 entropy_coding_sync_enabled_flag, 之后的 tile 布局与去块参数不读取.

use tao_core::bitreader::BitReader;
use tao_core::{TaoError, TaoResult};

use super::nal::HevcNalUnitType;
use super::sps::MAX_SPS_ID;
use crate::parsers::nal::remove_emulation_prevention;

/// pps_pic_parameter_set_id 最大值
pub const MAX_PPS_ID: u32 = 63;

const ID_PEEK_BYTES: usize = 8;

/// PPS 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcPps {
    /// PPS ID
    pub pps_id: u32,
    /// 引用的 SPS ID
    pub sps_id: u32,
    /// dependent_slice_segments_enabled_flag
    pub dependent_slice_segments_enabled: bool,
    /// output_flag_present_flag
    pub output_flag_present: bool,
    /// num_extra_slice_header_bits
    pub num_extra_slice_header_bits: u32,
    /// sign_data_hiding_enabled_flag
    pub sign_data_hiding_enabled: bool,
    /// cabac_init_present_flag
    pub cabac_init_present: bool,
    /// num_ref_idx_l0_default_active_minus1 + 1
    pub num_ref_idx_l0_default_active: u32,
    /// num_ref_idx_l1_default_active_minus1 + 1
    pub num_ref_idx_l1_default_active: u32,
    /// 26 + init_qp_minus26
    pub init_qp: i32,
    /// constrained_intra_pred_flag
    pub constrained_intra_pred: bool,
    /// transform_skip_enabled_flag
    pub transform_skip_enabled: bool,
    /// cu_qp_delta_enabled_flag
    pub cu_qp_delta_enabled: bool,
    /// pps_cb_qp_offset
    pub cb_qp_offset: i32,
    /// pps_cr_qp_offset
    pub cr_qp_offset: i32,
    /// tiles_enabled_flag
    pub tiles_enabled: bool,
    /// entropy_coding_sync_enabled_flag
    pub entropy_coding_sync_enabled: bool,
}

impl HevcPps {
    /// 从完整 NAL 单元 (含 2 字节头部, 未去除防竞争字节) 解析
    pub fn from_nal(nal: &[u8]) -> TaoResult<Self> {
        let nal_type = nal
            .first()
            .map(|b| HevcNalUnitType::from_type_id((b >> 1) & 0x3F));
        match nal_type {
            Some(HevcNalUnitType::Pps) if nal.len() > 2 => {
                parse_hevc_pps(&remove_emulation_prevention(&nal[2..]))
            }
            Some(HevcNalUnitType::Pps) | None => {
                Err(TaoError::InvalidData("HEVC: PPS NAL 太短".into()))
            }
            Some(other) => Err(TaoError::InvalidData(format!(
                "HEVC: 期望 PPS NAL, 实际为 {}",
                other
            ))),
        }
    }
}

/// 只读取 pps_pic_parameter_set_id, 输入为完整 NAL 单元 (含 2 字节头部)
pub fn peek_pps_id(nal: &[u8]) -> TaoResult<u32> {
    let end = nal.len().min(ID_PEEK_BYTES);
    let rbsp = remove_emulation_prevention(nal.get(2..end).unwrap_or_default());
    BitReader::new(&rbsp).read_ue()
}

/// 从 RBSP (不含 2 字节 NAL 头部, 已去除防竞争字节) 解析 HEVC PPS
pub fn parse_hevc_pps(rbsp: &[u8]) -> TaoResult<HevcPps> {
    if rbsp.is_empty() {
        return Err(TaoError::InvalidData("HEVC: PPS RBSP 为空".into()));
    }

    let mut br = BitReader::new(rbsp);

    let pps_id = br.read_ue()?;
    if pps_id > MAX_PPS_ID {
        return Err(TaoError::InvalidData(format!(
            "HEVC: pps_id 超出范围, pps_id={}",
            pps_id
        )));
    }
    let sps_id = br.read_ue()?;
    if sps_id > MAX_SPS_ID {
        return Err(TaoError::InvalidData(format!(
            "HEVC: PPS 引用的 sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }

    let dependent_slice_segments_enabled = br.read_flag()?;
    let output_flag_present = br.read_flag()?;
    let num_extra_slice_header_bits = br.read_bits(3)?;
    let sign_data_hiding_enabled = br.read_flag()?;
    let cabac_init_present = br.read_flag()?;

    let num_ref_idx_l0_default_active = read_num_ref_idx(&mut br, "l0")?;
    let num_ref_idx_l1_default_active = read_num_ref_idx(&mut br, "l1")?;

    let init_qp = 26i32.saturating_add(br.read_se()?);
    if !(-26..=51).contains(&init_qp) {
        return Err(TaoError::InvalidData(format!(
            "HEVC: init_qp 超出范围, init_qp={}",
            init_qp
        )));
    }

    let constrained_intra_pred = br.read_flag()?;
    let transform_skip_enabled = br.read_flag()?;
    let cu_qp_delta_enabled = br.read_flag()?;
    if cu_qp_delta_enabled {
        br.read_ue()?; // diff_cu_qp_delta_depth
    }

    let cb_qp_offset = read_chroma_qp_offset(&mut br, "pps_cb_qp_offset")?;
    let cr_qp_offset = read_chroma_qp_offset(&mut br, "pps_cr_qp_offset")?;

    br.skip_bits(1)?; // pps_slice_chroma_qp_offsets_present_flag
    br.skip_bits(1)?; // weighted_pred_flag
    br.skip_bits(1)?; // weighted_bipred_flag
    br.skip_bits(1)?; // transquant_bypass_enabled_flag
    let tiles_enabled = br.read_flag()?;
    let entropy_coding_sync_enabled = br.read_flag()?;

    Ok(HevcPps {
        pps_id,
        sps_id,
        dependent_slice_segments_enabled,
        output_flag_present,
        num_extra_slice_header_bits,
        sign_data_hiding_enabled,
        cabac_init_present,
        num_ref_idx_l0_default_active,
        num_ref_idx_l1_default_active,
        init_qp,
        constrained_intra_pred,
        transform_skip_enabled,
        cu_qp_delta_enabled,
        cb_qp_offset,
        cr_qp_offset,
        tiles_enabled,
        entropy_coding_sync_enabled,
    })
}

fn read_num_ref_idx(br: &mut BitReader, list: &str) -> TaoResult<u32> {
    let minus1 = br.read_ue()?;
    if minus1 > 14 {
        return Err(TaoError::InvalidData(format!(
            "HEVC: num_ref_idx_{}_default_active_minus1 超出范围, value={}",
            list, minus1
        )));
    }
    Ok(minus1 + 1)
}

fn read_chroma_qp_offset(br: &mut BitReader, field: &str) -> TaoResult<i32> {
    let value = br.read_se()?;
    if !(-12..=12).contains(&value) {
        return Err(TaoError::InvalidData(format!(
            "HEVC: {} 超出范围, value={}",
            field, value
        )));
    }
    Ok(value)
}
