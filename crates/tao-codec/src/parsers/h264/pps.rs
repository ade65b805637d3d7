//! H.264 PPS (Picture Parameter Set) 解析器.
//!
//! 只解析到 transform_8x8_mode_flag, 量化矩阵依赖 SPS 的色度格式, 不在此处解析.

use tao_core::bitreader::BitReader;
use tao_core::{TaoError, TaoResult};

use super::nal::NalUnitType;
use super::sps::MAX_SPS_ID;
use crate::parsers::nal::remove_emulation_prevention;

/// pic_parameter_set_id 最大值
pub const MAX_PPS_ID: u32 = 255;

const ID_PEEK_BYTES: usize = 8;

/// PPS 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pps {
    /// PPS ID
    pub pps_id: u32,
    /// 引用的 SPS ID
    pub sps_id: u32,
    /// entropy_coding_mode_flag (true=CABAC)
    pub entropy_coding_mode: bool,
    /// bottom_field_pic_order_in_frame_present_flag
    pub pic_order_present: bool,
    /// num_slice_groups_minus1 + 1
    pub num_slice_groups: u32,
    /// num_ref_idx_l0_default_active_minus1 + 1
    pub num_ref_idx_l0_default_active: u32,
    /// num_ref_idx_l1_default_active_minus1 + 1
    pub num_ref_idx_l1_default_active: u32,
    /// weighted_pred_flag
    pub weighted_pred: bool,
    /// weighted_bipred_idc
    pub weighted_bipred_idc: u32,
    /// 26 + pic_init_qp_minus26
    pub pic_init_qp: i32,
    /// chroma_qp_index_offset
    pub chroma_qp_index_offset: i32,
    /// deblocking_filter_control_present_flag
    pub deblocking_filter_control: bool,
    /// constrained_intra_pred_flag
    pub constrained_intra_pred: bool,
    /// redundant_pic_cnt_present_flag
    pub redundant_pic_cnt_present: bool,
    /// transform_8x8_mode_flag
    pub transform_8x8_mode: bool,
}

impl Pps {
    /// 从完整 NAL 单元 (含 1 字节头部, 未去除防竞争字节) 解析
    pub fn from_nal(nal: &[u8]) -> TaoResult<Self> {
        match nal.first().map(|b| NalUnitType::from_type_id(b & 0x1F)) {
            Some(NalUnitType::Pps) => parse_pps(&remove_emulation_prevention(&nal[1..])),
            Some(other) => Err(TaoError::InvalidData(format!(
                "H.264: 期望 PPS NAL, 实际为 {}",
                other
            ))),
            None => Err(TaoError::InvalidData("H.264: PPS NAL 为空".into())),
        }
    }
}

/// 只读取 pic_parameter_set_id, 输入为完整 NAL 单元 (含 1 字节头部)
pub fn peek_pps_id(nal: &[u8]) -> TaoResult<u32> {
    let end = nal.len().min(ID_PEEK_BYTES);
    let rbsp = remove_emulation_prevention(nal.get(1..end).unwrap_or_default());
    BitReader::new(&rbsp).read_ue()
}

/// 从 RBSP 数据 (不含 NAL 头部) 解析 PPS
pub fn parse_pps(rbsp: &[u8]) -> TaoResult<Pps> {
    if rbsp.is_empty() {
        return Err(TaoError::InvalidData("H.264: PPS RBSP 为空".into()));
    }

    let mut br = BitReader::new(rbsp);
    let pps_id = br.read_ue()?;
    if pps_id > MAX_PPS_ID {
        return Err(TaoError::InvalidData(format!(
            "H.264: pps_id 超出范围, pps_id={}",
            pps_id
        )));
    }

    let sps_id = br.read_ue()?;
    if sps_id > MAX_SPS_ID {
        return Err(TaoError::InvalidData(format!(
            "H.264: PPS 引用的 sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }

    let entropy_coding_mode = br.read_flag()?;
    let pic_order_present = br.read_flag()?;

    let num_slice_groups_minus1 = br.read_ue()?;
    if num_slice_groups_minus1 > 7 {
        return Err(TaoError::InvalidData(format!(
            "H.264: num_slice_groups_minus1 超出范围, value={}",
            num_slice_groups_minus1
        )));
    }
    if num_slice_groups_minus1 > 0 {
        skip_slice_groups(&mut br, num_slice_groups_minus1)?;
    }

    let num_ref_idx_l0_default_active = read_num_ref_idx(&mut br, "l0")?;
    let num_ref_idx_l1_default_active = read_num_ref_idx(&mut br, "l1")?;

    let weighted_pred = br.read_flag()?;
    let weighted_bipred_idc = br.read_bits(2)?;
    if weighted_bipred_idc > 2 {
        return Err(TaoError::InvalidData(format!(
            "H.264: weighted_bipred_idc 非法, value={}",
            weighted_bipred_idc
        )));
    }

    let pic_init_qp = 26i32.saturating_add(br.read_se()?);
    if !(0..=51).contains(&pic_init_qp) {
        return Err(TaoError::InvalidData(format!(
            "H.264: pic_init_qp 超出范围, pic_init_qp={}",
            pic_init_qp
        )));
    }
    br.read_se()?; // pic_init_qs_minus26

    let chroma_qp_index_offset = br.read_se()?;
    if !(-12..=12).contains(&chroma_qp_index_offset) {
        return Err(TaoError::InvalidData(format!(
            "H.264: chroma_qp_index_offset 超出范围, value={}",
            chroma_qp_index_offset
        )));
    }

    let deblocking_filter_control = br.read_flag()?;
    let constrained_intra_pred = br.read_flag()?;
    let redundant_pic_cnt_present = br.read_flag()?;

    let transform_8x8_mode = br.more_rbsp_data() && br.read_flag()?;

    Ok(Pps {
        pps_id,
        sps_id,
        entropy_coding_mode,
        pic_order_present,
        num_slice_groups: num_slice_groups_minus1 + 1,
        num_ref_idx_l0_default_active,
        num_ref_idx_l1_default_active,
        weighted_pred,
        weighted_bipred_idc,
        pic_init_qp,
        chroma_qp_index_offset,
        deblocking_filter_control,
        constrained_intra_pred,
        redundant_pic_cnt_present,
        transform_8x8_mode,
    })
}

fn read_num_ref_idx(br: &mut BitReader, list: &str) -> TaoResult<u32> {
    let minus1 = br.read_ue()?;
    if minus1 > 31 {
        return Err(TaoError::InvalidData(format!(
            "H.264: num_ref_idx_{}_default_active_minus1 超出范围, value={}",
            list, minus1
        )));
    }
    Ok(minus1 + 1)
}

/// 跳过 slice group 相关语法
fn skip_slice_groups(br: &mut BitReader, num_slice_groups_minus1: u32) -> TaoResult<()> {
    let slice_group_map_type = br.read_ue()?;
    match slice_group_map_type {
        0 => {
            for _ in 0..=num_slice_groups_minus1 {
                br.read_ue()?; // run_length_minus1
            }
        }
        1 => {}
        2 => {
            for _ in 0..num_slice_groups_minus1 {
                br.read_ue()?; // top_left
                br.read_ue()?; // bottom_right
            }
        }
        3..=5 => {
            br.skip_bits(1)?; // slice_group_change_direction_flag
            br.read_ue()?; // slice_group_change_rate_minus1
        }
        6 => {
            let pic_size_in_map_units_minus1 = br.read_ue()?;
            let bits_per_id = u32::BITS - num_slice_groups_minus1.leading_zeros();
            let total = u64::from(pic_size_in_map_units_minus1 + 1) * u64::from(bits_per_id);
            if total > br.bits_left() as u64 {
                return Err(TaoError::Eof);
            }
            for _ in 0..=pic_size_in_map_units_minus1 {
                br.skip_bits(bits_per_id)?; // slice_group_id
            }
        }
        _ => {
            return Err(TaoError::InvalidData(format!(
                "H.264: slice_group_map_type 非法, value={}",
                slice_group_map_type
            )));
        }
    }
    Ok(())
}
