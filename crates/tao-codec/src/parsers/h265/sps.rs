//! HEVC 视频参数集与序列参数集.
//!
//! VPS 只取到 profile_tier_level. SPS 解析到 VUI 的 timing 为止,
//! 参考图像集和长期参考只做语法跳过, 以便后面的字段对齐.

use tao_core::bitreader::BitReader;
use tao_core::{Rational, TaoError, TaoResult};

use super::nal::HevcNalUnitType;
use crate::parsers::nal::remove_emulation_prevention;
use crate::parsers::read_aspect_ratio;

/// vps_video_parameter_set_id 最大值
pub const MAX_VPS_ID: u32 = 15;
/// sps_seq_parameter_set_id 最大值
pub const MAX_SPS_ID: u32 = 15;

/// 参考图像集中 delta POC 的最大数量
const MAX_DELTA_POCS: u32 = 16;
/// num_short_term_ref_pic_sets 最大值
const MAX_SHORT_TERM_RPS: u32 = 64;

/// profile_tier_level 中的 general 字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileTierLevel {
    /// general_profile_space
    pub profile_space: u8,
    /// general_tier_flag
    pub tier_flag: bool,
    /// general_profile_idc (1=Main, 2=Main10, 3=MainStillPicture, 4=RExt)
    pub profile_idc: u8,
    /// general_level_idc (level * 30)
    pub level_idc: u8,
}

/// VPS 解析结果
#[derive(Debug, Clone)]
pub struct HevcVps {
    pub vps_id: u8,
    /// vps_max_layers_minus1 + 1
    pub max_layers: u8,
    pub max_sub_layers: u8,
    pub temporal_id_nesting: bool,
    /// general profile/tier/level
    pub ptl: ProfileTierLevel,
}

impl HevcVps {
    /// 从完整 NAL 单元 (含 2 字节头部, 未去除防竞争字节) 解析
    pub fn from_nal(nal: &[u8]) -> TaoResult<Self> {
        check_nal_type(nal, HevcNalUnitType::Vps)?;
        parse_hevc_vps(&remove_emulation_prevention(&nal[2..]))
    }
}

/// SPS 解析结果
#[derive(Debug, Clone)]
pub struct HevcSps {
    /// sps_video_parameter_set_id, 对应的 VPS 不一定已缓存
    pub vps_id: u8,
    pub max_sub_layers: u8,
    pub sps_id: u32,
    /// general profile/tier/level
    pub ptl: ProfileTierLevel,
    pub chroma_format_idc: u32,
    pub separate_colour_plane: bool,
    pub bit_depth_luma: u32,
    pub bit_depth_chroma: u32,
    /// 扣除 conformance window 后的显示尺寸
    pub width: u32,
    pub height: u32,
    /// pic_width_in_luma_samples
    pub pic_width: u32,
    /// pic_height_in_luma_samples
    pub pic_height: u32,
    /// conformance window 裁剪 (亮度像素)
    pub conf_win_left: u32,
    pub conf_win_right: u32,
    pub conf_win_top: u32,
    pub conf_win_bottom: u32,
    /// log2_max_pic_order_cnt_lsb_minus4 + 4
    pub log2_max_poc_lsb: u32,
    /// 最高子层的 sps_max_dec_pic_buffering_minus1 + 1
    pub max_dec_pic_buffering: u32,
    /// 最高子层的 sps_max_num_reorder_pics
    pub max_num_reorder_pics: u32,
    /// num_short_term_ref_pic_sets
    pub num_short_term_ref_pic_sets: u32,
    /// time_scale / num_units_in_tick
    pub fps: Option<Rational>,
    /// SAR (Sample Aspect Ratio), VUI 未给出时为 `None`
    pub sar: Option<Rational>,
}

impl HevcSps {
    /// 从完整 NAL 单元 (含 2 字节头部, 未去除防竞争字节) 解析
    pub fn from_nal(nal: &[u8]) -> TaoResult<Self> {
        check_nal_type(nal, HevcNalUnitType::Sps)?;
        parse_hevc_sps(&remove_emulation_prevention(&nal[2..]))
    }
}

fn check_nal_type(nal: &[u8], expected: HevcNalUnitType) -> TaoResult<()> {
    if nal.len() < 3 {
        return Err(TaoError::InvalidData(format!(
            "HEVC: {} NAL 太短, len={}",
            expected,
            nal.len()
        )));
    }
    let actual = HevcNalUnitType::from_type_id((nal[0] >> 1) & 0x3F);
    if actual != expected {
        return Err(TaoError::InvalidData(format!(
            "HEVC: 期望 {} NAL, 实际为 {}",
            expected, actual
        )));
    }
    Ok(())
}

/// 解析 profile_tier_level(1, max_sub_layers - 1)
fn parse_profile_tier_level(br: &mut BitReader, max_sub_layers: u8) -> TaoResult<ProfileTierLevel> {
    let profile_space = br.read_bits(2)? as u8;
    let tier_flag = br.read_flag()?;
    let profile_idc = br.read_bits(5)? as u8;

    // general_profile_compatibility_flags (32 bits)
    br.skip_bits(32)?;
    // general_progressive_source_flag + interlaced + non_packed + frame_only
    br.skip_bits(4)?;
    // 43 位约束标志 + general_inbld_flag/reserved
    br.skip_bits(44)?;

    let level_idc = br.read_bits(8)? as u8;

    if max_sub_layers > 1 {
        let mut sub_layer_present = [(false, false); 7];
        for present in sub_layer_present.iter_mut().take(usize::from(max_sub_layers - 1)) {
            *present = (br.read_flag()?, br.read_flag()?);
        }
        for _ in max_sub_layers - 1..8 {
            br.skip_bits(2)?; // reserved_zero_2bits
        }
        for &(profile_present, level_present) in
            sub_layer_present.iter().take(usize::from(max_sub_layers - 1))
        {
            if profile_present {
                br.skip_bits(88)?; // sub_layer profile_space..inbld
            }
            if level_present {
                br.skip_bits(8)?; // sub_layer_level_idc
            }
        }
    }

    Ok(ProfileTierLevel {
        profile_space,
        tier_flag,
        profile_idc,
        level_idc,
    })
}

fn read_max_sub_layers(br: &mut BitReader) -> TaoResult<u8> {
    let max_sub_layers = br.read_bits(3)? as u8 + 1;
    if max_sub_layers > 7 {
        return Err(TaoError::InvalidData(format!(
            "HEVC: max_sub_layers 超出范围, value={}",
            max_sub_layers
        )));
    }
    Ok(max_sub_layers)
}

/// 只读取 vps_video_parameter_set_id (NAL 头部之后的高 4 位)
pub fn peek_vps_id(nal: &[u8]) -> TaoResult<u32> {
    nal.get(2)
        .map(|b| u32::from(b >> 4))
        .ok_or_else(|| TaoError::InvalidData("HEVC: VPS NAL 太短".into()))
}

/// 只读取 sps_seq_parameter_set_id
///
/// 该字段位于 profile_tier_level 之后, 需要先跳过 PTL.
pub fn peek_sps_id(nal: &[u8]) -> TaoResult<u32> {
    let rbsp = remove_emulation_prevention(nal.get(2..).unwrap_or_default());
    let mut br = BitReader::new(&rbsp);
    br.skip_bits(4)?; // sps_video_parameter_set_id
    let max_sub_layers = read_max_sub_layers(&mut br)?;
    br.skip_bits(1)?; // sps_temporal_id_nesting_flag
    parse_profile_tier_level(&mut br, max_sub_layers)?;
    br.read_ue()
}

/// 从 RBSP (不含 2 字节 NAL 头部, 已去除防竞争字节) 解析 HEVC VPS
pub fn parse_hevc_vps(rbsp: &[u8]) -> TaoResult<HevcVps> {
    if rbsp.len() < 2 {
        return Err(TaoError::InvalidData("HEVC: VPS RBSP 太短".into()));
    }

    let mut br = BitReader::new(rbsp);

    let vps_id = br.read_bits(4)? as u8;
    br.skip_bits(2)?; // vps_base_layer_internal_flag + vps_base_layer_available_flag
    let max_layers = br.read_bits(6)? as u8 + 1;
    let max_sub_layers = read_max_sub_layers(&mut br)?;
    let temporal_id_nesting = br.read_flag()?;
    br.skip_bits(16)?; // vps_reserved_0xffff_16bits

    let ptl = parse_profile_tier_level(&mut br, max_sub_layers)?;

    Ok(HevcVps {
        vps_id,
        max_layers,
        max_sub_layers,
        temporal_id_nesting,
        ptl,
    })
}

/// 从 RBSP (不含 2 字节 NAL 头部, 已去除防竞争字节) 解析 HEVC SPS
pub fn parse_hevc_sps(rbsp: &[u8]) -> TaoResult<HevcSps> {
    if rbsp.len() < 3 {
        return Err(TaoError::InvalidData("HEVC: SPS RBSP 太短".into()));
    }

    let mut br = BitReader::new(rbsp);

    let vps_id = br.read_bits(4)? as u8;
    let max_sub_layers = read_max_sub_layers(&mut br)?;
    br.skip_bits(1)?; // sps_temporal_id_nesting_flag

    let ptl = parse_profile_tier_level(&mut br, max_sub_layers)?;

    let sps_id = br.read_ue()?;
    if sps_id > MAX_SPS_ID {
        return Err(TaoError::InvalidData(format!(
            "HEVC: sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }

    let chroma_format_idc = br.read_ue()?;
    if chroma_format_idc > 3 {
        return Err(TaoError::InvalidData(format!(
            "HEVC: chroma_format_idc 非法, value={}",
            chroma_format_idc
        )));
    }
    let separate_colour_plane = chroma_format_idc == 3 && br.read_flag()?;

    let pic_width = br.read_ue()?;
    let pic_height = br.read_ue()?;
    if pic_width == 0 || pic_height == 0 {
        return Err(TaoError::InvalidData(format!(
            "HEVC: 图像尺寸非法, {}x{}",
            pic_width, pic_height
        )));
    }

    let (conf_win_left, conf_win_right, conf_win_top, conf_win_bottom) = if br.read_flag()? {
        (br.read_ue()?, br.read_ue()?, br.read_ue()?, br.read_ue()?)
    } else {
        (0, 0, 0, 0)
    };

    let bit_depth_luma = read_ue_max(&mut br, 8, "bit_depth_luma_minus8")? + 8;
    let bit_depth_chroma = read_ue_max(&mut br, 8, "bit_depth_chroma_minus8")? + 8;
    let log2_max_poc_lsb = read_ue_max(&mut br, 12, "log2_max_pic_order_cnt_lsb_minus4")? + 4;

    let sub_layer_ordering_info_present = br.read_flag()?;
    let first = if sub_layer_ordering_info_present {
        0
    } else {
        max_sub_layers - 1
    };
    let (mut max_dec_pic_buffering, mut max_num_reorder_pics) = (1, 0);
    for _ in first..max_sub_layers {
        max_dec_pic_buffering = br.read_ue()?.saturating_add(1);
        max_num_reorder_pics = br.read_ue()?;
        br.read_ue()?; // sps_max_latency_increase_plus1
    }

    br.read_ue()?; // log2_min_luma_coding_block_size_minus3
    br.read_ue()?; // log2_diff_max_min_luma_coding_block_size
    br.read_ue()?; // log2_min_luma_transform_block_size_minus2
    br.read_ue()?; // log2_diff_max_min_luma_transform_block_size
    br.read_ue()?; // max_transform_hierarchy_depth_inter
    br.read_ue()?; // max_transform_hierarchy_depth_intra

    // scaling_list
    if br.read_flag()? && br.read_flag()? {
        skip_scaling_list_data(&mut br)?;
    }

    br.skip_bits(1)?; // amp_enabled_flag
    br.skip_bits(1)?; // sample_adaptive_offset_enabled_flag

    // PCM
    if br.read_flag()? {
        br.skip_bits(4)?; // pcm_sample_bit_depth_luma_minus1
        br.skip_bits(4)?; // pcm_sample_bit_depth_chroma_minus1
        br.read_ue()?; // log2_min_pcm_luma_coding_block_size_minus3
        br.read_ue()?; // log2_diff_max_min_pcm_luma_coding_block_size
        br.skip_bits(1)?; // pcm_loop_filter_disabled_flag
    }

    let num_short_term_ref_pic_sets = br.read_ue()?;
    if num_short_term_ref_pic_sets > MAX_SHORT_TERM_RPS {
        return Err(TaoError::InvalidData(format!(
            "HEVC: num_short_term_ref_pic_sets 超出范围, value={}",
            num_short_term_ref_pic_sets
        )));
    }
    let mut num_delta_pocs = Vec::with_capacity(num_short_term_ref_pic_sets as usize);
    for idx in 0..num_short_term_ref_pic_sets as usize {
        let count = skip_short_term_ref_pic_set(&mut br, idx, &num_delta_pocs)?;
        num_delta_pocs.push(count);
    }

    if br.read_flag()? {
        // long_term_ref_pics_present_flag
        let num_long_term_ref_pics = br.read_ue()?;
        if num_long_term_ref_pics > 32 {
            return Err(TaoError::InvalidData(format!(
                "HEVC: num_long_term_ref_pics_sps 超出范围, value={}",
                num_long_term_ref_pics
            )));
        }
        for _ in 0..num_long_term_ref_pics {
            br.skip_bits(log2_max_poc_lsb)?; // lt_ref_pic_poc_lsb_sps
            br.skip_bits(1)?; // used_by_curr_pic_lt_sps_flag
        }
    }

    br.skip_bits(1)?; // sps_temporal_mvp_enabled_flag
    br.skip_bits(1)?; // strong_intra_smoothing_enabled_flag

    let (sar, fps) = if br.read_flag()? {
        parse_vui(&mut br)?
    } else {
        (None, None)
    };

    // conformance window 以色度采样为单位
    let sub_width_c: u32 = if matches!(chroma_format_idc, 1 | 2) && !separate_colour_plane {
        2
    } else {
        1
    };
    let sub_height_c: u32 = if chroma_format_idc == 1 && !separate_colour_plane {
        2
    } else {
        1
    };
    let scale = |a: u32, b: u32, unit: u32| a.checked_add(b).and_then(|v| v.checked_mul(unit));
    let (Some(crop_x), Some(crop_y)) = (
        scale(conf_win_left, conf_win_right, sub_width_c),
        scale(conf_win_top, conf_win_bottom, sub_height_c),
    ) else {
        return Err(TaoError::InvalidData("HEVC: 计算裁剪时发生溢出".into()));
    };
    if crop_x >= pic_width || crop_y >= pic_height {
        return Err(TaoError::InvalidData(format!(
            "HEVC: conformance window 非法, pic={}x{}, crop_x={}, crop_y={}",
            pic_width, pic_height, crop_x, crop_y
        )));
    }

    Ok(HevcSps {
        vps_id,
        max_sub_layers,
        sps_id,
        ptl,
        chroma_format_idc,
        separate_colour_plane,
        bit_depth_luma,
        bit_depth_chroma,
        width: pic_width - crop_x,
        height: pic_height - crop_y,
        pic_width,
        pic_height,
        conf_win_left: conf_win_left * sub_width_c,
        conf_win_right: conf_win_right * sub_width_c,
        conf_win_top: conf_win_top * sub_height_c,
        conf_win_bottom: conf_win_bottom * sub_height_c,
        log2_max_poc_lsb,
        max_dec_pic_buffering,
        max_num_reorder_pics,
        num_short_term_ref_pic_sets,
        fps,
        sar,
    })
}

/// 解析 VUI, 只保留 SAR 与帧率
///
/// timing_info 之后的 HRD 与 bitstream_restriction 不再读取.
fn parse_vui(br: &mut BitReader) -> TaoResult<(Option<Rational>, Option<Rational>)> {
    let sar = if br.read_flag()? {
        read_aspect_ratio(br, "HEVC")?
    } else {
        None
    };

    if br.read_flag()? {
        br.skip_bits(1)?; // overscan_appropriate_flag
    }

    if br.read_flag()? {
        br.skip_bits(3)?; // video_format
        br.skip_bits(1)?; // video_full_range_flag
        if br.read_flag()? {
            br.skip_bits(24)?; // colour_primaries, transfer_characteristics, matrix_coeffs
        }
    }

    if br.read_flag()? {
        br.read_ue()?; // chroma_sample_loc_type_top_field
        br.read_ue()?; // chroma_sample_loc_type_bottom_field
    }

    br.skip_bits(1)?; // neutral_chroma_indication_flag
    br.skip_bits(1)?; // field_seq_flag
    br.skip_bits(1)?; // frame_field_info_present_flag

    if br.read_flag()? {
        // default_display_window
        for _ in 0..4 {
            br.read_ue()?;
        }
    }

    let mut fps = None;
    if br.read_flag()? {
        let num_units_in_tick = br.read_bits(32)?;
        let time_scale = br.read_bits(32)?;
        if num_units_in_tick == 0 || time_scale == 0 {
            return Err(TaoError::InvalidData(format!(
                "HEVC: VUI timing_info 非法, num_units_in_tick={}, time_scale={}",
                num_units_in_tick, time_scale
            )));
        }
        // HEVC: fps = time_scale / num_units_in_tick
        fps = Rational::from_u32(time_scale, num_units_in_tick);
    }

    Ok((sar, fps))
}

fn read_ue_max(br: &mut BitReader, max: u32, field: &str) -> TaoResult<u32> {
    let value = br.read_ue()?;
    if value > max {
        return Err(TaoError::InvalidData(format!(
            "HEVC: {} 超出范围, value={}, max={}",
            field, value, max
        )));
    }
    Ok(value)
}

/// 跳过 scaling_list_data
fn skip_scaling_list_data(br: &mut BitReader) -> TaoResult<()> {
    for size_id in 0..4u32 {
        let step = if size_id == 3 { 3 } else { 1 };
        for _ in (0..6).step_by(step) {
            if br.read_flag()? {
                // scaling_list_pred_mode_flag=1: 显式系数
                let coef_num = 64.min(1u32 << (4 + (size_id << 1)));
                if size_id > 1 {
                    br.read_se()?; // scaling_list_dc_coef_minus8
                }
                for _ in 0..coef_num {
                    br.read_se()?; // scaling_list_delta_coef
                }
            } else {
                br.read_ue()?; // scaling_list_pred_matrix_id_delta
            }
        }
    }
    Ok(())
}

/// 跳过 SPS 中的第 `idx` 个 st_ref_pic_set, 返回其 delta POC 数量
///
/// `num_delta_pocs` 为已解析各组的 delta POC 数量, inter RPS 预测需要参考组的大小.
fn skip_short_term_ref_pic_set(
    br: &mut BitReader,
    idx: usize,
    num_delta_pocs: &[u32],
) -> TaoResult<u32> {
    let inter_ref_pic_set_prediction = idx > 0 && br.read_flag()?;

    if inter_ref_pic_set_prediction {
        // SPS 内 delta_idx_minus1 不出现, 参考组总是前一组
        let ref_count = num_delta_pocs[idx - 1];
        br.skip_bits(1)?; // delta_rps_sign
        let abs_delta_rps_minus1 = br.read_ue()?;
        if abs_delta_rps_minus1 > 0x7FFF {
            return Err(TaoError::InvalidData(format!(
                "HEVC: abs_delta_rps_minus1 超出范围, value={}",
                abs_delta_rps_minus1
            )));
        }
        let mut count = 0;
        for _ in 0..=ref_count {
            let used_by_curr_pic = br.read_flag()?;
            let use_delta = used_by_curr_pic || br.read_flag()?;
            if use_delta {
                count += 1;
            }
        }
        if count > MAX_DELTA_POCS {
            return Err(TaoError::InvalidData(format!(
                "HEVC: 参考图像集过大, idx={}, num_delta_pocs={}",
                idx, count
            )));
        }
        Ok(count)
    } else {
        let num_negative = br.read_ue()?;
        let num_positive = br.read_ue()?;
        if num_negative > MAX_DELTA_POCS || num_positive > MAX_DELTA_POCS - num_negative {
            return Err(TaoError::InvalidData(format!(
                "HEVC: 参考图像集过大, idx={}, negative={}, positive={}",
                idx, num_negative, num_positive
            )));
        }
        for _ in 0..num_negative + num_positive {
            br.read_ue()?; // delta_poc_minus1
            br.skip_bits(1)?; // used_by_curr_pic_flag
        }
        Ok(num_negative + num_positive)
    }
}
