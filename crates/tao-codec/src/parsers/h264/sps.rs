//! H.264 序列参数集.
//!
//! 适配器需要的字段: profile/level, 裁剪后的显示尺寸, 色度与位深,
//! 以及 VUI 中的宽高比、色彩描述、timing 和重排序深度.
//! 量化矩阵只做语法跳过.

use bitflags::bitflags;
use tao_core::bitreader::BitReader;
use tao_core::color::{ColorPrimaries, ColorRange, ColorSpace, ColorTransfer};
use tao_core::{Rational, TaoError, TaoResult};

use super::nal::NalUnitType;
use crate::parsers::nal::remove_emulation_prevention;
use crate::parsers::read_aspect_ratio;

/// seq_parameter_set_id 最大值
pub const MAX_SPS_ID: u32 = 31;

/// H.264 Profile: Baseline
pub const PROFILE_BASELINE: u8 = 66;
/// H.264 Profile: Main
pub const PROFILE_MAIN: u8 = 77;
/// H.264 Profile: Extended
pub const PROFILE_EXTENDED: u8 = 88;
/// H.264 Profile: High
pub const PROFILE_HIGH: u8 = 100;

bitflags! {
    /// constraint_set0..5_flag
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConstraintFlags: u8 {
        /// constraint_set0_flag
        const SET0 = 0x80;
        /// constraint_set1_flag
        const SET1 = 0x40;
        /// constraint_set2_flag
        const SET2 = 0x20;
        /// constraint_set3_flag (Level 1b 或 intra-only)
        const SET3 = 0x10;
        /// constraint_set4_flag
        const SET4 = 0x08;
        /// constraint_set5_flag
        const SET5 = 0x04;
    }
}

/// VUI 色彩描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSignal {
    /// video_format (5=未指定)
    pub video_format: u8,
    /// video_full_range_flag
    pub full_range: bool,
    /// colour_primaries 码点
    pub colour_primaries: u8,
    /// transfer_characteristics 码点
    pub transfer_characteristics: u8,
    /// matrix_coefficients 码点
    pub matrix_coefficients: u8,
}

impl Default for VideoSignal {
    fn default() -> Self {
        // 缺省值: 未指定
        Self {
            video_format: 5,
            full_range: false,
            colour_primaries: 2,
            transfer_characteristics: 2,
            matrix_coefficients: 2,
        }
    }
}

/// VUI timing_info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    /// num_units_in_tick
    pub num_units_in_tick: u32,
    /// time_scale
    pub time_scale: u32,
    /// fixed_frame_rate_flag
    pub fixed_frame_rate: bool,
}

/// VUI bitstream_restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitstreamRestriction {
    /// max_num_reorder_frames
    pub max_num_reorder_frames: u32,
    /// max_dec_frame_buffering
    pub max_dec_frame_buffering: u32,
}

/// VUI 参数 (仅保留适配层需要的字段)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vui {
    /// 像素宽高比, 未指定时为 `None`
    pub sar: Option<Rational>,
    /// 色彩描述
    pub video_signal: VideoSignal,
    /// 帧率时间信息
    pub timing: Option<TimingInfo>,
    /// 码流约束
    pub bitstream_restriction: Option<BitstreamRestriction>,
}

/// SPS 解析结果
#[derive(Debug, Clone)]
pub struct Sps {
    pub profile_idc: u8,
    pub constraint_flags: ConstraintFlags,
    /// 10 倍的 level 值, 9 表示 Level 1b
    pub level_idc: u8,
    pub sps_id: u32,
    /// 0 为单色, 1..=3 依次为 4:2:0 / 4:2:2 / 4:4:4
    pub chroma_format_idc: u32,
    pub separate_colour_plane: bool,
    pub bit_depth_luma: u32,
    pub bit_depth_chroma: u32,
    pub log2_max_frame_num: u32,
    pub poc_type: u32,
    pub max_num_ref_frames: u32,
    /// 宏块列数
    pub pic_width_in_mbs: u32,
    /// 场编码时为半帧的宏块行数
    pub pic_height_in_map_units: u32,
    pub frame_mbs_only: bool,
    /// 宏块对齐的解码尺寸
    pub coded_width: u32,
    pub coded_height: u32,
    /// 扣除裁剪后的显示尺寸
    pub width: u32,
    pub height: u32,
    /// 以像素计的裁剪量
    pub crop_left: u32,
    pub crop_right: u32,
    pub crop_top: u32,
    pub crop_bottom: u32,
    pub vui: Option<Vui>,
}

/// 各 level 的 MaxDpbMbs (ITU-T H.264 表 A-1)
///
/// level_idc 9 表示 Level 1b.
const LEVEL_MAX_DPB_MBS: [(u8, u32); 20] = [
    (9, 396),
    (10, 396),
    (11, 900),
    (12, 2376),
    (13, 2376),
    (20, 2376),
    (21, 4752),
    (22, 8100),
    (30, 8100),
    (31, 18000),
    (32, 20480),
    (40, 32768),
    (41, 32768),
    (42, 34816),
    (50, 110400),
    (51, 184320),
    (52, 184320),
    (60, 696320),
    (61, 696320),
    (62, 696320),
];

/// DPB 帧数上限
const MAX_DPB_FRAMES: u32 = 16;

/// 读取 seq_parameter_set_id 所需的 NAL 前缀长度
const ID_PEEK_BYTES: usize = 16;

impl Sps {
    /// 从完整 NAL 单元 (含 1 字节头部, 未去除防竞争字节) 解析
    pub fn from_nal(nal: &[u8]) -> TaoResult<Self> {
        match nal.first().map(|b| NalUnitType::from_type_id(b & 0x1F)) {
            Some(NalUnitType::Sps) => parse_sps(&remove_emulation_prevention(&nal[1..])),
            Some(other) => Err(TaoError::InvalidData(format!(
                "H.264: 期望 SPS NAL, 实际为 {}",
                other
            ))),
            None => Err(TaoError::InvalidData("H.264: SPS NAL 为空".into())),
        }
    }

    /// 帧高度 (宏块)
    pub fn frame_height_in_mbs(&self) -> u32 {
        self.pic_height_in_map_units
            .saturating_mul(if self.frame_mbs_only { 1 } else { 2 })
    }

    /// 像素宽高比, VUI 未给出时为 1:1
    pub fn sar(&self) -> Rational {
        self.vui
            .as_ref()
            .and_then(|vui| vui.sar)
            .unwrap_or(Rational::new(1, 1))
    }

    /// 帧率 (time_scale / (2 * num_units_in_tick))
    pub fn frame_rate(&self) -> Option<Rational> {
        let timing = self.vui.as_ref()?.timing?;
        Rational::from_u32(timing.time_scale, timing.num_units_in_tick.checked_mul(2)?)
    }

    /// level_idc 对应的 MaxDpbMbs
    ///
    /// Baseline/Main/Extended 的 level 11 且 constraint_set3 置位时为 Level 1b.
    fn max_dpb_mbs(&self) -> Option<u32> {
        let is_level_1b = self.level_idc == 11
            && self.constraint_flags.contains(ConstraintFlags::SET3)
            && matches!(
                self.profile_idc,
                PROFILE_BASELINE | PROFILE_MAIN | PROFILE_EXTENDED
            );
        let level = if is_level_1b { 9 } else { self.level_idc };
        LEVEL_MAX_DPB_MBS
            .iter()
            .find(|(idc, _)| *idc == level)
            .map(|(_, mbs)| *mbs)
    }

    /// 按 level 推算的最大 DPB 帧数 (上限 16)
    pub fn max_dpb_frames(&self) -> u32 {
        let frame_mbs = self
            .pic_width_in_mbs
            .saturating_mul(self.frame_height_in_mbs());
        match self.max_dpb_mbs() {
            Some(max_mbs) if frame_mbs > 0 => (max_mbs / frame_mbs).min(MAX_DPB_FRAMES),
            _ => MAX_DPB_FRAMES,
        }
    }

    /// DPB 深度与输出延迟 (帧)
    ///
    /// 返回 `(max_dec_frame_buffering, max_num_reorder_frames)`.
    pub fn dpb_values(&self) -> (u32, u32) {
        if let Some(restriction) = self.vui.as_ref().and_then(|vui| vui.bitstream_restriction) {
            let depth = restriction.max_dec_frame_buffering;
            return (depth, restriction.max_num_reorder_frames.min(depth));
        }

        let max_dpb = self.max_dpb_frames();
        match self.profile_idc {
            // 只有 I/P 帧, 无需重排序
            PROFILE_BASELINE => (max_dpb, 0),
            // CAVLC 4:4:4 Intra 与 High 系列的 intra-only 码流
            44 | 86 | PROFILE_HIGH | 110 | 122 | 244
                if self.constraint_flags.contains(ConstraintFlags::SET3) =>
            {
                (0, 0)
            }
            _ => (max_dpb, max_dpb),
        }
    }

    /// 色彩描述, 无 VUI 时为 `None`
    pub fn colorimetry(&self) -> Option<(ColorPrimaries, ColorTransfer, ColorSpace, ColorRange)> {
        let signal = self.vui.as_ref()?.video_signal;
        Some((
            ColorPrimaries::from_iso_code(signal.colour_primaries),
            ColorTransfer::from_iso_code(signal.transfer_characteristics),
            ColorSpace::from_iso_code(signal.matrix_coefficients),
            ColorRange::from_full_range_flag(signal.full_range),
        ))
    }
}

/// 只读取 seq_parameter_set_id, 不解析 SPS 其余部分
///
/// 输入为完整 NAL 单元 (含 1 字节头部).
pub fn peek_sps_id(nal: &[u8]) -> TaoResult<u32> {
    let end = nal.len().min(ID_PEEK_BYTES);
    let rbsp = remove_emulation_prevention(nal.get(1..end).unwrap_or_default());
    let mut br = BitReader::new(&rbsp);
    br.skip_bits(24)?; // profile_idc + constraint_set flags + level_idc
    br.read_ue()
}

/// 从 RBSP 数据 (不含 NAL 头部) 解析 SPS
pub fn parse_sps(rbsp: &[u8]) -> TaoResult<Sps> {
    if rbsp.len() < 3 {
        return Err(TaoError::InvalidData("H.264: SPS RBSP 太短".into()));
    }

    let mut br = BitReader::new(rbsp);

    let profile_idc = br.read_bits(8)? as u8;
    let constraint_flags = ConstraintFlags::from_bits_truncate(br.read_bits(8)? as u8);
    let level_idc = br.read_bits(8)? as u8;
    let sps_id = read_ue_max(&mut br, MAX_SPS_ID, "sps_id")?;

    // 其余 profile 隐含 4:2:0 8bit
    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    let mut bit_depth_luma = 8;
    let mut bit_depth_chroma = 8;

    if is_high_profile(profile_idc) {
        chroma_format_idc = read_ue_max(&mut br, 3, "chroma_format_idc")?;
        if chroma_format_idc == 3 {
            separate_colour_plane = br.read_flag()?;
        }
        // 位深 8..=14
        bit_depth_luma = read_ue_max(&mut br, 6, "bit_depth_luma_minus8")? + 8;
        bit_depth_chroma = read_ue_max(&mut br, 6, "bit_depth_chroma_minus8")? + 8;
        // qpprime_y_zero_transform_bypass_flag
        br.skip_bits(1)?;

        let seq_scaling_matrix_present = br.read_flag()?;
        if seq_scaling_matrix_present {
            let list_count = if chroma_format_idc == 3 { 12 } else { 8 };
            for list_idx in 0..list_count {
                let present = br.read_flag()?;
                if present {
                    // 前 6 个为 4x4 列表
                    skip_scaling_list(&mut br, if list_idx < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let log2_max_frame_num = read_ue_max(&mut br, 12, "log2_max_frame_num_minus4")? + 4;

    let poc_type = br.read_ue()?;
    match poc_type {
        0 => {
            read_ue_max(&mut br, 12, "log2_max_pic_order_cnt_lsb_minus4")?;
        }
        1 => {
            // delta_pic_order_always_zero_flag, offset_for_non_ref_pic, offset_for_top_to_bottom_field
            br.skip_bits(1)?;
            br.read_se()?;
            br.read_se()?;
            let cycle_len = read_ue_max(&mut br, 255, "num_ref_frames_in_pic_order_cnt_cycle")?;
            for _ in 0..cycle_len {
                br.read_se()?;
            }
        }
        2 => {}
        _ => {
            return Err(TaoError::InvalidData(format!(
                "H.264: pic_order_cnt_type 非法, value={}",
                poc_type
            )));
        }
    }

    let max_num_ref_frames = read_ue_max(&mut br, MAX_DPB_FRAMES, "max_num_ref_frames")?;
    // gaps_in_frame_num_value_allowed_flag
    br.skip_bits(1)?;

    let pic_width_in_mbs = br.read_ue()? + 1;
    let pic_height_in_map_units = br.read_ue()? + 1;

    let frame_mbs_only = br.read_flag()?;
    // mb_adaptive_frame_field_flag 与 direct_8x8_inference_flag
    br.skip_bits(if frame_mbs_only { 1 } else { 2 })?;

    let frame_cropping = br.read_flag()?;
    let [crop_left, crop_right, crop_top, crop_bottom] = if frame_cropping {
        [br.read_ue()?, br.read_ue()?, br.read_ue()?, br.read_ue()?]
    } else {
        [0; 4]
    };

    let chroma_array_type = if separate_colour_plane {
        0
    } else {
        chroma_format_idc
    };
    let (crop_unit_x, crop_unit_y) = cropping_unit(chroma_array_type, frame_mbs_only);
    let coded_width = pic_width_in_mbs
        .checked_mul(16)
        .ok_or_else(|| TaoError::InvalidData("H.264: 计算宽度时发生溢出".into()))?;
    let coded_height = pic_height_in_map_units
        .checked_mul(if frame_mbs_only { 16 } else { 32 })
        .ok_or_else(|| TaoError::InvalidData("H.264: 计算高度时发生溢出".into()))?;
    let scale = |a: u32, b: u32, unit: u32| a.checked_add(b).and_then(|v| v.checked_mul(unit));
    let (Some(crop_x), Some(crop_y)) = (
        scale(crop_left, crop_right, crop_unit_x),
        scale(crop_top, crop_bottom, crop_unit_y),
    ) else {
        return Err(TaoError::InvalidData("H.264: 计算裁剪时发生溢出".into()));
    };
    if crop_x >= coded_width || crop_y >= coded_height {
        return Err(TaoError::InvalidData(format!(
            "H.264: 裁剪参数非法, coded={}x{}, crop_x={}, crop_y={}",
            coded_width, coded_height, crop_x, crop_y
        )));
    }

    let vui = if br.read_flag()? {
        Some(parse_vui(&mut br)?)
    } else {
        None
    };

    Ok(Sps {
        profile_idc,
        constraint_flags,
        level_idc,
        sps_id,
        chroma_format_idc,
        separate_colour_plane,
        bit_depth_luma,
        bit_depth_chroma,
        log2_max_frame_num,
        poc_type,
        max_num_ref_frames,
        pic_width_in_mbs,
        pic_height_in_map_units,
        frame_mbs_only,
        coded_width,
        coded_height,
        width: coded_width - crop_x,
        height: coded_height - crop_y,
        crop_left: crop_left * crop_unit_x,
        crop_right: crop_right * crop_unit_x,
        crop_top: crop_top * crop_unit_y,
        crop_bottom: crop_bottom * crop_unit_y,
        vui,
    })
}

/// 读取 ue(v) 并检查上限
fn read_ue_max(br: &mut BitReader, max: u32, field: &str) -> TaoResult<u32> {
    let value = br.read_ue()?;
    if value > max {
        return Err(TaoError::InvalidData(format!(
            "H.264: {} 超出范围, value={}, max={}",
            field, value, max
        )));
    }
    Ok(value)
}

/// SPS 中带 chroma_format_idc 等扩展字段的 profile
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    )
}

/// frame_crop_*_offset 的单位 (CropUnitX, CropUnitY)
fn cropping_unit(chroma_array_type: u32, frame_mbs_only: bool) -> (u32, u32) {
    // (SubWidthC, SubHeightC), 单色与 4:4:4 不做色度下采样
    let (sub_width, sub_height) = match chroma_array_type {
        1 => (2, 2),
        2 => (2, 1),
        _ => (1, 1),
    };
    let field_factor = 2 - u32::from(frame_mbs_only);
    (sub_width, sub_height * field_factor)
}

/// 跳过 scaling_list() 语法
fn skip_scaling_list(br: &mut BitReader, size: usize) -> TaoResult<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = br.read_se()?;
            next_scale = last_scale.wrapping_add(delta_scale).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

/// 跳过 hrd_parameters() 语法
fn skip_hrd_parameters(br: &mut BitReader) -> TaoResult<()> {
    let cpb_count = read_ue_max(br, 31, "cpb_cnt_minus1")? + 1;
    // bit_rate_scale, cpb_size_scale
    br.skip_bits(8)?;
    for _ in 0..cpb_count {
        // bit_rate_value_minus1, cpb_size_value_minus1, cbr_flag
        br.read_ue()?;
        br.read_ue()?;
        br.skip_bits(1)?;
    }
    // initial_cpb_removal_delay_length_minus1, cpb_removal_delay_length_minus1,
    // dpb_output_delay_length_minus1, time_offset_length
    br.skip_bits(20)
}

/// 解析 VUI 参数
fn parse_vui(br: &mut BitReader) -> TaoResult<Vui> {
    let aspect_ratio_info_present = br.read_flag()?;
    let sar = if aspect_ratio_info_present {
        read_aspect_ratio(br, "H.264")?
    } else {
        None
    };

    let overscan_info_present = br.read_flag()?;
    if overscan_info_present {
        br.skip_bits(1)?;
    }

    let mut video_signal = VideoSignal::default();
    let video_signal_type_present = br.read_flag()?;
    if video_signal_type_present {
        video_signal.video_format = br.read_bits(3)? as u8;
        video_signal.full_range = br.read_flag()?;
        let colour_description_present = br.read_flag()?;
        if colour_description_present {
            let [primaries, transfer, matrix] =
                [br.read_bits(8)?, br.read_bits(8)?, br.read_bits(8)?].map(|v| v as u8);
            video_signal.colour_primaries = primaries;
            video_signal.transfer_characteristics = transfer;
            video_signal.matrix_coefficients = matrix;
        }
    }

    let chroma_loc_info_present = br.read_flag()?;
    if chroma_loc_info_present {
        // 顶场与底场的 chroma_sample_loc_type
        br.read_ue()?;
        br.read_ue()?;
    }

    let mut timing = None;
    let timing_info_present = br.read_flag()?;
    if timing_info_present {
        let num_units_in_tick = br.read_bits(32)?;
        let time_scale = br.read_bits(32)?;
        let fixed_frame_rate = br.read_flag()?;
        if num_units_in_tick == 0 || time_scale == 0 {
            return Err(TaoError::InvalidData(format!(
                "H.264: VUI timing_info 非法, num_units_in_tick={}, time_scale={}",
                num_units_in_tick, time_scale
            )));
        }
        timing = Some(TimingInfo {
            num_units_in_tick,
            time_scale,
            fixed_frame_rate,
        });
    }

    let nal_hrd = br.read_flag()?;
    if nal_hrd {
        skip_hrd_parameters(br)?;
    }
    let vcl_hrd = br.read_flag()?;
    if vcl_hrd {
        skip_hrd_parameters(br)?;
    }
    // low_delay_hrd_flag 仅在有 HRD 时出现, 之后是 pic_struct_present_flag
    br.skip_bits(if nal_hrd || vcl_hrd { 2 } else { 1 })?;

    let mut bitstream_restriction = None;
    let bitstream_restriction_present = br.read_flag()?;
    if bitstream_restriction_present {
        // motion_vectors_over_pic_boundaries_flag 及四个运动矢量/码率上限
        br.skip_bits(1)?;
        for _ in 0..4 {
            br.read_ue()?;
        }
        let max_num_reorder_frames = br.read_ue()?;
        let max_dec_frame_buffering =
            read_ue_max(br, MAX_DPB_FRAMES, "max_dec_frame_buffering")?;
        bitstream_restriction = Some(BitstreamRestriction {
            max_num_reorder_frames,
            max_dec_frame_buffering,
        });
    }

    Ok(Vui {
        sar,
        video_signal,
        timing,
        bitstream_restriction,
    })
}
