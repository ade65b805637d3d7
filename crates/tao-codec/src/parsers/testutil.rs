//! 单元测试用码流构造器.
//!
//! 按语法顺序写出 H.264 / HEVC 参数集与 slice 头部, 生成带防竞争字节的完整 NAL.

use tao_core::bitwriter::BitWriter;

use super::nal::add_emulation_prevention;

/// 构造 NAL: 头部 + 插入防竞争字节后的 RBSP
fn finish_nal(header: &[u8], bw: BitWriter) -> Vec<u8> {
    let mut nal = header.to_vec();
    nal.extend_from_slice(&add_emulation_prevention(&bw.finish()));
    nal
}

/// 以 4 字节起始码拼接 Annex B 码流
pub(crate) fn annex_b(nals: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(nal);
    }
    out
}

/// 以 `length_size` 字节大端长度前缀拼接码流
pub(crate) fn length_prefixed(nals: &[&[u8]], length_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        let len = (nal.len() as u32).to_be_bytes();
        out.extend_from_slice(&len[4 - length_size..]);
        out.extend_from_slice(nal);
    }
    out
}

// ============================================================
// H.264
// ============================================================

/// VUI 字段选项
#[derive(Debug, Clone, Default)]
pub(crate) struct VuiOptions {
    /// aspect_ratio_idc, `None` 表示不写 aspect_ratio_info
    pub aspect_ratio_idc: Option<u8>,
    /// idc=255 时写入的 (sar_width, sar_height)
    pub extended_sar: (u32, u32),
    /// (colour_primaries, transfer, matrix, full_range)
    pub colour: Option<(u8, u8, u8, bool)>,
    /// (num_units_in_tick, time_scale)
    pub timing: Option<(u32, u32)>,
    /// 是否写入一组 NAL HRD 参数
    pub nal_hrd: bool,
    /// (max_num_reorder_frames, max_dec_frame_buffering)
    pub reorder: Option<(u32, u32)>,
}

/// H.264 SPS 构造器
#[derive(Debug, Clone)]
pub(crate) struct H264SpsBuilder {
    sps_id: u32,
    width: u32,
    height: u32,
    profile_idc: u8,
    constraint_flags: u8,
    level_idc: u8,
    bit_depth_minus8: u32,
    vui: Option<VuiOptions>,
}

impl H264SpsBuilder {
    /// 默认 Baseline, level 3.0, 无 VUI
    pub fn new(sps_id: u32, width: u32, height: u32) -> Self {
        Self {
            sps_id,
            width,
            height,
            profile_idc: 66,
            constraint_flags: 0x00,
            level_idc: 30,
            bit_depth_minus8: 0,
            vui: None,
        }
    }

    pub fn profile(mut self, profile_idc: u8, constraint_flags: u8, level_idc: u8) -> Self {
        self.profile_idc = profile_idc;
        self.constraint_flags = constraint_flags;
        self.level_idc = level_idc;
        self
    }

    /// 亮度与色度共用, 仅 High 系列 profile 写出
    pub fn bit_depth_minus8(mut self, value: u32) -> Self {
        self.bit_depth_minus8 = value;
        self
    }

    pub fn vui(mut self, vui: VuiOptions) -> Self {
        self.vui = Some(vui);
        self
    }

    /// 不含 NAL 头部的 RBSP
    pub fn rbsp(&self) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(u32::from(self.profile_idc), 8);
        bw.write_bits(u32::from(self.constraint_flags), 8);
        bw.write_bits(u32::from(self.level_idc), 8);
        bw.write_ue(self.sps_id);

        if matches!(
            self.profile_idc,
            100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
        ) {
            bw.write_ue(1); // chroma_format_idc = 4:2:0
            bw.write_ue(self.bit_depth_minus8); // bit_depth_luma_minus8
            bw.write_ue(self.bit_depth_minus8); // bit_depth_chroma_minus8
            bw.write_flag(false); // qpprime_y_zero_transform_bypass_flag
            bw.write_flag(false); // seq_scaling_matrix_present_flag
        }

        bw.write_ue(0); // log2_max_frame_num_minus4
        bw.write_ue(0); // pic_order_cnt_type
        bw.write_ue(0); // log2_max_pic_order_cnt_lsb_minus4
        bw.write_ue(1); // max_num_ref_frames
        bw.write_flag(false); // gaps_in_frame_num_value_allowed_flag

        let mbs_w = self.width.div_ceil(16);
        let mbs_h = self.height.div_ceil(16);
        bw.write_ue(mbs_w - 1);
        bw.write_ue(mbs_h - 1);
        bw.write_flag(true); // frame_mbs_only_flag
        bw.write_flag(true); // direct_8x8_inference_flag

        let (raw_w, raw_h) = (mbs_w * 16, mbs_h * 16);
        if raw_w != self.width || raw_h != self.height {
            bw.write_flag(true);
            bw.write_ue(0);
            bw.write_ue((raw_w - self.width) / 2);
            bw.write_ue(0);
            bw.write_ue((raw_h - self.height) / 2);
        } else {
            bw.write_flag(false);
        }

        match &self.vui {
            Some(vui) => {
                bw.write_flag(true);
                write_h264_vui(&mut bw, vui);
            }
            None => bw.write_flag(false),
        }

        bw.write_rbsp_trailing_bits();
        bw.finish()
    }

    /// 完整 NAL (nal_ref_idc=3, type=7)
    pub fn nal(&self) -> Vec<u8> {
        let mut nal = vec![0x67];
        nal.extend_from_slice(&add_emulation_prevention(&self.rbsp()));
        nal
    }
}

fn write_h264_vui(bw: &mut BitWriter, vui: &VuiOptions) {
    match vui.aspect_ratio_idc {
        Some(idc) => {
            bw.write_flag(true);
            bw.write_bits(u32::from(idc), 8);
            if idc == 255 {
                bw.write_bits(vui.extended_sar.0, 16);
                bw.write_bits(vui.extended_sar.1, 16);
            }
        }
        None => bw.write_flag(false),
    }

    bw.write_flag(false); // overscan_info_present_flag

    match vui.colour {
        Some((primaries, transfer, matrix, full_range)) => {
            bw.write_flag(true);
            bw.write_bits(5, 3); // video_format
            bw.write_flag(full_range);
            bw.write_flag(true); // colour_description_present_flag
            bw.write_bits(u32::from(primaries), 8);
            bw.write_bits(u32::from(transfer), 8);
            bw.write_bits(u32::from(matrix), 8);
        }
        None => bw.write_flag(false),
    }

    bw.write_flag(false); // chroma_loc_info_present_flag

    match vui.timing {
        Some((num_units_in_tick, time_scale)) => {
            bw.write_flag(true);
            bw.write_bits(num_units_in_tick, 32);
            bw.write_bits(time_scale, 32);
            bw.write_flag(true); // fixed_frame_rate_flag
        }
        None => bw.write_flag(false),
    }

    bw.write_flag(vui.nal_hrd);
    if vui.nal_hrd {
        bw.write_ue(0); // cpb_cnt_minus1
        bw.write_bits(0, 8); // bit_rate_scale + cpb_size_scale
        bw.write_ue(1000);
        bw.write_ue(2000);
        bw.write_flag(false); // cbr_flag
        bw.write_bits(0, 20);
    }
    bw.write_flag(false); // vcl_hrd_parameters_present_flag
    if vui.nal_hrd {
        bw.write_flag(false); // low_delay_hrd_flag
    }
    bw.write_flag(false); // pic_struct_present_flag

    match vui.reorder {
        Some((max_num_reorder_frames, max_dec_frame_buffering)) => {
            bw.write_flag(true);
            bw.write_flag(true); // motion_vectors_over_pic_boundaries_flag
            bw.write_ue(0);
            bw.write_ue(0);
            bw.write_ue(16);
            bw.write_ue(16);
            bw.write_ue(max_num_reorder_frames);
            bw.write_ue(max_dec_frame_buffering);
        }
        None => bw.write_flag(false),
    }
}

/// H.264 PPS NAL (CAVLC, 单 slice group)
pub(crate) fn h264_pps_nal(pps_id: u32, sps_id: u32) -> Vec<u8> {
    h264_pps_nal_qp(pps_id, sps_id, 0)
}

/// 指定 pic_init_qp_minus26 的 H.264 PPS NAL
pub(crate) fn h264_pps_nal_qp(pps_id: u32, sps_id: u32, init_qp_minus26: i32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_ue(pps_id);
    bw.write_ue(sps_id);
    bw.write_flag(false); // entropy_coding_mode_flag
    bw.write_flag(false); // bottom_field_pic_order_in_frame_present_flag
    bw.write_ue(0); // num_slice_groups_minus1
    bw.write_ue(0); // num_ref_idx_l0_default_active_minus1
    bw.write_ue(0); // num_ref_idx_l1_default_active_minus1
    bw.write_flag(false); // weighted_pred_flag
    bw.write_bits(0, 2); // weighted_bipred_idc
    bw.write_se(init_qp_minus26); // pic_init_qp_minus26
    bw.write_se(0); // pic_init_qs_minus26
    bw.write_se(0); // chroma_qp_index_offset
    bw.write_flag(true); // deblocking_filter_control_present_flag
    bw.write_flag(false); // constrained_intra_pred_flag
    bw.write_flag(false); // redundant_pic_cnt_present_flag
    bw.write_rbsp_trailing_bits();
    finish_nal(&[0x68], bw)
}

/// H.264 slice NAL (IDR 为 I slice, 否则 P slice), 附带少量伪造的宏块数据
pub(crate) fn h264_slice_nal(idr: bool, pps_id: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_ue(0); // first_mb_in_slice
    bw.write_ue(if idr { 7 } else { 5 }); // slice_type
    bw.write_ue(pps_id);
    bw.write_bits(0, 4); // frame_num
    if idr {
        bw.write_ue(0); // idr_pic_id
    }
    bw.write_bits(0, 4); // pic_order_cnt_lsb
    bw.write_bits(0xB5A5, 16);
    bw.write_rbsp_trailing_bits();
    finish_nal(if idr { &[0x65] } else { &[0x41] }, bw)
}

// ============================================================
// HEVC
// ============================================================

/// 写入 profile_tier_level(1, max_sub_layers - 1)
fn write_hevc_ptl(bw: &mut BitWriter, profile_idc: u8, level_idc: u8, max_sub_layers: u8) {
    bw.write_bits(0, 2); // general_profile_space
    bw.write_flag(false); // general_tier_flag
    bw.write_bits(u32::from(profile_idc), 5);
    bw.write_bits(1 << (31 - u32::from(profile_idc & 0x1F)), 32);
    bw.write_bits(0b1001, 4); // progressive, interlaced, non_packed, frame_only
    bw.write_bits(0, 32);
    bw.write_bits(0, 12);
    bw.write_bits(u32::from(level_idc), 8);
    if max_sub_layers > 1 {
        for _ in 0..max_sub_layers - 1 {
            bw.write_flag(false); // sub_layer_profile_present_flag
            bw.write_flag(false); // sub_layer_level_present_flag
        }
        for _ in max_sub_layers - 1..8 {
            bw.write_bits(0, 2); // reserved_zero_2bits
        }
    }
}

/// HEVC VPS NAL (Main profile, level 3.1, 单层)
pub(crate) fn hevc_vps_nal(vps_id: u8) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(u32::from(vps_id), 4);
    bw.write_flag(true); // vps_base_layer_internal_flag
    bw.write_flag(true); // vps_base_layer_available_flag
    bw.write_bits(0, 6); // vps_max_layers_minus1
    bw.write_bits(0, 3); // vps_max_sub_layers_minus1
    bw.write_flag(true); // vps_temporal_id_nesting_flag
    bw.write_bits(0xFFFF, 16);
    write_hevc_ptl(&mut bw, 1, 93, 1);
    bw.write_flag(true); // vps_sub_layer_ordering_info_present_flag
    bw.write_ue(4);
    bw.write_ue(2);
    bw.write_ue(0);
    bw.write_bits(0, 6); // vps_max_layer_id
    bw.write_ue(0); // vps_num_layer_sets_minus1
    bw.write_flag(false); // vps_timing_info_present_flag
    bw.write_flag(false); // vps_extension_flag
    bw.write_rbsp_trailing_bits();
    finish_nal(&[0x40, 0x01], bw)
}

/// HEVC SPS 构造器
#[derive(Debug, Clone)]
pub(crate) struct HevcSpsBuilder {
    vps_id: u8,
    sps_id: u32,
    width: u32,
    height: u32,
    profile_idc: u8,
    level_idc: u8,
    max_sub_layers: u8,
    chroma_format_idc: u32,
    bit_depth_minus8: u32,
    short_term_rps: bool,
    long_term_refs: bool,
    aspect_ratio_idc: Option<u8>,
    timing: Option<(u32, u32)>,
}

impl HevcSpsBuilder {
    /// 默认 Main profile, level 3.1, 4:2:0, 无 VUI
    pub fn new(sps_id: u32, width: u32, height: u32) -> Self {
        Self {
            vps_id: 0,
            sps_id,
            width,
            height,
            profile_idc: 1,
            level_idc: 93,
            max_sub_layers: 1,
            chroma_format_idc: 1,
            bit_depth_minus8: 0,
            short_term_rps: false,
            long_term_refs: false,
            aspect_ratio_idc: None,
            timing: None,
        }
    }

    pub fn vps_id(mut self, vps_id: u8) -> Self {
        self.vps_id = vps_id;
        self
    }

    pub fn profile(mut self, profile_idc: u8, level_idc: u8) -> Self {
        self.profile_idc = profile_idc;
        self.level_idc = level_idc;
        self
    }

    pub fn max_sub_layers(mut self, max_sub_layers: u8) -> Self {
        self.max_sub_layers = max_sub_layers;
        self
    }

    pub fn chroma_format(mut self, chroma_format_idc: u32) -> Self {
        self.chroma_format_idc = chroma_format_idc;
        self
    }

    /// 亮度与色度共用
    pub fn bit_depth_minus8(mut self, value: u32) -> Self {
        self.bit_depth_minus8 = value;
        self
    }

    /// 写入两组短期参考图像集 (第二组使用 inter RPS 预测) 与一个长期参考
    pub fn with_ref_pic_sets(mut self) -> Self {
        self.short_term_rps = true;
        self.long_term_refs = true;
        self
    }

    pub fn aspect_ratio(mut self, idc: u8) -> Self {
        self.aspect_ratio_idc = Some(idc);
        self
    }

    /// (num_units_in_tick, time_scale)
    pub fn timing(mut self, num_units_in_tick: u32, time_scale: u32) -> Self {
        self.timing = Some((num_units_in_tick, time_scale));
        self
    }

    fn write(&self, bw: &mut BitWriter) {
        bw.write_bits(u32::from(self.vps_id), 4);
        bw.write_bits(u32::from(self.max_sub_layers - 1), 3);
        bw.write_flag(true); // sps_temporal_id_nesting_flag
        write_hevc_ptl(bw, self.profile_idc, self.level_idc, self.max_sub_layers);
        bw.write_ue(self.sps_id);
        bw.write_ue(self.chroma_format_idc);
        if self.chroma_format_idc == 3 {
            bw.write_flag(false); // separate_colour_plane_flag
        }

        // 最小编码块 8x8
        let pic_w = self.width.div_ceil(8) * 8;
        let pic_h = self.height.div_ceil(8) * 8;
        bw.write_ue(pic_w);
        bw.write_ue(pic_h);
        let (sub_w, sub_h) = match self.chroma_format_idc {
            1 => (2, 2),
            2 => (2, 1),
            _ => (1, 1),
        };
        if pic_w != self.width || pic_h != self.height {
            bw.write_flag(true);
            bw.write_ue(0);
            bw.write_ue((pic_w - self.width) / sub_w);
            bw.write_ue(0);
            bw.write_ue((pic_h - self.height) / sub_h);
        } else {
            bw.write_flag(false);
        }

        bw.write_ue(self.bit_depth_minus8); // bit_depth_luma_minus8
        bw.write_ue(self.bit_depth_minus8); // bit_depth_chroma_minus8
        bw.write_ue(4); // log2_max_pic_order_cnt_lsb_minus4
        bw.write_flag(true); // sps_sub_layer_ordering_info_present_flag
        for _ in 0..self.max_sub_layers {
            bw.write_ue(4); // sps_max_dec_pic_buffering_minus1
            bw.write_ue(2); // sps_max_num_reorder_pics
            bw.write_ue(0); // sps_max_latency_increase_plus1
        }

        bw.write_ue(0); // log2_min_luma_coding_block_size_minus3
        bw.write_ue(3); // log2_diff_max_min_luma_coding_block_size
        bw.write_ue(0); // log2_min_luma_transform_block_size_minus2
        bw.write_ue(3); // log2_diff_max_min_luma_transform_block_size
        bw.write_ue(1); // max_transform_hierarchy_depth_inter
        bw.write_ue(1); // max_transform_hierarchy_depth_intra
        bw.write_flag(false); // scaling_list_enabled_flag
        bw.write_flag(true); // amp_enabled_flag
        bw.write_flag(true); // sample_adaptive_offset_enabled_flag
        bw.write_flag(false); // pcm_enabled_flag

        if self.short_term_rps {
            bw.write_ue(2); // num_short_term_ref_pic_sets
            // st_ref_pic_set(0): 两个前向参考
            bw.write_ue(2); // num_negative_pics
            bw.write_ue(0); // num_positive_pics
            for _ in 0..2 {
                bw.write_ue(0); // delta_poc_s0_minus1
                bw.write_flag(true); // used_by_curr_pic_s0_flag
            }
            // st_ref_pic_set(1): 由第 0 组预测
            bw.write_flag(true); // inter_ref_pic_set_prediction_flag
            bw.write_flag(false); // delta_rps_sign
            bw.write_ue(0); // abs_delta_rps_minus1
            bw.write_flag(true); // used_by_curr_pic_flag[0]
            bw.write_flag(false); // used_by_curr_pic_flag[1]
            bw.write_flag(true); // use_delta_flag[1]
            bw.write_flag(false); // used_by_curr_pic_flag[2]
            bw.write_flag(false); // use_delta_flag[2]
        } else {
            bw.write_ue(0);
        }

        bw.write_flag(self.long_term_refs);
        if self.long_term_refs {
            bw.write_ue(1); // num_long_term_ref_pics_sps
            bw.write_bits(0x5A, 8); // lt_ref_pic_poc_lsb_sps, log2_max_poc_lsb=8
            bw.write_flag(true); // used_by_curr_pic_lt_sps_flag
        }

        bw.write_flag(true); // sps_temporal_mvp_enabled_flag
        bw.write_flag(true); // strong_intra_smoothing_enabled_flag

        let has_vui = self.aspect_ratio_idc.is_some() || self.timing.is_some();
        bw.write_flag(has_vui);
        if has_vui {
            match self.aspect_ratio_idc {
                Some(idc) => {
                    bw.write_flag(true);
                    bw.write_bits(u32::from(idc), 8);
                    if idc == 255 {
                        bw.write_bits(4, 16);
                        bw.write_bits(3, 16);
                    }
                }
                None => bw.write_flag(false),
            }
            bw.write_flag(false); // overscan_info_present_flag
            bw.write_flag(false); // video_signal_type_present_flag
            bw.write_flag(false); // chroma_loc_info_present_flag
            bw.write_flag(false); // neutral_chroma_indication_flag
            bw.write_flag(false); // field_seq_flag
            bw.write_flag(false); // frame_field_info_present_flag
            bw.write_flag(false); // default_display_window_flag
            match self.timing {
                Some((num_units_in_tick, time_scale)) => {
                    bw.write_flag(true);
                    bw.write_bits(num_units_in_tick, 32);
                    bw.write_bits(time_scale, 32);
                    bw.write_flag(false); // vui_poc_proportional_to_timing_flag
                    bw.write_flag(false); // vui_hrd_parameters_present_flag
                }
                None => bw.write_flag(false),
            }
            bw.write_flag(false); // bitstream_restriction_flag
        }

        bw.write_flag(false); // sps_extension_present_flag
        bw.write_rbsp_trailing_bits();
    }

    /// 不含 2 字节 NAL 头部的 RBSP
    pub fn rbsp(&self) -> Vec<u8> {
        let mut bw = BitWriter::new();
        self.write(&mut bw);
        bw.finish()
    }

    /// 完整 NAL (type=33)
    pub fn nal(&self) -> Vec<u8> {
        let mut bw = BitWriter::new();
        self.write(&mut bw);
        finish_nal(&[0x42, 0x01], bw)
    }
}

/// HEVC PPS NAL
pub(crate) fn hevc_pps_nal(pps_id: u32, sps_id: u32) -> Vec<u8> {
    hevc_pps_nal_qp(pps_id, sps_id, 0)
}

/// 指定 init_qp_minus26 的 HEVC PPS NAL
pub(crate) fn hevc_pps_nal_qp(pps_id: u32, sps_id: u32, init_qp_minus26: i32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_ue(pps_id);
    bw.write_ue(sps_id);
    bw.write_flag(false); // dependent_slice_segments_enabled_flag
    bw.write_flag(false); // output_flag_present_flag
    bw.write_bits(0, 3); // num_extra_slice_header_bits
    bw.write_flag(false); // sign_data_hiding_enabled_flag
    bw.write_flag(false); // cabac_init_present_flag
    bw.write_ue(0); // num_ref_idx_l0_default_active_minus1
    bw.write_ue(0); // num_ref_idx_l1_default_active_minus1
    bw.write_se(init_qp_minus26); // init_qp_minus26
    bw.write_flag(false); // constrained_intra_pred_flag
    bw.write_flag(false); // transform_skip_enabled_flag
    bw.write_flag(false); // cu_qp_delta_enabled_flag
    bw.write_se(0); // pps_cb_qp_offset
    bw.write_se(0); // pps_cr_qp_offset
    bw.write_flag(false); // pps_slice_chroma_qp_offsets_present_flag
    bw.write_flag(false); // weighted_pred_flag
    bw.write_flag(false); // weighted_bipred_flag
    bw.write_flag(false); // transquant_bypass_enabled_flag
    bw.write_flag(false); // tiles_enabled_flag
    bw.write_flag(false); // entropy_coding_sync_enabled_flag
    bw.write_flag(true); // pps_loop_filter_across_slices_enabled_flag
    bw.write_flag(false); // deblocking_filter_control_present_flag
    bw.write_flag(false); // pps_scaling_list_data_present_flag
    bw.write_flag(false); // lists_modification_present_flag
    bw.write_ue(0); // log2_parallel_merge_level_minus2
    bw.write_flag(false); // slice_segment_header_extension_present_flag
    bw.write_flag(false); // pps_extension_present_flag
    bw.write_rbsp_trailing_bits();
    finish_nal(&[0x44, 0x01], bw)
}

/// HEVC slice segment NAL (首个 slice segment)
pub(crate) fn hevc_slice_nal(nal_type: u8, pps_id: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_flag(true); // first_slice_segment_in_pic_flag
    if (16..=23).contains(&nal_type) {
        bw.write_flag(false); // no_output_of_prior_pics_flag
    }
    bw.write_ue(pps_id);
    bw.write_ue(if (16..=23).contains(&nal_type) { 2 } else { 1 }); // slice_type
    bw.write_bits(0xC3A5, 16);
    bw.write_rbsp_trailing_bits();
    finish_nal(&[nal_type << 1, 0x01], bw)
}
