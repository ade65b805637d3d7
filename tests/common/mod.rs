//! 集成测试共用的码流构造工具.
//!
//! 按语法顺序写出最小可解析的 H.264 / HEVC 参数集与 slice, 生成带防竞争字节的完整 NAL.

#![allow(dead_code)]

use tao::codec::parsers::nal::add_emulation_prevention;
use tao::core::bitwriter::BitWriter;

fn finish_nal(header: &[u8], bw: BitWriter) -> Vec<u8> {
    let mut nal = header.to_vec();
    nal.extend_from_slice(&add_emulation_prevention(&bw.finish()));
    nal
}

/// 以 4 字节起始码拼接 Annex B 码流
pub fn annex_b(nals: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(nal);
    }
    out
}

/// 以 `length_size` 字节大端长度前缀拼接码流
pub fn length_prefixed(nals: &[&[u8]], length_size: usize) -> Vec<u8> {
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

/// Baseline SPS, level 3.0, 无 VUI; 尺寸不是 16 的倍数时写入裁剪
pub fn h264_sps(sps_id: u32, width: u32, height: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(66, 8); // profile_idc
    bw.write_bits(0, 8); // constraint flags
    bw.write_bits(30, 8); // level_idc
    bw.write_ue(sps_id);
    bw.write_ue(0); // log2_max_frame_num_minus4
    bw.write_ue(0); // pic_order_cnt_type
    bw.write_ue(0); // log2_max_pic_order_cnt_lsb_minus4
    bw.write_ue(1); // max_num_ref_frames
    bw.write_flag(false); // gaps_in_frame_num_value_allowed_flag

    let mbs_w = width.div_ceil(16);
    let mbs_h = height.div_ceil(16);
    bw.write_ue(mbs_w - 1);
    bw.write_ue(mbs_h - 1);
    bw.write_flag(true); // frame_mbs_only_flag
    bw.write_flag(true); // direct_8x8_inference_flag

    let (raw_w, raw_h) = (mbs_w * 16, mbs_h * 16);
    if raw_w != width || raw_h != height {
        bw.write_flag(true);
        bw.write_ue(0);
        bw.write_ue((raw_w - width) / 2);
        bw.write_ue(0);
        bw.write_ue((raw_h - height) / 2);
    } else {
        bw.write_flag(false);
    }
    bw.write_flag(false); // vui_parameters_present_flag
    bw.write_rbsp_trailing_bits();
    finish_nal(&[0x67], bw)
}

/// CAVLC PPS, 单 slice group
pub fn h264_pps(pps_id: u32, sps_id: u32) -> Vec<u8> {
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
    bw.write_se(0); // pic_init_qp_minus26
    bw.write_se(0); // pic_init_qs_minus26
    bw.write_se(0); // chroma_qp_index_offset
    bw.write_flag(true); // deblocking_filter_control_present_flag
    bw.write_flag(false); // constrained_intra_pred_flag
    bw.write_flag(false); // redundant_pic_cnt_present_flag
    bw.write_rbsp_trailing_bits();
    finish_nal(&[0x68], bw)
}

/// slice NAL (IDR 为 I slice, 否则 P slice), 宏块数据为占位字节
pub fn h264_slice(idr: bool, pps_id: u32) -> Vec<u8> {
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

/// 访问单元分隔符
pub const H264_AUD: [u8; 2] = [0x09, 0xF0];

// ============================================================
// HEVC
// ============================================================

/// profile_tier_level(1, 0)
fn write_hevc_ptl(bw: &mut BitWriter, profile_idc: u8, level_idc: u8) {
    bw.write_bits(0, 2); // general_profile_space
    bw.write_flag(false); // general_tier_flag
    bw.write_bits(u32::from(profile_idc), 5);
    bw.write_bits(1 << (31 - u32::from(profile_idc)), 32);
    bw.write_bits(0b1001, 4);
    bw.write_bits(0, 32);
    bw.write_bits(0, 12);
    bw.write_bits(u32::from(level_idc), 8);
}

/// VPS, Main profile, level 3.1, 单层单子层
pub fn hevc_vps(vps_id: u8) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(u32::from(vps_id), 4);
    bw.write_flag(true); // vps_base_layer_internal_flag
    bw.write_flag(true); // vps_base_layer_available_flag
    bw.write_bits(0, 6); // vps_max_layers_minus1
    bw.write_bits(0, 3); // vps_max_sub_layers_minus1
    bw.write_flag(true); // vps_temporal_id_nesting_flag
    bw.write_bits(0xFFFF, 16);
    write_hevc_ptl(&mut bw, 1, 93);
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

/// SPS, Main profile, 4:2:0, 8 bit, 无 VUI; 尺寸需为 8 的倍数
pub fn hevc_sps(sps_id: u32, vps_id: u8, width: u32, height: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(u32::from(vps_id), 4);
    bw.write_bits(0, 3); // sps_max_sub_layers_minus1
    bw.write_flag(true); // sps_temporal_id_nesting_flag
    write_hevc_ptl(&mut bw, 1, 93);
    bw.write_ue(sps_id);
    bw.write_ue(1); // chroma_format_idc
    bw.write_ue(width);
    bw.write_ue(height);
    bw.write_flag(false); // conformance_window_flag
    bw.write_ue(0); // bit_depth_luma_minus8
    bw.write_ue(0); // bit_depth_chroma_minus8
    bw.write_ue(4); // log2_max_pic_order_cnt_lsb_minus4
    bw.write_flag(true); // sps_sub_layer_ordering_info_present_flag
    bw.write_ue(4);
    bw.write_ue(2);
    bw.write_ue(0);
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
    bw.write_ue(0); // num_short_term_ref_pic_sets
    bw.write_flag(false); // long_term_ref_pics_present_flag
    bw.write_flag(true); // sps_temporal_mvp_enabled_flag
    bw.write_flag(true); // strong_intra_smoothing_enabled_flag
    bw.write_flag(false); // vui_parameters_present_flag
    bw.write_flag(false); // sps_extension_present_flag
    bw.write_rbsp_trailing_bits();
    finish_nal(&[0x42, 0x01], bw)
}

/// PPS, 所有可选工具关闭
pub fn hevc_pps(pps_id: u32, sps_id: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_ue(pps_id);
    bw.write_ue(sps_id);
    bw.write_flag(false); // dependent_slice_segments_enabled_flag
    bw.write_flag(false); // output_flag_present_flag
    bw.write_bits(0, 3); // num_extra_slice_header_bits
    bw.write_flag(false); // sign_data_hiding_enabled_flag
    bw.write_flag(false); // cabac_init_present_flag
    bw.write_ue(0);
    bw.write_ue(0);
    bw.write_se(0); // init_qp_minus26
    bw.write_flag(false); // constrained_intra_pred_flag
    bw.write_flag(false); // transform_skip_enabled_flag
    bw.write_flag(false); // cu_qp_delta_enabled_flag
    bw.write_se(0);
    bw.write_se(0);
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

/// 图像的首个 slice segment
pub fn hevc_slice(nal_type: u8, pps_id: u32) -> Vec<u8> {
    let irap = (16..=23).contains(&nal_type);
    let mut bw = BitWriter::new();
    bw.write_flag(true); // first_slice_segment_in_pic_flag
    if irap {
        bw.write_flag(false); // no_output_of_prior_pics_flag
    }
    bw.write_ue(pps_id);
    bw.write_ue(if irap { 2 } else { 1 }); // slice_type
    bw.write_bits(0xC3A5, 16);
    bw.write_rbsp_trailing_bits();
    finish_nal(&[nal_type << 1, 0x01], bw)
}

/// IDR_W_RADL
pub const HEVC_IDR_W_RADL: u8 = 19;
/// TRAIL_R
pub const HEVC_TRAIL_R: u8 = 1;
