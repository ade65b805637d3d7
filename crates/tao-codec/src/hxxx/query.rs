//! 当前参数集查询.
//!
//! 所有查询都只读缓存, 当前没有可用的 SPS 时返回 `None`.

use bytes::Bytes;
use tao_core::color::{ColorPrimaries, ColorRange, ColorSpace, ColorTransfer};
use tao_core::{Rational, TaoResult};

use super::HxxxHelper;
use super::cache::ParameterSetTable;
use super::state::CodecState;
use crate::parsers::nal::START_CODE;
use crate::parsers::{h264, h265};

/// 图像尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureSize {
    /// 编码宽度 (H.264 宏块对齐, HEVC 为 pic_width_in_luma_samples)
    pub width: u32,
    /// 编码高度
    pub height: u32,
    /// 裁剪后的可见宽度
    pub visible_width: u32,
    /// 裁剪后的可见高度
    pub visible_height: u32,
}

/// 色彩描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colorimetry {
    /// 色域原色 (colour_primaries)
    pub primaries: ColorPrimaries,
    /// 传输特性 (transfer_characteristics)
    pub transfer: ColorTransfer,
    /// YUV 矩阵 (matrix_coefficients)
    pub space: ColorSpace,
    /// 取值范围, 由 video_full_range_flag 决定
    pub range: ColorRange,
}

/// H.264 Annex B 配置: SPS 块与 PPS 块
///
/// 每个块按 id 升序拼接, 每个 NAL 前有 4 字节起始码.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnexBConfig {
    /// 全部已缓存 SPS
    pub sps: Bytes,
    /// 全部已缓存 PPS
    pub pps: Bytes,
}

/// avcC/hvcC 输出使用的长度前缀宽度
const CONFIG_NAL_LENGTH_SIZE: usize = 4;

impl HxxxHelper {
    /// 当前图像尺寸
    pub fn picture_size(&self) -> Option<PictureSize> {
        match &self.state {
            CodecState::H264(state) => {
                let sps = state.active_sps()?;
                Some(PictureSize {
                    width: sps.coded_width,
                    height: sps.coded_height,
                    visible_width: sps.width,
                    visible_height: sps.height,
                })
            }
            CodecState::Hevc(state) => {
                let sps = state.active_sps()?;
                Some(PictureSize {
                    width: sps.pic_width,
                    height: sps.pic_height,
                    visible_width: sps.width,
                    visible_height: sps.height,
                })
            }
        }
    }

    /// 当前像素宽高比, VUI 未给出时为 1:1
    pub fn sar(&self) -> Option<Rational> {
        match &self.state {
            CodecState::H264(state) => state.active_sps().map(h264::Sps::sar),
            CodecState::Hevc(state) => state
                .active_sps()
                .map(|sps| sps.sar.unwrap_or(Rational::new(1, 1))),
        }
    }

    /// 当前 `(profile_idc, level_idc)`
    pub fn profile_level(&self) -> Option<(u8, u8)> {
        match &self.state {
            CodecState::H264(state) => state
                .active_sps()
                .map(|sps| (sps.profile_idc, sps.level_idc)),
            CodecState::Hevc(state) => state
                .active_sps()
                .map(|sps| (sps.ptl.profile_idc, sps.ptl.level_idc)),
        }
    }

    /// 当前 DPB 深度与初始输出延迟 (帧), 仅 H.264
    pub fn dpb_values(&self) -> Option<(u32, u32)> {
        match &self.state {
            CodecState::H264(state) => state.active_sps().map(h264::Sps::dpb_values),
            CodecState::Hevc(_) => None,
        }
    }

    /// 当前色彩描述, 仅 H.264 且 SPS 带 VUI 时可用
    pub fn colorimetry(&self) -> Option<Colorimetry> {
        match &self.state {
            CodecState::H264(state) => {
                let (primaries, transfer, space, range) = state.active_sps()?.colorimetry()?;
                Some(Colorimetry {
                    primaries,
                    transfer,
                    space,
                    range,
                })
            }
            CodecState::Hevc(_) => None,
        }
    }

    /// 当前 `(chroma_format_idc, bit_depth_luma, bit_depth_chroma)`
    pub fn chroma_format(&self) -> Option<(u32, u32, u32)> {
        match &self.state {
            CodecState::H264(state) => state
                .active_sps()
                .map(|sps| (sps.chroma_format_idc, sps.bit_depth_luma, sps.bit_depth_chroma)),
            CodecState::Hevc(state) => state
                .active_sps()
                .map(|sps| (sps.chroma_format_idc, sps.bit_depth_luma, sps.bit_depth_chroma)),
        }
    }

    /// 当前帧率 (VUI timing_info)
    pub fn frame_rate(&self) -> Option<Rational> {
        match &self.state {
            CodecState::H264(state) => state.active_sps()?.frame_rate(),
            CodecState::Hevc(state) => state.active_sps()?.fps,
        }
    }

    /// 是否至少缓存了一个 SPS 和一个 PPS
    pub fn has_config(&self) -> bool {
        match &self.state {
            CodecState::H264(state) => !state.sps.is_empty() && !state.pps.is_empty(),
            CodecState::Hevc(state) => !state.sps.is_empty() && !state.pps.is_empty(),
        }
    }

    /// 全部已缓存 SPS 与 PPS 的 Annex B 形式
    ///
    /// 非 H.264, 或 SPS/PPS 任一为空时返回 `None`.
    pub fn h264_annexb_config(&self) -> TaoResult<Option<AnnexBConfig>> {
        let CodecState::H264(state) = &self.state else {
            return Ok(None);
        };
        if state.sps.is_empty() || state.pps.is_empty() {
            return Ok(None);
        }
        Ok(Some(AnnexBConfig {
            sps: render_annex_b(&state.sps)?,
            pps: render_annex_b(&state.pps)?,
        }))
    }

    /// 由全部已缓存 SPS 与 PPS 构建 avcC (4 字节长度前缀)
    ///
    /// 非 H.264 或没有 SPS 时返回 `None`.
    pub fn h264_avcc_config(&self) -> TaoResult<Option<Vec<u8>>> {
        let CodecState::H264(state) = &self.state else {
            return Ok(None);
        };
        if state.sps.is_empty() {
            return Ok(None);
        }
        let sps: Vec<&[u8]> = state.sps.iter().map(|(_, raw, _)| raw).collect();
        let pps: Vec<&[u8]> = state.pps.iter().map(|(_, raw, _)| raw).collect();
        h264::build_avcc_config(&sps, &pps, CONFIG_NAL_LENGTH_SIZE).map(Some)
    }

    /// hvcC 的 Annex B 渲染, 仅在 hvcC 源且消费方需要 Annex B 时存在
    pub fn hevc_annexb_config(&self) -> Option<Bytes> {
        match &self.state {
            CodecState::Hevc(state) => state.annexb_config.clone(),
            CodecState::H264(_) => None,
        }
    }

    /// 由全部已缓存 VPS/SPS/PPS 构建 hvcC (4 字节长度前缀)
    ///
    /// 非 HEVC 或没有 SPS 时返回 `None`.
    pub fn hevc_hvcc_config(&self) -> TaoResult<Option<Vec<u8>>> {
        let CodecState::Hevc(state) = &self.state else {
            return Ok(None);
        };
        if state.sps.is_empty() {
            return Ok(None);
        }
        let vps: Vec<&[u8]> = state.vps.iter().map(|(_, raw, _)| raw).collect();
        let sps: Vec<&[u8]> = state.sps.iter().map(|(_, raw, _)| raw).collect();
        let pps: Vec<&[u8]> = state.pps.iter().map(|(_, raw, _)| raw).collect();
        h265::build_hvcc_config(&vps, &sps, &pps, CONFIG_NAL_LENGTH_SIZE).map(Some)
    }
}

fn render_annex_b<P: super::cache::ParameterSet>(
    table: &ParameterSetTable<P>,
) -> TaoResult<Bytes> {
    let total: usize = table
        .iter()
        .map(|(_, raw, _)| START_CODE.len() + raw.len())
        .sum();
    let mut out = Vec::new();
    out.try_reserve_exact(total)?;
    for (_, raw, _) in table.iter() {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(raw);
    }
    Ok(Bytes::from(out))
}
