//! H.265/HEVC 码流解析器.
//!
//! 提供适配层需要的 HEVC 语法解析能力:
//! - NAL 头部与类型识别 (2 字节 NAL 头)
//! - hvcC (HEVCDecoderConfigurationRecord) 解析、构建与 Annex B 渲染
//! - VPS / SPS / PPS 解析
//! - slice segment 头部 PPS ID 读取
//!
//! # HEVC NAL 头部 (2 字节)
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ forbidden(1) | type(6) | layer_id(6) | tid(3) │
//! └────────────────────────────────────────────┘
//! ```

pub mod nal;
pub mod pps;
pub mod slice;
pub mod sps;

pub use nal::{
    HevcNalHeader, HevcNalUnitType, HvccArray, HvccConfig, build_hvcc_config, hvcc_to_annex_b,
    is_hvcc, parse_hvcc_config,
};
pub use pps::{HevcPps, parse_hevc_pps};
pub use slice::{parse_slice_segment_prefix, slice_pps_id};
pub use sps::{HevcSps, HevcVps, ProfileTierLevel, parse_hevc_sps, parse_hevc_vps};
