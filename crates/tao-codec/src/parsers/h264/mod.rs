//! H.264/AVC 码流解析器.
//!
//! 提供适配层需要的 H.264 语法解析能力:
//! - NAL 头部与类型识别
//! - avcC (AVCDecoderConfigurationRecord) 解析与构建
//! - SPS (含 VUI) / PPS 解析
//! - slice 头部 PPS ID 读取

pub mod nal;
pub mod pps;
pub mod slice;
pub mod sps;

pub use nal::{AvccConfig, NalHeader, NalUnitType, build_avcc_config, is_avcc, parse_avcc_config};
pub use pps::{MAX_PPS_ID, Pps, parse_pps};
pub use slice::{SliceHeaderPrefix, parse_slice_header_prefix, slice_pps_id};
pub use sps::{MAX_SPS_ID, Sps, parse_sps};
