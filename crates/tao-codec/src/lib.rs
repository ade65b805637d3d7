//! # tao-codec
//!
//! Tao 码流适配层: H.264/HEVC 参数集解析、NAL 分帧转换与 [`hxxx::HxxxHelper`].
//!
//! ## 模块
//!
//! - [`packet`]: 压缩数据包
//! - [`parsers`]: NAL 分帧与 H.264/HEVC 参数集语法解析
//! - [`hxxx`]: 参数集缓存、分帧转换管线与当前码流查询
//!
//! ## 使用示例
//!
//! ```rust
//! use tao_codec::hxxx::{HxxxCodec, HxxxHelper, Pipeline};
//!
//! let mut helper = HxxxHelper::new(HxxxCodec::Hevc, false);
//! helper.configure(&[]).unwrap();
//! assert_eq!(helper.pipeline(), Some(Pipeline::AnnexB));
//! ```

pub mod hxxx;
pub mod packet;
pub mod parsers;

// 重导出常用类型
pub use hxxx::{HxxxCodec, HxxxHelper, ProcessOutput};
pub use packet::Packet;
