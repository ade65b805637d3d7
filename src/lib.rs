//! # Tao (道)
//!
//! 纯 Rust 实现的 H.264/HEVC 码流适配层.
//!
//! 解码器通常只接受一种分帧方式: Annex B 起始码, 或 avcC/hvcC 描述的长度前缀.
//! Tao 在两者之间转换, 同时缓存码流中出现的参数集, 并在当前 SPS/VPS 改变时通知调用方.
//!
//! # 快速开始
//!
//! ```rust
//! use tao::codec::{HxxxCodec, HxxxHelper, Packet};
//!
//! // 消费方需要长度前缀, 源为 Annex B
//! let mut helper = HxxxHelper::new(HxxxCodec::H264, true);
//! helper.configure(&[]).unwrap();
//!
//! let out = helper
//!     .process(Packet::from_data(vec![0, 0, 0, 1, 0x09, 0xF0]))
//!     .unwrap();
//! assert_eq!(&out.packet.data[..], &[0, 0, 0, 2, 0x09, 0xF0]);
//! assert!(!out.config_changed);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tao-core` | 位读写、错误类型、有理数与色彩枚举 |
//! | `tao-codec` | NAL 解析、参数集缓存与 [`codec::HxxxHelper`] |

/// 核心类型与工具
pub use tao_core as core;

/// 码流解析与适配
pub use tao_codec as codec;

/// 获取 Tao 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
