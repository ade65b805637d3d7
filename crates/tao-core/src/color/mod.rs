//! 色彩相关类型定义.
//!
//! 参数集 VUI 中的色彩描述以 ISO/IEC 23001-8 码点表示, 各类型提供码点到枚举的转换.

mod color_primaries;
mod color_range;
mod color_space;
mod color_transfer;

pub use color_primaries::ColorPrimaries;
pub use color_range::ColorRange;
pub use color_space::ColorSpace;
pub use color_transfer::ColorTransfer;
