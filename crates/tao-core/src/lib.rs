//! # tao-core
//!
//! Tao 码流适配层的基础库, 提供错误类型、比特流读取器、有理数与色彩描述.

pub mod bitreader;
pub mod bitwriter;
pub mod color;
pub mod error;
pub mod rational;

// 重导出常用类型
pub use error::{TaoError, TaoResult};
pub use rational::Rational;
