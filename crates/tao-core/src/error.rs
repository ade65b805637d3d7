//! 统一错误类型定义.
//!
//! 所有 Tao crate 共用的错误类型, 支持跨模块传播.
//!
//! 码流适配层的错误种类映射:
//! - 不支持的带外配置记录 -> [`TaoError::Unsupported`]
//! - 损坏的参数集 / 越界 id / 引用了未缓存的参数集 -> [`TaoError::InvalidData`]
//! - 缓冲区扩容失败 -> [`TaoError::OutOfMemory`]

use std::collections::TryReserveError;

use thiserror::Error;

/// Tao 框架统一错误类型
#[derive(Debug, Error)]
pub enum TaoError {
    /// 无效参数 (调用顺序错误等)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作或输入形态
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),
}

impl TaoError {
    /// 将比特流读取越界视为数据损坏
    ///
    /// 参数集解析器在 RBSP 中途耗尽数据时返回 `Eof`, 对调用方而言这就是损坏的参数集.
    pub fn eof_as_invalid(self, what: &str) -> Self {
        match self {
            TaoError::Eof => TaoError::InvalidData(format!("{} 数据被截断", what)),
            other => other,
        }
    }
}

impl From<TryReserveError> for TaoError {
    fn from(err: TryReserveError) -> Self {
        TaoError::OutOfMemory(err.to_string())
    }
}

/// Tao 框架统一 Result 类型
pub type TaoResult<T> = Result<T, TaoError>;
