//! 适配器的输入输出单元.
//!
//! 一个 [`Packet`] 承载一个访问单元; 适配器只改写 `data`.

use bytes::Bytes;
use tao_core::Rational;

/// 时间戳缺省值
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 一个访问单元及其时间信息
#[derive(Debug, Clone)]
pub struct Packet {
    /// Annex B 或长度前缀分帧的 NAL 序列
    pub data: Bytes,
    pub pts: i64,
    pub dts: i64,
    /// 以 `time_base` 计
    pub duration: i64,
    pub time_base: Rational,
    /// 由上游填写, 适配器不检查
    pub is_keyframe: bool,
}

impl Packet {
    /// 无数据, 时间戳未设置
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            duration: 0,
            time_base: Rational::UNDEFINED,
            is_keyframe: false,
        }
    }

    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 替换负载, 保留时间字段
    pub fn with_data(self, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..self
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
