//! NAL 单元分帧 (H.264/HEVC 通用).
//!
//! # Annex B 格式
//!
//! 使用起始码分隔 NAL 单元:
//! - 3 字节起始码: `00 00 01`
//! - 4 字节起始码: `00 00 00 01`
//!
//! # 长度前缀格式 (AVCC/HVCC)
//!
//! 每个 NAL 单元前有 1/2/4 字节大端长度:
//! ```text
//! [length: N bytes BE] [NAL data: length bytes]
//! ```
//!
//! 迭代器只借用输入缓冲区, 产出的 NAL 切片不含起始码或长度前缀, 含 NAL 头部.

use bytes::{Buf, BufMut};
use tao_core::{TaoError, TaoResult};

/// Annex B 输出统一使用的 4 字节起始码
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// NAL 分帧方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalFraming {
    /// 起始码分隔
    AnnexB,
    /// 固定宽度的大端长度前缀 (字节数)
    LengthPrefixed(usize),
}

impl NalFraming {
    /// 按长度前缀宽度构造, 0 表示 Annex B
    pub fn from_length_size(length_size: usize) -> Self {
        if length_size == 0 {
            Self::AnnexB
        } else {
            Self::LengthPrefixed(length_size)
        }
    }
}

/// 借用式 NAL 迭代器
///
/// 遇到截断的尾部数据 (长度前缀声明的字节不足) 时结束迭代, 不报错.
pub struct NalIter<'a> {
    data: &'a [u8],
    pos: usize,
    framing: NalFraming,
}

impl<'a> NalIter<'a> {
    /// 创建迭代器
    pub fn new(data: &'a [u8], framing: NalFraming) -> Self {
        let pos = match framing {
            // 第一个起始码之前的字节不属于任何 NAL
            NalFraming::AnnexB => find_start_code(data, 0).map_or(data.len(), |p| p + 3),
            NalFraming::LengthPrefixed(_) => 0,
        };
        Self { data, pos, framing }
    }

    fn next_annex_b(&mut self) -> Option<&'a [u8]> {
        while self.pos < self.data.len() {
            let start = self.pos;
            let (end, next_pos) = match find_start_code(self.data, start) {
                Some(sc) => (sc, sc + 3),
                None => (self.data.len(), self.data.len()),
            };
            self.pos = next_pos;

            // 去除尾部 0 字节 (trailing_zero_8bits 与 4 字节起始码的首字节)
            let mut nal_end = end;
            while nal_end > start && self.data[nal_end - 1] == 0x00 {
                nal_end -= 1;
            }
            if nal_end > start {
                return Some(&self.data[start..nal_end]);
            }
        }
        None
    }

    fn next_length_prefixed(&mut self, length_size: usize) -> Option<&'a [u8]> {
        if !(1..=4).contains(&length_size) {
            return None;
        }
        loop {
            let mut rest = self.data.get(self.pos..)?;
            if rest.len() < length_size {
                return None;
            }
            let nal_len = rest.get_uint(length_size) as usize;
            let start = self.pos + length_size;
            let end = start.checked_add(nal_len)?;
            if end > self.data.len() {
                return None;
            }
            self.pos = end;
            if nal_len > 0 {
                return Some(&self.data[start..end]);
            }
        }
    }
}

impl<'a> Iterator for NalIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        match self.framing {
            NalFraming::AnnexB => self.next_annex_b(),
            NalFraming::LengthPrefixed(n) => self.next_length_prefixed(n),
        }
    }
}

/// 将 Annex B 数据转换为长度前缀格式
///
/// NAL 长度超出前缀宽度可表示的范围时返回 `InvalidData`.
pub fn annex_b_to_length_prefixed(data: &[u8], length_size: usize) -> TaoResult<Vec<u8>> {
    check_length_size(length_size)?;
    let max_len = (1u64 << (8 * length_size as u32)) - 1;

    let mut out = Vec::new();
    out.try_reserve(data.len() + length_size)?;
    for nal in NalIter::new(data, NalFraming::AnnexB) {
        let len = nal.len() as u64;
        if len > max_len {
            return Err(TaoError::InvalidData(format!(
                "NAL 长度 {} 超出 {} 字节长度前缀的范围",
                len, length_size
            )));
        }
        out.try_reserve(length_size + nal.len())?;
        out.put_uint(len, length_size);
        out.extend_from_slice(nal);
    }
    Ok(out)
}

/// 将长度前缀格式转换为 Annex B 格式 (4 字节起始码)
pub fn length_prefixed_to_annex_b(data: &[u8], length_size: usize) -> TaoResult<Vec<u8>> {
    check_length_size(length_size)?;

    let mut out = Vec::new();
    out.try_reserve(data.len() + START_CODE.len())?;
    for nal in NalIter::new(data, NalFraming::LengthPrefixed(length_size)) {
        out.try_reserve(START_CODE.len() + nal.len())?;
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nal);
    }
    Ok(out)
}

/// 移除 emulation prevention 字节 (0x00 0x00 0x03 → 0x00 0x00)
///
/// RBSP 中连续两个 0x00 之后必须插入 0x03 以防止与起始码混淆,
/// 解析语法前需要移除这些 0x03 字节.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut zeros = 0usize;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }

    rbsp
}

/// 插入 emulation prevention 字节, 将 RBSP 转换为 NAL 负载
///
/// 两个 0x00 之后若紧跟 0x00..=0x03, 先插入 0x03.
pub fn add_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 1);
    let mut zeros = 0usize;

    for &byte in rbsp {
        if zeros >= 2 && byte <= 0x03 {
            out.push(0x03);
            zeros = 0;
        }
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
        out.push(byte);
    }

    out
}

/// 判断数据是否以 Annex B 起始码开头
pub fn has_start_code(data: &[u8]) -> bool {
    data.starts_with(&[0x00, 0x00, 0x01]) || data.starts_with(&START_CODE)
}

fn check_length_size(length_size: usize) -> TaoResult<()> {
    if matches!(length_size, 1 | 2 | 4) {
        Ok(())
    } else {
        Err(TaoError::InvalidData(format!(
            "NAL 长度前缀宽度非法, length_size={}",
            length_size
        )))
    }
}

/// 从 `from` 开始查找 `00 00 01`, 返回其首字节位置
fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(3)
        .position(|w| w == [0x00, 0x00, 0x01])
        .map(|p| from + p)
}
