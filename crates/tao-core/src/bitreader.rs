//! 比特流读取器.
//!
//! 按 MSB first 读取已去除防竞争字节的 RBSP, 供参数集与 slice 头解析使用.
//! 数据耗尽时返回 [`TaoError::Eof`], 由调用方决定是否视为数据损坏.

use crate::{TaoError, TaoResult};

/// ue(v) 前导零上限, 超过即无法放入 u32
const MAX_EXP_GOLOMB_LEADING_ZEROS: u32 = 31;

/// 比特流读取器
///
/// ```
/// use tao_core::bitreader::BitReader;
///
/// // 0b101 | ue=2 (011) | 停止位
/// let data = [0b1010_1110];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(3).unwrap(), 0b101);
/// assert_eq!(br.read_ue().unwrap(), 2);
/// assert!(!br.more_rbsp_data());
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 以位计的读取位置
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 剩余可读位数
    pub fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.pos)
    }

    /// 读取 1 位标志
    pub fn read_flag(&mut self) -> TaoResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// 读取 `n` 位 (n <= 32), 高位在前
    pub fn read_bits(&mut self, n: u32) -> TaoResult<u32> {
        if n > 32 {
            return Err(TaoError::InvalidArgument(format!(
                "BitReader: 单次最多读取 32 位, n={}",
                n
            )));
        }
        let mut remaining = n as usize;
        if remaining > self.bits_left() {
            return Err(TaoError::Eof);
        }

        let mut value = 0u64;
        while remaining > 0 {
            let offset = self.pos % 8;
            let take = (8 - offset).min(remaining);
            let bits = (self.data[self.pos / 8] << offset) >> (8 - take);
            value = (value << take) | u64::from(bits);
            self.pos += take;
            remaining -= take;
        }
        Ok(value as u32)
    }

    /// 跳过 `n` 位
    pub fn skip_bits(&mut self, n: u32) -> TaoResult<()> {
        let n = n as usize;
        if n > self.bits_left() {
            return Err(TaoError::Eof);
        }
        self.pos += n;
        Ok(())
    }

    /// 无符号 Exp-Golomb ue(v)
    pub fn read_ue(&mut self) -> TaoResult<u32> {
        let mut leading_zeros = 0u32;
        while !self.read_flag()? {
            leading_zeros += 1;
            if leading_zeros > MAX_EXP_GOLOMB_LEADING_ZEROS {
                return Err(TaoError::InvalidData(
                    "Exp-Golomb 前导零超过 31 个".into(),
                ));
            }
        }
        let suffix = self.read_bits(leading_zeros)?;
        Ok(((1u64 << leading_zeros) - 1 + u64::from(suffix)) as u32)
    }

    /// 有符号 Exp-Golomb se(v): 1, 2, 3, 4 对应 1, -1, 2, -2
    pub fn read_se(&mut self) -> TaoResult<i32> {
        let code = self.read_ue()?;
        let magnitude = code.div_ceil(2) as i32;
        Ok(if code % 2 == 1 { magnitude } else { -magnitude })
    }

    /// 当前位置之后是否还有语法数据
    ///
    /// 最后一个非零字节的最低置位是 rbsp_stop_one_bit, 其后的零位与零字节不计入.
    pub fn more_rbsp_data(&self) -> bool {
        let Some(last) = self.data.iter().rposition(|&b| b != 0) else {
            return false;
        };
        let stop_bit = last * 8 + 7 - self.data[last].trailing_zeros() as usize;
        self.pos < stop_bit
    }
}
