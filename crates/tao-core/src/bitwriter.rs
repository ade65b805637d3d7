//! 比特流写入器.
//!
//! [`BitReader`](crate::bitreader::BitReader) 的逆操作, 用于构造参数集与 slice 头的 RBSP.

/// 比特流写入器, 高位在前
///
/// ```
/// use tao_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_ue(0);
/// bw.write_rbsp_trailing_bits();
/// assert_eq!(bw.finish(), vec![0b1011_1100]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    /// 尚未凑满一个字节的位, 低 `pending_bits` 位有效
    pending: u64,
    pending_bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入 `value` 的低 `n` 位 (n <= 32)
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "BitWriter: 单次最多写入 32 位, n={}", n);
        if n == 0 {
            return;
        }
        let masked = u64::from(value) & ((1u64 << n) - 1);
        self.pending = (self.pending << n) | masked;
        self.pending_bits += n;
        while self.pending_bits >= 8 {
            self.pending_bits -= 8;
            self.data.push((self.pending >> self.pending_bits) as u8);
        }
        self.pending &= (1u64 << self.pending_bits) - 1;
    }

    pub fn write_flag(&mut self, flag: bool) {
        self.write_bits(u32::from(flag), 1);
    }

    /// 无符号 Exp-Golomb ue(v)
    pub fn write_ue(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let suffix_bits = 63 - code.leading_zeros();
        self.write_bits(0, suffix_bits);
        self.write_bits(1, 1);
        self.write_bits((code - (1u64 << suffix_bits)) as u32, suffix_bits);
    }

    /// 有符号 Exp-Golomb se(v)
    pub fn write_se(&mut self, value: i32) {
        let code = if value > 0 {
            value.unsigned_abs() * 2 - 1
        } else {
            value.unsigned_abs() * 2
        };
        self.write_ue(code);
    }

    /// rbsp_stop_one_bit 加对齐零位
    pub fn write_rbsp_trailing_bits(&mut self) {
        self.write_bits(1, 1);
        self.align_to_byte();
    }

    /// 用 0 填充到字节边界
    pub fn align_to_byte(&mut self) {
        if self.pending_bits > 0 {
            self.write_bits(0, 8 - self.pending_bits);
        }
    }

    /// 对齐并返回写出的字节
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}
