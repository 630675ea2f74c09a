//! 比特流写入器.
//!
//! 按大端位序写入 (MSB first), 与 [`BitReader`](crate::bitreader::BitReader) 对应.
//! 主要用于构造参数集码流 (单元测试, 合成探测样本).

/// 比特流写入器
///
/// # 示例
/// ```
/// use esprobe_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_ue(0); // "1"
/// bw.write_ue(1); // "010"
/// let data = bw.finish();
/// assert_eq!(data, vec![0b10111010]);
/// ```
#[derive(Debug, Clone)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// 以指定容量创建比特流写入器
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.current_byte = (self.current_byte << 1) | (bit & 1) as u8;
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入布尔标志
    pub fn write_flag(&mut self, flag: bool) {
        self.write_bit(u32::from(flag));
    }

    /// 写入 N 个位 (最多 32 位)
    ///
    /// 值的低 N 位被写入, 高位在前.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);

        let mut remaining = n.min(32);
        while remaining > 0 {
            let available = 8 - u32::from(self.bit_count);
            let to_write = remaining.min(available);

            let shift = remaining - to_write;
            let mask = (1u64 << to_write) - 1;
            let bits = ((u64::from(value) >> shift) & mask) as u8;

            self.current_byte = if to_write == 8 {
                bits
            } else {
                (self.current_byte << to_write) | bits
            };
            self.bit_count += to_write as u8;

            if self.bit_count == 8 {
                self.data.push(self.current_byte);
                self.current_byte = 0;
                self.bit_count = 0;
            }

            remaining -= to_write;
        }
    }

    /// 写入 N 个位 (最多 64 位)
    pub fn write_bits_u64(&mut self, value: u64, n: u32) {
        if n <= 32 {
            self.write_bits(value as u32, n);
        } else {
            self.write_bits((value >> 32) as u32, n - 32);
            self.write_bits(value as u32, 32);
        }
    }

    /// 写入无符号 Exp-Golomb 编码值 ue(v)
    pub fn write_ue(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let len = 64 - code.leading_zeros();
        // len-1 个前导零, 随后是 len 位的 code
        self.write_bits_u64(0, len - 1);
        self.write_bits_u64(code, len);
    }

    /// 写入有符号 Exp-Golomb 编码值 se(v)
    pub fn write_se(&mut self, value: i32) {
        let mapped = if value > 0 {
            (value as u32) * 2 - 1
        } else {
            value.unsigned_abs() * 2
        };
        self.write_ue(mapped);
    }

    /// 写入 RBSP 尾部 (停止位 1 + 零填充至字节边界)
    pub fn write_rbsp_trailing_bits(&mut self) {
        self.write_bit(1);
        self.align_to_byte();
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            let pad = 8 - self.bit_count;
            self.current_byte <<= pad;
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入完整字节
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bit_count == 0 {
            self.data.extend_from_slice(bytes);
        } else {
            for &b in bytes {
                self.write_bits(u32::from(b), 8);
            }
        }
    }

    /// 完成写入, 返回字节数据
    ///
    /// 如果当前不在字节边界, 自动用 0 填充.
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}
