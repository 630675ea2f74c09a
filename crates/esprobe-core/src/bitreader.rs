//! 比特流读取器.
//!
//! 提供从字节缓冲区中按位读取数据的能力, 是 H.264/H.265 参数集解析的基础设施.
//!
//! 按大端位序读取 (MSB first). 与常规读取器不同, 越过末尾的定长读取不会报错:
//! 缺失的位按 0 返回, 游标继续前进, [`BitReader::bits_left`] 随之变为负数.
//! 调用方在关键检查点查看 `bits_left() < 0` 来识别截断, 这样可以在截断的
//! VUI 等结构上实现 "读完再判定" 的回退逻辑, 同时保证不会访问缓冲区之外的内存.

use crate::{ProbeError, ProbeResult};

/// 比特流读取器
///
/// 从字节缓冲区中按位读取数据, 使用大端位序 (MSB first).
/// 读取器本身是 `Copy` 的, 复制即可得到游标快照.
///
/// # 示例
/// ```
/// use esprobe_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4), 0b1011);
/// assert_eq!(br.read_bits(4), 0b0001);
/// assert_eq!(br.read_bits(8), 0b01010101);
/// assert_eq!(br.bits_left(), 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 有效位数 (不超过 data.len() * 8)
    size_in_bits: usize,
    /// 当前位索引 (可能超过 size_in_bits)
    index: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器, 有效位数为整个缓冲区
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            size_in_bits: data.len() * 8,
            index: 0,
        }
    }

    /// 以指定有效位数创建读取器
    ///
    /// `bit_len` 超过缓冲区长度时按缓冲区长度截断.
    pub fn with_bit_len(data: &'a [u8], bit_len: usize) -> Self {
        Self {
            data,
            size_in_bits: bit_len.min(data.len() * 8),
            index: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.index
    }

    /// 获取剩余可读位数
    ///
    /// 发生越界读取后返回负数, 其绝对值为越界的位数.
    pub fn bits_left(&self) -> i64 {
        self.size_in_bits as i64 - self.index as i64
    }

    /// 是否发生过越界读取
    pub fn is_overread(&self) -> bool {
        self.bits_left() < 0
    }

    /// 越界读取时返回截断错误
    pub fn check_overread(&self, what: &str) -> ProbeResult<()> {
        let left = self.bits_left();
        if left < 0 {
            return Err(ProbeError::Truncated(format!(
                "{what}: 越界读取 {} 位",
                -left
            )));
        }
        Ok(())
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> u32 {
        let bit = if self.index < self.size_in_bits {
            (self.data[self.index >> 3] >> (7 - (self.index & 7))) & 1
        } else {
            0
        };
        self.index = self.index.saturating_add(1);
        u32::from(bit)
    }

    /// 读取 1 个位并转换为布尔值
    pub fn read_flag(&mut self) -> bool {
        self.read_bit() == 1
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效. 超出末尾的位按 0 计.
    pub fn read_bits(&mut self, n: u32) -> u32 {
        debug_assert!(n <= 32, "read_bits: n={} 超过 32 位", n);
        let mut result: u64 = 0;
        let mut remaining = n.min(32) as usize;

        while remaining > 0 {
            if self.index >= self.size_in_bits {
                // 越界部分补 0
                result <<= remaining;
                self.index = self.index.saturating_add(remaining);
                break;
            }

            let bit_pos = self.index & 7;
            let available = (8 - bit_pos).min(self.size_in_bits - self.index);
            let to_read = remaining.min(available);

            // 从当前字节中提取位
            let shift = 8 - bit_pos - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.index >> 3] >> shift) & mask;

            result = (result << to_read) | u64::from(bits);
            self.index += to_read;
            remaining -= to_read;
        }

        result as u32
    }

    /// 窥视 N 个位 (不移动位置)
    pub fn show_bits(&self, n: u32) -> u32 {
        let mut probe = *self;
        probe.read_bits(n)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) {
        self.index = self.index.saturating_add(n);
    }

    /// 读取无符号 Exp-Golomb 编码值 ue(v)
    ///
    /// 前导零串越过缓冲区末尾时返回截断错误, 超过 31 个前导零视为非法数据.
    pub fn read_ue(&mut self) -> ProbeResult<u32> {
        let mut leading_zeros = 0u32;
        loop {
            if self.bits_left() <= 0 {
                return Err(ProbeError::Truncated(
                    "Exp-Golomb 前导零越过缓冲区末尾".into(),
                ));
            }
            if self.read_bit() == 1 {
                break;
            }
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(ProbeError::InvalidData("Exp-Golomb 前导零过多".into()));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let suffix = self.read_bits(leading_zeros);
        Ok((1u32 << leading_zeros) - 1 + suffix)
    }

    /// 读取有符号 Exp-Golomb 编码值 se(v)
    pub fn read_se(&mut self) -> ProbeResult<i32> {
        let code = self.read_ue()?;
        // 映射: 0→0, 1→1, 2→-1, 3→2, 4→-2, ...
        if code & 1 == 1 {
            Ok(code.div_ceil(2) as i32)
        } else {
            Ok(-((code / 2) as i32))
        }
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn align_to_byte(&mut self) {
        let rem = self.index & 7;
        if rem != 0 {
            self.index = self.index.saturating_add(8 - rem);
        }
    }
}
