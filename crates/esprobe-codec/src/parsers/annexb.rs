//! Annex B 字节流扫描.
//!
//! Annex B 使用起始码分隔 NAL 单元:
//! - 3 字节起始码: `00 00 01`
//! - 4 字节起始码: `00 00 00 01`
//!
//! [`NalScanner`] 持有整个码流缓冲区与游标, 每次调用取出一个 NAL 单元
//! (连同其自身的起始码). 配置了循环次数时, 到达末尾后回绕到开头继续,
//! 用于循环回放场景.

use bytes::Bytes;
use log::debug;

/// NAL 头部布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalCodec {
    /// H.264: 类型位于头部字节的低 5 位
    H264,
    /// H.265: 类型位于头部字节的 bit1..=bit6
    Hevc,
}

impl NalCodec {
    /// 从 NAL 头部首字节提取类型编号
    pub fn nal_type(self, header: u8) -> u8 {
        match self {
            Self::H264 => header & 0x1F,
            Self::Hevc => (header & 0x7E) >> 1,
        }
    }

    /// NAL 头部字节数
    pub fn header_len(self) -> usize {
        match self {
            Self::H264 => 1,
            Self::Hevc => 2,
        }
    }
}

/// 一次扫描得到的 NAL 单元位置信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedNal {
    /// NAL 类型编号
    pub nal_type: u8,
    /// 起始码在缓冲区中的偏移
    pub offset: usize,
    /// 拷贝的字节数 (含起始码)
    pub len: usize,
    /// 起始码长度 (3 或 4)
    pub start_code_len: usize,
}

impl ScannedNal {
    /// NAL 负载 (跳过起始码) 在缓冲区中的起始偏移
    pub fn payload_offset(&self) -> usize {
        self.offset + self.start_code_len
    }

    /// NAL 负载长度 (不含起始码)
    pub fn payload_len(&self) -> usize {
        self.len - self.start_code_len
    }
}

/// Annex B NAL 扫描器
///
/// # 示例
/// ```
/// use bytes::Bytes;
/// use esprobe_codec::parsers::annexb::{NalCodec, NalScanner};
///
/// let data = Bytes::from_static(&[0, 0, 0, 1, 0x67, 0xAA, 0, 0, 1, 0x65, 0xBB]);
/// let mut scanner = NalScanner::new(data, NalCodec::H264);
/// let mut out = Vec::new();
/// assert_eq!(scanner.find_next_nalu(&mut out).unwrap().nal_type, 7);
/// assert_eq!(out, [0, 0, 0, 1, 0x67, 0xAA]);
/// assert_eq!(scanner.find_next_nalu(&mut out).unwrap().nal_type, 5);
/// assert!(scanner.find_next_nalu(&mut out).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct NalScanner {
    data: Bytes,
    pos: usize,
    loops_left: u32,
    codec: NalCodec,
}

impl NalScanner {
    /// 创建扫描器, 不循环
    pub fn new(data: Bytes, codec: NalCodec) -> Self {
        Self {
            data,
            pos: 0,
            loops_left: 1,
            codec,
        }
    }

    /// 设置循环次数 (含首轮), 0 与 1 等价
    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops_left = loops.max(1);
        self
    }

    /// 当前游标位置
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余循环次数
    pub fn loops_left(&self) -> u32 {
        self.loops_left
    }

    /// 回退 `n` 个字节, 用于上层把多读的 NAL 推回
    pub fn rewind(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
    }

    /// 取出下一个 NAL 单元, 拷贝 (含起始码) 到 `out`
    ///
    /// 码流耗尽且不再循环时返回 `None`, 此时 `out` 为空.
    pub fn find_next_nalu(&mut self, out: &mut Vec<u8>) -> Option<ScannedNal> {
        out.clear();
        let nal = self.next_location()?;
        out.extend_from_slice(&self.data[nal.offset..nal.offset + nal.len]);
        Some(nal)
    }

    /// 取出下一个 NAL 单元的负载 (不含起始码), 零拷贝
    pub fn next_payload(&mut self) -> Option<(ScannedNal, Bytes)> {
        let nal = self.next_location()?;
        let start = nal.payload_offset();
        let payload = self.data.slice(start..nal.offset + nal.len);
        Some((nal, payload))
    }

    fn next_location(&mut self) -> Option<ScannedNal> {
        loop {
            if let Some(nal) = self.scan_from_cursor() {
                self.pos = nal.offset + nal.len;
                return Some(nal);
            }
            if self.loops_left > 1 {
                self.loops_left -= 1;
                self.pos = 0;
                debug!("Annex B: 到达码流末尾, 回绕到开头, 剩余循环 {}", self.loops_left);
                continue;
            }
            self.pos = self.data.len();
            return None;
        }
    }

    fn scan_from_cursor(&self) -> Option<ScannedNal> {
        let data = &self.data[..];
        let (offset, start_code_len) = find_start_code(data, self.pos)?;
        let header_pos = offset + start_code_len;
        let header = *data.get(header_pos)?;
        let nal_type = self.codec.nal_type(header);

        let end = find_start_code(data, header_pos + 1)
            .map(|(next, _)| next)
            .unwrap_or(data.len());

        Some(ScannedNal {
            nal_type,
            offset,
            len: end - offset,
            start_code_len,
        })
    }
}

/// 从 `from` 开始查找起始码, 返回 (偏移, 起始码长度)
///
/// 同一位置优先匹配 4 字节起始码.
pub fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 2 < data.len() {
        if data[i] == 0x00 && data[i + 1] == 0x00 {
            if i + 3 < data.len() && data[i + 2] == 0x00 && data[i + 3] == 0x01 {
                return Some((i, 4));
            }
            if data[i + 2] == 0x01 {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

/// 移除 emulation prevention 字节 (0x00 0x00 0x03 → 0x00 0x00)
///
/// NAL 负载中连续两个 0x00 之后会插入 0x03 防止与起始码混淆,
/// 参数集解析前需要移除.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03 {
            rbsp.push(0x00);
            rbsp.push(0x00);
            i += 3;
        } else {
            rbsp.push(data[i]);
            i += 1;
        }
    }

    rbsp
}
