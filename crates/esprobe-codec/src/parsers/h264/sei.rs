//! H.264 SEI 扫描, 仅提取 pic_timing 中的 pic_struct 用于隔行判定.

use esprobe_core::bitreader::BitReader;
use esprobe_core::{ProbeError, ProbeResult};
use log::debug;

use super::sps::H264Sps;

const SEI_TYPE_PIC_TIMING: u32 = 1;

/// SEI 负载类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeiPayloadType {
    /// 图像定时 (pic_timing)
    PicTiming,
    /// 其他类型, 直接跳过
    Other(u32),
}

impl SeiPayloadType {
    /// 从类型编号创建
    pub fn from_type_id(id: u32) -> Self {
        match id {
            SEI_TYPE_PIC_TIMING => Self::PicTiming,
            _ => Self::Other(id),
        }
    }
}

/// pic_struct (H.264 表 D-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PicStruct {
    /// 帧
    Frame = 0,
    /// 顶场
    TopField = 1,
    /// 底场
    BottomField = 2,
    /// 顶场 + 底场
    TopBottom = 3,
    /// 底场 + 顶场
    BottomTop = 4,
    /// 顶场 + 底场 + 顶场
    TopBottomTop = 5,
    /// 底场 + 顶场 + 底场
    BottomTopBottom = 6,
    /// 帧加倍
    FrameDoubling = 7,
    /// 帧三倍
    FrameTripling = 8,
}

impl PicStruct {
    /// 从 4 位码值创建, 超出 [0, 8] 返回 `None`
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Frame,
            1 => Self::TopField,
            2 => Self::BottomField,
            3 => Self::TopBottom,
            4 => Self::BottomTop,
            5 => Self::TopBottomTop,
            6 => Self::BottomTopBottom,
            7 => Self::FrameDoubling,
            8 => Self::FrameTripling,
            _ => return None,
        })
    }

    /// 是否表示场 (隔行) 内容
    pub fn is_interlaced(self) -> bool {
        self > Self::Frame
    }
}

/// SEI 扫描结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeiOutcome {
    /// 是否遇到 pic_timing
    pub pic_timing_found: bool,
    /// pic_timing 中的 pic_struct (SPS 声明存在时)
    pub pic_struct: Option<PicStruct>,
}

impl SeiOutcome {
    /// 隔行判定, 未得到 pic_struct 时返回 `None`
    pub fn interlaced(&self) -> Option<bool> {
        self.pic_struct.map(PicStruct::is_interlaced)
    }
}

/// 扫描 SEI NAL, 遇到 pic_timing 即返回
///
/// `buf` 以 1 字节 NAL 头部开始.
pub fn parse_sei(buf: &[u8], sps: &H264Sps) -> ProbeResult<SeiOutcome> {
    let mut br = BitReader::new(buf);
    br.skip_bits(8);

    while br.bits_left() > 16 && br.show_bits(16) != 0 {
        let payload_type = read_ff_coded(&mut br, "payload_type")?;
        let size = read_ff_coded(&mut br, "payload_size")?;
        if i64::from(size) > br.bits_left() / 8 {
            return Err(ProbeError::InvalidData(format!(
                "H.264: SEI type={} size={} 超出剩余数据",
                payload_type, size
            )));
        }
        let next = br.bits_read() + 8 * size as usize;

        match SeiPayloadType::from_type_id(payload_type) {
            SeiPayloadType::PicTiming => {
                let pic_struct = decode_picture_timing(&mut br, sps)?;
                debug!("H.264: SEI pic_timing, pic_struct={:?}", pic_struct);
                return Ok(SeiOutcome {
                    pic_timing_found: true,
                    pic_struct,
                });
            }
            SeiPayloadType::Other(id) => {
                debug!("H.264: 跳过 SEI type={}, size={}", id, size);
            }
        }

        br.skip_bits(next.saturating_sub(br.bits_read()));
        br.align_to_byte();
    }

    Ok(SeiOutcome::default())
}

/// 读取以 0xFF 续接的 SEI 类型/长度
fn read_ff_coded(br: &mut BitReader, name: &str) -> ProbeResult<u32> {
    let mut value = 0u32;
    loop {
        if br.bits_left() < 8 {
            return Err(ProbeError::Truncated(format!("H.264: SEI {name} 截断")));
        }
        let byte = br.read_bits(8);
        value = value.saturating_add(byte);
        if byte != 0xFF {
            return Ok(value);
        }
    }
}

fn decode_picture_timing(br: &mut BitReader, sps: &H264Sps) -> ProbeResult<Option<PicStruct>> {
    let Some(vui) = sps.vui.as_ref() else {
        return Ok(None);
    };
    if vui.hrd_present() {
        br.skip_bits(vui.hrd.cpb_removal_delay_length as usize);
        br.skip_bits(vui.hrd.dpb_output_delay_length as usize);
    }
    if !vui.pic_struct_present_flag {
        return Ok(None);
    }
    let code = br.read_bits(4);
    PicStruct::from_code(code).map(Some).ok_or_else(|| {
        ProbeError::InvalidData(format!("H.264: pic_struct 非法, value={}", code))
    })
}
