//! IVF 容器头与首个 VP9 帧头解析.
//!
//! IVF 文件结构 (小端):
//! ```text
//! 0   signature "DKIF" (4)       4  version (2)     6  header_len (2)
//! 8   fourcc (4)                 12 width (2)       14 height (2)
//! 16  timebase_den (4)           20 timebase_num (4)
//! 24  frame_count (4)            28 reserved (4)
//! 32  frame_size (4) + timestamp (8), 随后是帧数据
//! ```

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use esprobe_core::bitreader::BitReader;
use esprobe_core::{ProbeError, ProbeResult, Rational};
use log::{debug, warn};

/// IVF 文件头长度
pub const IVF_HEADER_LEN: usize = 32;
/// IVF 帧头长度
pub const IVF_FRAME_HEADER_LEN: usize = 12;
/// VP9 帧标记 (2 位)
const VP9_FRAME_MARKER: u32 = 2;
/// VP9 关键帧同步码
const VP9_SYNC_CODE: u32 = 0x49_83_42;
/// color_space = CS_RGB
const VP9_CS_RGB: u32 = 7;

/// IVF 头与首帧信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vp9HeaderInfo {
    /// VP9 profile (仅支持 0 与 2)
    pub profile: u8,
    /// IVF 文件头长度, 必须为 32
    pub header_len: u16,
    /// IVF 版本
    pub version: u16,
    pub fourcc: [u8; 4],
    pub width: u32,
    pub height: u32,
    /// 帧率 timebase_den / timebase_num
    pub frame_rate: Rational,
    /// IVF 头中声明的总帧数
    pub frame_count: u32,
    /// 首帧数据长度
    pub first_frame_size: u32,
    /// 位深, 首帧为关键帧时从 color_config 读取, 否则按 profile 推断
    pub bit_depth: u32,
    /// 首帧是否为关键帧
    pub key_frame: bool,
}

impl Vp9HeaderInfo {
    /// FourCC 字符串
    pub fn fourcc_str(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).into_owned()
    }
}

/// 解析 IVF 头、首帧帧头以及 VP9 帧头开头的标记与 profile
pub fn parse_ivf_header(data: &[u8]) -> ProbeResult<Vp9HeaderInfo> {
    if data.len() < IVF_HEADER_LEN + IVF_FRAME_HEADER_LEN + 1 {
        return Err(ProbeError::Truncated(format!(
            "VP9: IVF 数据不足, 长度={}",
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    cursor.set_position(4); // signature 不校验
    let version = cursor.read_u16::<LittleEndian>()?;
    let header_len = cursor.read_u16::<LittleEndian>()?;
    if header_len as usize != IVF_HEADER_LEN {
        return Err(ProbeError::InvalidData(format!(
            "VP9: IVF 头长度非法, value={}",
            header_len
        )));
    }

    let mut fourcc = [0u8; 4];
    fourcc.copy_from_slice(&data[8..12]);
    cursor.set_position(12);
    let width = u32::from(cursor.read_u16::<LittleEndian>()?);
    let height = u32::from(cursor.read_u16::<LittleEndian>()?);
    let timebase_den = cursor.read_u32::<LittleEndian>()?;
    let timebase_num = cursor.read_u32::<LittleEndian>()?;
    let frame_count = cursor.read_u32::<LittleEndian>()?;
    let _reserved = cursor.read_u32::<LittleEndian>()?;

    if &fourcc != b"VP90" {
        warn!(
            "VP9: IVF FourCC 为 {:?}, 按 VP9 继续解析",
            String::from_utf8_lossy(&fourcc)
        );
    }

    let first_frame_size = cursor.read_u32::<LittleEndian>()?;
    let _timestamp = cursor.read_u64::<LittleEndian>()?;
    if first_frame_size == 0 {
        return Err(ProbeError::InvalidData("VP9: 首帧长度为 0".into()));
    }

    let frame = &data[IVF_HEADER_LEN + IVF_FRAME_HEADER_LEN..];
    let frame = &frame[..frame.len().min(first_frame_size as usize)];
    let (profile, key_frame, bit_depth) = parse_frame_start(frame)?;

    let frame_rate = if timebase_den == 0 || timebase_num == 0 {
        Rational::UNDEFINED
    } else {
        Rational::from_u64(u64::from(timebase_den), u64::from(timebase_num))
    };

    let info = Vp9HeaderInfo {
        profile,
        header_len,
        version,
        fourcc,
        width,
        height,
        frame_rate,
        frame_count,
        first_frame_size,
        bit_depth,
        key_frame,
    };
    debug!(
        "VP9: IVF {}x{}, fourcc={}, fps={}, frames={}, profile={}, depth={}",
        info.width,
        info.height,
        info.fourcc_str(),
        info.frame_rate,
        info.frame_count,
        info.profile,
        info.bit_depth
    );
    Ok(info)
}

/// 读取 frame_marker / profile, 关键帧时继续读取位深
///
/// 返回 (profile, 是否关键帧, 位深).
fn parse_frame_start(frame: &[u8]) -> ProbeResult<(u8, bool, u32)> {
    let mut br = BitReader::new(frame);

    let marker = br.read_bits(2);
    if marker != VP9_FRAME_MARKER {
        return Err(ProbeError::InvalidData(format!(
            "VP9: frame_marker 非法, value={}",
            marker
        )));
    }

    let low = br.read_bit();
    let high = br.read_bit();
    let profile = (low | (high << 1)) as u8;
    if profile != 0 && profile != 2 {
        return Err(ProbeError::Unsupported(format!(
            "VP9: 不支持 profile {}",
            profile
        )));
    }

    let default_depth = if profile == 2 { 10 } else { 8 };

    // show_existing_frame
    if br.read_flag() {
        return Ok((profile, false, default_depth));
    }
    let key_frame = !br.read_flag(); // frame_type: 0 = KEY_FRAME
    if !key_frame {
        return Ok((profile, false, default_depth));
    }
    br.skip_bits(2); // show_frame, error_resilient_mode

    if br.bits_left() < 24 + 4 {
        warn!("VP9: 关键帧头过短, 位深按 profile 推断");
        return Ok((profile, true, default_depth));
    }
    let sync = br.read_bits(24);
    if sync != VP9_SYNC_CODE {
        return Err(ProbeError::InvalidData(format!(
            "VP9: 同步码非法, value={:#08x}",
            sync
        )));
    }

    let bit_depth = if profile >= 2 {
        if br.read_flag() { 12 } else { 10 }
    } else {
        8
    };
    let color_space = br.read_bits(3);
    if color_space == VP9_CS_RGB {
        return Err(ProbeError::Unsupported(
            "VP9: profile 0/2 不支持 RGB 色彩空间".into(),
        ));
    }
    Ok((profile, true, bit_depth))
}
