//! H.264 NAL 单元类型与头部.
//!
//! # NAL 头部 (1 字节)
//! ```text
//! ┌─────────────────────────────────────┐
//! │ forbidden(1) | ref_idc(2) | type(5) │
//! └─────────────────────────────────────┘
//! ```

use esprobe_core::{ProbeError, ProbeResult};

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NalUnitType {
    /// 非 IDR 图像切片 (P/B slice)
    Slice,
    /// 数据分区 A
    SliceDpa,
    /// 数据分区 B
    SliceDpb,
    /// 数据分区 C
    SliceDpc,
    /// IDR 图像切片
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// 未知或不关心的类型
    Unknown(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            1 => Self::Slice,
            2 => Self::SliceDpa,
            3 => Self::SliceDpb,
            4 => Self::SliceDpc,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            _ => Self::Unknown(type_id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SliceDpa => 2,
            Self::SliceDpb => 3,
            Self::SliceDpc => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice | Self::SliceDpa | Self::SliceDpb | Self::SliceDpc | Self::SliceIdr
        )
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDpa => write!(f, "SliceDPA"),
            Self::SliceDpb => write!(f, "SliceDPB"),
            Self::SliceDpc => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
        }
    }
}

/// NAL 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    /// NAL 单元类型
    pub nal_type: NalUnitType,
    /// nal_ref_idc (0-3)
    pub ref_idc: u8,
}

impl NalHeader {
    /// 解析 NAL 头部字节
    pub fn parse(data: &[u8]) -> ProbeResult<Self> {
        let Some(&header) = data.first() else {
            return Err(ProbeError::InvalidData("H.264: NAL 单元数据为空".into()));
        };
        if header & 0x80 != 0 {
            return Err(ProbeError::InvalidData(
                "H.264: forbidden_zero_bit 非法, value=1".into(),
            ));
        }
        Ok(Self {
            nal_type: NalUnitType::from_type_id(header & 0x1F),
            ref_idc: (header >> 5) & 0x03,
        })
    }
}
