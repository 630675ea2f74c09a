//! H.265/HEVC NAL 单元类型与头部.
//!
//! HEVC NAL 头部为 2 字节:
//! - forbidden_zero_bit (1 bit)
//! - nal_unit_type (6 bits)
//! - nuh_layer_id (6 bits)
//! - nuh_temporal_id_plus1 (3 bits)

use esprobe_core::{ProbeError, ProbeResult};

/// HEVC NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HevcNalUnitType {
    /// TRAIL_N
    TrailN,
    /// TRAIL_R
    TrailR,
    /// TSA_N
    TsaN,
    /// TSA_R
    TsaR,
    /// STSA_N
    StsaN,
    /// STSA_R
    StsaR,
    /// RADL_N
    RadlN,
    /// RADL_R
    RadlR,
    /// RASL_N
    RaslN,
    /// RASL_R
    RaslR,
    /// BLA_W_LP
    BlaWLp,
    /// BLA_W_RADL
    BlaWRadl,
    /// BLA_N_LP
    BlaNLp,
    /// IDR_W_RADL
    IdrWRadl,
    /// IDR_N_LP
    IdrNLp,
    /// CRA_NUT
    Cra,
    /// VPS
    Vps,
    /// SPS
    Sps,
    /// PPS
    Pps,
    /// AUD
    Aud,
    /// EOS
    Eos,
    /// EOB
    Eob,
    /// FD
    FillerData,
    /// PREFIX_SEI
    PrefixSei,
    /// SUFFIX_SEI
    SuffixSei,
    /// 保留或未指定的类型
    Unknown(u8),
}

impl HevcNalUnitType {
    /// 从类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        match id {
            0 => Self::TrailN,
            1 => Self::TrailR,
            2 => Self::TsaN,
            3 => Self::TsaR,
            4 => Self::StsaN,
            5 => Self::StsaR,
            6 => Self::RadlN,
            7 => Self::RadlR,
            8 => Self::RaslN,
            9 => Self::RaslR,
            16 => Self::BlaWLp,
            17 => Self::BlaWRadl,
            18 => Self::BlaNLp,
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::Cra,
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            35 => Self::Aud,
            36 => Self::Eos,
            37 => Self::Eob,
            38 => Self::FillerData,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            _ => Self::Unknown(id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::TrailN => 0,
            Self::TrailR => 1,
            Self::TsaN => 2,
            Self::TsaR => 3,
            Self::StsaN => 4,
            Self::StsaR => 5,
            Self::RadlN => 6,
            Self::RadlR => 7,
            Self::RaslN => 8,
            Self::RaslR => 9,
            Self::BlaWLp => 16,
            Self::BlaWRadl => 17,
            Self::BlaNLp => 18,
            Self::IdrWRadl => 19,
            Self::IdrNLp => 20,
            Self::Cra => 21,
            Self::Vps => 32,
            Self::Sps => 33,
            Self::Pps => 34,
            Self::Aud => 35,
            Self::Eos => 36,
            Self::Eob => 37,
            Self::FillerData => 38,
            Self::PrefixSei => 39,
            Self::SuffixSei => 40,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL NAL (类型 0..=31, 含保留类型)
    pub fn is_vcl(&self) -> bool {
        self.type_id() < 32
    }
}

/// HEVC NAL 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HevcNalHeader {
    /// NAL 单元类型
    pub nal_type: HevcNalUnitType,
    /// nuh_layer_id
    pub layer_id: u8,
    /// TemporalId (nuh_temporal_id_plus1 - 1)
    pub temporal_id: u8,
}

impl HevcNalHeader {
    /// 解析 2 字节 NAL 头部
    pub fn parse(data: &[u8]) -> ProbeResult<Self> {
        let [b0, b1, ..] = *data else {
            return Err(ProbeError::InvalidData("HEVC: NAL 头部不足 2 字节".into()));
        };
        if b0 & 0x80 != 0 {
            return Err(ProbeError::InvalidData(
                "HEVC: forbidden_zero_bit 非法, value=1".into(),
            ));
        }
        let tid_plus1 = b1 & 0x07;
        if tid_plus1 == 0 {
            return Err(ProbeError::InvalidData(
                "HEVC: nuh_temporal_id_plus1 不能为 0".into(),
            ));
        }
        Ok(Self {
            nal_type: HevcNalUnitType::from_type_id((b0 >> 1) & 0x3F),
            layer_id: ((b0 & 0x01) << 5) | (b1 >> 3),
            temporal_id: tid_plus1 - 1,
        })
    }
}
