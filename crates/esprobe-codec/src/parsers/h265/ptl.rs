//! H.265 profile_tier_level 解析.

use esprobe_core::bitreader::BitReader;
use esprobe_core::{ProbeError, ProbeResult};
use log::debug;

/// 子层 PTL 最大数量 (max_sub_layers - 1)
pub const MAX_SUB_LAYER_PTL: usize = 6;

/// 单个 PTL 块至少需要的位数
const PTL_COMMON_BITS: i64 = 2 + 1 + 5 + 32 + 4 + 43 + 1;

/// 通用 / 子层共用的 profile_tier_level 字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PtlCommon {
    pub profile_space: u8,
    pub tier_flag: bool,
    /// profile_idc, 为 0 时会被首个兼容标志回填
    pub profile_idc: u8,
    pub profile_compatibility_flag: [bool; 32],
    pub progressive_source_flag: bool,
    pub interlaced_source_flag: bool,
    pub non_packed_constraint_flag: bool,
    pub frame_only_constraint_flag: bool,
    pub max_12bit_constraint_flag: bool,
    pub max_10bit_constraint_flag: bool,
    pub max_8bit_constraint_flag: bool,
    pub max_422chroma_constraint_flag: bool,
    pub max_420chroma_constraint_flag: bool,
    pub max_monochrome_constraint_flag: bool,
    pub intra_constraint_flag: bool,
    pub one_picture_only_constraint_flag: bool,
    pub lower_bit_rate_constraint_flag: bool,
    pub max_14bit_constraint_flag: bool,
    pub inbld_flag: bool,
    pub level_idc: u8,
}

impl PtlCommon {
    /// profile_idc 等于 `idc` 或兼容标志 `idc` 置位
    pub fn has_profile(&self, idc: u8) -> bool {
        self.profile_idc == idc
            || self
                .profile_compatibility_flag
                .get(idc as usize)
                .copied()
                .unwrap_or(false)
    }

    fn has_any_profile(&self, idcs: &[u8]) -> bool {
        idcs.iter().any(|&idc| self.has_profile(idc))
    }
}

/// 完整 PTL: 通用层加最多 6 个子层
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ptl {
    pub general: PtlCommon,
    pub sub_layer_profile_present_flag: [bool; MAX_SUB_LAYER_PTL],
    pub sub_layer_level_present_flag: [bool; MAX_SUB_LAYER_PTL],
    pub sub_layer: [PtlCommon; MAX_SUB_LAYER_PTL],
}

/// 解析 profile_tier_level 公共部分 (不含 level_idc)
pub fn decode_profile_tier_level(br: &mut BitReader) -> ProbeResult<PtlCommon> {
    if br.bits_left() < PTL_COMMON_BITS {
        return Err(ProbeError::Truncated(format!(
            "H.265: PTL 数据不足, 剩余 {} 位",
            br.bits_left()
        )));
    }

    let mut ptl = PtlCommon {
        profile_space: br.read_bits(2) as u8,
        tier_flag: br.read_flag(),
        profile_idc: br.read_bits(5) as u8,
        ..PtlCommon::default()
    };

    for i in 0..32 {
        let flag = br.read_flag();
        ptl.profile_compatibility_flag[i] = flag;
        if ptl.profile_idc == 0 && i > 0 && flag {
            ptl.profile_idc = i as u8;
        }
    }

    ptl.progressive_source_flag = br.read_flag();
    ptl.interlaced_source_flag = br.read_flag();
    ptl.non_packed_constraint_flag = br.read_flag();
    ptl.frame_only_constraint_flag = br.read_flag();

    if ptl.has_any_profile(&[4, 5, 6, 7, 8, 9, 10]) {
        ptl.max_12bit_constraint_flag = br.read_flag();
        ptl.max_10bit_constraint_flag = br.read_flag();
        ptl.max_8bit_constraint_flag = br.read_flag();
        ptl.max_422chroma_constraint_flag = br.read_flag();
        ptl.max_420chroma_constraint_flag = br.read_flag();
        ptl.max_monochrome_constraint_flag = br.read_flag();
        ptl.intra_constraint_flag = br.read_flag();
        ptl.one_picture_only_constraint_flag = br.read_flag();
        ptl.lower_bit_rate_constraint_flag = br.read_flag();

        if ptl.has_any_profile(&[5, 9, 10]) {
            ptl.max_14bit_constraint_flag = br.read_flag();
            br.skip_bits(33);
        } else {
            br.skip_bits(34);
        }
    } else if ptl.has_profile(2) {
        br.skip_bits(7);
        ptl.one_picture_only_constraint_flag = br.read_flag();
        br.skip_bits(35);
    } else {
        br.skip_bits(43);
    }

    if ptl.has_any_profile(&[1, 2, 3, 4, 5, 9]) {
        ptl.inbld_flag = br.read_flag();
    } else {
        br.skip_bits(1);
    }

    Ok(ptl)
}

/// 解析通用层与子层 PTL
pub fn parse_ptl(br: &mut BitReader, max_sub_layers: u32) -> ProbeResult<Ptl> {
    let sub_layers = (max_sub_layers.saturating_sub(1) as usize).min(MAX_SUB_LAYER_PTL);

    let general = decode_profile_tier_level(br)?;
    let need = 8 + if sub_layers > 0 { 8 * 2 } else { 0 };
    if br.bits_left() < need {
        return Err(ProbeError::Truncated(
            "H.265: PTL 信息过短".into(),
        ));
    }

    let mut ptl = Ptl {
        general,
        ..Ptl::default()
    };
    ptl.general.level_idc = br.read_bits(8) as u8;

    for i in 0..sub_layers {
        ptl.sub_layer_profile_present_flag[i] = br.read_flag();
        ptl.sub_layer_level_present_flag[i] = br.read_flag();
    }
    if sub_layers > 0 {
        for _ in sub_layers..8 {
            br.skip_bits(2); // reserved_zero_2bits
        }
    }

    for i in 0..sub_layers {
        if ptl.sub_layer_profile_present_flag[i] {
            ptl.sub_layer[i] = decode_profile_tier_level(br).map_err(|_| {
                ProbeError::Truncated(format!("H.265: 子层 {} PTL 信息过短", i))
            })?;
        }
        if ptl.sub_layer_level_present_flag[i] {
            if br.bits_left() < 8 {
                return Err(ProbeError::Truncated(format!(
                    "H.265: 子层 {} level_idc 数据不足",
                    i
                )));
            }
            ptl.sub_layer[i].level_idc = br.read_bits(8) as u8;
        }
    }

    debug!(
        "H.265: PTL profile_idc={}, tier={}, level_idc={}",
        ptl.general.profile_idc, ptl.general.tier_flag, ptl.general.level_idc
    );
    Ok(ptl)
}
