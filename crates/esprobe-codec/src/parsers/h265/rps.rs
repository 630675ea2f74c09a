//! H.265 短期参考图像集 (short-term RPS) 解析.

use esprobe_core::bitreader::BitReader;
use esprobe_core::{ProbeError, ProbeResult};

/// 单个 RPS 可容纳的 delta POC 数量
pub const MAX_DELTA_POCS: usize = 32;
/// 直接编码路径中正/负方向的参考数上限
pub const MAX_REFS: u32 = 16;
/// abs_delta_rps / delta_poc 的上限
const MAX_DELTA: u32 = 32768;

/// 短期参考图像集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortTermRps {
    pub num_negative_pics: u32,
    pub num_delta_pocs: u32,
    /// 前 num_negative_pics 项为负值 (绝对值从小到大), 其后为正值升序
    pub delta_poc: [i32; MAX_DELTA_POCS],
    pub used: [bool; MAX_DELTA_POCS],
    /// 从切片头预测时参考 RPS 的 num_delta_pocs
    pub rps_idx_num_delta_pocs: u32,
}

impl Default for ShortTermRps {
    fn default() -> Self {
        Self {
            num_negative_pics: 0,
            num_delta_pocs: 0,
            delta_poc: [0; MAX_DELTA_POCS],
            used: [false; MAX_DELTA_POCS],
            rps_idx_num_delta_pocs: 0,
        }
    }
}

impl ShortTermRps {
    /// 有效的 delta POC 切片
    pub fn delta_pocs(&self) -> &[i32] {
        &self.delta_poc[..self.num_delta_pocs as usize]
    }
}

/// 解析 st_ref_pic_set()
///
/// `previous` 为 SPS 中已解析的 RPS. 在 SPS 内调用时传入当前项之前的部分,
/// 在切片头中调用时传入 SPS 的全部 RPS 并设置 `is_slice_header`.
pub fn decode_short_term_rps(
    br: &mut BitReader,
    previous: &[ShortTermRps],
    is_slice_header: bool,
) -> ProbeResult<ShortTermRps> {
    let mut rps = ShortTermRps::default();

    let predict = !previous.is_empty() && br.read_flag();
    if predict {
        let reference = if is_slice_header {
            let delta_idx = br.read_ue()?.saturating_add(1) as usize;
            if delta_idx > previous.len() {
                return Err(ProbeError::InvalidData(format!(
                    "H.265: RPS delta_idx 非法, value={}, 已有 {}",
                    delta_idx,
                    previous.len()
                )));
            }
            let reference = &previous[previous.len() - delta_idx];
            rps.rps_idx_num_delta_pocs = reference.num_delta_pocs;
            reference
        } else {
            &previous[previous.len() - 1]
        };
        predict_from(br, reference, &mut rps)?;
    } else {
        decode_direct(br, &mut rps)?;
    }

    Ok(rps)
}

fn predict_from(
    br: &mut BitReader,
    reference: &ShortTermRps,
    rps: &mut ShortTermRps,
) -> ProbeResult<()> {
    let sign = br.read_flag();
    let abs_delta_rps = br.read_ue()?.saturating_add(1);
    if !(1..=MAX_DELTA).contains(&abs_delta_rps) {
        return Err(ProbeError::InvalidData(format!(
            "H.265: abs_delta_rps 非法, value={}",
            abs_delta_rps
        )));
    }
    let delta_rps = if sign {
        -(abs_delta_rps as i32)
    } else {
        abs_delta_rps as i32
    };

    let ref_count = reference.num_delta_pocs as usize;
    let mut k = 0usize;
    let mut k0 = 0u32;
    for i in 0..=ref_count {
        let used = br.read_flag();
        let use_delta = if used { false } else { br.read_flag() };
        if !(used || use_delta) {
            continue;
        }
        if k >= MAX_DELTA_POCS {
            return Err(ProbeError::InvalidData(format!(
                "H.265: 预测 RPS 项数超出容量 {}",
                MAX_DELTA_POCS
            )));
        }
        let delta_poc = if i < ref_count {
            delta_rps + reference.delta_poc[i]
        } else {
            delta_rps
        };
        rps.delta_poc[k] = delta_poc;
        rps.used[k] = used;
        if delta_poc < 0 {
            k0 += 1;
        }
        k += 1;
    }
    if k >= MAX_DELTA_POCS {
        return Err(ProbeError::InvalidData(format!(
            "H.265: 预测 RPS 项数超出容量 {}",
            MAX_DELTA_POCS
        )));
    }

    rps.num_delta_pocs = k as u32;
    rps.num_negative_pics = k0;

    // 插入排序为升序, used 随值移动
    for i in 1..k {
        let delta_poc = rps.delta_poc[i];
        let used = rps.used[i];
        for j in (0..i).rev() {
            let tmp = rps.delta_poc[j];
            if delta_poc < tmp {
                rps.delta_poc[j + 1] = tmp;
                rps.used[j + 1] = rps.used[j];
                rps.delta_poc[j] = delta_poc;
                rps.used[j] = used;
            }
        }
    }

    // 仅翻转负值部分, 使其按绝对值从小到大排列
    let negatives = k0 as usize;
    rps.delta_poc[..negatives].reverse();
    rps.used[..negatives].reverse();

    Ok(())
}

fn decode_direct(br: &mut BitReader, rps: &mut ShortTermRps) -> ProbeResult<()> {
    let num_negative = br.read_ue()?;
    let num_positive = br.read_ue()?;
    if num_negative >= MAX_REFS || num_positive >= MAX_REFS {
        return Err(ProbeError::InvalidData(format!(
            "H.265: RPS 参考数非法, negative={}, positive={}",
            num_negative, num_positive
        )));
    }

    rps.num_negative_pics = num_negative;
    rps.num_delta_pocs = num_negative + num_positive;

    let mut prev = 0i32;
    for i in 0..num_negative as usize {
        prev -= read_delta_poc(br)?;
        rps.delta_poc[i] = prev;
        rps.used[i] = br.read_flag();
    }

    prev = 0;
    for i in 0..num_positive as usize {
        prev += read_delta_poc(br)?;
        let idx = num_negative as usize + i;
        rps.delta_poc[idx] = prev;
        rps.used[idx] = br.read_flag();
    }

    Ok(())
}

fn read_delta_poc(br: &mut BitReader) -> ProbeResult<i32> {
    let delta = br.read_ue()?.saturating_add(1);
    if !(1..=MAX_DELTA).contains(&delta) {
        return Err(ProbeError::InvalidData(format!(
            "H.265: delta_poc 非法, value={}",
            delta
        )));
    }
    Ok(delta as i32)
}
