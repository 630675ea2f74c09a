//! H.265 缩放列表 (scaling_list_data) 解析.

use esprobe_core::bitreader::BitReader;
use esprobe_core::{ProbeError, ProbeResult};

/// 8x8 帧内默认缩放矩阵 (光栅顺序)
const DEFAULT_SCALING_LIST_INTRA: [u8; 64] = [
    16, 16, 16, 16, 17, 18, 21, 24, //
    16, 16, 16, 16, 17, 19, 22, 25, //
    16, 16, 17, 18, 20, 22, 25, 29, //
    16, 16, 18, 21, 24, 27, 31, 36, //
    17, 17, 20, 24, 30, 35, 41, 47, //
    18, 19, 22, 27, 35, 44, 54, 65, //
    21, 22, 25, 31, 41, 54, 70, 88, //
    24, 25, 29, 36, 47, 65, 88, 115,
];

/// 8x8 帧间默认缩放矩阵 (光栅顺序)
const DEFAULT_SCALING_LIST_INTER: [u8; 64] = [
    16, 16, 16, 16, 17, 18, 20, 24, //
    16, 16, 16, 17, 18, 20, 24, 25, //
    16, 16, 17, 18, 20, 24, 25, 28, //
    16, 17, 18, 20, 24, 25, 28, 33, //
    17, 18, 20, 24, 25, 28, 33, 41, //
    18, 20, 24, 25, 28, 33, 41, 54, //
    20, 24, 25, 28, 33, 41, 54, 71, //
    24, 25, 28, 33, 41, 54, 71, 91,
];

/// 右上对角扫描, 返回每个扫描位置对应的 (x, y)
const fn diag_scan<const N: usize, const LEN: usize>() -> [(u8, u8); LEN] {
    let mut table = [(0u8, 0u8); LEN];
    let mut i = 0;
    let mut d = 0;
    while d < 2 * N - 1 {
        let mut y = if d < N { d } else { N - 1 };
        loop {
            let x = d - y;
            if x < N {
                table[i] = (x as u8, y as u8);
                i += 1;
            }
            if y == 0 || x >= N - 1 {
                break;
            }
            y -= 1;
        }
        d += 1;
    }
    table
}

/// 4x4 对角扫描顺序
pub const DIAG_SCAN_4X4: [(u8, u8); 16] = diag_scan::<4, 16>();
/// 8x8 对角扫描顺序
pub const DIAG_SCAN_8X8: [(u8, u8); 64] = diag_scan::<8, 64>();

/// 缩放列表
///
/// `sl[size_id][matrix_id]` 对 size_id=0 只使用前 16 项.
/// `sl_dc[size_id - 2][matrix_id]` 为 16x16 / 32x32 的 DC 系数.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingList {
    pub sl: [[[u8; 64]; 6]; 4],
    pub sl_dc: [[u8; 6]; 2],
}

impl Default for ScalingList {
    /// 默认缩放列表: 4x4 全 16, 更大尺寸按帧内/帧间默认表
    fn default() -> Self {
        let mut sl = [[[16u8; 64]; 6]; 4];
        for size in sl.iter_mut().skip(1) {
            for (matrix_id, matrix) in size.iter_mut().enumerate() {
                *matrix = if matrix_id < 3 {
                    DEFAULT_SCALING_LIST_INTRA
                } else {
                    DEFAULT_SCALING_LIST_INTER
                };
            }
        }
        Self {
            sl,
            sl_dc: [[16; 6]; 2],
        }
    }
}

/// 解析 scaling_list_data(), 在 `sl` 已有内容的基础上覆盖
pub fn scaling_list_data(
    br: &mut BitReader,
    sl: &mut ScalingList,
    chroma_format_idc: u32,
) -> ProbeResult<()> {
    for size_id in 0..4usize {
        let step = if size_id == 3 { 3 } else { 1 };
        for matrix_id in (0..6usize).step_by(step) {
            let pred_mode_flag = br.read_flag();
            if !pred_mode_flag {
                let delta = br.read_ue()? as usize * step;
                // delta 为 0 表示使用默认值, 已在 sl 中
                if delta == 0 {
                    continue;
                }
                if delta > matrix_id {
                    return Err(ProbeError::InvalidData(format!(
                        "H.265: scaling_list_pred_matrix_id_delta 非法, value={}, matrix_id={}",
                        delta, matrix_id
                    )));
                }
                let len = if size_id > 0 { 64 } else { 16 };
                let src = sl.sl[size_id][matrix_id - delta];
                sl.sl[size_id][matrix_id][..len].copy_from_slice(&src[..len]);
                if size_id > 1 {
                    sl.sl_dc[size_id - 2][matrix_id] = sl.sl_dc[size_id - 2][matrix_id - delta];
                }
            } else {
                let mut next_coef: i32 = 8;
                let coef_num = 64.min(1usize << (4 + (size_id << 1)));
                if size_id > 1 {
                    let dc_minus8 = br.read_se()?;
                    if !(-7..=247).contains(&dc_minus8) {
                        return Err(ProbeError::InvalidData(format!(
                            "H.265: scaling_list_dc_coef_minus8 非法, value={}",
                            dc_minus8
                        )));
                    }
                    next_coef = dc_minus8 + 8;
                    sl.sl_dc[size_id - 2][matrix_id] = next_coef as u8;
                }
                for i in 0..coef_num {
                    let pos = if size_id == 0 {
                        let (x, y) = DIAG_SCAN_4X4[i];
                        4 * y as usize + x as usize
                    } else {
                        let (x, y) = DIAG_SCAN_8X8[i];
                        8 * y as usize + x as usize
                    };
                    let delta_coef = br.read_se()?;
                    if !(-128..=127).contains(&delta_coef) {
                        return Err(ProbeError::InvalidData(format!(
                            "H.265: scaling_list_delta_coef 非法, value={}",
                            delta_coef
                        )));
                    }
                    next_coef = (next_coef + 256 + delta_coef).rem_euclid(256);
                    sl.sl[size_id][matrix_id][pos] = next_coef as u8;
                }
            }
        }
    }

    if chroma_format_idc == 3 {
        for matrix_id in [1, 2, 4, 5] {
            sl.sl[3][matrix_id] = sl.sl[2][matrix_id];
            sl.sl_dc[1][matrix_id] = sl.sl_dc[0][matrix_id];
        }
    }

    Ok(())
}
