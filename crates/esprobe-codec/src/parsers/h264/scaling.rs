//! H.264 量化矩阵 (scaling matrix) 解析.
//!
//! 每个矩阵要么未写入 (沿用回退矩阵), 要么以 zig-zag 顺序逐个给出与前一系数的差值.
//! 第一个位置解出 0 表示使用 JVT 默认矩阵.

use esprobe_core::bitreader::BitReader;
use esprobe_core::{ProbeError, ProbeResult};

/// 4x4 zig-zag 扫描顺序
pub const ZIGZAG_SCAN_4X4: [u8; 16] = [0, 1, 4, 8, 5, 2, 3, 6, 9, 12, 13, 10, 7, 11, 14, 15];

/// 8x8 zig-zag 扫描顺序
pub const ZIGZAG_DIRECT_8X8: [u8; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// JVT 默认 4x4 矩阵: [Intra, Inter]
pub const DEFAULT_SCALING_4X4: [[u8; 16]; 2] = [
    [6, 13, 20, 28, 13, 20, 28, 32, 20, 28, 32, 37, 28, 32, 37, 42],
    [10, 14, 20, 24, 14, 20, 24, 27, 20, 24, 27, 30, 24, 27, 30, 34],
];

/// JVT 默认 8x8 矩阵: [Intra, Inter]
pub const DEFAULT_SCALING_8X8: [[u8; 64]; 2] = [
    [
        6, 10, 13, 16, 18, 23, 25, 27, 10, 11, 16, 18, 23, 25, 27, 29, 13, 16, 18, 23, 25, 27, 29,
        31, 16, 18, 23, 25, 27, 29, 31, 33, 18, 23, 25, 27, 29, 31, 33, 36, 23, 25, 27, 29, 31, 33,
        36, 38, 25, 27, 29, 31, 33, 36, 38, 40, 27, 29, 31, 33, 36, 38, 40, 42,
    ],
    [
        9, 13, 15, 17, 19, 21, 22, 24, 13, 13, 17, 19, 21, 22, 24, 25, 15, 17, 19, 21, 22, 24, 25,
        27, 17, 19, 21, 22, 24, 25, 27, 28, 19, 21, 22, 24, 25, 27, 28, 30, 21, 22, 24, 25, 27, 28,
        30, 32, 22, 24, 25, 27, 28, 30, 32, 33, 24, 25, 27, 28, 30, 32, 33, 35,
    ],
];

/// 平坦矩阵 (全部为 16), SPS 未携带量化矩阵时使用
pub const FLAT_4X4: [[u8; 16]; 6] = [[16; 16]; 6];
/// 平坦 8x8 矩阵
pub const FLAT_8X8: [[u8; 64]; 6] = [[16; 64]; 6];

/// 解码单个量化矩阵
///
/// `factors.len()` 为 16 时使用 4x4 扫描表, 否则为 64 使用 8x8 扫描表.
/// - 未写入: 拷贝 `fallback_list`
/// - 首个位置解出 0: 拷贝 `jvt_list`
pub fn decode_scaling_list(
    br: &mut BitReader,
    factors: &mut [u8],
    jvt_list: &[u8],
    fallback_list: &[u8],
) -> ProbeResult<()> {
    let size = factors.len();
    let scan: &[u8] = if size == 16 {
        &ZIGZAG_SCAN_4X4
    } else {
        &ZIGZAG_DIRECT_8X8
    };

    if !br.read_flag() {
        factors.copy_from_slice(&fallback_list[..size]);
        return Ok(());
    }

    let mut last: u32 = 8;
    let mut next: u32 = 8;
    for (i, &pos) in scan.iter().enumerate().take(size) {
        if next != 0 {
            let delta = br.read_se()?;
            if !(-128..=127).contains(&delta) {
                return Err(ProbeError::InvalidData(format!(
                    "H.264: delta_scale 非法, value={}",
                    delta
                )));
            }
            next = (last as i32 + delta) as u32 & 0xff;
        }
        if i == 0 && next == 0 {
            factors.copy_from_slice(&jvt_list[..size]);
            break;
        }
        if next != 0 {
            last = next;
        }
        factors[pos as usize] = last as u8;
    }
    Ok(())
}

/// 解码 SPS 中的全部量化矩阵
///
/// 返回 `Ok(false)` 表示 seq_scaling_matrix_present_flag 为 0 (矩阵保持不变),
/// `Ok(true)` 表示成功读取. 8x8 的 Cr/Cb 矩阵仅在 4:4:4 下出现.
pub fn decode_scaling_matrices(
    br: &mut BitReader,
    chroma_format_idc: u32,
    matrix4: &mut [[u8; 16]; 6],
    matrix8: &mut [[u8; 64]; 6],
) -> ProbeResult<bool> {
    if !br.read_flag() {
        return Ok(false);
    }

    let [intra4, inter4] = &DEFAULT_SCALING_4X4;
    let [intra8, inter8] = &DEFAULT_SCALING_8X8;

    // Intra Y/Cr/Cb, Inter Y/Cr/Cb; 每组首个矩阵回退到默认矩阵
    for i in 0..6 {
        let jvt = if i < 3 { intra4 } else { inter4 };
        let fallback = if i == 0 || i == 3 { *jvt } else { matrix4[i - 1] };
        decode_scaling_list(br, &mut matrix4[i], jvt, &fallback)?;
    }

    decode_scaling_list(br, &mut matrix8[0], intra8, intra8)?;
    decode_scaling_list(br, &mut matrix8[3], inter8, inter8)?;
    if chroma_format_idc == 3 {
        // 读取顺序: Intra Cr, Inter Cr, Intra Cb, Inter Cb
        for (idx, jvt) in [(1, intra8), (4, inter8), (2, intra8), (5, inter8)] {
            let fallback = matrix8[idx - 1];
            decode_scaling_list(br, &mut matrix8[idx], jvt, &fallback)?;
        }
    }

    Ok(true)
}
