//! 抗混叠处理 (Alias Reduction)
//!
//! 在相邻子带边界两侧各 8 条谱线上做蝶形运算, 抵消多相滤波器组的混叠.

use crate::tables::AA;

/// 对前 `nbands` 个子带边界做抗混叠
///
/// 长块为 31 个边界, 混合块只处理长块部分, 纯短块时 `nbands <= 0` 不做处理.
pub fn antialias(grbuf: &mut [f32], nbands: i32) {
    for band in 0..nbands.max(0) as usize {
        let base = band * 18;
        for i in 0..8 {
            let u = grbuf[base + 18 + i];
            let d = grbuf[base + 17 - i];
            grbuf[base + 18 + i] = u * AA[0][i] - d * AA[1][i];
            grbuf[base + 17 - i] = u * AA[1][i] + d * AA[0][i];
        }
    }
}
