//! 短块重排序 (Reordering)
//!
//! Huffman 输出按 `频带 -> 窗口 -> 频率` 排列, IMDCT 期望同一频率的三个
//! 窗口相邻: `[w0 f0, w1 f0, w2 f0, w0 f1, ...]`.

/// 重排短块部分的系数
///
/// `grbuf` 从第一个短块频带开始, `sfb` 为对应的频带宽度表 (每个频带重复三次,
/// 以 0 结尾). `scratch` 至少能容纳全部短块系数. 超出 `grbuf` 的频带被丢弃
/// (MPEG-2.5 8 kHz 混合块的频带表比 granule 剩余部分更长).
pub fn reorder(grbuf: &mut [f32], scratch: &mut [f32], sfb: &[u8]) {
    let mut src = 0usize;
    let mut dst = 0usize;
    for &len in sfb.iter().step_by(3).take_while(|&&w| w != 0) {
        let len = usize::from(len);
        if src + 3 * len > grbuf.len() {
            break;
        }
        for i in 0..len {
            scratch[dst] = grbuf[src + i];
            scratch[dst + 1] = grbuf[src + len + i];
            scratch[dst + 2] = grbuf[src + 2 * len + i];
            dst += 3;
        }
        src += 3 * len;
    }
    grbuf[..dst].copy_from_slice(&scratch[..dst]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaves_windows() {
        let sfb = [2u8, 2, 2, 1, 1, 1, 0];
        let mut grbuf: Vec<f32> = (0..10).map(|v| v as f32).collect();
        let mut scratch = [0f32; 16];
        reorder(&mut grbuf, &mut scratch, &sfb);
        // 频带 0: w0 = [0,1], w1 = [2,3], w2 = [4,5]; 频带 1: 6, 7, 8
        assert_eq!(&grbuf[..9], &[0.0, 2.0, 4.0, 1.0, 3.0, 5.0, 6.0, 7.0, 8.0]);
        // 超出短块部分不动
        assert_eq!(grbuf[9], 9.0);
    }

    #[test]
    fn test_mpeg25_8k_mixed_table_stays_in_bounds() {
        use crate::tables::SCF_MIXED;
        // 混合块在 8 kHz 下前 4 个长块子带 (72 个系数) 之后才开始短块部分
        let mut grbuf: Vec<f32> = (0..576 - 72).map(|v| v as f32).collect();
        let mut scratch = [0f32; 576];
        reorder(&mut grbuf, &mut scratch, &SCF_MIXED[1][6..]);
        // 第一个短块频带 (宽 8) 已重排
        assert_eq!(&grbuf[..6], &[0.0, 8.0, 16.0, 1.0, 9.0, 17.0]);
        // 放不下的最后一个频带保持原样
        assert_eq!(grbuf[503], 503.0);
    }

    #[test]
    fn test_empty_table() {
        let mut grbuf = [1.0f32; 4];
        let mut scratch = [0f32; 4];
        reorder(&mut grbuf, &mut scratch, &[0]);
        assert_eq!(grbuf, [1.0; 4]);
    }
}
