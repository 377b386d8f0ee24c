//! 声道转换与样本归一化.

/// 16 位样本归一化除数
const S16_SCALE: f32 = 32768.0;

/// 将交错 16 位样本转换为交错 f32 样本, 同时转换声道数
///
/// 支持的转换:
/// - 单声道 -> 立体声: 复制
/// - 立体声 -> 单声道: 取平均
/// - 声道数相同: 直接映射
///
/// # 参数
/// - `input`: 交错 16 位样本, 至少 `frames * src_channels` 个
/// - `output`: 交错 f32 输出, 至少 `frames * dst_channels` 个
/// - `frames`: 每声道样本数
pub fn mix_channels_to_f32(
    input: &[i16],
    src_channels: usize,
    output: &mut [f32],
    dst_channels: usize,
    frames: usize,
) {
    let src = input.chunks_exact(src_channels).take(frames);
    let dst = output.chunks_exact_mut(dst_channels);
    for (s, d) in src.zip(dst) {
        match (src_channels, dst_channels) {
            (1, _) => {
                // 单声道复制到所有输出声道
                d.fill(f32::from(s[0]) / S16_SCALE);
            }
            (_, 1) => {
                let l = f32::from(s[0]) / S16_SCALE;
                let r = f32::from(s[1]) / S16_SCALE;
                d[0] = (l + r) * 0.5;
            }
            _ => {
                for (o, &v) in d.iter_mut().zip(s) {
                    *o = f32::from(v) / S16_SCALE;
                }
            }
        }
    }
}
