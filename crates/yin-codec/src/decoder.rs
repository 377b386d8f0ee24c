//! 单帧解码器.
//!
//! [`FrameDecoder`] 把帧同步, 边信息, 比例因子, Huffman, 立体声处理, IMDCT
//! 与合成滤波器串成 "解码一帧". 调用方每次传入从当前位置开始的字节,
//! 解码器返回消耗的字节数与输出的样本数.
//!
//! 解码流程:
//! 1. 若上一帧头与当前字节一致且下一帧头也对得上, 直接按帧长解码;
//!    否则重置全部状态并调用 [`find_frame`] 重新同步
//! 2. Layer III: 边信息 -> 比特储备拼接 -> 每个 granule 解码并合成
//! 3. Layer I/II: 位分配与比例因子 -> 每 12 个样本一组反量化并合成
//!
//! 码流错误不会以 `Err` 返回: 同步丢失表现为消耗字节但输出 0 个样本,
//! 边信息越界会额外清空帧头, 迫使下一次调用重新同步.

use log::{debug, warn};
use yin_core::BitReader;

use crate::alias::antialias;
use crate::bit_reservoir::{BitReservoir, MAIN_DATA_LEN};
use crate::header::{FrameHeader, HDR_SIZE, find_frame};
use crate::huffman::decode_huffman;
use crate::imdct::{OVERLAP_LEN, change_sign, imdct_granule};
use crate::layer12::{ScaleInfo, apply_scf_384, dequantize_granule, read_scale_info};
use crate::reorder::reorder;
use crate::scalefactor::{IST_POS_LEN, decode_scalefactors};
use crate::side_info::{GranuleInfo, read_side_info};
use crate::stereo::{intensity_stereo, midside};
use crate::synthesis::{QMF_STATE_LEN, SYNTH_SCRATCH_LEN, synth_granule};

/// 单帧最多输出的交错样本数 (1152 x 2)
pub const MAX_SAMPLES_PER_FRAME: usize = 1152 * 2;

/// 一次 [`FrameDecoder::decode_frame`] 调用的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// 本次调用应消耗的字节数 (含帧前跳过的垃圾字节); 0 表示需要更多数据
    pub frame_bytes: usize,
    /// 帧头在输入中的偏移
    pub frame_offset: usize,
    pub channels: u32,
    pub hz: u32,
    pub layer: u32,
    pub bitrate_kbps: u32,
    /// 每声道输出样本数, 0 表示本帧无输出
    pub samples: usize,
}

/// 跨帧保存的解码器状态
#[derive(Debug, Clone)]
pub struct DecoderState {
    pub mdct_overlap: [[f32; OVERLAP_LEN]; 2],
    pub qmf_state: [f32; QMF_STATE_LEN],
    pub reservoir: BitReservoir,
    pub free_format_bytes: usize,
    /// 上一帧的帧头, 全零表示需要重新同步
    pub header: FrameHeader,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            mdct_overlap: [[0.0; OVERLAP_LEN]; 2],
            qmf_state: [0.0; QMF_STATE_LEN],
            reservoir: BitReservoir::new(),
            free_format_bytes: 0,
            header: FrameHeader::default(),
        }
    }
}

/// 单帧工作区, 每个解码器分配一次
pub struct Scratch {
    main_data: [u8; MAIN_DATA_LEN],
    gr_info: [GranuleInfo; 4],
    grbuf: [f32; 576 * 2],
    scf: [f32; 40],
    syn: [f32; SYNTH_SCRATCH_LEN],
    ist_pos: [[u8; IST_POS_LEN]; 2],
}

impl Default for Scratch {
    fn default() -> Self {
        Self {
            main_data: [0; MAIN_DATA_LEN],
            gr_info: [GranuleInfo::default(); 4],
            grbuf: [0.0; 576 * 2],
            scf: [0.0; 40],
            syn: [0.0; SYNTH_SCRATCH_LEN],
            ist_pos: [[0; IST_POS_LEN]; 2],
        }
    }
}

/// MPEG-1/2/2.5 Layer I/II/III 单帧解码器
pub struct FrameDecoder {
    state: DecoderState,
    scratch: Box<Scratch>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::default(),
            scratch: Box::default(),
        }
    }

    /// 清空全部跨帧状态
    pub fn reset(&mut self) {
        self.state = DecoderState::default();
    }

    /// 当前跨帧状态 (只读)
    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// 解码 `data` 开头的一帧
    ///
    /// `pcm` 为 `None` 时只解析帧头并返回帧信息, 不更新解码状态.
    /// 返回的 `frame_bytes` 为 0 表示数据不足以确认一帧; 不超过帧头长度的输入
    /// 直接返回, 不触碰解码状态.
    pub fn decode_frame(
        &mut self,
        data: &[u8],
        pcm: Option<&mut [i16; MAX_SAMPLES_PER_FRAME]>,
    ) -> FrameInfo {
        let mut info = FrameInfo::default();
        let len = data.len();
        if len <= HDR_SIZE {
            return info;
        }

        let mut frame_size = 0;
        let mut offset = 0;
        if self.state.header.bytes()[0] == 0xFF {
            let next = FrameHeader::read(data).unwrap_or_default();
            if self.state.header.matches(&next) {
                frame_size = next.frame_bytes(self.state.free_format_bytes) + next.padding();
                let confirmed = frame_size == len
                    || (frame_size + HDR_SIZE <= len
                        && next.matches(&FrameHeader::read(&data[frame_size..]).unwrap_or_default()));
                if !confirmed {
                    frame_size = 0;
                }
            }
        }

        if frame_size == 0 {
            self.reset();
            let (i, size) = find_frame(data, &mut self.state.free_format_bytes);
            if size == 0 || i + size > len {
                info.frame_bytes = i;
                return info;
            }
            offset = i;
            frame_size = size;
        }

        let frame = &data[offset..offset + frame_size];
        let hdr = FrameHeader::read(frame).unwrap_or_default();
        self.state.header = hdr;
        info.frame_bytes = offset + frame_size;
        info.frame_offset = offset;
        info.channels = hdr.channels();
        info.hz = hdr.sample_rate_hz();
        info.layer = hdr.layer();
        info.bitrate_kbps = hdr.bitrate_kbps();

        let Some(pcm) = pcm else {
            info.samples = hdr.frame_samples();
            return info;
        };

        let mut bs_frame = BitReader::new(frame.get(HDR_SIZE..).unwrap_or_default());
        if hdr.has_crc() {
            bs_frame.skip_bits(16);
        }

        let success = if info.layer == 3 {
            self.decode_layer3(&hdr, &mut bs_frame, pcm)
        } else {
            self.decode_layer12(&hdr, &mut bs_frame, pcm)
        };
        if success {
            info.samples = hdr.frame_samples();
        }
        info
    }

    fn decode_layer3(
        &mut self,
        hdr: &FrameHeader,
        bs_frame: &mut BitReader<'_>,
        pcm: &mut [i16; MAX_SAMPLES_PER_FRAME],
    ) -> bool {
        let Scratch {
            main_data,
            gr_info,
            grbuf,
            scf,
            syn,
            ist_pos,
        } = &mut *self.scratch;
        let state = &mut self.state;

        let main_data_begin = match read_side_info(bs_frame, gr_info, hdr) {
            Some(mdb) if !bs_frame.is_overrun() => mdb,
            _ => {
                warn!("Layer III 边信息无效, 重置解码器");
                state.header = FrameHeader::default();
                return false;
            }
        };

        let (mut bs, success) = state.reservoir.restore(main_data, bs_frame, main_data_begin);
        if success {
            let nch = hdr.channels() as usize;
            let granules = if hdr.is_mpeg1() { 2 } else { 1 };
            for igr in 0..granules {
                grbuf.fill(0.0);
                let gr = &gr_info[igr * nch..igr * nch + nch];
                decode_granule(state, hdr, &mut bs, gr, grbuf, scf, syn, ist_pos);
                let out = &mut pcm[igr * 576 * nch..];
                synth_granule(&mut state.qmf_state, grbuf, 18, nch, out, syn);
            }
        } else {
            // 储备不足时不重置解码器, 保留跨帧状态与主流解码器行为一致
            warn!(
                "比特储备不足: 需要 {main_data_begin} 字节, 仅有 {} 字节",
                state.reservoir.len()
            );
        }
        state.reservoir.save(&bs);
        success
    }

    fn decode_layer12(
        &mut self,
        hdr: &FrameHeader,
        bs: &mut BitReader<'_>,
        pcm: &mut [i16; MAX_SAMPLES_PER_FRAME],
    ) -> bool {
        let grbuf = &mut self.scratch.grbuf;
        let syn = &mut self.scratch.syn;
        let nch = hdr.channels() as usize;
        let group_size = if hdr.is_layer1() { 1 } else { 3 };

        let mut sci = ScaleInfo::default();
        read_scale_info(hdr, bs, &mut sci);
        grbuf.fill(0.0);

        let mut offset = 0;
        let mut out = 0;
        for part in 0..3 {
            offset += dequantize_granule(&mut grbuf[offset..], bs, &sci, group_size);
            if offset == 12 {
                offset = 0;
                apply_scf_384(&sci, part, grbuf);
                synth_granule(&mut self.state.qmf_state, grbuf, 12, nch, &mut pcm[out..], syn);
                grbuf.fill(0.0);
                out += 384 * nch;
            }
            if bs.is_overrun() {
                debug!("Layer I/II 帧数据不足, 重置解码器");
                self.state.header = FrameHeader::default();
                return false;
            }
        }
        true
    }
}

/// 解码一个 granule 的全部声道, 结果留在 `grbuf` 中等待合成
#[allow(clippy::too_many_arguments)]
fn decode_granule(
    state: &mut DecoderState,
    hdr: &FrameHeader,
    bs: &mut BitReader<'_>,
    gr: &[GranuleInfo],
    grbuf: &mut [f32; 576 * 2],
    scf: &mut [f32; 40],
    syn: &mut [f32; SYNTH_SCRATCH_LEN],
    ist_pos: &mut [[u8; IST_POS_LEN]; 2],
) {
    for (ch, g) in gr.iter().enumerate() {
        let limit = bs.position() + g.part_23_length as usize;
        decode_scalefactors(hdr, &mut ist_pos[ch], bs, g, scf, ch);
        decode_huffman(&mut grbuf[576 * ch..576 * ch + 576], bs, g, scf, limit);
    }

    // 单声道帧忽略模式扩展位
    if gr.len() == 2 {
        let (left, right) = grbuf.split_at_mut(576);
        if hdr.test_intensity_stereo() {
            intensity_stereo(left, right, &mut ist_pos[1], gr, hdr);
        } else if hdr.is_ms_stereo() {
            midside(left, right, 576);
        }
    }

    for (ch, g) in gr.iter().enumerate() {
        let channel = &mut grbuf[576 * ch..576 * ch + 576];
        let n_long_bands = (if g.mixed_block_flag { 2 } else { 0 })
            << usize::from(hdr.full_sample_rate_index() == 2);
        let mut aa_bands = 31;
        if g.n_short_sfb != 0 {
            aa_bands = n_long_bands as i32 - 1;
            reorder(&mut channel[n_long_bands * 18..], syn, &g.sfb_table[g.n_long_sfb..]);
        }
        antialias(channel, aa_bands);
        imdct_granule(channel, &mut state.mdct_overlap[ch], g.block_type, n_long_bands);
        change_sign(channel);
    }
}
