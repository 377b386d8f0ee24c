//! yin - MP3 解码命令行工具
//!
//! - `yin decode`: 解码为 32 位浮点 WAV 或原始 f32 样本
//! - `yin probe`: 统计帧信息, 可输出 JSON

mod logging;
mod probe;
mod wav;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use yin_stream::{DecoderConfig, FileSource, Mp3Stream};

/// 每次从解码流读取的 PCM 帧数
const READ_CHUNK_FRAMES: usize = 4096;

#[derive(Parser, Debug)]
#[command(name = "yin", version, about = "纯 Rust MP3 解码工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 日志详细程度 (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 解码 MP3 文件
    Decode(DecodeArgs),
    /// 统计 MP3 帧信息
    Probe(ProbeArgs),
}

#[derive(clap::Args, Debug)]
struct DecodeArgs {
    /// 输入文件路径
    input: PathBuf,

    /// 输出文件路径, "-" 表示标准输出 (仅限 raw 格式)
    #[arg(short, long)]
    output: String,

    /// 输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Wav)]
    format: OutputFormat,

    /// JSON 格式的解码配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出声道数 (覆盖配置文件)
    #[arg(long)]
    channels: Option<u32>,

    /// 输出采样率 (覆盖配置文件)
    #[arg(long)]
    rate: Option<u32>,

    /// 从第几个 PCM 帧开始输出
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// 最多输出的 PCM 帧数
    #[arg(long)]
    frames: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct ProbeArgs {
    /// 输入文件路径
    input: PathBuf,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// 32 位浮点 WAV
    Wav,
    /// 交织的小端 f32 样本, 无文件头
    Raw,
}

fn main() {
    let cli = Cli::parse();
    logging::init("yin", cli.verbose);

    let result = match cli.command {
        Command::Decode(args) => run_decode(&args),
        Command::Probe(args) => run_probe(&args),
    };
    if let Err(e) = result {
        log::error!("{e:#}");
        eprintln!("错误: {e:#}");
        std::process::exit(1);
    }
}

/// 配置文件打底, 命令行参数覆盖
fn load_config(args: &DecodeArgs) -> Result<DecoderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取配置文件 {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("配置文件格式错误 {}", path.display()))?
        }
        None => DecoderConfig::default(),
    };
    if let Some(ch) = args.channels {
        config.output_channels = ch;
    }
    if let Some(rate) = args.rate {
        config.output_sample_rate = rate;
    }
    Ok(config)
}

fn run_decode(args: &DecodeArgs) -> Result<()> {
    let config = load_config(args)?;
    let source = FileSource::open(&args.input)
        .with_context(|| format!("无法打开输入文件 {}", args.input.display()))?;
    let mut stream = Mp3Stream::new(source, config)
        .with_context(|| format!("无法解码 {}", args.input.display()))?;

    info!(
        "输入 {} Hz {} 声道, 输出 {} Hz {} 声道",
        stream.input_sample_rate(),
        stream.input_channels(),
        stream.sample_rate(),
        stream.channels()
    );

    if args.start > 0 && !stream.seek_to_frame(args.start) {
        bail!("无法定位到第 {} 帧", args.start);
    }

    let written = if args.output == "-" {
        if args.format == OutputFormat::Wav {
            bail!("WAV 输出需要可定位的文件, 标准输出请使用 --format raw");
        }
        let mut out = BufWriter::new(io::stdout().lock());
        let n = pump(&mut stream, args.frames, |s| Ok(wav::write_f32_samples(&mut out, s)?))?;
        out.flush()?;
        n
    } else {
        write_file(&mut stream, args, Path::new(&args.output))?
    };

    if stream.is_at_end() && written == 0 {
        warn!("没有解码出任何样本");
    }
    info!(
        "完成: {written} 帧, 共解码 {} 帧",
        stream.frames_decoded()
    );
    Ok(())
}

fn write_file(stream: &mut Mp3Stream<FileSource>, args: &DecodeArgs, path: &Path) -> Result<u64> {
    let file = File::create(path).with_context(|| format!("无法创建输出文件 {}", path.display()))?;
    let out = BufWriter::new(file);
    match args.format {
        OutputFormat::Wav => {
            let mut wav = wav::WavWriter::new(out, stream.channels() as u16, stream.sample_rate())?;
            let n = pump(stream, args.frames, |s| wav.write_samples(s))?;
            wav.finish()?;
            Ok(n)
        }
        OutputFormat::Raw => {
            let mut out = out;
            let n = pump(stream, args.frames, |s| Ok(wav::write_f32_samples(&mut out, s)?))?;
            out.flush()?;
            Ok(n)
        }
    }
}

/// 持续读取解码流直到结束或达到帧数上限, 返回输出的 PCM 帧数
fn pump<F>(stream: &mut Mp3Stream<FileSource>, limit: Option<u64>, mut sink: F) -> Result<u64>
where
    F: FnMut(&[f32]) -> Result<()>,
{
    let channels = stream.channels() as usize;
    let mut buf = vec![0.0f32; READ_CHUNK_FRAMES * channels];
    let mut total = 0u64;
    loop {
        let want = match limit {
            Some(max) => (max - total).min(READ_CHUNK_FRAMES as u64),
            None => READ_CHUNK_FRAMES as u64,
        };
        if want == 0 {
            break;
        }
        let got = stream.read_frames(want, Some(&mut buf[..])) as usize;
        if got == 0 {
            break;
        }
        sink(&buf[..got * channels])?;
        total += got as u64;
    }
    Ok(total)
}

fn run_probe(args: &ProbeArgs) -> Result<()> {
    let data = std::fs::read(&args.input)
        .with_context(|| format!("无法读取输入文件 {}", args.input.display()))?;
    let report = probe::probe(&data);
    if report.frames == 0 {
        warn!("{} 中没有找到 MPEG 音频帧", args.input.display());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("文件:     {}", args.input.display());
        println!("{report}");
    }
    Ok(())
}
