//! tao-probe - H.264/HEVC 基本流探测工具
//!
//! 将基本流逐访问单元送入 [`HxxxHelper`], 统计配置变化并输出当前码流信息.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use serde::Serialize;

use tao_codec::parsers::nal::NalFraming;
use tao_codec::{HxxxCodec, HxxxHelper, Packet};

mod access_unit;
mod logging;

/// 编解码器参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CodecArg {
    H264,
    Hevc,
}

impl From<CodecArg> for HxxxCodec {
    fn from(codec: CodecArg) -> Self {
        match codec {
            CodecArg::H264 => HxxxCodec::H264,
            CodecArg::Hevc => HxxxCodec::Hevc,
        }
    }
}

/// Tao H.264/HEVC 基本流探测工具
#[derive(Parser, Debug)]
#[command(name = "tao-probe", version, about = "H.264/HEVC 基本流探测工具")]
struct Cli {
    /// 输入文件 (Annex B 基本流, 或配合 --extradata 的长度前缀流)
    input: PathBuf,

    /// 编解码器
    #[arg(long, value_enum, default_value_t = CodecArg::H264)]
    codec: CodecArg,

    /// avcC/hvcC 配置记录文件, 给出时输入按长度前缀解析
    #[arg(long)]
    extradata: Option<PathBuf>,

    /// 输出长度前缀分帧 (模拟需要 avcC/hvcC 的解码器)
    #[arg(long)]
    need_length_prefixed: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志目录
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// 日志详细程度 (-v / -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// 输出结构体
// ============================================================

/// 探测结果
#[derive(Debug, Serialize)]
struct ProbeOutput {
    filename: String,
    codec: String,
    pipeline: String,
    nal_length_size: usize,
    access_units: u64,
    bytes_in: u64,
    bytes_out: u64,
    config_changes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<StreamInfo>,
}

/// 当前码流信息
#[derive(Debug, Serialize)]
struct StreamInfo {
    width: u32,
    height: u32,
    visible_width: u32,
    visible_height: u32,
    sample_aspect_ratio: String,
    profile: u8,
    level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    chroma_format: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dpb_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dpb_delay: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_primaries: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_transfer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_range: Option<String>,
    sps_count: usize,
    pps_count: usize,
    vps_count: usize,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_dir, cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    match probe(&cli) {
        Ok(output) => {
            if cli.json {
                match serde_json::to_string_pretty(&output) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("错误: JSON 序列化失败: {e}");
                        process::exit(1);
                    }
                }
            } else {
                print_text(&output);
            }
        }
        Err(e) => {
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    }
}

/// 读取输入并逐访问单元处理
fn probe(cli: &Cli) -> Result<ProbeOutput> {
    let data = std::fs::read(&cli.input)
        .with_context(|| format!("无法读取输入文件 '{}'", cli.input.display()))?;
    let extra_data = match &cli.extradata {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("无法读取配置记录 '{}'", path.display()))?,
        None => Vec::new(),
    };

    let codec = HxxxCodec::from(cli.codec);
    let mut helper = HxxxHelper::new(codec, cli.need_length_prefixed);
    helper.configure(&extra_data).context("配置适配器失败")?;
    info!(
        "{}: 输入 {} 字节, pipeline={:?}",
        codec,
        data.len(),
        helper.pipeline()
    );

    let framing = if helper.is_length_prefixed_source() {
        NalFraming::LengthPrefixed(helper.nal_length_size())
    } else {
        NalFraming::AnnexB
    };

    let mut output = ProbeOutput {
        filename: cli.input.display().to_string(),
        codec: codec.to_string(),
        pipeline: helper
            .pipeline()
            .map(|p| p.to_string())
            .unwrap_or_default(),
        nal_length_size: helper.nal_length_size(),
        access_units: 0,
        bytes_in: 0,
        bytes_out: 0,
        config_changes: 0,
        stream: None,
    };

    for (index, unit) in access_unit::split(&data, framing, codec).into_iter().enumerate() {
        output.bytes_in += unit.len() as u64;
        let result = helper
            .process(Packet::from_data(unit))
            .with_context(|| format!("处理第 {} 个访问单元失败", index))?;
        output.access_units += 1;
        output.bytes_out += result.packet.size() as u64;
        if result.config_changed {
            output.config_changes += 1;
            debug!(
                "访问单元 {}: 配置变化, 当前 SPS={:?}",
                index,
                helper.active_sps_id()
            );
        }
    }

    output.stream = stream_info(&helper);
    Ok(output)
}

/// 由当前参数集构建码流信息
fn stream_info(helper: &HxxxHelper) -> Option<StreamInfo> {
    let size = helper.picture_size()?;
    let (profile, level) = helper.profile_level()?;
    let sar = helper.sar()?;
    let chroma = helper.chroma_format();
    let dpb = helper.dpb_values();
    let colorimetry = helper.colorimetry();

    Some(StreamInfo {
        width: size.width,
        height: size.height,
        visible_width: size.visible_width,
        visible_height: size.visible_height,
        sample_aspect_ratio: format!("{}/{}", sar.num, sar.den),
        profile,
        level,
        chroma_format: chroma.map(|(idc, _, _)| idc),
        bit_depth: chroma.map(|(_, luma, _)| luma),
        frame_rate: helper
            .frame_rate()
            .map(|fr| format!("{}/{}", fr.num, fr.den)),
        dpb_depth: dpb.map(|(depth, _)| depth),
        dpb_delay: dpb.map(|(_, delay)| delay),
        color_primaries: colorimetry.map(|c| format!("{:?}", c.primaries)),
        color_transfer: colorimetry.map(|c| format!("{:?}", c.transfer)),
        color_space: colorimetry.map(|c| format!("{:?}", c.space)),
        color_range: colorimetry.map(|c| format!("{:?}", c.range)),
        sps_count: helper.sps_count(),
        pps_count: helper.pps_count(),
        vps_count: helper.vps_count(),
    })
}

/// 文本输出
fn print_text(output: &ProbeOutput) {
    println!("[STREAM]");
    println!("  文件名       : {}", output.filename);
    println!("  编解码器     : {}", output.codec);
    println!("  管线         : {}", output.pipeline);
    println!("  长度前缀     : {} 字节", output.nal_length_size);
    println!("  访问单元     : {}", output.access_units);
    println!("  输入/输出    : {} / {} 字节", output.bytes_in, output.bytes_out);
    println!("  配置变化     : {}", output.config_changes);

    if let Some(ref stream) = output.stream {
        println!(
            "  分辨率       : {}x{} (编码 {}x{})",
            stream.visible_width, stream.visible_height, stream.width, stream.height
        );
        println!("  SAR          : {}", stream.sample_aspect_ratio);
        println!("  Profile/Level: {}/{}", stream.profile, stream.level);
        if let (Some(chroma), Some(depth)) = (stream.chroma_format, stream.bit_depth) {
            println!("  色度格式     : {} ({} bit)", chroma, depth);
        }
        if let Some(ref fr) = stream.frame_rate {
            println!("  帧率         : {fr}");
        }
        if let (Some(depth), Some(delay)) = (stream.dpb_depth, stream.dpb_delay) {
            println!("  DPB          : 深度 {depth}, 延迟 {delay}");
        }
        if let Some(ref primaries) = stream.color_primaries {
            println!(
                "  色彩         : {} / {} / {} / {}",
                primaries,
                stream.color_transfer.as_deref().unwrap_or("-"),
                stream.color_space.as_deref().unwrap_or("-"),
                stream.color_range.as_deref().unwrap_or("-"),
            );
        }
        println!(
            "  参数集       : VPS {} / SPS {} / PPS {}",
            stream.vps_count, stream.sps_count, stream.pps_count
        );
    } else {
        println!("  (未找到 SPS)");
    }
    println!("[/STREAM]");
}
