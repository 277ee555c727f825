//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use crate::config::{FrameConfig, FrameFormat};
use crate::constants::{DEFAULT_HEIGHT, DEFAULT_OUTPUT_DIR, DEFAULT_WIDTH};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{Level, info};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// 把任意文件编码为一组黑白像素帧，或把帧集合还原为原始文件。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "把任意文件编码为一组黑白像素帧 (每个比特占一个 2x2 像素块)，或把帧集合还原为原始文件。\n帧集合可以交给外部工具封装为视频。"
)]
pub struct Cli {
    /// 提高日志详细程度，可重复使用 (-v, -vv, -vvv)。
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 把文件编码为帧集合。
    #[command(alias = "e")]
    Encode(EncodeArgs),

    /// 把帧集合还原为原始文件。
    #[command(alias = "d")]
    Decode(DecodeArgs),

    /// 解码单张帧图像。
    DecodeFrame(DecodeFrameArgs),

    /// 依次执行编码与解码，并与原始文件逐字节比对。
    #[command(alias = "t")]
    Test(TestArgs),
}

/// 帧的尺寸、格式与并发参数。
#[derive(Args, Debug, Clone)]
pub struct FrameArgs {
    /// 帧宽度 (像素)，必须为偶数。
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// 帧高度 (像素)，必须为偶数。
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// 帧图像格式。
    #[arg(long, value_enum, default_value_t = FrameFormat::Png)]
    pub format: FrameFormat,

    /// 工作线程数，默认为可用的 CPU 核数。
    #[arg(long)]
    pub threads: Option<NonZeroUsize>,
}

impl Default for FrameArgs {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            format: FrameFormat::Png,
            threads: None,
        }
    }
}

impl FrameArgs {
    pub fn to_config(&self) -> FrameConfig {
        FrameConfig {
            width: self.width,
            height: self.height,
            format: self.format,
            threads: self.threads,
        }
    }
}

/// 'encode' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// 要编码的输入文件路径。
    #[arg(short, long)]
    pub input: PathBuf,

    /// 帧文件的输出目录。
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    #[command(flatten)]
    pub frame: FrameArgs,

    /// 输出目录中已有帧集合时强制覆盖。
    #[arg(short, long)]
    pub force: bool,
}

/// 'decode' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// 帧集合所在目录。
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub dir: PathBuf,

    /// 还原文件的输出路径，默认为帧目录下的 `decoded<原扩展名>`。
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 工作线程数，默认为可用的 CPU 核数。
    #[arg(long)]
    pub threads: Option<NonZeroUsize>,

    /// 跳过无法识别的像素，而不是报错。
    #[arg(long)]
    pub lenient: bool,

    /// 输出文件已存在时强制覆盖。
    #[arg(short, long)]
    pub force: bool,
}

/// 'decode-frame' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct DecodeFrameArgs {
    /// 单张帧图像的路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 还原字节的输出路径，默认为图像旁的 `decoded<图像扩展名>`。
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 跳过无法识别的像素，而不是报错。
    #[arg(long)]
    pub lenient: bool,

    /// 输出文件已存在时强制覆盖。
    #[arg(short, long)]
    pub force: bool,
}

/// 'test' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct TestArgs {
    /// 要比对的输入文件路径。
    #[arg(short, long)]
    pub input: PathBuf,

    /// 存放帧集合与解码结果的工作目录。
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub work_dir: PathBuf,

    #[command(flatten)]
    pub frame: FrameArgs,

    /// 工作目录中已有帧集合或解码结果时强制覆盖。
    #[arg(short, long)]
    pub force: bool,
}

/// 根据 `-v` 的次数初始化日志。
pub fn setup_logger(verbose: u8) {
    let log_level = match verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };

    if simple_logger::init_with_level(log_level).is_err() {
        return;
    }

    info!("Initialized logger");
    info!("Log level :{}", log_level);
}
