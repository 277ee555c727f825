//! # 命令处理逻辑模块
//!
//! 包含处理 `encode`、`decode`、`decode-frame` 和 `test` 子命令的高级业务逻辑。
//! 本模块负责检查输出路径、调用编解码流程以及向用户报告结果。

use crate::cli::{DecodeArgs, DecodeFrameArgs, EncodeArgs, TestArgs};
use crate::codec::DecodeMode;
use crate::config::FrameConfig;
use crate::reel::{self, CompareOutcome, Reel};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

fn decode_mode(lenient: bool) -> DecodeMode {
    if lenient {
        DecodeMode::Lenient
    } else {
        DecodeMode::Strict
    }
}

/// 输出文件已存在且未指定 `--force` 时拒绝继续。
fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        path.to_string_lossy().red().bold()
    );
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| {
        format!(
            "Unable to write to output file: {}",
            path.to_string_lossy().red().bold()
        )
    })
}

/// 处理 'Encode' 命令的执行逻辑。
///
/// 负责检查输出目录、读取输入文件并生成帧集合。
///
/// # Arguments
///
/// * `args` - 包含输入文件、输出目录与帧参数的 `EncodeArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 帧参数无效。
/// * 输出目录中已有帧集合且未指定 `--force`。
/// * 无法读取输入文件，或任意一帧无法写出。
pub fn handle_encode(args: EncodeArgs) -> Result<()> {
    let config = args.frame.to_config();
    config
        .validate()
        .context("Invalid frame geometry. \nWidth and height must be even and hold a whole number of bytes.")?;

    if reel::has_frame_set(&args.output)? {
        anyhow::ensure!(
            args.force,
            "Output file already exists: {} contains a frame set. \nUse --force to overwrite it.",
            args.output.to_string_lossy().red().bold()
        );
        let removed = reel::clear_frame_set(&args.output)?;
        log::info!("removed {removed} files from previous frame set");
    }

    let manifest = Reel::new(config)
        .encode_file(&args.input, &args.output)
        .with_context(|| {
            format!(
                "Failed to encode {}. \nNo complete frame set was written.",
                args.input.to_string_lossy().red().bold()
            )
        })?;

    println!(
        "{} bytes encoded into {} frames: {}",
        manifest.byte_len.to_string().green(),
        manifest.frame_count.to_string().green(),
        args.output.to_string_lossy().green().bold()
    );

    Ok(())
}

/// 处理 'Decode' 命令的执行逻辑。
///
/// 读取帧目录中的清单，按序解码全部帧并写出还原的文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 帧目录中没有清单 (帧集合不完整)。
/// * 任意一帧缺失、无法读取或包含无法识别的像素。
/// * 输出文件已存在且未指定 `--force`，或无法写入。
pub fn handle_decode(args: DecodeArgs) -> Result<()> {
    let config = FrameConfig::default().with_threads(args.threads);
    let (manifest, bytes) = Reel::new(config)
        .decode_dir(&args.dir, decode_mode(args.lenient))
        .with_context(|| {
            format!(
                "Failed to decode frame set in '{}'. \nThe frames may be incomplete or corrupted.",
                args.dir.to_string_lossy().red().bold()
            )
        })?;

    let output = args
        .output
        .unwrap_or_else(|| args.dir.join(reel::decoded_file_name(&manifest.source_ext)));
    ensure_writable(&output, args.force)?;
    write_output(&output, &bytes)?;

    println!(
        "The file has been successfully decoded and saved: {}",
        output.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'DecodeFrame' 命令的执行逻辑。
///
/// 只解码一张帧图像，输出默认放在图像旁，命名为 `decoded<图像扩展名>`。
pub fn handle_decode_frame(args: DecodeFrameArgs) -> Result<()> {
    let bytes = reel::decode_frame_file(&args.image, decode_mode(args.lenient)).with_context(|| {
        format!(
            "Failed to decode frame '{}'. \nThe image may not be a frame or is corrupted.",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let output = args.output.unwrap_or_else(|| {
        args.image
            .with_file_name(reel::decoded_file_name(&reel::source_extension(&args.image)))
    });
    ensure_writable(&output, args.force)?;
    write_output(&output, &bytes)?;

    println!(
        "{} bytes recovered from the frame and saved: {}",
        bytes.len().to_string().green(),
        output.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 向用户报告比对结果；内容不同时返回错误，使进程以非零状态退出。
pub fn report_comparison(outcome: &CompareOutcome, decoded: &Path) -> Result<()> {
    match *outcome {
        CompareOutcome::Same => {
            println!(
                "Files are the same: {}",
                decoded.to_string_lossy().green().bold()
            );
            Ok(())
        }
        CompareOutcome::Differ {
            original_len,
            decoded_len,
            first_mismatch,
        } => anyhow::bail!(
            "Files are different. \nOriginal: {} bytes, Decoded: {} bytes, first difference at byte {}",
            original_len.to_string().green().bold(),
            decoded_len.to_string().red().bold(),
            first_mismatch.to_string().red().bold()
        ),
    }
}

/// 处理 'Test' 命令的执行逻辑。
///
/// 编码后立即解码并与原始文件比对。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 帧参数无效。
/// * 工作目录中已有帧集合或解码结果且未指定 `--force`。
/// * 编码或解码失败，或解码结果与原始文件不同。
pub fn handle_test(args: TestArgs) -> Result<()> {
    let config = args.frame.to_config();
    config
        .validate()
        .context("Invalid frame geometry. \nWidth and height must be even and hold a whole number of bytes.")?;

    let decoded = args
        .work_dir
        .join(reel::decoded_file_name(&reel::source_extension(&args.input)));
    ensure_writable(&decoded, args.force)?;

    if reel::has_frame_set(&args.work_dir)? {
        anyhow::ensure!(
            args.force,
            "Output file already exists: {} contains a frame set. \nUse --force to overwrite it.",
            args.work_dir.to_string_lossy().red().bold()
        );
        let removed = reel::clear_frame_set(&args.work_dir)?;
        log::info!("removed {removed} files from previous frame set");
    }

    let (outcome, decoded) = Reel::new(config)
        .compare(&args.input, &args.work_dir)
        .with_context(|| {
            format!(
                "Error comparing {} with its decoded copy.",
                args.input.to_string_lossy().red().bold()
            )
        })?;

    report_comparison(&outcome, &decoded)
}
