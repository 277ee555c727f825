//! # 文件级操作模块
//!
//! 把比特打包、帧调度、清单与重组串联为完整的编码、解码与比对流程。

use crate::bits;
use crate::codec::{self, DecodeMode};
use crate::config::FrameConfig;
use crate::constants::{BLOCK_SIZE, DECODED_STEM};
use crate::error::{ReelError, Result};
use crate::manifest::Manifest;
use crate::scheduler::{self, FileSink, FrameScheduler, FrameSink};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 比对的结果。内容不同是正常的返回值，而不是错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOutcome {
    Same,
    Differ {
        original_len: usize,
        decoded_len: usize,
        /// 第一个不同字节的偏移，长度不同且公共部分一致时为较短一方的长度。
        first_mismatch: usize,
    },
}

impl CompareOutcome {
    pub fn of(original: &[u8], decoded: &[u8]) -> Self {
        if original == decoded {
            return CompareOutcome::Same;
        }
        let first_mismatch = original
            .iter()
            .zip(decoded)
            .position(|(a, b)| a != b)
            .unwrap_or(original.len().min(decoded.len()));
        CompareOutcome::Differ {
            original_len: original.len(),
            decoded_len: decoded.len(),
            first_mismatch,
        }
    }

    pub fn is_same(&self) -> bool {
        matches!(self, CompareOutcome::Same)
    }
}

/// 取路径的扩展名 (含点号)，没有扩展名时返回空字符串。
pub fn source_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// 解码结果的默认文件名 `decoded<扩展名>`。
pub fn decoded_file_name(ext: &str) -> String {
    format!("{DECODED_STEM}{ext}")
}

fn frame_set_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ReelError::io(dir, e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReelError::io(dir, e))?;
        let path = entry.path();
        let is_frame = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(scheduler::is_frame_file_name);
        if is_frame || path == Manifest::path(dir) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// 目录中是否已经存在帧文件或清单。
pub fn has_frame_set(dir: &Path) -> Result<bool> {
    Ok(!frame_set_entries(dir)?.is_empty())
}

/// 删除目录中的清单与全部帧文件，返回删除的文件数。清单最先删除。
pub fn clear_frame_set(dir: &Path) -> Result<usize> {
    Manifest::remove(dir)?;
    let entries = frame_set_entries(dir)?;
    scheduler::remove_files(entries.iter().map(PathBuf::as_path))?;
    Ok(entries.len())
}

/// 单帧解码：读取一张图像并还原其中的字节，尺寸取自图像本身。
pub fn decode_frame_file(path: &Path, mode: DecodeMode) -> Result<Vec<u8>> {
    let canvas = image::open(path)
        .map_err(|e| ReelError::image(path, e))?
        .to_rgb8();
    let (width, height) = canvas.dimensions();
    if width % BLOCK_SIZE != 0 || height % BLOCK_SIZE != 0 {
        return Err(ReelError::InvalidGeometry {
            width,
            height,
            reason: "dimensions must be even",
        });
    }

    let config = FrameConfig {
        width,
        height,
        ..FrameConfig::default()
    };
    let bits = codec::decode_frame(&canvas, &config, mode)?;
    debug!("{} decoded to {} bits", path.display(), bits.len());
    Ok(bits::unpack(&bits))
}

/// 编码与解码的入口，持有帧配置和取消标记。
#[derive(Debug, Clone)]
pub struct Reel {
    config: FrameConfig,
    cancel: Arc<AtomicBool>,
}

impl Reel {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// 返回取消标记，置位后正在进行的操作将以 `Cancelled` 结束。
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn scheduler(&self, config: FrameConfig) -> FrameScheduler {
        FrameScheduler::new(config).with_cancel(self.cancel_flag())
    }

    /// 把 `bytes` 编码为 `dir` 下的帧集合，所有帧写入成功后才写出清单。
    ///
    /// 旧的清单会在开始前删除，因此中途失败的目录不会被误认为完整。
    ///
    /// # Errors
    ///
    /// * 配置无效，或无法创建输出目录。
    /// * 任意一帧编码或写入失败 (此时本次写出的帧文件会被删除)。
    /// * 操作被取消。
    pub fn encode_bytes(
        &self,
        bytes: &[u8],
        source_ext: &str,
        dir: &Path,
        sink: &dyn FrameSink,
    ) -> Result<Manifest> {
        self.config.validate()?;
        fs::create_dir_all(dir).map_err(|e| ReelError::io(dir, e))?;
        Manifest::remove(dir)?;

        let packed = bits::pack(bytes);
        let frame_count = self.config.frame_count(packed.len());
        info!(
            "encoding {} bytes into {} frames of {}x{}",
            bytes.len(),
            frame_count,
            self.config.width,
            self.config.height
        );

        let scheduler = self.scheduler(self.config);
        let paths = scheduler.encode(&packed, dir, sink)?;

        if self.cancel.load(Ordering::Relaxed) {
            scheduler::remove_files(paths.iter().map(PathBuf::as_path))?;
            return Err(ReelError::Cancelled);
        }

        let manifest = Manifest::new(
            &self.config,
            bytes.len() as u64,
            paths.len(),
            source_ext.to_owned(),
        );
        let marker = manifest.store(dir)?;
        info!("frame set complete, manifest at {}", marker.display());
        Ok(manifest)
    }

    /// 读取 `input` 并编码为 `dir` 下的帧文件。
    pub fn encode_file(&self, input: &Path, dir: &Path) -> Result<Manifest> {
        let bytes = fs::read(input).map_err(|e| ReelError::io(input, e))?;
        let sink = FileSink::new(self.config.format);
        self.encode_bytes(&bytes, &source_extension(input), dir, &sink)
    }

    /// 解码 `dir` 下的帧集合，帧尺寸与格式以清单为准。
    ///
    /// # Errors
    ///
    /// * 目录中没有清单，或清单与帧数不一致。
    /// * 缺少任意一帧、帧无法读取或像素无法分类。
    /// * 还原出的字节数与清单记录不同。
    pub fn decode_dir(&self, dir: &Path, mode: DecodeMode) -> Result<(Manifest, Vec<u8>)> {
        let manifest = Manifest::load(dir)?;
        let config = manifest.frame_config(&self.config)?;

        let total_bits = usize::try_from(manifest.byte_len)
            .ok()
            .and_then(|len| len.checked_mul(8))
            .ok_or(ReelError::ManifestOverflow {
                byte_len: manifest.byte_len,
            })?;
        let expected = config.frame_count(total_bits);
        if expected != manifest.frame_count {
            return Err(ReelError::ManifestMismatch {
                frame_count: manifest.frame_count,
                byte_len: manifest.byte_len,
                expected,
            });
        }

        info!(
            "decoding {} frames ({} bytes) from {}",
            manifest.frame_count,
            manifest.byte_len,
            dir.display()
        );

        let ext = config.format.extension();
        let paths: Vec<PathBuf> = (0..manifest.frame_count)
            .map(|index| scheduler::frame_path(dir, index, manifest.frame_count, ext))
            .collect();

        let assembler = self.scheduler(config).decode(&paths, mode)?;
        let bytes = assembler.finish(Some(manifest.byte_len))?;
        Ok((manifest, bytes))
    }

    /// 编码 `input` 到 `work_dir`，再解码为 `work_dir/decoded<扩展名>`，逐字节比对。
    ///
    /// 原始文件不会被修改。工作目录中已有帧集合时直接返回 `FrameSetExists`，
    /// 需要由调用方先行清理。
    pub fn compare(&self, input: &Path, work_dir: &Path) -> Result<(CompareOutcome, PathBuf)> {
        if has_frame_set(work_dir)? {
            return Err(ReelError::FrameSetExists {
                dir: work_dir.to_path_buf(),
            });
        }
        let original = fs::read(input).map_err(|e| ReelError::io(input, e))?;
        let sink = FileSink::new(self.config.format);

        self.encode_bytes(&original, &source_extension(input), work_dir, &sink)?;
        let (manifest, decoded) = self.decode_dir(work_dir, DecodeMode::Strict)?;

        let output = work_dir.join(decoded_file_name(&manifest.source_ext));
        if output.exists() && fs::canonicalize(&output).ok() == fs::canonicalize(input).ok() {
            return Err(ReelError::io(
                &output,
                std::io::Error::new(ErrorKind::AlreadyExists, "decoded copy would replace the input"),
            ));
        }
        fs::write(&output, &decoded).map_err(|e| ReelError::io(&output, e))?;

        Ok((CompareOutcome::of(&original, &decoded), output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_outcome_reports_first_mismatch() {
        assert!(CompareOutcome::of(b"abc", b"abc").is_same());
        assert_eq!(
            CompareOutcome::of(b"abcd", b"abXd"),
            CompareOutcome::Differ {
                original_len: 4,
                decoded_len: 4,
                first_mismatch: 2
            }
        );
        assert_eq!(
            CompareOutcome::of(b"abcd", b"ab"),
            CompareOutcome::Differ {
                original_len: 4,
                decoded_len: 2,
                first_mismatch: 2
            }
        );
    }

    #[test]
    fn oversized_manifest_length_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            byte_len: u64::MAX,
            frame_count: 1,
            ..Manifest::new(&FrameConfig::new(32, 16).unwrap(), 0, 0, ".bin".to_owned())
        };
        manifest.store(dir.path()).unwrap();

        let result = Reel::new(FrameConfig::default()).decode_dir(dir.path(), DecodeMode::Strict);
        assert!(matches!(
            result,
            Err(ReelError::ManifestOverflow { byte_len: u64::MAX })
        ));
    }

    #[test]
    fn compare_refuses_existing_frame_set() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bin");
        fs::write(&input, b"replacement").unwrap();
        let reel = Reel::new(FrameConfig::new(32, 16).unwrap());
        let kept = reel
            .encode_bytes(&[7; 40], ".dat", dir.path(), &FileSink::default())
            .unwrap();

        assert!(matches!(
            reel.compare(&input, dir.path()),
            Err(ReelError::FrameSetExists { .. })
        ));
        assert_eq!(Manifest::load(dir.path()).unwrap(), kept);
        assert!(!dir.path().join("decoded.bin").exists());
    }

    #[test]
    fn extension_keeps_leading_dot() {
        assert_eq!(source_extension(Path::new("a/b/report.pdf")), ".pdf");
        assert_eq!(source_extension(Path::new("Makefile")), "");
        assert_eq!(decoded_file_name(".pdf"), "decoded.pdf");
    }
}
