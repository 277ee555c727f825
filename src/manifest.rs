//! # 清单模块
//!
//! 清单既是帧集合的完成标记，也是长度头：它记录原始文件的字节数，
//! 因此最后一帧恰好写满时也能准确截断。清单只在全部帧写入成功后生成。

use crate::config::{FrameConfig, FrameFormat};
use crate::constants::{MANIFEST_NAME, MANIFEST_VERSION};
use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// 原始文件的字节数。
    pub byte_len: u64,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    /// 原始文件的扩展名 (含点号)，没有扩展名时为空字符串。
    pub source_ext: String,
}

impl Manifest {
    pub fn new(config: &FrameConfig, byte_len: u64, frame_count: usize, source_ext: String) -> Self {
        Self {
            version: MANIFEST_VERSION,
            byte_len,
            frame_count,
            width: config.width,
            height: config.height,
            format: config.format,
            source_ext,
        }
    }

    /// 按清单记录的参数还原帧配置，线程数沿用 `base`。
    pub fn frame_config(&self, base: &FrameConfig) -> Result<FrameConfig> {
        let config = FrameConfig {
            width: self.width,
            height: self.height,
            format: self.format,
            threads: base.threads,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_NAME)
    }

    /// 读取目录中的清单，不存在时返回 `MissingManifest`。
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path(dir);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ReelError::MissingManifest {
                    dir: dir.to_path_buf(),
                });
            }
            Err(e) => return Err(ReelError::io(path, e)),
        };
        serde_json::from_slice(&raw).map_err(|source| ReelError::Manifest { path, source })
    }

    /// 写入清单，先写临时文件再重命名，避免留下半个清单。
    pub fn store(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::path(dir);
        let staging = dir.join(format!("{MANIFEST_NAME}.partial"));
        let raw = serde_json::to_vec_pretty(self).map_err(|source| ReelError::Manifest {
            path: path.clone(),
            source,
        })?;
        fs::write(&staging, raw).map_err(|e| ReelError::io(&staging, e))?;
        fs::rename(&staging, &path).map_err(|e| ReelError::io(&path, e))?;
        Ok(path)
    }

    /// 删除目录中的清单，不存在时视为成功。
    pub fn remove(dir: &Path) -> Result<()> {
        let path = Self::path(dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReelError::io(path, e)),
        }
    }
}
