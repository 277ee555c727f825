//! # 帧配置模块
//!
//! 画布尺寸、帧图像格式与工作线程数，在开始编码或解码前统一校验一次。

use crate::constants::{BLOCK_SIZE, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{ReelError, Result};
use clap::ValueEnum;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// 帧图像的存储格式，只提供无损格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Png,
    Bmp,
    Qoi,
    Tiff,
}

impl FrameFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FrameFormat::Png => "png",
            FrameFormat::Bmp => "bmp",
            FrameFormat::Qoi => "qoi",
            FrameFormat::Tiff => "tiff",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            FrameFormat::Png => ImageFormat::Png,
            FrameFormat::Bmp => ImageFormat::Bmp,
            FrameFormat::Qoi => ImageFormat::Qoi,
            FrameFormat::Tiff => ImageFormat::Tiff,
        }
    }
}

/// 一次编码或解码所使用的帧参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    /// 工作线程数，`None` 表示使用可用的并行度。
    pub threads: Option<NonZeroUsize>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            format: FrameFormat::default(),
            threads: None,
        }
    }
}

impl FrameConfig {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let config = Self {
            width,
            height,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_threads(mut self, threads: Option<NonZeroUsize>) -> Self {
        self.threads = threads;
        self
    }

    /// 检查尺寸能否整齐地划分为 2x2 块，且每帧容量是整字节。
    ///
    /// 容量按字节对齐后，每一帧都能独立还原为完整的字节块。
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason| ReelError::InvalidGeometry {
            width: self.width,
            height: self.height,
            reason,
        };

        if self.width == 0 || self.height == 0 {
            return Err(invalid("dimensions must be non-zero"));
        }
        if self.width % BLOCK_SIZE != 0 || self.height % BLOCK_SIZE != 0 {
            return Err(invalid("dimensions must be even"));
        }
        if self.capacity() % 8 != 0 {
            return Err(invalid("frame capacity must be a multiple of 8 bits"));
        }
        Ok(())
    }

    /// 每列的块数，即遍历顺序中内层循环的长度。
    pub fn blocks_per_column(&self) -> usize {
        (self.height / BLOCK_SIZE) as usize
    }

    /// 每帧可容纳的比特数 `C = width * height / 4`。
    pub fn capacity(&self) -> usize {
        (self.width / BLOCK_SIZE) as usize * self.blocks_per_column()
    }

    /// 覆盖 `total_bits` 个比特所需的帧数 `ceil(total_bits / C)`。
    pub fn frame_count(&self, total_bits: usize) -> usize {
        total_bits.div_ceil(self.capacity())
    }

    pub fn worker_count(&self, jobs: usize) -> usize {
        let available = self
            .threads
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get);
        available.min(jobs).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_4k() {
        let config = FrameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity(), 2_073_600);
    }

    #[test]
    fn rejects_odd_dimensions() {
        assert!(matches!(
            FrameConfig::new(31, 32),
            Err(ReelError::InvalidGeometry { .. })
        ));
        assert!(FrameConfig::new(0, 32).is_err());
    }

    #[test]
    fn rejects_unaligned_capacity() {
        // 6x6 只有 9 个块
        assert!(FrameConfig::new(6, 6).is_err());
        assert!(FrameConfig::new(12, 4).is_err());
        assert!(FrameConfig::new(8, 8).is_ok());
    }

    #[test]
    fn frame_count_rounds_up() {
        let config = FrameConfig::new(16, 8).unwrap();
        assert_eq!(config.capacity(), 32);
        assert_eq!(config.frame_count(0), 0);
        assert_eq!(config.frame_count(32), 1);
        assert_eq!(config.frame_count(33), 2);
    }

    #[test]
    fn worker_count_never_exceeds_jobs() {
        let config = FrameConfig::default().with_threads(NonZeroUsize::new(8));
        assert_eq!(config.worker_count(3), 3);
        assert_eq!(config.worker_count(0), 1);
    }
}
