//! # 错误类型模块
//!
//! 库内部的所有操作都返回结构化的 `ReelError`，由处理函数再用 `anyhow` 附加上下文。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 库中所有操作共用的错误类型。
#[derive(Debug, Error)]
pub enum ReelError {
    /// 文件读写失败。
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 图像编码或解码失败。
    #[error("image error on {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 画布尺寸不可用。
    #[error("invalid frame geometry {width}x{height}: {reason}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("chunk of {len} bits exceeds frame capacity of {capacity} bits")]
    ChunkTooLarge { len: usize, capacity: usize },

    #[error("frame is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// 采样像素既不是黑/白，也不是填充色。
    #[error("unexpected pixel color {rgb:?} at ({x}, {y})")]
    InvalidPixel { x: u32, y: u32, rgb: [u8; 3] },

    /// 填充块之后又出现了数据块。
    #[error("data block at ({x}, {y}) follows padding")]
    PaddingNotTrailing { x: u32, y: u32 },

    #[error("frame {index} is missing from the frame set")]
    MissingFrame { index: usize },

    #[error("frame {index} was supplied more than once")]
    DuplicateFrame { index: usize },

    #[error("frame {index} is outside the expected range 0..{expected}")]
    UnexpectedFrame { index: usize, expected: usize },

    #[error("decoded {actual} bytes, expected {expected}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// 清单文件内容无法解析或写入。
    #[error("manifest error on {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 没有清单文件，说明帧集合不完整或尚未写完。
    #[error("no manifest in {}; the frame set is incomplete", dir.display())]
    MissingManifest { dir: PathBuf },

    /// 清单中的帧数与记录的字节数不符。
    #[error("manifest lists {frame_count} frames but {byte_len} bytes need {expected}")]
    ManifestMismatch {
        frame_count: usize,
        byte_len: u64,
        expected: usize,
    },

    /// 清单记录的字节数超出本平台可寻址的范围。
    #[error("manifest byte length {byte_len} is out of range")]
    ManifestOverflow { byte_len: u64 },

    /// 工作目录中已有帧集合，不能被覆盖。
    #[error("{} already contains a frame set", dir.display())]
    FrameSetExists { dir: PathBuf },

    #[error("operation cancelled")]
    Cancelled,

    #[error("a frame worker panicked")]
    WorkerPanicked,
}

impl ReelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReelError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        ReelError::Image {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ReelError> = std::result::Result<T, E>;
