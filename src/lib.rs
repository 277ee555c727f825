//! # bytereel 库
//!
//! 把任意文件编码为一组黑白像素帧，并从帧集合中还原原始文件。
//!
//! 每个比特占用一个 2x2 的像素块：黑色为 1，白色为 0，最后一帧中多余的位置涂成红色填充。
//! 帧按序号命名，可以交给外部工具封装为视频。

// 声明库包含的所有模块。

pub mod assembler;
pub mod bits;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod handler;
pub mod manifest;
pub mod reel;
pub mod scheduler;

pub use error::{ReelError, Result};
