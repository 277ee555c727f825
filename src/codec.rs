//! # 帧编解码模块
//!
//! 把一段比特绘制到固定尺寸的画布上，或从画布中采样还原比特。
//! 两个方向共用同一个遍历顺序：外层沿 x 以步长 2 前进，内层沿 y 以步长 2 前进。

use crate::bits::BitBuf;
use crate::config::FrameConfig;
use crate::constants::{BIT0_COLOR, BIT1_COLOR, BLOCK_SIZE, PADDING_COLOR};
use crate::error::{ReelError, Result};
use image::{Rgb, RgbImage};

/// 像素颜色的语义分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pixel {
    /// 纯黑，表示比特 1。
    Bit1,
    /// 纯白，表示比特 0。
    Bit0,
    /// 最后一帧中没有数据的位置。
    Padding,
    /// 其他任何颜色。
    Invalid,
}

impl Pixel {
    pub fn classify(rgb: [u8; 3]) -> Self {
        match rgb {
            BIT1_COLOR => Pixel::Bit1,
            BIT0_COLOR => Pixel::Bit0,
            PADDING_COLOR => Pixel::Padding,
            _ => Pixel::Invalid,
        }
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit { Pixel::Bit1 } else { Pixel::Bit0 }
    }

    pub fn color(self) -> Option<[u8; 3]> {
        match self {
            Pixel::Bit1 => Some(BIT1_COLOR),
            Pixel::Bit0 => Some(BIT0_COLOR),
            Pixel::Padding => Some(PADDING_COLOR),
            Pixel::Invalid => None,
        }
    }
}

/// 解码时对异常像素的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// 未知颜色或填充之后出现数据都视为错误。
    #[default]
    Strict,
    /// 跳过所有非黑白像素，不做任何检查。
    Lenient,
}

/// 第 `position` 个块左上角像素的坐标。
pub fn block_origin(config: &FrameConfig, position: usize) -> (u32, u32) {
    let per_column = config.blocks_per_column();
    let x = (position / per_column) as u32 * BLOCK_SIZE;
    let y = (position % per_column) as u32 * BLOCK_SIZE;
    (x, y)
}

/// 按遍历顺序依次给出每个块左上角的坐标。
pub fn blocks(config: &FrameConfig) -> impl Iterator<Item = (u32, u32)> {
    let (width, height) = (config.width, config.height);
    (0..width)
        .step_by(BLOCK_SIZE as usize)
        .flat_map(move |x| (0..height).step_by(BLOCK_SIZE as usize).map(move |y| (x, y)))
}

fn fill_block(canvas: &mut RgbImage, x: u32, y: u32, color: [u8; 3]) {
    for dx in 0..BLOCK_SIZE {
        for dy in 0..BLOCK_SIZE {
            canvas.put_pixel(x + dx, y + dy, Rgb(color));
        }
    }
}

/// 把一段比特编码为一帧画布。
///
/// 前 `chunk.len()` 个块按比特值涂成黑或白，其余的块涂成填充色；
/// 满帧时不会出现填充色。
///
/// # Errors
///
/// 比特数超过每帧容量时返回 `ChunkTooLarge`。
pub fn encode_frame(chunk: &BitBuf, config: &FrameConfig) -> Result<RgbImage> {
    let capacity = config.capacity();
    if chunk.len() > capacity {
        return Err(ReelError::ChunkTooLarge {
            len: chunk.len(),
            capacity,
        });
    }

    let mut canvas = RgbImage::new(config.width, config.height);
    let mut bits = chunk.iter();
    for (x, y) in blocks(config) {
        let pixel = bits.next().map_or(Pixel::Padding, Pixel::from_bit);
        if let Some(color) = pixel.color() {
            fill_block(&mut canvas, x, y, color);
        }
    }

    Ok(canvas)
}

/// 从一帧画布中还原比特，每个块只采样左上角的像素。
///
/// 填充块不产生比特，所以带填充的最后一帧会还原出恰好 `k` 个比特。
///
/// # Errors
///
/// * 画布尺寸与配置不一致。
/// * 严格模式下遇到未知颜色，或数据块出现在填充块之后。
pub fn decode_frame(canvas: &RgbImage, config: &FrameConfig, mode: DecodeMode) -> Result<BitBuf> {
    let (actual_width, actual_height) = canvas.dimensions();
    if (actual_width, actual_height) != (config.width, config.height) {
        return Err(ReelError::DimensionMismatch {
            width: config.width,
            height: config.height,
            actual_width,
            actual_height,
        });
    }

    let mut bits = BitBuf::with_capacity(config.capacity());
    let mut padded = false;

    for (x, y) in blocks(config) {
        let Rgb(rgb) = *canvas.get_pixel(x, y);
        let pixel = Pixel::classify(rgb);

        match (pixel, mode) {
            (Pixel::Bit1 | Pixel::Bit0, DecodeMode::Strict) if padded => {
                return Err(ReelError::PaddingNotTrailing { x, y });
            }
            (Pixel::Bit1, _) => bits.push(true),
            (Pixel::Bit0, _) => bits.push(false),
            (Pixel::Padding, _) => padded = true,
            (Pixel::Invalid, DecodeMode::Strict) => {
                return Err(ReelError::InvalidPixel { x, y, rgb });
            }
            (Pixel::Invalid, DecodeMode::Lenient) => {}
        }
    }

    Ok(bits)
}
