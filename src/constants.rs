/// 默认画布宽度 (4K)。
pub const DEFAULT_WIDTH: u32 = 3840;

/// 默认画布高度 (4K)。
pub const DEFAULT_HEIGHT: u32 = 2160;

/// 每个比特占用一个 2x2 的像素块。
pub const BLOCK_SIZE: u32 = 2;

/// 比特 1 对应纯黑。
pub const BIT1_COLOR: [u8; 3] = [0, 0, 0];

/// 比特 0 对应纯白。
pub const BIT0_COLOR: [u8; 3] = [255, 255, 255];

/// 最后一帧中超出数据部分的填充色 (纯红)。
pub const PADDING_COLOR: [u8; 3] = [255, 0, 0];

/// 帧文件名前缀，完整文件名为 `out_<序号>.<扩展名>`。
pub const FRAME_PREFIX: &str = "out_";

/// 帧集合的完成标记，只有所有帧写入成功后才会生成。
pub const MANIFEST_NAME: &str = "manifest.json";

/// 清单格式版本。
pub const MANIFEST_VERSION: u32 = 1;

/// 默认的帧输出目录。
pub const DEFAULT_OUTPUT_DIR: &str = "tmp";

/// 解码输出文件的默认名称前缀，完整名称为 `decoded<原扩展名>`。
pub const DECODED_STEM: &str = "decoded";
