use clap::Parser;

use bytereel::{
    cli::{Cli, Commands, setup_logger},
    handler::{handle_decode, handle_decode_frame, handle_encode, handle_test},
};

/// 程序的主入口点
///
/// 负责解析命令行参数、初始化日志，并根据子命令将执行分派到相应的处理函数。
/// 任何错误都会让进程以非零状态退出。
fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();
    setup_logger(cli.verbose);

    // 根据子命令调用相应的处理函数
    match cli.command {
        Commands::Encode(args) => handle_encode(args),
        Commands::Decode(args) => handle_decode(args),
        Commands::DecodeFrame(args) => handle_decode_frame(args),
        Commands::Test(args) => handle_test(args),
    }
}
