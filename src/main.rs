//! # Beamflow - DFT 到中子仪器模拟工作流工具箱
//!
//! 将"结构下载 → DFT 弛豫 → 反射文件导出 → 中子仪器模拟"的
//! 零散脚本用 Rust 重构，统一成单一可执行文件。
//!
//! ## 子命令
//! - `fetch`    - 下载晶体结构 (CIF) 与赝势文件
//! - `relax`    - 调用外部 DFT 求解器做离子弛豫并解析结果
//! - `export`   - 调用外部转换工具生成反射强度 (HKL) 文件
//! - `simulate` - 装配中子仪器并运行蒙特卡洛引擎
//! - `run`      - 端到端执行完整流水线
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/    (CIF / 求解器输出 / HKL 解析)
//!   │     ├── solver/     (求解器输入生成与进程调用)
//!   │     ├── instrument/ (仪器装配与 .instr 生成)
//!   │     ├── sim/        (引擎调用、数据收集、绘图)
//!   │     └── models/     (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod cli;
mod commands;
mod error;
mod instrument;
mod models;
mod parsers;
mod sim;
mod solver;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
