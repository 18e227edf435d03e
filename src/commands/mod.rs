//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `models/`, `solver/`, `instrument/`, `sim/`, `utils/`
//! - 子模块: fetch, relax, export, simulate, run

pub mod export;
pub mod fetch;
pub mod relax;
pub mod run;
pub mod simulate;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Fetch(args) => fetch::execute(args),
        Commands::Relax(args) => relax::execute(args),
        Commands::Export(args) => export::execute(args),
        Commands::Simulate(args) => simulate::execute(args),
        Commands::Run(args) => run::execute(args),
    }
}
