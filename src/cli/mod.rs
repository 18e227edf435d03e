//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `fetch`: 下载结构与赝势文件
//! - `relax`: 运行外部 DFT 弛豫并解析结果
//! - `export`: 生成反射强度 (HKL) 文件
//! - `simulate`: 装配仪器并运行蒙特卡洛引擎
//! - `run`: 端到端流水线
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: fetch, relax, export, simulate, run

pub mod export;
pub mod fetch;
pub mod relax;
pub mod run;
pub mod simulate;

use clap::{Parser, Subcommand};

/// Beamflow - DFT 到中子仪器模拟工作流工具箱
#[derive(Parser)]
#[command(name = "beamflow")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "A DFT-to-neutron-instrument simulation workflow toolkit", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a crystal structure (CIF) and pseudopotential files
    Fetch(fetch::FetchArgs),

    /// Run an external DFT ionic relaxation and parse its results
    Relax(relax::RelaxArgs),

    /// Export a reflection intensity (HKL) file via an external converter
    Export(export::ExportArgs),

    /// Assemble a neutron instrument and run the Monte Carlo engine
    Simulate(simulate::SimulateArgs),

    /// Run the full fetch -> relax -> export -> simulate pipeline
    Run(run::RunArgs),
}
