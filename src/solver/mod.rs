//! # 求解器模块
//!
//! 外部平面波 DFT 求解器的显式进程边界：配置记录、输入文件
//! 生成与阻塞式进程调用。
//!
//! ## 依赖关系
//! - 被 `commands/relax.rs`, `commands/run.rs` 调用
//! - 使用 `models/`, `parsers/pwout.rs`
//! - 子模块: config, input, runner

pub mod config;
pub mod input;
pub mod runner;

pub use config::{IonDynamics, SmearingScheme, SolverConfig};
pub use runner::{run_relaxation, SolverInvocation};
