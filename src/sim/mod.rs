//! # 模拟引擎模块
//!
//! 蒙特卡洛射线追踪引擎的显式进程边界：仪器文件写入、
//! 引擎调用、监视器数据收集与绘图。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/run.rs` 调用
//! - 使用 `instrument/` 生成仪器描述
//! - 子模块: runner, dataset, plot

pub mod dataset;
pub mod plot;
pub mod runner;

pub use dataset::{collect_datasets, Dataset, DatasetCollection, DatasetData};
pub use runner::{run_simulation, SimulationRun};
