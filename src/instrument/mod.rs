//! # 仪器装配模块
//!
//! 声明式构建中子仪器的组件序列（源、导管、单色器、样品、
//! 监视器），在装配期校验相对放置引用，并生成模拟引擎的
//! 仪器描述文件。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/run.rs` 调用
//! - 被 `sim/runner.rs` 消费
//! - 子模块: component, assembly, optics, instr

pub mod assembly;
pub mod component;
pub mod instr;
pub mod optics;

pub use assembly::{Instrument, InstrumentParameter};
pub use component::{Component, ComponentKind, ParamValue, Placement, Rotation};
pub use optics::{bragg_angle_deg, wavevector};
