//! # 数据模型模块
//!
//! 定义晶体结构、求解器配置与弛豫结果的统一表示。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `solver/`, `commands/` 使用
//! - 无外部模块依赖

pub mod relaxation;
pub mod structure;

pub use relaxation::RelaxResult;
pub use structure::{Atom, AtomDisplacement, Crystal, Lattice};
