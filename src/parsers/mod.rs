//! # 解析器模块
//!
//! 提供结构文件、求解器输出与反射数据文件的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/`, `solver/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: cif, pwout, hkl

pub mod cif;
pub mod hkl;
pub mod pwout;

use crate::error::{BeamflowError, Result};
use crate::models::Crystal;
use std::path::Path;

/// 从文件路径推断格式并解析
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "cif" => cif::parse_cif_file(path),
        _ => Err(BeamflowError::UnsupportedFormat(format!(
            "Cannot determine format for: {}",
            path.display()
        ))),
    }
}
