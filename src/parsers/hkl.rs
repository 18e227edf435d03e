//! # 反射强度 (HKL) 文件探测
//!
//! 反射文件由外部转换工具生成，供模拟引擎的样品组件使用。
//! 本模块不完整解析文件，只统计反射行数，用于导出后的
//! 校验与模拟前的快速失败检查。
//!
//! ## 依赖关系
//! - 被 `commands/export.rs`, `sim/runner.rs` 使用

use crate::error::{BeamflowError, Result};
use std::fs;
use std::path::Path;

/// 反射文件概要
#[derive(Debug, Clone, Copy)]
pub struct HklSummary {
    /// 数据行数（反射数）
    pub reflections: usize,
}

/// 探测反射文件：存在、非空、且至少含一行反射数据
pub fn probe_hkl_file(path: &Path) -> Result<HklSummary> {
    if !path.exists() {
        return Err(BeamflowError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| BeamflowError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let reflections = content.lines().filter(|l| is_reflection_row(l)).count();

    if reflections == 0 {
        return Err(BeamflowError::EmptyReflectionFile {
            path: path.display().to_string(),
        });
    }

    Ok(HklSummary { reflections })
}

/// 数据行：非注释且前三个字段 (h k l) 均可解析为数值
fn is_reflection_row(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
        return false;
    }

    let mut fields = trimmed.split_whitespace();
    let mut parsed = 0;
    for _ in 0..3 {
        match fields.next().and_then(|f| f.parse::<f64>().ok()) {
            Some(_) => parsed += 1,
            None => return false,
        }
    }

    // 至少还要有一列强度相关数据
    parsed == 3 && fields.next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_probe_counts_reflections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.hkl");

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "# TITLE quartz").unwrap();
        writeln!(file, "# h k l Mult dspc F2").unwrap();
        writeln!(file, "1 0 0 6 4.2550 1.234").unwrap();
        writeln!(file, "1 0 1 6 3.3435 10.56").unwrap();
        drop(file);

        let summary = probe_hkl_file(&path).unwrap();
        assert_eq!(summary.reflections, 2);
    }

    #[test]
    fn test_probe_rejects_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.hkl");
        fs::write(&path, "# TITLE nothing here\n").unwrap();

        assert!(matches!(
            probe_hkl_file(&path),
            Err(BeamflowError::EmptyReflectionFile { .. })
        ));
    }

    #[test]
    fn test_probe_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.hkl");

        assert!(matches!(
            probe_hkl_file(&path),
            Err(BeamflowError::FileNotFound { .. })
        ));
    }
}
