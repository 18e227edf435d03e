//! # export 命令实现
//!
//! 调用外部转换工具生成反射强度 (HKL) 文件，并校验输出
//! 确实存在且包含反射数据（只看退出码不够）。
//!
//! ## 依赖关系
//! - 使用 `cli/export.rs` 定义的参数
//! - 使用 `parsers/hkl.rs`, `utils/output.rs`, `utils/workspace.rs`

use crate::cli::export::{ExportArgs, ReflectionMode};
use crate::error::{BeamflowError, Result};
use crate::parsers::hkl::{self, HklSummary};
use crate::utils::output;
use crate::utils::workspace::augmented_search_path;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 执行 export 命令
pub fn execute(args: ExportArgs) -> Result<()> {
    output::print_header("Exporting Reflection Intensities");

    if !args.input.exists() {
        return Err(BeamflowError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("hkl"));

    let search_path = if args.extra_bin.is_empty() {
        None
    } else {
        Some(augmented_search_path(&args.extra_bin))
    };

    let summary = export_reflections(
        &args.input,
        &output_path,
        &args.exec,
        args.mode,
        search_path.as_ref(),
    )?;

    output::print_conversion(
        &args.input.display().to_string(),
        &output_path.display().to_string(),
    );
    output::print_done(&format!("{} reflections exported", summary.reflections));

    Ok(())
}

/// 调用转换工具并校验反射文件
///
/// 返回的概要同时充当"输出存在且非空"的证明。
pub fn export_reflections(
    input: &Path,
    output_path: &Path,
    exec: &str,
    mode: ReflectionMode,
    search_path: Option<&OsString>,
) -> Result<HklSummary> {
    let mut command = Command::new(exec);
    command
        .arg("--mode")
        .arg(mode.keyword())
        .arg("-o")
        .arg(output_path)
        .arg(input);

    if let Some(search_path) = search_path {
        command.env("PATH", search_path);
    }

    let result = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BeamflowError::CommandNotFound {
                command: exec.to_string(),
            }
        } else {
            BeamflowError::CommandFailed {
                command: exec.to_string(),
                stderr: e.to_string(),
            }
        }
    })?;

    if !result.status.success() {
        return Err(BeamflowError::CommandFailed {
            command: exec.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }

    // 退出码为 0 不代表文件可用；显式探测反射行
    hkl::probe_hkl_file(output_path)
}

/// 反射文件的默认输出位置
pub fn default_hkl_path(input: &Path) -> PathBuf {
    input.with_extension("hkl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hkl_path() {
        assert_eq!(
            default_hkl_path(Path::new("structures/quartz_relaxed.cif")),
            PathBuf::from("structures/quartz_relaxed.hkl")
        );
    }

    #[test]
    fn test_missing_converter_is_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("quartz.cif");
        std::fs::write(&input, "data_quartz\n").unwrap();

        let result = export_reflections(
            &input,
            &dir.path().join("quartz.hkl"),
            "beamflow-no-such-converter",
            ReflectionMode::Nuc,
            None,
        );

        assert!(matches!(
            result,
            Err(BeamflowError::CommandNotFound { .. })
        ));
    }
}
