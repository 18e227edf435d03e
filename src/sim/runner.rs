//! # 模拟引擎调用
//!
//! 写出仪器描述文件并阻塞式调用外部蒙特卡洛引擎。
//! 并行完全交给引擎自身的 MPI；本进程只等待。
//! 引擎启动前先做依赖文件的快速失败检查。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/run.rs` 调用
//! - 使用 `instrument/`, `sim/dataset.rs`, `utils/workspace.rs`

use crate::error::{BeamflowError, Result};
use crate::instrument::assembly::Instrument;
use crate::instrument::instr::to_instr_string;
use crate::sim::dataset::{collect_datasets, DatasetCollection};
use crate::utils::workspace::unique_output_dir;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 仪器描述文件的固定名称
pub const INSTR_FILE: &str = "instrument.instr";

/// 一次模拟运行的参数
#[derive(Debug, Clone)]
pub struct SimulationRun {
    /// 模拟粒子数
    pub ncount: u64,
    /// MPI 并行度（1 表示串行）
    pub mpi: usize,
    /// 引擎输出目录
    pub output_dir: PathBuf,
    /// 输出目录已存在时自动编号（dir_1, dir_2, ...）
    pub increment_if_exists: bool,
}

/// 运行模拟并收集监视器数据
///
/// 返回实际使用的输出目录（可能被编号）与数据集集合。
pub fn run_simulation(
    instrument: &Instrument,
    run: &SimulationRun,
    exec: &str,
    workdir: &Path,
    search_path: Option<&OsString>,
) -> Result<(PathBuf, DatasetCollection)> {
    instrument.validate()?;

    // 快速失败：样品等组件引用的文件必须存在且非空，
    // 否则引擎会在深处用难懂的方式报错
    for (component, path) in instrument.file_dependencies() {
        let missing = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if missing {
            return Err(BeamflowError::MissingDependencyFile {
                path: path.display().to_string(),
                producer: format!("component '{}'", component),
            });
        }
    }

    fs::create_dir_all(workdir).map_err(|e| BeamflowError::FileWriteError {
        path: workdir.display().to_string(),
        source: e,
    })?;

    let instr_path = workdir.join(INSTR_FILE);
    fs::write(&instr_path, to_instr_string(instrument)).map_err(|e| {
        BeamflowError::FileWriteError {
            path: instr_path.display().to_string(),
            source: e,
        }
    })?;

    let output_dir = if run.increment_if_exists {
        unique_output_dir(&run.output_dir)
    } else if run.output_dir.exists() {
        return Err(BeamflowError::InvalidArgument(format!(
            "Output directory already exists: {} (pass --increment to auto-number)",
            run.output_dir.display()
        )));
    } else {
        run.output_dir.clone()
    };

    let mut command = Command::new(exec);
    command
        .arg(INSTR_FILE)
        .arg("-n")
        .arg(run.ncount.to_string())
        .arg("-d")
        .arg(&output_dir)
        .current_dir(workdir);

    if run.mpi > 1 {
        command.arg(format!("--mpi={}", run.mpi));
    }
    if let Some(search_path) = search_path {
        command.env("PATH", search_path);
    }

    let output = command.output().map_err(|e| {
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

    if !output.status.success() {
        return Err(BeamflowError::CommandFailed {
            command: exec.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let datasets = collect_datasets(&output_dir)?;

    Ok((output_dir, datasets))
}
