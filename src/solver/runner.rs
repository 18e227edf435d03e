//! # 求解器进程调用
//!
//! 阻塞式调用外部弛豫求解器：写入固定名称的输入文件，
//! 捕获标准输出到固定名称的输出文件，再解析回结果。
//! 收敛状态在消费结果之前显式检查。
//!
//! ## 依赖关系
//! - 被 `commands/relax.rs`, `commands/run.rs` 调用
//! - 使用 `solver/input.rs`, `parsers/pwout.rs`, `models/`

use crate::error::{BeamflowError, Result};
use crate::models::{Crystal, RelaxResult};
use crate::parsers::pwout;
use crate::solver::config::SolverConfig;
use crate::solver::input::render_input;

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// 求解器约定的输入文件名
pub const INPUT_FILE: &str = "pw.in";
/// 求解器标准输出的落盘文件名
pub const OUTPUT_FILE: &str = "pw.out";

/// 一次求解器调用的进程参数
#[derive(Debug, Clone)]
pub struct SolverInvocation {
    /// 可执行文件名或路径
    pub exec: String,
    /// 作业目录（输入/输出文件都放在这里）
    pub workdir: PathBuf,
    /// 显式传给子进程的可执行搜索路径；None 表示继承当前环境
    pub search_path: Option<OsString>,
}

/// 运行离子弛豫，返回弛豫后的结构与标量结果
pub fn run_relaxation(
    crystal: &Crystal,
    config: &SolverConfig,
    invocation: &SolverInvocation,
) -> Result<(Crystal, RelaxResult)> {
    // 启动前检查赝势文件，避免求解器跑到一半才报错
    verify_pseudopotentials(crystal, config)?;

    fs::create_dir_all(&invocation.workdir).map_err(|e| BeamflowError::FileWriteError {
        path: invocation.workdir.display().to_string(),
        source: e,
    })?;

    let deck = render_input(crystal, config)?;
    let input_path = invocation.workdir.join(INPUT_FILE);
    fs::write(&input_path, deck).map_err(|e| BeamflowError::FileWriteError {
        path: input_path.display().to_string(),
        source: e,
    })?;

    let mut command = Command::new(&invocation.exec);
    command
        .arg("-in")
        .arg(INPUT_FILE)
        .current_dir(&invocation.workdir);

    if let Some(ref search_path) = invocation.search_path {
        command.env("PATH", search_path);
    }

    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BeamflowError::CommandNotFound {
                command: invocation.exec.clone(),
            }
        } else {
            BeamflowError::CommandFailed {
                command: invocation.exec.clone(),
                stderr: e.to_string(),
            }
        }
    })?;

    // 无论成败都保留输出文件供检查
    let output_path = invocation.workdir.join(OUTPUT_FILE);
    fs::write(&output_path, &output.stdout).map_err(|e| BeamflowError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    if !output.status.success() {
        return Err(BeamflowError::CommandFailed {
            command: invocation.exec.clone(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let result = pwout::parse_pw_output(&output_path, &crystal.name)?;

    // 收敛必须显式确认，不能默认成功
    if !result.is_finished {
        return Err(BeamflowError::CommandFailed {
            command: invocation.exec.clone(),
            stderr: format!(
                "solver output ended before completion marker (see {})",
                output_path.display()
            ),
        });
    }
    if !result.scf_converged {
        return Err(BeamflowError::SolverNonconvergence {
            detail: format!(
                "electronic SCF did not converge within {} iterations",
                config.electron_maxstep
            ),
        });
    }
    if !result.ions_converged {
        return Err(BeamflowError::SolverNonconvergence {
            detail: "ionic minimization did not reach its convergence thresholds".to_string(),
        });
    }

    if result.final_positions.is_empty() {
        return Err(BeamflowError::ParseError {
            format: "pw-output".to_string(),
            path: output_path.display().to_string(),
            reason: "Converged run without a final coordinates block".to_string(),
        });
    }

    let relaxed = crystal.with_positions(&result.final_positions)?;

    Ok((relaxed, result))
}

/// 检查每个元素的赝势文件都在赝势目录中
fn verify_pseudopotentials(crystal: &Crystal, config: &SolverConfig) -> Result<()> {
    for element in crystal.species() {
        let filename = config.pseudopotentials.get(&element).ok_or_else(|| {
            BeamflowError::MissingPseudopotential {
                element: element.clone(),
                path: format!("(no mapping; expected under {})", config.pseudo_dir.display()),
            }
        })?;

        let path = config.pseudo_dir.join(filename);
        if !path.is_file() {
            return Err(BeamflowError::MissingPseudopotential {
                element,
                path: path.display().to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn silicon() -> Crystal {
        let lattice = Lattice::from_parameters(5.43, 5.43, 5.43, 90.0, 90.0, 90.0);
        Crystal::new(
            "Si",
            lattice,
            vec![
                Atom::new("Si", [0.0, 0.0, 0.0]),
                Atom::new("Si", [0.25, 0.25, 0.25]),
            ],
        )
    }

    #[test]
    fn test_missing_pseudo_file_detected_before_launch() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = SolverConfig::default();
        config.pseudo_dir = dir.path().join("pseudo");
        config
            .pseudopotentials
            .insert("Si".to_string(), "Si.UPF".to_string());

        let invocation = SolverInvocation {
            exec: "pw.x".to_string(),
            workdir: dir.path().join("relax"),
            search_path: None,
        };

        let result = run_relaxation(&silicon(), &config, &invocation);
        assert!(matches!(
            result,
            Err(BeamflowError::MissingPseudopotential { .. })
        ));
        // 没有进入进程启动，作业目录不应出现输出文件
        assert!(!invocation.workdir.join(OUTPUT_FILE).exists());
    }

    #[test]
    fn test_missing_executable_is_launch_failure() {
        let dir = tempfile::tempdir().unwrap();

        let pseudo_dir = dir.path().join("pseudo");
        std::fs::create_dir_all(&pseudo_dir).unwrap();
        std::fs::write(pseudo_dir.join("Si.UPF"), "<UPF/>").unwrap();

        let mut config = SolverConfig::default();
        config.pseudo_dir = pseudo_dir;
        config
            .pseudopotentials
            .insert("Si".to_string(), "Si.UPF".to_string());

        let invocation = SolverInvocation {
            exec: "beamflow-no-such-solver".to_string(),
            workdir: dir.path().join("relax"),
            search_path: None,
        };

        let result = run_relaxation(&silicon(), &config, &invocation);
        assert!(matches!(
            result,
            Err(BeamflowError::CommandNotFound { .. })
        ));
        // 输入文件已经写好，便于手动重跑排查
        assert!(invocation.workdir.join(INPUT_FILE).exists());
    }
}
