//! # 平面波求解器输出解析器
//!
//! 解析 pw.x 风格的弛豫计算输出文本，提取能量、费米能级、
//! 收敛状态与弛豫后的原子位置。
//!
//! ## 依赖关系
//! - 被 `solver/runner.rs`, `commands/relax.rs` 使用
//! - 使用 `models/relaxation.rs`
//! - 使用 `regex` 提取压力与墙钟时间

use crate::error::{BeamflowError, Result};
use crate::models::RelaxResult;
use regex::Regex;
use std::fs;
use std::path::Path;

/// 解析求解器输出文件
pub fn parse_pw_output(path: &Path, structure_name: &str) -> Result<RelaxResult> {
    let content = fs::read_to_string(path).map_err(|e| BeamflowError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(parse_pw_output_content(&content, structure_name))
}

/// 从字符串内容解析求解器输出
pub fn parse_pw_output_content(content: &str, structure_name: &str) -> RelaxResult {
    let mut result = RelaxResult::new(structure_name);

    let pressure_re = Regex::new(r"P\s*=\s*(-?\d+(?:\.\d+)?)").unwrap();
    let wall_re = Regex::new(r"(\S+)\s*WALL").unwrap();

    let mut scf_achieved = false;
    let mut scf_failed = false;

    for line in content.lines() {
        // 正常结束标志
        if line.contains("JOB DONE") {
            result.is_finished = true;
        }

        // SCF 收敛状态：弛豫中每个离子步都会出现一次，
        // 任何一步出现 NOT achieved 都视为不收敛
        if line.contains("convergence has been achieved") {
            scf_achieved = true;
        }
        if line.contains("convergence NOT achieved") {
            scf_failed = true;
        }

        // 几何优化终点
        if line.contains("End of BFGS Geometry Optimization")
            || line.contains("End of damped dynamics calculation")
        {
            result.ions_converged = true;
        }

        // 提取原子数
        // "number of atoms/cell      =            3"
        if line.contains("number of atoms/cell") {
            if let Some(val) = extract_value_after_eq(line) {
                result.num_atoms = Some(val as usize);
            }
        }

        // 提取总能量（以 '!' 开头的行是收敛后的值）
        // "!    total energy              =     -22.83850478 Ry"
        if line.trim_start().starts_with('!') && line.contains("total energy") {
            if let Some(val) = extract_value_after_eq(line) {
                result.total_energy_ry = Some(val);
            }
        }

        // 提取费米能级
        // "the Fermi energy is     6.5213 ev"
        if line.contains("the Fermi energy is") {
            if let Some(val) = extract_number_after(line, "is") {
                result.fermi_ev = Some(val);
            }
        }

        // 提取压力
        // "total   stress  (Ry/bohr**3)                   (kbar)     P=   -5.62"
        if line.contains("total   stress") {
            if let Some(cap) = pressure_re.captures(line) {
                result.pressure_kbar = cap[1].parse().ok();
            }
        }

        // 提取墙钟时间
        // "     PWSCF        :      4.85s CPU      5.20s WALL"
        if line.contains("PWSCF") && line.contains("WALL") {
            if let Some(cap) = wall_re.captures(line) {
                result.wall_time = Some(cap[1].to_string());
            }
        }
    }

    result.scf_converged = scf_achieved && !scf_failed;
    result.final_positions = parse_final_positions(content);

    result
}

/// 解析 "Begin final coordinates ... End final coordinates" 块
fn parse_final_positions(content: &str) -> Vec<(String, [f64; 3])> {
    let mut positions = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("Begin final coordinates") {
            in_block = true;
            positions.clear(); // 只保留最后一个块
            continue;
        }
        if trimmed.starts_with("End final coordinates") {
            in_block = false;
            continue;
        }
        if !in_block {
            continue;
        }

        // 跳过块内的标题行与空行
        if trimmed.is_empty()
            || trimmed.starts_with("ATOMIC_POSITIONS")
            || trimmed.starts_with("CELL_PARAMETERS")
        {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let element = match parts.next() {
            Some(e) if e.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) => e,
            _ => continue,
        };

        let coords: Vec<f64> = parts.filter_map(|s| s.parse().ok()).take(3).collect();
        if coords.len() == 3 {
            positions.push((element.to_string(), [coords[0], coords[1], coords[2]]));
        }
    }

    positions
}

/// 提取等号后的数值
fn extract_value_after_eq(s: &str) -> Option<f64> {
    if let Some(pos) = s.find('=') {
        let after = &s[pos + 1..];
        after.trim().split_whitespace().next()?.parse().ok()
    } else {
        None
    }
}

/// 提取指定标记之后的数值
fn extract_number_after(s: &str, marker: &str) -> Option<f64> {
    if let Some(pos) = s.find(marker) {
        let after = &s[pos + marker.len()..];
        after
            .split_whitespace()
            .find_map(|w| w.parse::<f64>().ok())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONVERGED_OUTPUT: &str = r#"
     Program PWSCF v.7.2 starts on  8Aug2025

     number of atoms/cell      =            2
     number of atomic types    =            1

     Self-consistent Calculation

     convergence has been achieved in   9 iterations

!    total energy              =     -22.83850478 Ry

     the Fermi energy is     6.5213 ev

     total   stress  (Ry/bohr**3)                   (kbar)     P=       -5.62

     BFGS Geometry Optimization

     convergence has been achieved in   6 iterations

!    total energy              =     -22.84103911 Ry

     the Fermi energy is     6.4981 ev

     End of BFGS Geometry Optimization

     Final enthalpy =     -22.8410391139 Ry
Begin final coordinates

ATOMIC_POSITIONS (crystal)
Si               0.0000000000        0.0000000000        0.0000000000
Si               0.2493000000        0.2506000000        0.2500000000
End final coordinates

     PWSCF        :      4.85s CPU      5.20s WALL

   This run was terminated on:  12:00:00   8Aug2025

=------------------------------------------------------------------------------=
   JOB DONE.
=------------------------------------------------------------------------------=
"#;

    const NONCONVERGED_OUTPUT: &str = r#"
     number of atoms/cell      =            2

     Self-consistent Calculation

     convergence NOT achieved after 100 iterations: stopping

     PWSCF        :     33.10s CPU     34.92s WALL

   JOB DONE.
"#;

    #[test]
    fn test_parse_converged_relaxation() {
        let result = parse_pw_output_content(CONVERGED_OUTPUT, "Si");

        assert!(result.is_finished);
        assert!(result.scf_converged);
        assert!(result.ions_converged);
        assert_eq!(result.num_atoms, Some(2));

        // 最后一次 '!' 行的值
        assert!((result.total_energy_ry.unwrap() - (-22.84103911)).abs() < 1e-8);
        assert!((result.fermi_ev.unwrap() - 6.4981).abs() < 1e-6);
        assert!((result.pressure_kbar.unwrap() - (-5.62)).abs() < 1e-9);
        assert_eq!(result.wall_time.as_deref(), Some("5.20s"));
    }

    #[test]
    fn test_parse_final_positions() {
        let result = parse_pw_output_content(CONVERGED_OUTPUT, "Si");

        assert_eq!(result.final_positions.len(), 2);
        assert_eq!(result.final_positions[0].0, "Si");
        assert!((result.final_positions[1].1[0] - 0.2493).abs() < 1e-9);
        assert!((result.final_positions[1].1[1] - 0.2506).abs() < 1e-9);
    }

    #[test]
    fn test_nonconvergence_is_not_success() {
        let result = parse_pw_output_content(NONCONVERGED_OUTPUT, "Si");

        assert!(result.is_finished); // 进程正常退出
        assert!(!result.scf_converged); // 但物理上没有收敛
        assert!(!result.ions_converged);
        assert!(result.final_positions.is_empty());
    }

    #[test]
    fn test_scf_failure_overrides_earlier_success() {
        let content = "convergence has been achieved in 5 iterations\n\
                       convergence NOT achieved after 100 iterations: stopping\n";
        let result = parse_pw_output_content(content, "x");

        assert!(!result.scf_converged);
    }
}
