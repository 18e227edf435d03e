//! # relax 命令实现
//!
//! 读取结构，配置并运行外部 DFT 求解器，解析标量结果，
//! 对比弛豫前后的原子位置，写出弛豫后的结构文件。
//!
//! ## 依赖关系
//! - 使用 `cli/relax.rs` 定义的参数
//! - 使用 `parsers/`, `solver/`, `models/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`, `utils/workspace.rs`

use crate::cli::relax::{PhysicsArgs, RelaxArgs};
use crate::error::{BeamflowError, Result};
use crate::models::relaxation::RY_TO_EV;
use crate::models::{AtomDisplacement, Crystal, RelaxResult};
use crate::parsers;
use crate::parsers::cif::to_cif_string;
use crate::solver::{run_relaxation, SolverConfig, SolverInvocation};
use crate::utils::workspace::{augmented_search_path, Workspace};
use crate::utils::{output, progress};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 标量结果行
#[derive(Debug, Tabled)]
struct ScalarRow {
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// 位移表行
#[derive(Debug, Tabled)]
struct DisplacementRow {
    #[tabled(rename = "Atom")]
    atom: String,
    #[tabled(rename = "Δx (frac)")]
    dx: String,
    #[tabled(rename = "Δy (frac)")]
    dy: String,
    #[tabled(rename = "Δz (frac)")]
    dz: String,
    #[tabled(rename = "|Δr| (Å)")]
    norm: String,
}

/// 执行 relax 命令
pub fn execute(args: RelaxArgs) -> Result<()> {
    output::print_header("DFT Ionic Relaxation");

    let workspace = Workspace::create(&args.workdir)?;

    let crystal = parsers::parse_structure_file(&args.input)?;
    let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();
    output::print_info(&format!(
        "Structure: {} ({}), {} atoms",
        crystal.name,
        crystal.formula(),
        crystal.atoms.len()
    ));
    output::print_info(&format!(
        "Cell: a={:.4} b={:.4} c={:.4} Å, α={:.2} β={:.2} γ={:.2}°",
        a, b, c, alpha, beta, gamma
    ));

    let pseudo_map = parse_pseudo_map(&args.pseudo_map)?;
    let pseudo_dir = args
        .pseudo_dir
        .clone()
        .unwrap_or_else(|| workspace.pseudo_dir());
    let config = build_solver_config(&args.physics, &args.prefix, pseudo_map, pseudo_dir)?;

    let search_path = if args.extra_bin.is_empty() {
        None
    } else {
        Some(augmented_search_path(&args.extra_bin))
    };

    let invocation = SolverInvocation {
        exec: args.pw_exec.clone(),
        workdir: workspace.relax_dir(),
        search_path,
    };

    let spinner = progress::create_spinner(&format!(
        "Running {} (blocking, output in {})",
        args.pw_exec,
        invocation.workdir.display()
    ));
    let outcome = run_relaxation(&crystal, &config, &invocation);
    spinner.finish_and_clear();

    let (relaxed, result) = outcome?;

    print_relax_summary(&result);

    let displacements = relaxed.displacements_from(&crystal)?;
    print_displacements(&relaxed, &displacements);

    if let Some(ref csv_path) = args.diff_csv {
        write_displacement_csv(&displacements, csv_path)?;
        output::print_success(&format!(
            "Displacement table saved to '{}'",
            csv_path.display()
        ));
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_relaxed_path(&args.input));
    fs::write(&output_path, to_cif_string(&relaxed)).map_err(|e| {
        BeamflowError::FileWriteError {
            path: output_path.display().to_string(),
            source: e,
        }
    })?;

    output::print_done(&format!(
        "Relaxed structure written to '{}'",
        output_path.display()
    ));

    Ok(())
}

/// 弛豫后结构文件的默认位置
pub fn default_relaxed_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("structure");
    input.with_file_name(format!("{}_relaxed.cif", stem))
}

/// 解析 "4,4,4" 形式的三元组
pub fn parse_triple(expr: &str) -> Result<[u32; 3]> {
    let parts: Vec<u32> = expr
        .split(',')
        .map(|s| s.trim().parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| {
            BeamflowError::InvalidArgument(format!(
                "Expected three comma-separated integers, got '{}'",
                expr
            ))
        })?;

    if parts.len() != 3 {
        return Err(BeamflowError::InvalidArgument(format!(
            "Expected three comma-separated integers, got '{}'",
            expr
        )));
    }

    Ok([parts[0], parts[1], parts[2]])
}

/// 解析 "Element=file.UPF" 形式的赝势映射
pub fn parse_pseudo_map(entries: &[String]) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    for entry in entries {
        let (element, filename) = entry.split_once('=').ok_or_else(|| {
            BeamflowError::InvalidArgument(format!(
                "Pseudopotential mapping must be 'Element=file.UPF', got '{}'",
                entry
            ))
        })?;

        let element = element.trim();
        let filename = filename.trim();
        if element.is_empty() || filename.is_empty() {
            return Err(BeamflowError::InvalidArgument(format!(
                "Pseudopotential mapping must be 'Element=file.UPF', got '{}'",
                entry
            )));
        }

        map.insert(element.to_string(), filename.to_string());
    }

    Ok(map)
}

/// 从命令行参数构造求解器配置
pub fn build_solver_config(
    physics: &PhysicsArgs,
    prefix: &str,
    pseudopotentials: BTreeMap<String, String>,
    pseudo_dir: PathBuf,
) -> Result<SolverConfig> {
    Ok(SolverConfig {
        prefix: prefix.to_string(),
        kpoints: parse_triple(&physics.kpoints)?,
        kpoint_offset: parse_triple(&physics.kpoint_offset)?,
        ecutwfc: physics.ecutwfc,
        ecutrho: physics.ecutrho,
        smearing: physics.smearing.into(),
        degauss: physics.degauss,
        conv_thr: physics.conv_thr,
        mixing_beta: physics.mixing_beta,
        electron_maxstep: physics.electron_maxstep,
        ion_dynamics: physics.ion_dynamics.into(),
        forc_conv_thr: physics.forc_conv_thr,
        etot_conv_thr: physics.etot_conv_thr,
        pseudo_dir,
        // 求解器自身的临时文件相对作业目录存放
        outdir: PathBuf::from("tmp"),
        pseudopotentials,
    })
}

/// 打印标量结果表
pub fn print_relax_summary(result: &RelaxResult) {
    let mut rows = vec![ScalarRow {
        quantity: "SCF / ionic convergence".to_string(),
        value: format!(
            "{} / {}",
            if result.scf_converged { "yes" } else { "NO" },
            if result.ions_converged { "yes" } else { "NO" }
        ),
    }];

    if let Some(e_ry) = result.total_energy_ry {
        rows.push(ScalarRow {
            quantity: "Total energy".to_string(),
            value: format!("{:.8} Ry ({:.6} eV)", e_ry, e_ry * RY_TO_EV),
        });
    }
    if let Some(e_per_atom) = result.energy_per_atom_ev() {
        rows.push(ScalarRow {
            quantity: "Energy per atom".to_string(),
            value: format!("{:.6} eV", e_per_atom),
        });
    }
    if let Some(fermi) = result.fermi_ev {
        rows.push(ScalarRow {
            quantity: "Fermi level".to_string(),
            value: format!("{:.4} eV", fermi),
        });
    }
    if let Some(p) = result.pressure_kbar {
        rows.push(ScalarRow {
            quantity: "Pressure".to_string(),
            value: format!("{:.2} kBar", p),
        });
    }
    if let Some(ref wall) = result.wall_time {
        rows.push(ScalarRow {
            quantity: "Solver wall time".to_string(),
            value: wall.clone(),
        });
    }

    println!("{}", Table::new(&rows));
}

/// 打印位移表
pub fn print_displacements(relaxed: &Crystal, displacements: &[AtomDisplacement]) {
    let rows: Vec<DisplacementRow> = displacements
        .iter()
        .enumerate()
        .map(|(i, d)| DisplacementRow {
            atom: format!("{}{}", d.element, i + 1),
            dx: format!("{:+.6}", d.delta_frac[0]),
            dy: format!("{:+.6}", d.delta_frac[1]),
            dz: format!("{:+.6}", d.delta_frac[2]),
            norm: format!("{:.6}", d.norm_ang),
        })
        .collect();

    output::print_info(&format!(
        "Position changes after relaxation ({}):",
        relaxed.formula()
    ));
    println!("{}", Table::new(&rows));

    let max_norm = displacements
        .iter()
        .map(|d| d.norm_ang)
        .fold(0.0_f64, f64::max);
    output::print_info(&format!("Largest atomic displacement: {:.6} Å", max_norm));
}

/// 保存位移表到 CSV
pub fn write_displacement_csv(
    displacements: &[AtomDisplacement],
    output_path: &Path,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path).map_err(BeamflowError::CsvError)?;

    wtr.write_record(["atom", "element", "dx_frac", "dy_frac", "dz_frac", "norm_angstrom"])
        .map_err(BeamflowError::CsvError)?;

    for (i, d) in displacements.iter().enumerate() {
        wtr.write_record([
            format!("{}{}", d.element, i + 1),
            d.element.clone(),
            format!("{:.10}", d.delta_frac[0]),
            format!("{:.10}", d.delta_frac[1]),
            format!("{:.10}", d.delta_frac[2]),
            format!("{:.10}", d.norm_ang),
        ])
        .map_err(BeamflowError::CsvError)?;
    }

    wtr.flush().map_err(|e| BeamflowError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triple() {
        assert_eq!(parse_triple("4,4,4").unwrap(), [4, 4, 4]);
        assert_eq!(parse_triple(" 6, 6, 2 ").unwrap(), [6, 6, 2]);
        assert!(parse_triple("4,4").is_err());
        assert!(parse_triple("a,b,c").is_err());
    }

    #[test]
    fn test_parse_pseudo_map() {
        let entries = vec![
            "Si=Si.pbe-n-rrkjus_psl.1.0.0.UPF".to_string(),
            "O = O.pbe-n-kjpaw_psl.0.1.UPF".to_string(),
        ];
        let map = parse_pseudo_map(&entries).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["Si"], "Si.pbe-n-rrkjus_psl.1.0.0.UPF");
        assert_eq!(map["O"], "O.pbe-n-kjpaw_psl.0.1.UPF");
    }

    #[test]
    fn test_parse_pseudo_map_rejects_bad_entries() {
        assert!(parse_pseudo_map(&["SiUPF".to_string()]).is_err());
        assert!(parse_pseudo_map(&["=file.UPF".to_string()]).is_err());
        assert!(parse_pseudo_map(&["Si=".to_string()]).is_err());
    }

    #[test]
    fn test_default_relaxed_path() {
        assert_eq!(
            default_relaxed_path(Path::new("structures/9000775.cif")),
            PathBuf::from("structures/9000775_relaxed.cif")
        );
    }
}
