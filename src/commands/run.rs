//! # run 命令实现
//!
//! 端到端流水线：工作区准备 → 下载 → 解析 → 弛豫 →
//! 位移对比 → 反射文件导出 → 仪器装配与模拟 → 绘图。
//! 严格顺序执行，任何阶段失败立即中止；每个阶段的输出
//! 文件是下一阶段的输入，路径全部显式传递。
//!
//! ## 依赖关系
//! - 使用 `cli/run.rs` 定义的参数
//! - 复用 `commands/relax.rs`, `commands/export.rs`, `commands/simulate.rs` 的逻辑
//! - 使用 `parsers/`, `solver/`, `sim/`, `utils/`

use crate::cli::run::RunArgs;
use crate::commands::{export, relax, simulate};
use crate::error::{BeamflowError, Result};
use crate::parsers;
use crate::parsers::cif::to_cif_string;
use crate::sim::{run_simulation, SimulationRun};
use crate::solver::{run_relaxation, SolverInvocation};
use crate::utils::download::{self, FetchStatus};
use crate::utils::workspace::{augmented_search_path, Workspace};
use crate::utils::{output, progress};

use std::fs;

const STAGES: usize = 7;

/// 执行 run 命令
pub fn execute(args: RunArgs) -> Result<()> {
    output::print_header("End-to-End Materials-to-Experiment Workflow");

    let search_path = if args.extra_bin.is_empty() {
        None
    } else {
        Some(augmented_search_path(&args.extra_bin))
    };

    // 阶段 1：工作区
    output::print_stage(1, STAGES, "Preparing workspace");
    let workspace = Workspace::create(&args.workdir)?;
    output::print_info(&format!("Workspace: {}", workspace.root().display()));

    // 阶段 2：下载输入
    output::print_stage(2, STAGES, "Fetching structure and pseudopotentials");
    let pseudo_map = relax::parse_pseudo_map(&args.pseudo_map)?;
    if pseudo_map.is_empty() {
        return Err(BeamflowError::InvalidArgument(
            "At least one --pseudo 'Element=file.UPF' mapping is required".to_string(),
        ));
    }

    let client = reqwest::blocking::Client::new();
    let (cif_path, status) = download::fetch_structure(
        &client,
        &args.cod_id,
        &workspace.structures_dir(),
        args.force,
    )?;
    report_fetch(&cif_path.display().to_string(), status);

    for filename in pseudo_map.values() {
        let (path, status) =
            download::fetch_pseudopotential(&client, filename, &workspace.pseudo_dir(), args.force)?;
        report_fetch(&path.display().to_string(), status);
    }

    // 阶段 3：解析结构
    output::print_stage(3, STAGES, "Parsing structure");
    let crystal = parsers::parse_structure_file(&cif_path)?;
    output::print_info(&format!(
        "Structure: {} ({}), {} atoms",
        crystal.name,
        crystal.formula(),
        crystal.atoms.len()
    ));

    // 阶段 4：离子弛豫
    output::print_stage(4, STAGES, "Running DFT ionic relaxation");
    let config = relax::build_solver_config(
        &args.physics,
        &args.cod_id,
        pseudo_map,
        workspace.pseudo_dir(),
    )?;

    let invocation = SolverInvocation {
        exec: args.pw_exec.clone(),
        workdir: workspace.relax_dir(),
        search_path: search_path.clone(),
    };

    let spinner = progress::create_spinner(&format!("Running {} (blocking)...", args.pw_exec));
    let outcome = run_relaxation(&crystal, &config, &invocation);
    spinner.finish_and_clear();
    let (relaxed, result) = outcome?;

    relax::print_relax_summary(&result);
    let displacements = relaxed.displacements_from(&crystal)?;
    relax::print_displacements(&relaxed, &displacements);

    let relaxed_cif = workspace
        .structures_dir()
        .join(format!("{}_relaxed.cif", args.cod_id));
    fs::write(&relaxed_cif, to_cif_string(&relaxed)).map_err(|e| {
        BeamflowError::FileWriteError {
            path: relaxed_cif.display().to_string(),
            source: e,
        }
    })?;
    output::print_success(&format!("Relaxed structure: {}", relaxed_cif.display()));

    // 阶段 5：反射文件导出
    output::print_stage(5, STAGES, "Exporting reflection intensities");
    let hkl_path = export::default_hkl_path(&relaxed_cif);
    let summary = export::export_reflections(
        &relaxed_cif,
        &hkl_path,
        &args.cif2hkl_exec,
        args.mode,
        search_path.as_ref(),
    )?;
    output::print_conversion(
        &relaxed_cif.display().to_string(),
        &hkl_path.display().to_string(),
    );
    output::print_info(&format!("{} reflections available", summary.reflections));

    // 阶段 6：仪器装配与模拟
    output::print_stage(6, STAGES, "Assembling instrument and running simulation");
    let instrument = simulate::build_instrument(&args.beamline, &hkl_path)?;
    simulate::print_component_table(&instrument);

    let mpi = if args.engine.mpi == 0 {
        num_cpus::get()
    } else {
        args.engine.mpi
    };
    let run = SimulationRun {
        ncount: args.engine.ncount,
        mpi,
        output_dir: workspace.sim_dir().join("run"),
        increment_if_exists: !args.engine.no_increment,
    };

    let spinner = progress::create_spinner("Running Monte Carlo ray tracing (blocking)...");
    let outcome = run_simulation(
        &instrument,
        &run,
        &args.engine.mcrun_exec,
        &workspace.sim_dir(),
        search_path.as_ref(),
    );
    spinner.finish_and_clear();
    let (output_dir, datasets) = outcome?;
    output::print_success(&format!("Engine output in '{}'", output_dir.display()));

    // 阶段 7：数据收集与绘图
    output::print_stage(7, STAGES, "Collecting datasets and plotting");
    simulate::print_dataset_summary(&datasets);
    simulate::plot_datasets(&datasets, &output_dir, args.engine.plot_format)?;

    output::print_separator();
    output::print_done(&format!(
        "Workflow complete: {} -> {} -> {} monitor dataset(s)",
        args.cod_id,
        hkl_path.display(),
        datasets.len()
    ));

    Ok(())
}

fn report_fetch(path: &str, status: FetchStatus) {
    match status {
        FetchStatus::Downloaded(bytes) => {
            output::print_success(&format!("{} ({} bytes)", path, bytes));
        }
        FetchStatus::SkippedExisting => {
            output::print_skip(&format!("{} (already present)", path));
        }
    }
}
