//! # simulate 命令实现
//!
//! 装配两轴粉末衍射风格的中子束线（源 → 导管 → 单色器 →
//! 样品 → 监视器），运行外部蒙特卡洛引擎并绘制监视器数据。
//!
//! ## 依赖关系
//! - 使用 `cli/simulate.rs` 定义的参数
//! - 使用 `instrument/`, `sim/`, `parsers/hkl.rs`
//! - 使用 `utils/output.rs`, `utils/progress.rs`, `utils/workspace.rs`

use crate::cli::simulate::{BeamlineArgs, PlotFormat, SimulateArgs};
use crate::error::Result;
use crate::instrument::{
    bragg_angle_deg, Component, ComponentKind, Instrument, ParamValue, Placement,
};
use crate::parsers::hkl;
use crate::sim::dataset::DataPoint;
use crate::sim::{plot, run_simulation, DatasetCollection, DatasetData, SimulationRun};
use crate::utils::workspace::{augmented_search_path, Workspace};
use crate::utils::{output, progress};

use std::path::Path;
use tabled::{Table, Tabled};

/// 组件一览表行
#[derive(Debug, Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Engine type")]
    engine_type: String,
    #[tabled(rename = "Placement")]
    placement: String,
}

/// 监视器数据一览表行
#[derive(Debug, Tabled)]
struct DatasetRow {
    #[tabled(rename = "Monitor")]
    monitor: String,
    #[tabled(rename = "Layout")]
    layout: String,
    #[tabled(rename = "Bins")]
    bins: String,
    #[tabled(rename = "Integrated I")]
    integral: String,
}

/// 执行 simulate 命令
pub fn execute(args: SimulateArgs) -> Result<()> {
    output::print_header("Neutron Instrument Simulation");

    let workspace = Workspace::create(&args.workdir)?;

    // 反射文件必须在引擎启动前就绪
    let summary = hkl::probe_hkl_file(&args.hkl)?;
    output::print_info(&format!(
        "Reflection file: {} ({} reflections)",
        args.hkl.display(),
        summary.reflections
    ));

    let instrument = build_instrument(&args.beamline, &args.hkl)?;
    print_component_table(&instrument);

    let mpi = if args.engine.mpi == 0 {
        num_cpus::get()
    } else {
        args.engine.mpi
    };

    let run = SimulationRun {
        ncount: args.engine.ncount,
        mpi,
        output_dir: args
            .outdir
            .clone()
            .unwrap_or_else(|| workspace.sim_dir().join("run")),
        increment_if_exists: !args.engine.no_increment,
    };

    let search_path = if args.extra_bin.is_empty() {
        None
    } else {
        Some(augmented_search_path(&args.extra_bin))
    };

    output::print_info(&format!(
        "Engine: {} with {} particles, MPI degree {}",
        args.engine.mcrun_exec, run.ncount, run.mpi
    ));

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

    print_dataset_summary(&datasets);
    plot_datasets(&datasets, &output_dir, args.engine.plot_format)?;

    output::print_done(&format!(
        "Simulation finished with {} monitor dataset(s)",
        datasets.len()
    ));

    Ok(())
}

/// 装配两轴束线
///
/// 单色器转角由 Bragg 条件从散射矢量大小与波长推出，
/// 出射臂转过 2θ。
pub fn build_instrument(beamline: &BeamlineArgs, hkl: &Path) -> Result<Instrument> {
    let theta = bragg_angle_deg(beamline.mono_q, beamline.wavelength)?;

    let mut instrument = Instrument::new(&beamline.name);
    instrument.add_parameter("lambda", beamline.wavelength);
    instrument.add_declare("double dlambda;");
    instrument.add_initialize("dlambda = 0.05 * lambda;");

    instrument.add_component(
        Component::new("source", ComponentKind::Source)
            .at([0.0, 0.0, 0.0])
            .with_param("radius", ParamValue::Num(0.02))
            .with_param("dist", ParamValue::Num(1.5))
            .with_param("focus_xw", ParamValue::Num(0.03))
            .with_param("focus_yh", ParamValue::Num(0.05))
            .with_param("lambda0", ParamValue::Expr("lambda".to_string()))
            .with_param("dlambda", ParamValue::Expr("dlambda".to_string())),
    )?;

    instrument.add_component(
        Component::new("guide", ComponentKind::Guide)
            .at_relative("source", [0.0, 0.0, 1.5])
            .with_param("w1", ParamValue::Num(0.03))
            .with_param("h1", ParamValue::Num(0.05))
            .with_param("w2", ParamValue::Num(0.03))
            .with_param("h2", ParamValue::Num(0.05))
            .with_param("l", ParamValue::Num(beamline.guide_length))
            .with_param("m", ParamValue::Num(2.0)),
    )?;

    instrument.add_component(
        Component::new("mono_arm", ComponentKind::Arm)
            .at_relative("guide", [0.0, 0.0, beamline.guide_length + 0.1]),
    )?;

    instrument.add_component(
        Component::new("mono", ComponentKind::Monochromator)
            .at_relative("mono_arm", [0.0, 0.0, 0.0])
            .rotated_relative("mono_arm", [0.0, theta, 0.0])
            .with_param("zwidth", ParamValue::Num(0.1))
            .with_param("yheight", ParamValue::Num(0.1))
            .with_param("Q", ParamValue::Num(beamline.mono_q)),
    )?;

    // 出射束方向：Bragg 反射偏转 2θ
    instrument.add_component(
        Component::new("out_arm", ComponentKind::Arm)
            .at_relative("mono_arm", [0.0, 0.0, 0.0])
            .rotated_relative("mono_arm", [0.0, 2.0 * theta, 0.0]),
    )?;

    instrument.add_component(
        Component::new("lmon", ComponentKind::Monitor)
            .with_engine_type("L_monitor")
            .at_relative("out_arm", [0.0, 0.0, 0.5 * beamline.sample_dist])
            .with_param("nL", ParamValue::Num(100.0))
            .with_param("Lmin", ParamValue::Num(0.5 * beamline.wavelength))
            .with_param("Lmax", ParamValue::Num(1.5 * beamline.wavelength))
            .with_param("xwidth", ParamValue::Num(0.05))
            .with_param("yheight", ParamValue::Num(0.05))
            .with_param("filename", ParamValue::Str("lmon.dat".to_string())),
    )?;

    instrument.add_component(
        Component::new("sample", ComponentKind::Sample)
            .at_relative("out_arm", [0.0, 0.0, beamline.sample_dist])
            .with_param("reflections", ParamValue::File(hkl.to_path_buf()))
            .with_param("radius", ParamValue::Num(0.004))
            .with_param("yheight", ParamValue::Num(0.01)),
    )?;

    instrument.add_component(
        Component::new("psd", ComponentKind::Monitor)
            .at_relative("sample", [0.0, 0.0, beamline.detector_dist])
            .with_param("nx", ParamValue::Num(90.0))
            .with_param("ny", ParamValue::Num(90.0))
            .with_param("xwidth", ParamValue::Num(0.2))
            .with_param("yheight", ParamValue::Num(0.2))
            .with_param("filename", ParamValue::Str("psd.dat".to_string())),
    )?;

    instrument.validate()?;

    Ok(instrument)
}

/// 打印组件一览表
pub fn print_component_table(instrument: &Instrument) {
    let rows: Vec<ComponentRow> = instrument
        .components
        .iter()
        .map(|c| ComponentRow {
            name: c.name.clone(),
            kind: c.kind.to_string(),
            engine_type: c.resolved_engine_type().to_string(),
            placement: match &c.placement {
                Placement::Absolute(p) => {
                    format!("({:.2}, {:.2}, {:.2}) absolute", p[0], p[1], p[2])
                }
                Placement::Relative { to, offset } => format!(
                    "({:.2}, {:.2}, {:.2}) rel. {}",
                    offset[0], offset[1], offset[2], to
                ),
            },
        })
        .collect();

    output::print_info(&format!(
        "Instrument '{}' with {} components:",
        instrument.name,
        instrument.components.len()
    ));
    println!("{}", Table::new(&rows));
}

/// 打印监视器数据一览表
pub fn print_dataset_summary(datasets: &DatasetCollection) {
    if datasets.is_empty() {
        output::print_warning("No monitor datasets found in the engine output.");
        return;
    }

    let rows: Vec<DatasetRow> = datasets
        .values()
        .map(|d| match &d.data {
            DatasetData::OneDim { points } => DatasetRow {
                monitor: d.monitor.clone(),
                layout: "1D".to_string(),
                bins: points.len().to_string(),
                integral: format!("{:.4e}", integrate(points)),
            },
            DatasetData::TwoDim {
                rows: ny,
                cols: nx,
                intensity,
            } => DatasetRow {
                monitor: d.monitor.clone(),
                layout: "2D".to_string(),
                bins: format!("{}x{}", nx, ny),
                integral: format!("{:.4e}", intensity.iter().sum::<f64>()),
            },
        })
        .collect();

    println!("{}", Table::new(&rows));
}

/// 渲染全部监视器图表到输出目录
pub fn plot_datasets(
    datasets: &DatasetCollection,
    output_dir: &Path,
    format: PlotFormat,
) -> Result<()> {
    for dataset in datasets.values() {
        let path = output_dir.join(format!("{}.{}", dataset.monitor, format.extension()));
        plot::plot_dataset(dataset, &path, 1000, 700, format == PlotFormat::Svg)?;
        output::print_success(&format!("Plot saved to '{}'", path.display()));
    }
    Ok(())
}

/// 一维直方图强度求和
fn integrate(points: &[DataPoint]) -> f64 {
    points.iter().map(|p| p.intensity).sum()
}
