//! # 监视器数据绘图
//!
//! 使用 `plotters` 库把监视器直方图渲染成 PNG 或 SVG。
//!
//! ## 功能
//! - 一维监视器：填充折线直方图
//! - 二维监视器：强度热图
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/run.rs` 调用
//! - 使用 `sim/dataset.rs` 的 Dataset 结构
//! - 使用 `plotters` 渲染图表

use crate::error::{BeamflowError, Result};
use crate::sim::dataset::{Dataset, DatasetData};

use plotters::prelude::*;
use std::path::Path;

/// 渲染单个监视器数据集
pub fn plot_dataset(
    dataset: &Dataset,
    output_path: &Path,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_dataset(&root, dataset)?;
        root.present()
            .map_err(|e| BeamflowError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_dataset(&root, dataset)?;
        root.present()
            .map_err(|e| BeamflowError::Other(e.to_string()))?;
    }
    Ok(())
}

/// 绘图核心逻辑，按数据维度分派
fn draw_dataset<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    dataset: &Dataset,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    match &dataset.data {
        DatasetData::OneDim { .. } => draw_histogram(root, dataset),
        DatasetData::TwoDim { .. } => draw_intensity_map(root, dataset),
    }
}

/// 一维直方图
fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    dataset: &Dataset,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let DatasetData::OneDim { points } = &dataset.data else {
        return Err(BeamflowError::Other("not a 1d dataset".to_string()));
    };

    root.fill(&WHITE)
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    let (x_min, x_max) = dataset.xlimits.unwrap_or_else(|| {
        let min = points.first().map(|p| p.x).unwrap_or(0.0);
        let max = points.last().map(|p| p.x).unwrap_or(1.0);
        (min, max)
    });

    let y_max = points
        .iter()
        .map(|p| p.intensity)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(1e-12);

    let title = if dataset.title.is_empty() {
        dataset.monitor.clone()
    } else {
        dataset.title.clone()
    };

    let mut chart = ChartBuilder::on(root)
        .caption(&title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max * 1.1)
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc(dataset.xlabel.as_str())
        .y_desc(if dataset.ylabel.is_empty() {
            "Intensity"
        } else {
            dataset.ylabel.as_str()
        })
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    let line_color = RGBColor(0, 102, 204);

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|p| (p.x, p.intensity)),
            line_color.stroke_width(2),
        ))
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    let fill_color = line_color.mix(0.2);
    chart
        .draw_series(AreaSeries::new(
            points.iter().map(|p| (p.x, p.intensity)),
            0.0,
            fill_color,
        ))
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    Ok(())
}

/// 二维强度热图
fn draw_intensity_map<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    dataset: &Dataset,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let DatasetData::TwoDim {
        rows,
        cols,
        intensity,
    } = &dataset.data
    else {
        return Err(BeamflowError::Other("not a 2d dataset".to_string()));
    };

    root.fill(&WHITE)
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    let (x_min, x_max) = dataset.xlimits.unwrap_or((0.0, *cols as f64));
    let (y_min, y_max) = dataset.ylimits.unwrap_or((0.0, *rows as f64));

    let max_intensity = intensity.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let max_intensity = if max_intensity > 0.0 { max_intensity } else { 1.0 };

    let title = if dataset.title.is_empty() {
        dataset.monitor.clone()
    } else {
        dataset.title.clone()
    };

    let mut chart = ChartBuilder::on(root)
        .caption(&title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(dataset.xlabel.as_str())
        .y_desc(dataset.ylabel.as_str())
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    let dx = (x_max - x_min) / *cols as f64;
    let dy = (y_max - y_min) / *rows as f64;

    chart
        .draw_series((0..*rows).flat_map(|row| {
            let intensity = &intensity;
            (0..*cols).map(move |col| {
                let value = intensity[row * cols + col];
                let x0 = x_min + col as f64 * dx;
                let y0 = y_min + row as f64 * dy;
                Rectangle::new(
                    [(x0, y0), (x0 + dx, y0 + dy)],
                    heat_color(value / max_intensity).filled(),
                )
            })
        }))
        .map_err(|e| BeamflowError::Other(format!("{:?}", e)))?;

    Ok(())
}

/// 归一化强度 [0, 1] -> 蓝白热度色
fn heat_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let r = (255.0 * (1.0 - t) + 0.0 * t) as u8;
    let g = (255.0 * (1.0 - t) + 102.0 * t) as u8;
    let b = (255.0 * (1.0 - t) + 204.0 * t) as u8;
    RGBColor(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::dataset::parse_dat_content;

    const ONE_DIM_DAT: &str = r#"# type: array_1d(3)
# component: lmon
# title: Wavelength monitor
# xlabel: Wavelength [AA]
# ylabel: Intensity
# xlimits: 0.5 4
1.0 10.0 1.0 100
2.0 50.0 2.0 500
3.0 20.0 1.5 200
"#;

    #[test]
    fn test_plot_one_dim_to_svg() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = parse_dat_content(ONE_DIM_DAT, "lmon").unwrap();

        let out = dir.path().join("lmon.svg");
        plot_dataset(&dataset, &out, 800, 600, true).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("<svg"));
    }

    #[test]
    fn test_heat_color_range() {
        assert_eq!(heat_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(heat_color(1.0), RGBColor(0, 102, 204));
        // 超界输入被钳制
        assert_eq!(heat_color(2.0), RGBColor(0, 102, 204));
    }
}
