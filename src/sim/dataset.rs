//! # 监视器数据集解析
//!
//! 解析引擎输出目录中的监视器数据文件（`#` 开头的元数据
//! 头 + 数据行），汇总成按监视器名索引的集合。
//!
//! ## 支持的数据布局
//! ```text
//! # type: array_1d(100)
//! # component: lmon
//! # title: Wavelength monitor
//! # xlabel: Wavelength [AA]
//! # ylabel: Intensity
//! # xlimits: 0.5 4
//! # variables: L I I_err N
//! 0.5175 12.3 0.41 123
//! ...
//! ```
//! 二维监视器 (`array_2d(m, n)`) 的强度矩阵按行读入。
//!
//! ## 依赖关系
//! - 被 `sim/runner.rs`, `sim/plot.rs`, `commands/simulate.rs` 使用
//! - 使用 `walkdir` + `glob` 收集数据文件

use crate::error::{BeamflowError, Result};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// 一维监视器的单个数据点
#[derive(Debug, Clone, Copy)]
pub struct DataPoint {
    /// 横轴坐标（bin 中心）
    pub x: f64,
    /// 强度
    pub intensity: f64,
    /// 强度统计误差
    pub error: f64,
}

/// 数据主体：一维直方图或二维强度图
#[derive(Debug, Clone)]
pub enum DatasetData {
    OneDim { points: Vec<DataPoint> },
    TwoDim {
        rows: usize,
        cols: usize,
        intensity: Vec<f64>,
    },
}

/// 单个监视器的数据集
#[derive(Debug, Clone)]
pub struct Dataset {
    /// 监视器（组件）名
    pub monitor: String,
    /// 标题
    pub title: String,
    /// 轴标签
    pub xlabel: String,
    pub ylabel: String,
    /// 横轴范围
    pub xlimits: Option<(f64, f64)>,
    /// 纵轴范围（二维监视器）
    pub ylimits: Option<(f64, f64)>,
    /// 数据
    pub data: DatasetData,
}

/// 按监视器名索引的数据集集合
pub type DatasetCollection = BTreeMap<String, Dataset>;

/// 解析单个监视器数据文件
pub fn parse_dat_file(path: &Path) -> Result<Dataset> {
    let content = fs::read_to_string(path).map_err(|e| BeamflowError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_dat_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("monitor"),
    )
    .ok_or_else(|| BeamflowError::ParseError {
        format: "monitor-dat".to_string(),
        path: path.display().to_string(),
        reason: "No recognizable data header or rows".to_string(),
    })
}

/// 从字符串内容解析监视器数据
pub fn parse_dat_content(content: &str, default_name: &str) -> Option<Dataset> {
    let mut monitor = default_name.to_string();
    let mut title = String::new();
    let mut xlabel = String::new();
    let mut ylabel = String::new();
    let mut xlimits = None;
    let mut ylimits = None;
    let mut dims: Option<(usize, usize)> = None; // (cols, rows) for array_2d
    let mut is_2d = false;

    let mut points: Vec<DataPoint> = Vec::new();
    let mut grid: Vec<f64> = Vec::new();
    // 二维文件的 Data 块后面还跟 Errors/Events 块，只读第一块
    let mut in_data_block = true;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(meta) = trimmed.strip_prefix('#') {
            let meta = meta.trim();
            if let Some(value) = meta.strip_prefix("component:") {
                monitor = value.trim().to_string();
            } else if let Some(value) = meta.strip_prefix("title:") {
                title = value.trim().to_string();
            } else if let Some(value) = meta.strip_prefix("xlabel:") {
                xlabel = value.trim().to_string();
            } else if let Some(value) = meta.strip_prefix("ylabel:") {
                ylabel = value.trim().to_string();
            } else if let Some(value) = meta.strip_prefix("xlimits:") {
                xlimits = parse_limits(value);
            } else if let Some(value) = meta.strip_prefix("ylimits:") {
                ylimits = parse_limits(value);
            } else if let Some(value) = meta.strip_prefix("type:") {
                let value = value.trim();
                if let Some(args) = value
                    .strip_prefix("array_2d(")
                    .and_then(|s| s.strip_suffix(')'))
                {
                    is_2d = true;
                    let nums: Vec<usize> = args
                        .split(',')
                        .filter_map(|s| s.trim().parse().ok())
                        .collect();
                    if nums.len() == 2 {
                        dims = Some((nums[0], nums[1]));
                    }
                }
            } else if meta.starts_with("Errors") || meta.starts_with("Events") {
                in_data_block = false;
            }
            continue;
        }

        if is_2d {
            if in_data_block {
                grid.extend(
                    trimmed
                        .split_whitespace()
                        .filter_map(|s| s.parse::<f64>().ok()),
                );
            }
        } else {
            let values: Vec<f64> = trimmed
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            if values.len() >= 2 {
                points.push(DataPoint {
                    x: values[0],
                    intensity: values[1],
                    error: values.get(2).copied().unwrap_or(0.0),
                });
            }
        }
    }

    let data = if is_2d {
        let (cols, rows) = dims?;
        if grid.len() < rows * cols {
            return None;
        }
        grid.truncate(rows * cols);
        DatasetData::TwoDim {
            rows,
            cols,
            intensity: grid,
        }
    } else {
        if points.is_empty() {
            return None;
        }
        DatasetData::OneDim { points }
    };

    Some(Dataset {
        monitor,
        title,
        xlabel,
        ylabel,
        xlimits,
        ylimits,
        data,
    })
}

/// "0.5 4.0" -> (0.5, 4.0)
fn parse_limits(value: &str) -> Option<(f64, f64)> {
    let nums: Vec<f64> = value
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect();
    if nums.len() >= 2 {
        Some((nums[0], nums[1]))
    } else {
        None
    }
}

/// 扫描输出目录，收集所有监视器数据文件
pub fn collect_datasets(output_dir: &Path) -> Result<DatasetCollection> {
    if !output_dir.is_dir() {
        return Err(BeamflowError::DirectoryNotFound {
            path: output_dir.display().to_string(),
        });
    }

    let pattern = glob::Pattern::new("*.dat").unwrap();
    let mut collection = DatasetCollection::new();

    for entry in WalkDir::new(output_dir)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !pattern.matches(name) {
            continue;
        }

        // 数据文件里没有表头时跳过而不是中断收集
        if let Ok(dataset) = parse_dat_file(entry.path()) {
            collection.insert(dataset.monitor.clone(), dataset);
        }
    }

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_DIM_DAT: &str = r#"# Format: McCode with text headers
# type: array_1d(5)
# component: lmon
# title: Wavelength monitor
# xlabel: Wavelength [AA]
# ylabel: Intensity
# xvar: L
# xlimits: 0.5 4
# variables: L I I_err N
0.85 0.0 0.0 0
1.55 120.5 3.2 1420
2.25 340.1 5.9 4032
2.95 95.7 2.8 1187
3.65 4.2 0.6 51
"#;

    const TWO_DIM_DAT: &str = r#"# type: array_2d(3, 2)
# component: psd
# title: PSD monitor
# xlabel: X position [cm]
# ylabel: Y position [cm]
# xlimits: -5 5
# ylimits: -5 5
# Data [psd/psd.dat] I:
1.0 2.0 3.0
4.0 5.0 6.0
# Errors [psd/psd.dat] I_err:
0.1 0.1 0.1
0.2 0.2 0.2
"#;

    #[test]
    fn test_parse_one_dim_monitor() {
        let dataset = parse_dat_content(ONE_DIM_DAT, "fallback").unwrap();

        assert_eq!(dataset.monitor, "lmon");
        assert_eq!(dataset.title, "Wavelength monitor");
        assert_eq!(dataset.xlabel, "Wavelength [AA]");
        assert_eq!(dataset.xlimits, Some((0.5, 4.0)));

        let DatasetData::OneDim { points } = &dataset.data else {
            panic!("expected 1d data");
        };
        assert_eq!(points.len(), 5);
        assert!((points[2].x - 2.25).abs() < 1e-12);
        assert!((points[2].intensity - 340.1).abs() < 1e-12);
        assert!((points[2].error - 5.9).abs() < 1e-12);
    }

    #[test]
    fn test_parse_two_dim_monitor() {
        let dataset = parse_dat_content(TWO_DIM_DAT, "fallback").unwrap();

        assert_eq!(dataset.monitor, "psd");
        let DatasetData::TwoDim {
            rows,
            cols,
            intensity,
        } = &dataset.data
        else {
            panic!("expected 2d data");
        };

        // Errors 块不能混进强度矩阵
        assert_eq!(*cols, 3);
        assert_eq!(*rows, 2);
        assert_eq!(intensity.len(), 6);
        assert!((intensity[4] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_headerless_content_is_rejected() {
        assert!(parse_dat_content("no numbers here\n", "x").is_none());
    }

    #[test]
    fn test_collect_datasets_keyed_by_monitor() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lmon.dat"), ONE_DIM_DAT).unwrap();
        fs::write(dir.path().join("psd.dat"), TWO_DIM_DAT).unwrap();
        fs::write(dir.path().join("mccode.sim"), "simulation metadata").unwrap();

        let collection = collect_datasets(dir.path()).unwrap();

        assert_eq!(collection.len(), 2);
        assert!(collection.contains_key("lmon"));
        assert!(collection.contains_key("psd"));
    }
}
