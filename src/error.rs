//! # 统一错误处理模块
//!
//! 定义 Beamflow 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// Beamflow 统一错误类型
#[derive(Error, Debug)]
pub enum BeamflowError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 网络错误
    // ─────────────────────────────────────────────────────────────
    #[error("Download failed: {url}")]
    DownloadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Downloaded file is empty: {url}")]
    EmptyDownload { url: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in search path")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    // ─────────────────────────────────────────────────────────────
    // 弛豫 / 求解器错误
    // ─────────────────────────────────────────────────────────────
    #[error("SCF did not converge: {detail}")]
    SolverNonconvergence { detail: String },

    #[error("Pseudopotential file missing for {element}: {path}")]
    MissingPseudopotential { element: String, path: String },

    #[error("Required input file missing or empty: {path}\nProduced by: {producer}")]
    MissingDependencyFile { path: String, producer: String },

    #[error("Atom count mismatch: {before} before vs {after} after relaxation")]
    AtomCountMismatch { before: usize, after: usize },

    // ─────────────────────────────────────────────────────────────
    // 仪器装配错误
    // ─────────────────────────────────────────────────────────────
    #[error("Duplicate component name: {0}")]
    DuplicateComponent(String),

    #[error("Component '{component}' placed relative to undeclared component '{reference}'")]
    UnknownComponentReference { component: String, reference: String },

    #[error("Cyclic relative placement: {chain}")]
    CyclicPlacement { chain: String },

    #[error("Bragg condition unsatisfiable: Q/2k = {ratio:.4} exceeds 1")]
    BraggUnreachable { ratio: f64 },

    #[error("Reflection file has no reflections: {path}")]
    EmptyReflectionFile { path: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, BeamflowError>;
