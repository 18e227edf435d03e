//! # 工作区准备
//!
//! 创建固定布局的临时目录树，并显式构造子进程的可执行
//! 搜索路径。所有阶段都通过参数接收目录；本进程从不
//! 改变自己的工作目录。
//!
//! ## 目录布局
//! ```text
//! <root>/
//!   structures/   下载与转换后的结构文件
//!   pseudo/       赝势文件
//!   relax/        求解器作业目录
//!   sim/          仪器文件与引擎输出
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用

use crate::error::{BeamflowError, Result};

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// 工作区目录树
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// 创建（或复用）工作区目录树
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let workspace = Workspace { root };

        for dir in [
            workspace.root.clone(),
            workspace.structures_dir(),
            workspace.pseudo_dir(),
            workspace.relax_dir(),
            workspace.sim_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| BeamflowError::FileWriteError {
                path: dir.display().to_string(),
                source: e,
            })?;
        }

        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn structures_dir(&self) -> PathBuf {
        self.root.join("structures")
    }

    pub fn pseudo_dir(&self) -> PathBuf {
        self.root.join("pseudo")
    }

    pub fn relax_dir(&self) -> PathBuf {
        self.root.join("relax")
    }

    pub fn sim_dir(&self) -> PathBuf {
        self.root.join("sim")
    }
}

/// 构造子进程的 PATH 值：额外目录放在现有搜索路径前面
///
/// 不修改本进程的环境，只返回显式传给 `Command::env` 的值。
pub fn augmented_search_path(extra_dirs: &[PathBuf]) -> OsString {
    let current = env::var_os("PATH").unwrap_or_default();

    let mut paths: Vec<PathBuf> = extra_dirs.to_vec();
    paths.extend(env::split_paths(&current));

    // join_paths 只会在路径含分隔符时失败；此时退回原值
    env::join_paths(paths).unwrap_or(current)
}

/// 输出目录去重编号策略：`dir` 已存在时返回 `dir_1`, `dir_2`, ...
pub fn unique_output_dir(base: &Path) -> PathBuf {
    if !base.exists() {
        return base.to_path_buf();
    }

    let parent = base.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = base
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}", stem, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_creates_tree() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path().join("scratch")).unwrap();

        assert!(workspace.structures_dir().is_dir());
        assert!(workspace.pseudo_dir().is_dir());
        assert!(workspace.relax_dir().is_dir());
        assert!(workspace.sim_dir().is_dir());
    }

    #[test]
    fn test_workspace_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("scratch");

        Workspace::create(&root).unwrap();
        Workspace::create(&root).unwrap();
    }

    #[test]
    fn test_unique_output_dir_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("out");

        // 不存在时用原名
        assert_eq!(unique_output_dir(&base), base);

        fs::create_dir_all(&base).unwrap();
        let first = unique_output_dir(&base);
        assert_eq!(first, dir.path().join("out_1"));

        fs::create_dir_all(&first).unwrap();
        let second = unique_output_dir(&base);
        assert_eq!(second, dir.path().join("out_2"));
    }

    #[test]
    fn test_augmented_search_path_prepends() {
        let extra = PathBuf::from("/opt/beamflow/bin");
        let value = augmented_search_path(std::slice::from_ref(&extra));

        let first = env::split_paths(&value).next().unwrap();
        assert_eq!(first, extra);
    }
}
