//! # fetch 命令实现
//!
//! 准备工作区并下载晶体结构与赝势文件。
//!
//! ## 依赖关系
//! - 使用 `cli/fetch.rs` 定义的参数
//! - 使用 `utils/workspace.rs`, `utils/download.rs`, `utils/output.rs`

use crate::cli::fetch::FetchArgs;
use crate::error::Result;
use crate::utils::download::{self, FetchStatus};
use crate::utils::output;
use crate::utils::workspace::Workspace;

/// 执行 fetch 命令
pub fn execute(args: FetchArgs) -> Result<()> {
    output::print_header("Fetching Input Data");

    let workspace = Workspace::create(&args.workdir)?;
    output::print_info(&format!("Workspace: {}", workspace.root().display()));

    let client = reqwest::blocking::Client::new();

    let (cif_path, status) = download::fetch_structure(
        &client,
        &args.cod_id,
        &workspace.structures_dir(),
        args.force,
    )?;
    report(&cif_path.display().to_string(), status);

    for filename in &args.pseudo_files {
        let (path, status) =
            download::fetch_pseudopotential(&client, filename, &workspace.pseudo_dir(), args.force)?;
        report(&path.display().to_string(), status);
    }

    output::print_done(&format!(
        "Fetched structure {} and {} pseudopotential file(s)",
        args.cod_id,
        args.pseudo_files.len()
    ));

    Ok(())
}

fn report(path: &str, status: FetchStatus) {
    match status {
        FetchStatus::Downloaded(bytes) => {
            output::print_success(&format!("{} ({} bytes)", path, bytes));
        }
        FetchStatus::SkippedExisting => {
            output::print_skip(&format!("{} (already present)", path));
        }
    }
}
