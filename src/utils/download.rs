//! # 文件下载工具
//!
//! 用固定 URL 模板从公共数据库下载晶体结构 (CIF) 与
//! 赝势文件。阻塞式下载，无重试：网络错误直接中止工作流。
//!
//! ## 依赖关系
//! - 被 `commands/fetch.rs`, `commands/run.rs` 使用
//! - 使用 `reqwest` blocking 客户端
//! - 使用 `utils/progress.rs` 显示下载进度

use crate::error::{BeamflowError, Result};
use crate::utils::progress;

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// 晶体学开放数据库的结构下载地址
pub fn structure_url(cod_id: &str) -> String {
    format!("http://www.crystallography.net/cod/{}.cif", cod_id)
}

/// 赝势档案库的文件下载地址
pub fn pseudopotential_url(filename: &str) -> String {
    format!(
        "https://pseudopotentials.quantum-espresso.org/upf_files/{}",
        filename
    )
}

/// 下载结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// 已下载（字节数）
    Downloaded(u64),
    /// 本地已存在，跳过
    SkippedExisting,
}

/// 按数据库编号下载结构文件
pub fn fetch_structure(
    client: &reqwest::blocking::Client,
    cod_id: &str,
    dest_dir: &Path,
    force: bool,
) -> Result<(PathBuf, FetchStatus)> {
    if cod_id.is_empty() || !cod_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(BeamflowError::InvalidArgument(format!(
            "Structure identifier must be numeric, got '{}'",
            cod_id
        )));
    }

    let dest = dest_dir.join(format!("{}.cif", cod_id));
    if dest.exists() && !force {
        return Ok((dest, FetchStatus::SkippedExisting));
    }

    let bytes = download_file(client, &structure_url(cod_id), &dest)?;
    Ok((dest, FetchStatus::Downloaded(bytes)))
}

/// 按文件名下载赝势文件
pub fn fetch_pseudopotential(
    client: &reqwest::blocking::Client,
    filename: &str,
    dest_dir: &Path,
    force: bool,
) -> Result<(PathBuf, FetchStatus)> {
    let dest = dest_dir.join(filename);
    if dest.exists() && !force {
        return Ok((dest, FetchStatus::SkippedExisting));
    }

    let bytes = download_file(client, &pseudopotential_url(filename), &dest)?;
    Ok((dest, FetchStatus::Downloaded(bytes)))
}

/// 下载单个文件到目标路径，返回字节数
///
/// 空响应视为失败并删除落盘文件，避免后续阶段消费空文件。
fn download_file(client: &reqwest::blocking::Client, url: &str, dest: &Path) -> Result<u64> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| BeamflowError::DownloadFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !response.status().is_success() {
        return Err(BeamflowError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let pb = progress::create_download_bar(total, url);

    let mut file = fs::File::create(dest).map_err(|e| BeamflowError::FileWriteError {
        path: dest.display().to_string(),
        source: e,
    })?;

    let mut reader = response;
    let mut buffer = [0u8; 8192];
    let mut downloaded: u64 = 0;

    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| BeamflowError::FileReadError {
                path: url.to_string(),
                source: e,
            })?;
        if read == 0 {
            break;
        }

        file.write_all(&buffer[..read])
            .map_err(|e| BeamflowError::FileWriteError {
                path: dest.display().to_string(),
                source: e,
            })?;

        downloaded += read as u64;
        pb.set_position(downloaded);
    }

    pb.finish_and_clear();

    if downloaded == 0 {
        fs::remove_file(dest).ok();
        return Err(BeamflowError::EmptyDownload {
            url: url.to_string(),
        });
    }

    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_templates() {
        assert_eq!(
            structure_url("9000775"),
            "http://www.crystallography.net/cod/9000775.cif"
        );
        assert_eq!(
            pseudopotential_url("Si.pbe-n-rrkjus_psl.1.0.0.UPF"),
            "https://pseudopotentials.quantum-espresso.org/upf_files/Si.pbe-n-rrkjus_psl.1.0.0.UPF"
        );
    }

    #[test]
    fn test_non_numeric_identifier_rejected() {
        let client = reqwest::blocking::Client::new();
        let dir = tempfile::tempdir().unwrap();

        let result = fetch_structure(&client, "not-an-id", dir.path(), false);
        assert!(matches!(result, Err(BeamflowError::InvalidArgument(_))));
    }

    #[test]
    fn test_existing_file_is_skipped() {
        let client = reqwest::blocking::Client::new();
        let dir = tempfile::tempdir().unwrap();

        let dest = dir.path().join("9000775.cif");
        fs::write(&dest, "data_x\n").unwrap();

        let (path, status) = fetch_structure(&client, "9000775", dir.path(), false).unwrap();
        assert_eq!(path, dest);
        assert_eq!(status, FetchStatus::SkippedExisting);
    }
}
