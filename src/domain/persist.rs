//! Shared file-backed persistence helpers for the user and room directories.
//!
//! Both directories mutate a flat text file (`users.txt`, `room_names.log`)
//! under their own mutex; this module only supplies the mechanics of doing
//! so without ever leaving a half-written file behind.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

fn sibling_backup(path: &Path) -> PathBuf {
    let mut name = path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push("_b");
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Rewrites `path` keeping only the lines for which `keep` returns `true`,
/// via write-to-sibling-then-rename so a crash mid-write never corrupts the
/// live file.
pub async fn rewrite_filtered<P: AsRef<Path>>(
    path: P,
    keep: impl Fn(&str) -> bool,
) -> Result<()> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {path:?} for rewrite"))?;

    let mut filtered = String::with_capacity(contents.len());
    for line in contents.lines() {
        if keep(line) {
            filtered.push_str(line);
            filtered.push('\n');
        }
    }

    let backup = sibling_backup(path);
    tokio::fs::write(&backup, filtered.as_bytes())
        .await
        .with_context(|| format!("failed to write backup {backup:?}"))?;
    tokio::fs::rename(&backup, path)
        .await
        .with_context(|| format!("failed to rename {backup:?} over {path:?}"))?;
    Ok(())
}

/// Appends a single line (with trailing `\n`) to `path`, creating it if
/// absent.
pub async fn append_line<P: AsRef<Path>>(path: P, line: &str) -> Result<()> {
    let path = path.as_ref();
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {path:?} for append"))?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}
