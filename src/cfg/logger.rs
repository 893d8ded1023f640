// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::{non_blocking::WorkerGuard, rolling::RollingFileAppender};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber.
///
/// Logs always go to stdout. When `log_dir` is given, a second
/// non-blocking layer mirrors every event to a daily-rotating file under
/// that directory; the returned [`WorkerGuard`] must be kept alive for the
/// life of the process or buffered lines can be lost on exit.
pub fn init_logger(level: &str, log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .context("failed to parse log level")?;

    let stdout_layer = fmt::layer().with_target(true).with_ansi(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let guard = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {dir:?}"))?;
            let appender = RollingFileAppender::new(
                tracing_appender::rolling::Rotation::DAILY,
                Path::new(dir),
                "chatroomd.log",
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
            registry.with(file_layer).try_init().context(
                "failed to install global tracing subscriber",
            )?;
            Some(guard)
        },
        None => {
            registry
                .try_init()
                .context("failed to install global tracing subscriber")?;
            None
        },
    };

    Ok(guard)
}
