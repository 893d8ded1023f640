// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chatroom_server::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    domain::{RoomDirectory, UserDirectory},
    net::{listener, tls::build_acceptor},
    worker_pool::{ShutdownMode, WorkerPool},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("fatal: {e:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let _logger_guard = init_logger("info", None).context("failed to init logging")?;

    let config_path = resolve_config_path("config.txt").context("failed to resolve config.txt")?;
    let cfg = Config::load_from_file(&config_path).context("failed to load config.txt")?;
    info!(?cfg, "loaded configuration");

    let cancel = CancellationToken::new();

    let worker_count = (cfg.max_clients + 1) as usize;
    let pool = WorkerPool::new(worker_count, worker_count, cancel.clone());

    let rooms = Arc::new(
        RoomDirectory::init(PathBuf::from("rooms"), cfg.max_rooms)
            .await
            .context("failed to initialize room directory")?,
    );
    let users = Arc::new(
        UserDirectory::load_from_file(PathBuf::from("users.txt"), cfg.max_clients)
            .await
            .context("failed to load user directory")?,
    );

    let acceptor = build_acceptor(Path::new("server.crt"), Path::new("server.key"))
        .context("failed to build TLS acceptor")?;

    let sigint_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, shutting down");
            sigint_cancel.cancel();
        }
    });

    listener::run(&cfg.host, cfg.port, acceptor, users, Arc::clone(&rooms), &pool, cancel)
        .await
        .context("accept loop failed")?;

    pool.shutdown(ShutdownMode::Wait).await;
    rooms.teardown().await;

    info!("shutdown complete");
    Ok(())
}
