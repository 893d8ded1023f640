//! TLS accept loop: races `TcpListener::accept` against a short timeout and
//! the shutdown token, handshakes each socket, and hands the resulting
//! session off to the worker pool as one unit of work.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    domain::{RoomDirectory, UserDirectory},
    session,
    worker_pool::{SubmitError, WorkerPool},
};

/// How long `accept` may block before the loop re-checks the shutdown token.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Binds `host:port` and accepts connections until `cancel` fires, submitting
/// each successfully handshaked stream to `pool` as one session task. Returns
/// once the shutdown token is observed.
#[instrument(skip(acceptor, users, rooms, pool, cancel))]
pub async fn run(
    host: &str,
    port: u16,
    acceptor: TlsAcceptor,
    users: Arc<UserDirectory>,
    rooms: Arc<RoomDirectory>,
    pool: &WorkerPool,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    info!(host, port, "listening");

    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            res = tokio::time::timeout(ACCEPT_POLL_INTERVAL, listener.accept()) => res,
        };

        let (stream, peer) = match accepted {
            Err(_) => continue, // poll timeout, recheck the shutdown token
            Ok(Err(e)) => {
                warn!("accept failed: {e}");
                continue;
            },
            Ok(Ok(pair)) => pair,
        };

        let acceptor = acceptor.clone();
        let users = Arc::clone(&users);
        let rooms = Arc::clone(&rooms);
        let session_cancel = cancel.clone();

        let task: crate::worker_pool::Task = Box::pin(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(%peer, "TLS handshake failed: {e}");
                    return;
                },
            };
            session::run_session(tls_stream, users, rooms, session_cancel).await;
        });

        match pool.submit(task).await {
            Ok(()) => {},
            Err(SubmitError::ShuttingDown | SubmitError::Closed) => break,
        }
    }

    Ok(())
}
