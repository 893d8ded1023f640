//! SESSION frame handler: QUIT.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    error::HandlerOutcome,
    protocol::{opcode, FrameType},
    session::Session,
};

pub async fn quit(session: &mut Session) -> HandlerOutcome {
    match session.ack(FrameType::Session, opcode::session::QUIT).await {
        Ok(()) => HandlerOutcome::ThreadShutdown,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}
