//! Outward-facing outcome of a single handler invocation.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// What a handler reports back to the session dispatch loop.
///
/// Protocol-level rejections are never `Failure`: they are `Ok` with a
/// REJECT frame already written to the wire. `Ok` here means "the round
/// trip completed", not "the request was accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The round trip completed (accepted or rejected); keep reading.
    Ok,
    /// The transport is broken; terminate this session, no server impact.
    ConnectionFailure,
    /// A programmer fault or unrecoverable I/O; terminate this session and
    /// cancel the process-wide shutdown token.
    Failure,
    /// The session is ending (QUIT, or the dispatch loop decided to stop).
    ThreadShutdown,
}

impl HandlerOutcome {
    fn severity(self) -> u8 {
        match self {
            HandlerOutcome::Ok => 0,
            HandlerOutcome::ThreadShutdown => 1,
            HandlerOutcome::Failure => 2,
            HandlerOutcome::ConnectionFailure => 3,
        }
    }

    /// Folds two outcomes into the worse of the two, by `ConnectionFailure >
    /// Failure > Ok` severity. Used to summarize a fan-out across several
    /// peers, or a multi-step cleanup, into one outcome without losing the
    /// worst thing that happened.
    pub fn worse_of(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}
