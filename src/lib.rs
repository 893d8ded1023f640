// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A concurrent, multi-room TLS chat server.
//!
//! [`net::listener`] accepts TLS connections and hands each one to
//! [`worker_pool`] as a unit of work; a worker runs [`session`]'s dispatch
//! loop for that connection's whole lifetime, reading frames via
//! [`protocol`] and mutating the shared [`domain`] state.

pub mod cfg;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod net;
pub mod protocol;
pub mod session;
pub mod worker_pool;
