//! TLS listener and per-connection framed transport.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod listener;
pub mod tls;
pub mod transport;

pub use transport::{write_frame, write_frame_with_blob, write_header_only, FrameTransport, ReadOutcome, SharedWriter};
