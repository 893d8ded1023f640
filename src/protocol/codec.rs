//! Helpers for turning a fixed-layout payload type into the bytes that go
//! on the wire, and back.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::mem::size_of;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::protocol::{fields::FieldError, opcode::UnknownFrameType};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("buffer of {got} bytes does not match payload size {expected}")]
    SizeMismatch { expected: usize, got: usize },
    #[error(transparent)]
    UnknownFrameType(#[from] UnknownFrameType),
    #[error(transparent)]
    UnknownAction(#[from] crate::protocol::opcode::UnknownAction),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("connection closed or idle past the read timeout")]
    Timeout,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Decodes a payload of known fixed size out of a byte slice.
pub fn decode_payload<T>(buf: &[u8]) -> Result<T, CodecError>
where T: FromBytes + KnownLayout + Immutable {
    T::read_from_bytes(buf).map_err(|_| CodecError::SizeMismatch {
        expected: size_of::<T>(),
        got: buf.len(),
    })
}

/// Encodes a payload into its fixed-size wire representation.
pub fn encode_payload<T>(payload: &T) -> &[u8]
where T: IntoBytes + Immutable {
    payload.as_bytes()
}

pub const fn payload_len<T>() -> usize {
    size_of::<T>()
}
