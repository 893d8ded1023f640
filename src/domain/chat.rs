//! Pure log-rotation arithmetic, factored out of [`crate::domain::room`] so
//! the size-threshold logic can be unit tested without any filesystem or
//! locking.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub const ROTATE_AT_BYTES: usize = 1024;
const ROTATE_KEEP_TAIL_FROM: usize = 512;

/// Returns the content a room log should be replaced with after an append
/// pushed it past [`ROTATE_AT_BYTES`], or `None` if no rotation is needed.
pub fn rotated_tail(contents: &[u8]) -> Option<&[u8]> {
    if contents.len() <= ROTATE_AT_BYTES {
        return None;
    }
    Some(&contents[ROTATE_KEEP_TAIL_FROM..])
}
