//! User and room domain state: the directories, their on-disk backing
//! files, and the chat broadcast/rotation path.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod chat;
pub mod persist;
pub mod room;
pub mod user;

pub use room::{Room, RoomDirectory};
pub use user::{AdminStatus, LoginStatus, UserDirectory, UserRecord};
