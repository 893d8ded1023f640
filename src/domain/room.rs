//! Room registry and chat broadcast.
//!
//! Lock order is `rooms_mutex` (held by [`RoomDirectory`]) before any
//! per-room mutex (held by [`Room`]); nothing ever acquires the reverse.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use tokio::sync::Mutex;
use tracing::{instrument, warn};

use crate::{
    domain::{chat::rotated_tail, persist},
    error::HandlerOutcome,
    net::{transport::write_frame, SharedWriter},
    protocol::{
        frames::ChatPayload, opcode, Action, FrameHeader, FrameType, RejectCode,
    },
};

pub const MIN_ROOM_NAME_LEN: usize = 5;
pub const MAX_ROOM_NAME_LEN: usize = 30;

pub fn validate_room_name(name: &str) -> Result<(), RejectCode> {
    if !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(RejectCode::RoomChars);
    }
    if !(MIN_ROOM_NAME_LEN..=MAX_ROOM_NAME_LEN).contains(&name.len()) {
        return Err(RejectCode::RoomLen);
    }
    Ok(())
}

/// A room's view of one of its members: enough to address them for
/// broadcast, nothing more.
pub struct RoomMember {
    pub username: String,
    pub writer: SharedWriter,
}

struct RoomInner {
    membership: Vec<RoomMember>,
}

pub struct Room {
    name: String,
    log_path: PathBuf,
    inner: Mutex<RoomInner>,
}

impl Room {
    fn new(name: String, log_path: PathBuf) -> Self {
        Self {
            name,
            log_path,
            inner: Mutex::new(RoomInner {
                membership: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.membership.is_empty()
    }

    /// Adds `username` to membership and returns the log's current contents
    /// for the ACK+blob reply.
    pub async fn join(
        &self,
        username: &str,
        writer: SharedWriter,
    ) -> std::io::Result<Vec<u8>> {
        let mut inner = self.inner.lock().await;
        inner.membership.push(RoomMember {
            username: username.to_string(),
            writer,
        });
        tokio::fs::read(&self.log_path).await
    }

    /// Removes the first membership entry matching `username`. Returns
    /// `true` if a matching member was found and removed.
    pub async fn leave(&self, username: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if let Some(pos) = inner.membership.iter().position(|m| m.username == username) {
            inner.membership.remove(pos);
            true
        } else {
            false
        }
    }

    /// Appends a chat line to the room log, rotating it if it grew past the
    /// size cap, then fans the message out to every member except `sender`.
    /// Delivery failures to individual peers are logged and do not abort the
    /// loop; the worst outcome seen across the fan-out is returned so the
    /// caller can decide whether to log further, without affecting the
    /// sender's own ack.
    ///
    /// Holds the room's mutex across the log append/rotate *and* the
    /// fan-out: two chatters in the same room run on separate worker tasks,
    /// so without a lock spanning both steps their read-modify-write cycles
    /// on the log file can interleave and silently drop a message.
    #[instrument(skip(self), fields(room = %self.name))]
    pub async fn broadcast_chat(
        &self,
        sender: &str,
        message: &str,
    ) -> Result<HandlerOutcome, RejectCode> {
        let payload = ChatPayload::new(sender, message).map_err(|e| {
            warn!("dropping malformed broadcast payload: {e}");
            RejectCode::SrvErr
        })?;
        let header = FrameHeader::new(FrameType::Chat, opcode::chat::CHAT, Action::Update);

        let inner = self.inner.lock().await;
        self.append_and_rotate(sender, message)
            .await
            .map_err(|_| RejectCode::SrvErr)?;

        let mut outcome = HandlerOutcome::Ok;
        for member in inner.membership.iter().filter(|m| m.username != sender) {
            if let Err(e) = write_frame(&member.writer, header, Some(&payload)).await {
                warn!("chat fan-out to a peer failed: {e}");
                outcome = outcome.worse_of(HandlerOutcome::Failure);
            }
        }
        Ok(outcome)
    }

    /// Announces that `username` joined or left, to every member other than
    /// `exclude`.
    pub async fn broadcast_system(
        &self,
        username: &str,
        message: &str,
        exclude: &str,
    ) -> HandlerOutcome {
        self.fan_out(username, message, Some(exclude)).await
    }

    /// Appends one line and rotates the log if it grew past the size cap.
    /// Callers must already hold `self.inner`'s lock: this performs a
    /// read-modify-write of the log file that is only safe serialized
    /// against every other room operation.
    async fn append_and_rotate(&self, sender: &str, message: &str) -> std::io::Result<()> {
        let line = format!("{sender}>{message}\n");
        let mut contents = tokio::fs::read(&self.log_path).await.unwrap_or_default();
        contents.extend_from_slice(line.as_bytes());

        if let Some(tail) = rotated_tail(&contents) {
            tokio::fs::write(&self.log_path, tail).await
        } else {
            tokio::fs::write(&self.log_path, &contents).await
        }
    }

    async fn fan_out(&self, sender: &str, message: &str, exclude: Option<&str>) -> HandlerOutcome {
        let payload = match ChatPayload::new(sender, message) {
            Ok(p) => p,
            Err(e) => {
                warn!("dropping malformed broadcast payload: {e}");
                return HandlerOutcome::Failure;
            },
        };
        let header = FrameHeader::new(FrameType::Chat, opcode::chat::CHAT, Action::Update);

        let members: Vec<SharedWriter> = {
            let inner = self.inner.lock().await;
            inner
                .membership
                .iter()
                .filter(|m| Some(m.username.as_str()) != exclude)
                .map(|m| m.writer.clone())
                .collect()
        };

        let mut outcome = HandlerOutcome::Ok;
        for writer in members {
            if let Err(e) = write_frame(&writer, header, Some(&payload)).await {
                warn!("chat fan-out to a peer failed: {e}");
                outcome = outcome.worse_of(HandlerOutcome::Failure);
            }
        }
        outcome
    }
}

struct DirInner {
    rooms: HashMap<String, Arc<Room>>,
}

/// Shared room registry. Mutation goes through the single `rooms_mutex`;
/// per-room state is only ever touched after acquiring it first.
pub struct RoomDirectory {
    inner: Mutex<DirInner>,
    rooms_dir: PathBuf,
    room_names_path: PathBuf,
    max_rooms: u32,
}

impl RoomDirectory {
    /// Creates (or empties) the `rooms/` directory and its `room_names.log`
    /// sidecar.
    pub async fn init(rooms_dir: PathBuf, max_rooms: u32) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&rooms_dir).await?;
        let room_names_path = rooms_dir.join("room_names.log");
        tokio::fs::write(&room_names_path, b"").await?;

        Ok(Self {
            inner: Mutex::new(DirInner {
                rooms: HashMap::new(),
            }),
            rooms_dir,
            room_names_path,
            max_rooms,
        })
    }

    pub async fn room_count(&self) -> u32 {
        self.inner.lock().await.rooms.len() as u32
    }

    pub async fn create(&self, name: &str) -> Result<(), RejectCode> {
        validate_room_name(name)?;

        let mut inner = self.inner.lock().await;
        if inner.rooms.len() as u32 >= self.max_rooms {
            return Err(RejectCode::MaxRooms);
        }
        if inner.rooms.contains_key(name) {
            return Err(RejectCode::RoomExists);
        }

        let log_path = self.rooms_dir.join(format!("{name}.log"));
        tokio::fs::write(&log_path, b"")
            .await
            .map_err(|_| RejectCode::SrvErr)?;
        persist::append_line(&self.room_names_path, name)
            .await
            .map_err(|_| RejectCode::SrvErr)?;

        inner
            .rooms
            .insert(name.to_string(), Arc::new(Room::new(name.to_string(), log_path)));
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), RejectCode> {
        let mut inner = self.inner.lock().await;
        let room = inner
            .rooms
            .get(name)
            .cloned()
            .ok_or(RejectCode::RoomDoesNotExist)?;
        if !room.is_empty().await {
            return Err(RejectCode::RoomInUse);
        }

        persist::rewrite_filtered(&self.room_names_path, |line| line != name)
            .await
            .map_err(|_| RejectCode::SrvErr)?;
        let _ = tokio::fs::remove_file(&room.log_path).await;
        inner.rooms.remove(name);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<u8>, RejectCode> {
        let inner = self.inner.lock().await;
        if inner.rooms.is_empty() {
            return Err(RejectCode::NoRooms);
        }
        tokio::fs::read(&self.room_names_path)
            .await
            .map_err(|_| RejectCode::SrvErr)
    }

    /// Looks up `name` under `rooms_mutex`, then hands off to the room's own
    /// mutex for membership + log I/O.
    pub async fn join(
        &self,
        username: &str,
        writer: SharedWriter,
        name: &str,
    ) -> Result<(Arc<Room>, Vec<u8>), RejectCode> {
        let room = {
            let inner = self.inner.lock().await;
            inner
                .rooms
                .get(name)
                .cloned()
                .ok_or(RejectCode::RoomDoesNotExist)?
        };
        let log_contents = room
            .join(username, writer)
            .await
            .map_err(|_| RejectCode::SrvErr)?;
        Ok((room, log_contents))
    }

    /// Removes every room's log file and the `rooms/` directory itself.
    pub async fn teardown(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.rooms_dir).await {
            warn!("failed to remove rooms directory during teardown: {e}");
        }
    }
}
