//! In-memory user table backed by `users.txt`.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, path::PathBuf};

use anyhow::{Context, Result, bail};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::{
    domain::persist,
    net::SharedWriter,
    protocol::{fields::is_allowed_char, RejectCode},
};

pub const MIN_USERNAME_LEN: usize = 1;
pub const MAX_USERNAME_LEN: usize = 30;
pub const MIN_PASSWORD_LEN: usize = 5;
pub const MAX_PASSWORD_LEN: usize = 30;
pub const MAX_USERS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStatus {
    Out,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    User,
    Admin,
}

/// A registered account. Transient fields (`current_room`, `transport`) are
/// only meaningful while `login_status == In`.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub login_status: LoginStatus,
    pub admin_status: AdminStatus,
    pub current_room: Option<String>,
    pub transport: Option<SharedWriter>,
}

pub fn validate_username(username: &str) -> Result<(), RejectCode> {
    let len = username.len();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(RejectCode::UserNameLen);
    }
    if !username.bytes().all(is_allowed_char) {
        return Err(RejectCode::UserNameChar);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), RejectCode> {
    let len = password.len();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(RejectCode::PassLen);
    }
    if !password.bytes().all(is_allowed_char) {
        return Err(RejectCode::PassChar);
    }
    Ok(())
}

struct Inner {
    users: HashMap<String, UserRecord>,
    client_count: u32,
}

/// Shared user table. All mutation goes through the single `users_mutex`;
/// no code path holds this lock while holding a per-room lock.
pub struct UserDirectory {
    inner: Mutex<Inner>,
    users_path: PathBuf,
    max_clients: u32,
}

impl UserDirectory {
    /// Loads `users.txt` (`username:password` per line). The literal user
    /// `admin` is promoted to [`AdminStatus::Admin`]; everyone else starts
    /// as [`AdminStatus::User`]. Stops loading at [`MAX_USERS`]. A
    /// malformed line aborts startup, matching the original loader's
    /// all-or-nothing semantics.
    #[instrument(skip_all, fields(path = %users_path.display()))]
    pub async fn load_from_file(users_path: PathBuf, max_clients: u32) -> Result<Self> {
        let mut users = HashMap::new();

        if tokio::fs::try_exists(&users_path).await.unwrap_or(false) {
            let contents = tokio::fs::read_to_string(&users_path)
                .await
                .with_context(|| format!("failed to read {users_path:?}"))?;

            for (lineno, line) in contents.lines().enumerate() {
                if line.is_empty() {
                    continue;
                }
                if users.len() >= MAX_USERS {
                    break;
                }
                let (username, password) = line.split_once(':').with_context(|| {
                    format!("malformed users.txt line {}: {line:?}", lineno + 1)
                })?;
                let admin_status = if username == "admin" {
                    AdminStatus::Admin
                } else {
                    AdminStatus::User
                };
                users.insert(username.to_string(), UserRecord {
                    username: username.to_string(),
                    password: password.to_string(),
                    login_status: LoginStatus::Out,
                    admin_status,
                    current_room: None,
                    transport: None,
                });
            }
        } else {
            tokio::fs::write(&users_path, b"").await.with_context(|| {
                format!("failed to create empty {users_path:?}")
            })?;
        }

        info!(count = users.len(), "loaded user directory");

        Ok(Self {
            inner: Mutex::new(Inner {
                users,
                client_count: 0,
            }),
            users_path,
            max_clients,
        })
    }

    pub async fn client_count(&self) -> u32 {
        self.inner.lock().await.client_count
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), RejectCode> {
        let mut inner = self.inner.lock().await;
        if inner.users.contains_key(username) {
            return Err(RejectCode::UserExists);
        }
        validate_username(username)?;
        validate_password(password)?;
        if inner.users.len() >= MAX_USERS {
            return Err(RejectCode::MaxUsers);
        }

        persist::append_line(&self.users_path, &format!("{username}:{password}"))
            .await
            .map_err(|_| RejectCode::SrvErr)?;

        inner.users.insert(username.to_string(), UserRecord {
            username: username.to_string(),
            password: password.to_string(),
            login_status: LoginStatus::Out,
            admin_status: AdminStatus::User,
            current_room: None,
            transport: None,
        });
        Ok(())
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        transport: SharedWriter,
    ) -> Result<(), RejectCode> {
        let mut inner = self.inner.lock().await;
        if inner.client_count >= self.max_clients {
            return Err(RejectCode::MaxClients);
        }
        let user = inner
            .users
            .get_mut(username)
            .ok_or(RejectCode::UserDoesNotExist)?;
        if user.login_status == LoginStatus::In {
            return Err(RejectCode::UserLoggedIn);
        }
        if !constant_time_eq(user.password.as_bytes(), password.as_bytes()) {
            return Err(RejectCode::IncorrectPass);
        }

        user.login_status = LoginStatus::In;
        user.transport = Some(transport);
        inner.client_count += 1;
        Ok(())
    }

    /// Marks `username` logged out. Used both for an explicit LOGOUT request
    /// and for session-exit cleanup, where the caller suppresses the ack.
    pub async fn logout(&self, username: &str) -> Result<(), RejectCode> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(username)
            .ok_or(RejectCode::UserDoesNotExist)?;
        if user.login_status == LoginStatus::Out {
            return Err(RejectCode::UserDoesNotExist);
        }
        user.login_status = LoginStatus::Out;
        user.transport = None;
        user.current_room = None;
        inner.client_count = inner.client_count.saturating_sub(1);
        Ok(())
    }

    pub async fn set_admin(
        &self,
        requester: &str,
        target: &str,
        make_admin: bool,
    ) -> Result<(), RejectCode> {
        if requester == target {
            return Err(RejectCode::AdminSelf);
        }

        let mut inner = self.inner.lock().await;
        if !inner
            .users
            .get(requester)
            .is_some_and(|u| u.admin_status == AdminStatus::Admin)
        {
            return Err(RejectCode::AdminPriv);
        }

        let target_user = inner
            .users
            .get_mut(target)
            .ok_or(RejectCode::UserDoesNotExist)?;
        if target_user.login_status == LoginStatus::In {
            return Err(RejectCode::UserLoggedIn);
        }
        target_user.admin_status = if make_admin {
            AdminStatus::Admin
        } else {
            AdminStatus::User
        };
        Ok(())
    }

    pub async fn delete(&self, requester: &str, target: &str) -> Result<(), RejectCode> {
        let mut inner = self.inner.lock().await;
        if !inner
            .users
            .get(requester)
            .is_some_and(|u| u.admin_status == AdminStatus::Admin)
        {
            return Err(RejectCode::AdminPriv);
        }
        if requester == target {
            return Err(RejectCode::AdminSelf);
        }

        let target_user = inner.users.get(target).ok_or(RejectCode::UserDoesNotExist)?;
        if target_user.login_status == LoginStatus::In {
            return Err(RejectCode::UserLoggedIn);
        }

        persist::rewrite_filtered(&self.users_path, |line| {
            line.split_once(':').map(|(u, _)| u) != Some(target)
        })
        .await
        .map_err(|_| RejectCode::SrvErr)?;

        inner.users.remove(target);
        Ok(())
    }

    pub async fn is_admin(&self, username: &str) -> bool {
        self.inner
            .lock()
            .await
            .users
            .get(username)
            .is_some_and(|u| u.admin_status == AdminStatus::Admin)
    }

    pub async fn set_current_room(&self, username: &str, room: Option<String>) {
        if let Some(user) = self.inner.lock().await.users.get_mut(username) {
            user.current_room = room;
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
