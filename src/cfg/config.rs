// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};

/// 1-based line indices that carry the four configuration values. The
/// surrounding lines are free-form commentary in the on-disk template and are
/// ignored.
const LINE_HOST: usize = 2;
const LINE_PORT: usize = 5;
const LINE_MAX_ROOMS: usize = 8;
const LINE_MAX_CLIENTS: usize = 11;

const MAX_HOST_LEN: usize = 40;
const MAX_ROOMS_RANGE: std::ops::RangeInclusive<u32> = 1..=20;
const MAX_CLIENTS_RANGE: std::ops::RangeInclusive<u32> = 2..=50;

/// Runtime configuration loaded from `config.txt`.
///
/// The on-disk format is a fixed-position text file: only the lines named by
/// [`LINE_HOST`], [`LINE_PORT`], [`LINE_MAX_ROOMS`] and [`LINE_MAX_CLIENTS`]
/// are interpreted, so operators can annotate the rest of the file freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen host (IPv4/IPv6 literal or hostname).
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Maximum number of concurrently live rooms.
    pub max_rooms: u32,
    /// Maximum number of concurrently logged-in clients.
    pub max_clients: u32,
}

impl Config {
    /// Loads the configuration from the fixed-position text file, validates
    /// it, and returns the ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("failed to read config file {:?}", path.as_ref())
        })?;
        Self::parse(&raw).context("failed to parse config.txt")
    }

    fn parse(raw: &str) -> Result<Self> {
        let lines: Vec<&str> = raw.lines().collect();

        let host = line_at(&lines, LINE_HOST)?.trim().to_string();
        let port_s = line_at(&lines, LINE_PORT)?.trim();
        let max_rooms_s = line_at(&lines, LINE_MAX_ROOMS)?.trim();
        let max_clients_s = line_at(&lines, LINE_MAX_CLIENTS)?.trim();

        let port: u32 = port_s
            .parse()
            .with_context(|| format!("invalid port {port_s:?} on line {LINE_PORT}"))?;
        let max_rooms: u32 = max_rooms_s.parse().with_context(|| {
            format!("invalid max_rooms {max_rooms_s:?} on line {LINE_MAX_ROOMS}")
        })?;
        let max_clients: u32 = max_clients_s.parse().with_context(|| {
            format!("invalid max_clients {max_clients_s:?} on line {LINE_MAX_CLIENTS}")
        })?;

        let cfg = Config {
            host,
            port: port.try_into().context("port out of u16 range")?,
            max_rooms,
            max_clients,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.host.is_empty() && self.host.len() <= MAX_HOST_LEN,
            "host must be 1..={MAX_HOST_LEN} chars, got {}",
            self.host.len()
        );
        ensure!(
            (1..=65535).contains(&(self.port as u32)),
            "port {} out of range 1..=65535",
            self.port
        );
        ensure!(
            MAX_ROOMS_RANGE.contains(&self.max_rooms),
            "max_rooms {} out of range {:?}",
            self.max_rooms,
            MAX_ROOMS_RANGE
        );
        ensure!(
            MAX_CLIENTS_RANGE.contains(&self.max_clients),
            "max_clients {} out of range {:?}",
            self.max_clients,
            MAX_CLIENTS_RANGE
        );
        Ok(())
    }
}

fn line_at<'a>(lines: &[&'a str], one_based: usize) -> Result<&'a str> {
    lines
        .get(one_based - 1)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("config.txt has no line {one_based}"))
}
