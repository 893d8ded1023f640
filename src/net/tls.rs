//! Builds the server-side TLS configuration from a certificate and key on
//! disk.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use tokio_rustls::{
    TlsAcceptor,
    rustls::{
        self,
        pki_types::{CertificateDer, PrivateKeyDer},
    },
};

/// Loads `cert_path`/`key_path` (PEM) and builds a [`TlsAcceptor`] that
/// presents no client-certificate requirement, matching a self-signed
/// single-server deployment.
pub fn build_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build TLS server config")?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {path:?}"))?;
    let certs = rustls_pemfile::certs(&mut raw.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse certificates from {path:?}"))?;
    if certs.is_empty() {
        bail!("no certificates found in {path:?}");
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {path:?}"))?;
    rustls_pemfile::private_key(&mut raw.as_slice())
        .with_context(|| format!("failed to parse private key from {path:?}"))?
        .ok_or_else(|| anyhow::anyhow!("no private key found in {path:?}"))
}
