//! Modbridge host library
//!
//! This module exports the internal components of the host for testing purposes.

pub mod bridges;
pub mod config;
pub mod context;

use anyhow::Result;
use config::Config;
use context::HostContext;
use modbridge_api::{BridgeHost, Scanner};

/// Build a bridge host session from configuration.
pub fn build_host(config: &Config) -> Result<BridgeHost<HostContext>> {
    let scanner = Scanner::new(config.to_source_layout()?)
        .with_extension(config.scan.extension.trim())
        .with_contract(config.to_contract());

    Ok(BridgeHost::new(scanner, bridges::builtin_catalog()))
}

/// Build the activation context for a session.
pub fn host_context(config: &Config) -> Result<HostContext> {
    Ok(HostContext::new(config.host_root()?, config.host.game.clone()))
}
