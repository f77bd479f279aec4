//! Service factory for building the engine and its collaborators.
//!
//! Construction of the HTTP client, process runner and search client is kept
//! apart from [`Config`]; services are built from configuration values but
//! are not part of the configuration itself.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;

use crate::config::Config;
use crate::http::HttpClient;
use crate::manager::PackageManager;
use crate::output::{LogCrateSink, LogSink, Notifier};
use crate::process::ProcessRunner;
use crate::registry::RegistryClient;

const USER_AGENT: &str = "pipmgr-cli";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The engine as wired for real use.
pub type DefaultManager = PackageManager<ProcessRunner, RegistryClient>;

/// Build an HTTP client for talking to the package index.
pub fn build_http_client() -> Result<HttpClient> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    Ok(HttpClient::new(client))
}

/// Build the search client from configuration.
pub fn build_registry(config: &Config) -> Result<RegistryClient> {
    let http_client = build_http_client()?;
    Ok(RegistryClient::new(http_client, config.search_url.clone()))
}

/// Build a fully wired engine. Child process output goes to `sink`.
pub fn build_manager(
    config: &Config,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
) -> Result<DefaultManager> {
    let runner = ProcessRunner::new(sink);
    let registry = build_registry(config)?;

    Ok(PackageManager::new(runner, registry, notifier).with_settings(config.settings()))
}

/// [`build_manager`] with child output sent to the log.
pub fn build_default_manager(
    config: &Config,
    notifier: Arc<dyn Notifier>,
) -> Result<DefaultManager> {
    build_manager(config, Arc::new(LogCrateSink), notifier)
}
