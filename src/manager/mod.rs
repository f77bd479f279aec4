//! Package operations engine.
//!
//! [`PackageManager`] runs `<python> -m pip ...` through a [`CommandRunner`]
//! and turns the output into typed results. It keeps no package cache: every
//! listing is re-derived from pip. The interpreter path and mirror can be
//! changed at any time; each operation reads them once when it starts.

mod settings;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::{InvalidSpecError, ProcessError, is_cancelled};
use crate::output::Notifier;
use crate::package::{
    PackageInput, PackageRecord, PackageSpec, is_protected, merge_with_upgrades, normalize,
    parse_available_versions, parse_package_list,
};
use crate::process::CommandRunner;
use crate::registry::{Mirror, PackageSearch, SearchPage};

pub use settings::{Settings, default_python_path};

/// Result of [`PackageManager::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The package is one pip needs to run; nothing was done.
    Protected,
}

pub struct PackageManager<C: CommandRunner, S: PackageSearch> {
    runner: C,
    search: S,
    notifier: Arc<dyn Notifier>,
    home_dir: Option<PathBuf>,
    settings: Mutex<Settings>,
}

impl<C: CommandRunner, S: PackageSearch> PackageManager<C, S> {
    pub fn new(runner: C, search: S, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            runner,
            search,
            notifier,
            home_dir: dirs::home_dir(),
            settings: Mutex::new(Settings::default()),
        }
    }

    /// Replace the home directory used to locate the default interpreter.
    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    pub fn with_settings(self, settings: Settings) -> Self {
        *self.lock_settings() = settings;
        self
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.lock_settings().clone()
    }

    /// Point the engine at another interpreter. An empty path restores the
    /// default location.
    pub fn set_python_path(&self, path: Option<PathBuf>) {
        let path = path.filter(|p| !p.as_os_str().is_empty());
        debug!("Python path set to {:?}", path);
        self.lock_settings().python_path = path;
    }

    pub fn set_mirror(&self, mirror: Option<Mirror>) {
        debug!("Mirror set to {:?}", mirror);
        self.lock_settings().mirror = mirror;
    }

    /// The interpreter the next operation will run.
    pub fn python_path(&self) -> PathBuf {
        self.settings().resolve_python(self.home_dir.as_deref())
    }

    fn lock_settings(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn pip(
        &self,
        settings: &Settings,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let python = settings.resolve_python(self.home_dir.as_deref());
        let mut full_args = vec!["-m".to_string(), "pip".to_string()];
        full_args.extend(args);
        self.runner.run(&python, &full_args, cancel).await
    }

    /// Like [`Self::pip`], but reports failures to the notifier once before
    /// returning them. Cancellation is not reported.
    async fn pip_reported(
        &self,
        settings: &Settings,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let result = self.pip(settings, args, cancel).await;
        if let Err(e) = &result {
            if !is_cancelled(e) {
                self.notifier.notify_error(&e.to_string());
            }
        }
        result
    }

    /// All installed packages, without upgrade information.
    #[tracing::instrument(skip(self))]
    pub async fn list_installed(&self) -> Result<Vec<PackageRecord>> {
        let settings = self.settings();
        let args = strings(&["list", "--format", "json"]);
        let output = self.pip(&settings, args, &CancellationToken::new()).await?;
        parse_package_list(&output)
    }

    /// Installed packages that have a newer version on the configured index.
    #[tracing::instrument(skip(self))]
    pub async fn list_upgradable(&self) -> Result<Vec<PackageRecord>> {
        let settings = self.settings();
        let mut args = strings(&["list", "--outdated", "--format", "json"]);
        args.extend(settings.index_args());
        let output = self.pip(&settings, args, &CancellationToken::new()).await?;
        parse_package_list(&output)
    }

    /// Installed packages annotated with newer versions where known.
    ///
    /// The upgrade check is best-effort: if it fails, the plain listing is
    /// returned.
    #[tracing::instrument(skip(self))]
    pub async fn list_installed_with_upgrades(&self) -> Result<Vec<PackageRecord>> {
        let installed = self.list_installed().await?;

        match self.list_upgradable().await {
            Ok(upgrades) => Ok(merge_with_upgrades(installed, &upgrades)),
            Err(e) => {
                warn!("Upgrade check failed, listing without it: {:#}", e);
                Ok(installed)
            }
        }
    }

    #[tracing::instrument(skip(self, input, cancel))]
    pub async fn install(
        &self,
        input: impl Into<PackageInput>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let spec = require_spec(input)?;
        self.install_spec(&spec, false, cancel).await
    }

    #[tracing::instrument(skip(self, input, cancel))]
    pub async fn upgrade(
        &self,
        input: impl Into<PackageInput>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let spec = require_spec(input)?;
        self.install_spec(&spec, true, cancel).await
    }

    async fn install_spec(
        &self,
        spec: &PackageSpec,
        upgrade: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let settings = self.settings();
        let mut args = vec!["install".to_string()];
        if upgrade {
            args.push("--upgrade".to_string());
        }
        args.push(spec.to_string());
        args.extend(settings.index_args());

        info!("Installing {}", spec);
        self.pip_reported(&settings, args, cancel).await?;
        Ok(())
    }

    /// Install everything listed in a requirements file.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn install_from_manifest(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(InvalidSpecError("manifest path cannot be empty".to_string()).into());
        }

        let settings = self.settings();
        let mut args = vec![
            "install".to_string(),
            "-r".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        args.extend(settings.index_args());

        info!("Installing requirements from {}", path.display());
        self.pip_reported(&settings, args, cancel).await?;
        Ok(())
    }

    /// Uninstall a package. Packages pip depends on are left alone.
    #[tracing::instrument(skip(self, input, cancel))]
    pub async fn remove(
        &self,
        input: impl Into<PackageInput>,
        cancel: &CancellationToken,
    ) -> Result<RemoveOutcome> {
        let spec = require_spec(input)?;
        if is_protected(spec.name()) {
            warn!("Package {} is required by pip and cannot be removed", spec.name());
            return Ok(RemoveOutcome::Protected);
        }

        let settings = self.settings();
        let args = vec![
            "uninstall".to_string(),
            spec.name().to_string(),
            "-y".to_string(),
        ];

        info!("Removing {}", spec.name());
        self.pip_reported(&settings, args, cancel).await?;
        Ok(RemoveOutcome::Removed)
    }

    /// Versions available for a package on the configured index, newest
    /// first.
    ///
    /// pip is asked to install `name==`, which cannot succeed; its error
    /// message lists the versions it found. Any other outcome yields an empty
    /// list. Only cancellation is reported as an error.
    #[tracing::instrument(skip(self, input, cancel))]
    pub async fn list_versions(
        &self,
        input: impl Into<PackageInput>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let spec = require_spec(input)?;
        let settings = self.settings();
        let mut args = vec!["install".to_string(), format!("{}==", spec.name())];
        args.extend(settings.index_args());

        match self.pip(&settings, args, cancel).await {
            Ok(_) => {
                warn!("Version probe for {} unexpectedly succeeded", spec.name());
                Ok(Vec::new())
            }
            Err(e) if is_cancelled(&e) => Err(e),
            Err(e) => {
                let versions = e
                    .downcast_ref::<ProcessError>()
                    .map(|p| parse_available_versions(&p.stderr))
                    .unwrap_or_default();
                if versions.is_empty() {
                    debug!("No version information for {}: {:#}", spec.name(), e);
                }
                Ok(versions)
            }
        }
    }

    /// Search the package index.
    pub async fn search(
        &self,
        keyword: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchPage> {
        self.search.search(keyword, page, cancel).await
    }
}

fn require_spec(input: impl Into<PackageInput>) -> Result<PackageSpec, InvalidSpecError> {
    normalize(input).ok_or_else(|| InvalidSpecError("package name cannot be empty".to_string()))
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
