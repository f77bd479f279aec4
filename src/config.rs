use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::manager::Settings;
use crate::registry::Mirror;

/// Runtime configuration gathered from the command line and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub python_path: Option<PathBuf>,
    pub mirror: Option<Mirror>,
    pub search_url: Option<String>,
}

impl Config {
    /// Build a configuration, validating the mirror name.
    ///
    /// Empty values count as unset so that an exported but blank
    /// environment variable does not override the defaults.
    pub fn new(
        python_path: Option<PathBuf>,
        mirror: Option<&str>,
        search_url: Option<String>,
    ) -> Result<Self> {
        let python_path = python_path.filter(|p| !p.as_os_str().is_empty());
        let mirror = match mirror.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => Some(
                m.parse::<Mirror>()
                    .with_context(|| format!("Invalid mirror '{}'", m))?,
            ),
            None => None,
        };
        let search_url = search_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        debug!(
            "Config: python={:?}, mirror={:?}, search_url={:?}",
            python_path, mirror, search_url
        );

        Ok(Self {
            python_path,
            mirror,
            search_url,
        })
    }

    /// Engine settings derived from this configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            python_path: self.python_path.clone(),
            mirror: self.mirror.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new(None, None, None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.settings(), Settings::default());
    }

    #[test]
    fn test_config_parses_mirror() {
        let config = Config::new(
            Some(PathBuf::from("/opt/venv/bin/python")),
            Some("ustc"),
            Some("http://localhost:8080/search/".to_string()),
        )
        .unwrap();

        assert_eq!(config.mirror, Some(Mirror::Ustc));
        assert_eq!(
            config.settings().python_path,
            Some(PathBuf::from("/opt/venv/bin/python"))
        );
        assert_eq!(
            config.search_url.as_deref(),
            Some("http://localhost:8080/search/")
        );
    }

    #[test]
    fn test_config_blank_values_are_unset() {
        let config = Config::new(Some(PathBuf::new()), Some("  "), Some(String::new())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_rejects_unknown_mirror() {
        let err = Config::new(None, Some("nowhere"), None).unwrap_err();
        assert!(err.to_string().contains("Invalid mirror 'nowhere'"));
    }
}
