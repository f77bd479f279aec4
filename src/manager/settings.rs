use std::path::{Path, PathBuf};

use crate::registry::Mirror;

/// Directory under the home directory holding the fallback interpreter.
const DEFAULT_PYTHON_DIR: &str = ".pipmgr";

/// Engine configuration that may change between operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Interpreter used to run `-m pip`. `None` selects the default location.
    pub python_path: Option<PathBuf>,
    /// Index passed to pip with `-i`. `None` leaves pip's own default.
    pub mirror: Option<Mirror>,
}

impl Settings {
    /// Interpreter to run, falling back to the default under `home`.
    pub fn resolve_python(&self, home: Option<&Path>) -> PathBuf {
        match &self.python_path {
            Some(path) => path.clone(),
            None => default_python_path(home),
        }
    }

    /// `-i <url>` when a mirror is configured.
    pub fn index_args(&self) -> Vec<String> {
        match &self.mirror {
            Some(mirror) => vec!["-i".to_string(), mirror.url().to_string()],
            None => Vec::new(),
        }
    }
}

/// The fallback interpreter location:
/// - Unix: `~/.pipmgr/python/bin/python3`
/// - Windows: `~\.pipmgr\python\python.exe`
pub fn default_python_path(home: Option<&Path>) -> PathBuf {
    let root = home
        .map(|h| h.join(DEFAULT_PYTHON_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON_DIR))
        .join("python");

    #[cfg(not(windows))]
    {
        root.join("bin").join("python3")
    }
    #[cfg(windows)]
    {
        root.join("python.exe")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_python_prefers_configured_path() {
        let settings = Settings {
            python_path: Some(PathBuf::from("/opt/venv/bin/python")),
            mirror: None,
        };
        assert_eq!(
            settings.resolve_python(Some(Path::new("/home/user"))),
            PathBuf::from("/opt/venv/bin/python")
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_resolve_python_default_under_home() {
        let settings = Settings::default();
        assert_eq!(
            settings.resolve_python(Some(Path::new("/home/user"))),
            PathBuf::from("/home/user/.pipmgr/python/bin/python3")
        );
    }

    #[test]
    fn test_index_args() {
        assert!(Settings::default().index_args().is_empty());

        let settings = Settings {
            python_path: None,
            mirror: Some(Mirror::Tsinghua),
        };
        assert_eq!(
            settings.index_args(),
            vec!["-i", "https://pypi.tuna.tsinghua.edu.cn/simple"]
        );
    }
}
