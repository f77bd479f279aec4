//! Package index mirrors.

use std::fmt;
use std::str::FromStr;

/// An index to download packages from, passed to pip as `-i <url>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mirror {
    Pypi,
    Tsinghua,
    Aliyun,
    Ustc,
    Douban,
    Tencent,
    /// Caller-supplied index URL.
    Custom(String),
}

impl Mirror {
    /// Every named mirror, in the order they are offered to users.
    pub const NAMED: &'static [Mirror] = &[
        Mirror::Pypi,
        Mirror::Tsinghua,
        Mirror::Aliyun,
        Mirror::Ustc,
        Mirror::Douban,
        Mirror::Tencent,
    ];

    pub fn url(&self) -> &str {
        match self {
            Mirror::Pypi => "https://pypi.org/simple",
            Mirror::Tsinghua => "https://pypi.tuna.tsinghua.edu.cn/simple",
            Mirror::Aliyun => "https://mirrors.aliyun.com/pypi/simple",
            Mirror::Ustc => "https://pypi.mirrors.ustc.edu.cn/simple",
            Mirror::Douban => "https://pypi.douban.com/simple",
            Mirror::Tencent => "https://mirrors.cloud.tencent.com/pypi/simple",
            Mirror::Custom(url) => url,
        }
    }

    /// Short name for named mirrors, `None` for custom URLs.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Mirror::Pypi => Some("pypi"),
            Mirror::Tsinghua => Some("tsinghua"),
            Mirror::Aliyun => Some("aliyun"),
            Mirror::Ustc => Some("ustc"),
            Mirror::Douban => Some("douban"),
            Mirror::Tencent => Some("tencent"),
            Mirror::Custom(_) => None,
        }
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.url()),
        }
    }
}

impl FromStr for Mirror {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(Mirror::Custom(s.to_string()));
        }

        Mirror::NAMED
            .iter()
            .find(|m| m.name().is_some_and(|name| name.eq_ignore_ascii_case(s)))
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown mirror: {}. Expected one of pypi, tsinghua, aliyun, ustc, douban, tencent, or an http(s) URL.",
                    s
                )
            })
    }
}
