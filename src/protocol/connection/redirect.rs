//! Server redirection hints carried in the info string of an OK frame.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const DEFAULT_PORT: u16 = 3306;
/// How long a hint stays usable
pub const REDIRECTION_TTL: Duration = Duration::from_secs(600);

/// `Location: mysql://host[:port][/user=name]`; IPv6 hosts are bracketed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionInfo {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    expires_at: Instant,
}

impl RedirectionInfo {
    pub fn new(host: impl Into<String>, port: u16, user: Option<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user,
            expires_at: Instant::now() + REDIRECTION_TTL,
        }
    }

    /// Parse a hint; `None` when `msg` is not a redirection message
    pub fn parse(msg: &str) -> Result<Option<Self>> {
        let Some(location) = msg.strip_prefix("Location: ") else {
            return Ok(None);
        };
        if !location.starts_with("mysql://") && !location.starts_with("mariadb://") {
            return Ok(None);
        }

        let bad_host = || {
            Error::InvalidParameter(format!(
                "wrong redirection host value for redirection : {msg}"
            ))
        };
        let parsed = url::Url::parse(location).map_err(|e| match e {
            url::ParseError::InvalidPort => Error::InvalidParameter(format!(
                "wrong redirection port value for redirection : {msg}"
            )),
            _ => bad_host(),
        })?;

        let host = match parsed.host() {
            Some(url::Host::Domain(domain)) => domain.to_string(),
            Some(url::Host::Ipv4(addr)) => addr.to_string(),
            Some(url::Host::Ipv6(addr)) => addr.to_string(),
            None => String::new(),
        };
        if host.is_empty() {
            return Err(bad_host());
        }
        let port = parsed.port().unwrap_or(DEFAULT_PORT);

        let path = parsed.path().strip_prefix('/').unwrap_or_default();
        let user = path
            .contains("user=")
            .then(|| path.get(5..).unwrap_or_default().to_string())
            .filter(|user| !user.is_empty());

        Ok(Some(Self::new(host, port, user)))
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Hints keyed by (user, host, port) of the connection that received them.
///
/// `Conn` never reads or fills a cache. The caller that opens connections owns
/// one, stores the hint of [`Conn::redirection`](crate::sync::Conn::redirection)
/// after `connect`, and looks it up before opening the next transport.
#[derive(Debug, Default)]
pub struct RedirectionCache {
    max_size: Option<usize>,
    entries: HashMap<(String, String, u16), RedirectionInfo>,
}

impl RedirectionCache {
    /// `None` leaves the cache unbounded
    pub fn new(max_size: Option<usize>) -> Self {
        Self {
            max_size,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, user: &str, host: &str, port: u16) -> Option<&RedirectionInfo> {
        let key = (user.to_string(), host.to_string(), port);
        if self.entries.get(&key).is_some_and(|info| !info.is_valid()) {
            self.entries.remove(&key);
            return None;
        }
        self.entries.get(&key)
    }

    /// Store a hint; ignored once the cache is full
    pub fn put(&mut self, user: &str, host: &str, port: u16, info: RedirectionInfo) {
        if self.max_size.is_some_and(|max| self.entries.len() >= max) {
            return;
        }
        self.entries
            .insert((user.to_string(), host.to_string(), port), info);
    }

    pub fn remove(&mut self, user: &str, host: &str, port: u16) {
        self.entries
            .remove(&(user.to_string(), host.to_string(), port));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
