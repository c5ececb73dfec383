//! Mail store connection configuration

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const PROPERTY_PREFIX: &str = "MAIL_PROPERTY_";

/// Protocol used to reach the mail store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Plain IMAP upgraded with STARTTLS.
    Imap,
    /// IMAP over implicit TLS.
    Imaps,
}

impl Protocol {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Imaps => "imaps",
        }
    }

    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Imap => 143,
            Self::Imaps => 993,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("imap") {
            Ok(Self::Imap)
        } else if s.eq_ignore_ascii_case("imaps") {
            Ok(Self::Imaps)
        } else {
            Err(Error::Config(format!("Unsupported protocol: {s}")))
        }
    }
}

/// Username and password pair used for an authenticated connect.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parameters a [`FolderSession`](crate::FolderSession) is connected with.
///
/// `properties` is passed through to the store implementation without
/// being examined by the session.
#[derive(Clone)]
pub struct SessionConfig {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connection_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub properties: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Anonymous configuration on the protocol's default port, no timeouts.
    #[must_use]
    pub fn new(protocol: Protocol, host: impl Into<String>) -> Self {
        Self {
            protocol,
            host: host.into(),
            port: protocol.default_port(),
            username: None,
            password: None,
            connection_timeout: None,
            read_timeout: None,
            write_timeout: None,
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub const fn with_timeouts(
        mut self,
        connection: Option<Duration>,
        read: Option<Duration>,
        write: Option<Duration>,
    ) -> Self {
        self.connection_timeout = connection;
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Credentials for an authenticated connect.
    ///
    /// `None` unless both username and password are set; the store is
    /// then connected anonymously.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        }
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Deadline for one command round-trip: the write timeout plus the
    /// read timeout, or `None` when neither is set.
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        match (self.write_timeout, self.read_timeout) {
            (None, None) => None,
            (write, read) => Some(write.unwrap_or_default() + read.unwrap_or_default()),
        }
    }

    /// Load the configuration from environment variables
    ///
    /// Reads from `.env` file if present. All variables are optional:
    /// - `MAIL_PROTOCOL` (default: `imap`)
    /// - `MAIL_HOST` (default: `127.0.0.1`)
    /// - `MAIL_PORT` (default: 143 for `imap`, 993 for `imaps`)
    /// - `MAIL_USERNAME`, `MAIL_PASSWORD`
    /// - `MAIL_CONNECTION_TIMEOUT_MS`, `MAIL_READ_TIMEOUT_MS`,
    ///   `MAIL_WRITE_TIMEOUT_MS`
    /// - `MAIL_PROPERTY_<KEY>`, stored as property `<key>` lowercased
    ///   with `_` replaced by `.` (`MAIL_PROPERTY_TLS_VERIFY` is
    ///   `tls.verify`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a protocol, port or timeout value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Same as [`SessionConfig::from_env`] over an explicit set of
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a protocol, port or timeout value
    /// cannot be parsed.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let protocol = vars
            .get("MAIL_PROTOCOL")
            .map_or(Ok(Protocol::Imap), |p| p.parse())?;
        let port = match vars.get("MAIL_PORT") {
            Some(port) => port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid MAIL_PORT: {e}")))?,
            None => protocol.default_port(),
        };

        let properties = vars
            .iter()
            .filter_map(|(key, value)| {
                let key = key.strip_prefix(PROPERTY_PREFIX)?;
                Some((key.to_lowercase().replace('_', "."), value.clone()))
            })
            .collect();

        Ok(Self {
            protocol,
            host: vars
                .get("MAIL_HOST")
                .cloned()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            username: vars.get("MAIL_USERNAME").cloned(),
            password: vars.get("MAIL_PASSWORD").cloned(),
            connection_timeout: millis(&vars, "MAIL_CONNECTION_TIMEOUT_MS")?,
            read_timeout: millis(&vars, "MAIL_READ_TIMEOUT_MS")?,
            write_timeout: millis(&vars, "MAIL_WRITE_TIMEOUT_MS")?,
            properties,
        })
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connection_timeout", &self.connection_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("properties", &self.properties)
            .finish()
    }
}

fn millis(vars: &HashMap<String, String>, key: &str) -> Result<Option<Duration>> {
    vars.get(key)
        .map(|value| {
            value
                .parse()
                .map(Duration::from_millis)
                .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}
