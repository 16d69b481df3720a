//! Client configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ch_codec::TransportTimeouts;
use native_protocol::hello::CLIENT_HELLO_NAME;
use url::form_urlencoded;

use crate::error::{Error, Result};

/// Default native protocol port.
pub const DEFAULT_PORT: u16 = 9000;

/// Default user.
pub const DEFAULT_USER: &str = "default";

/// Default database.
pub const DEFAULT_DATABASE: &str = "default";

/// Default capacity of the per-connection type descriptor cache.
pub const DEFAULT_TYPE_CACHE_CAPACITY: usize = 64;

const SCHEME: &str = "clickhouse";

/// A server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddr {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl HostAddr {
    /// Create an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
    ///
    /// A missing port defaults to [`DEFAULT_PORT`].
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| Error::Config(format!("unterminated IPv6 address: {s}")))?;
            match after {
                "" => (host, None),
                _ => match after.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(Error::Config(format!("invalid host: {s}"))),
                },
            }
        } else {
            match s.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(Error::Config(format!("empty host in {s:?}")));
        }
        let port = match port {
            Some(port) => port
                .parse()
                .map_err(|_| Error::Config(format!("invalid port: {port}")))?,
            None => DEFAULT_PORT,
        };
        Ok(Self::new(host, port))
    }
}

impl Default for HostAddr {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Timeout configuration for transport operations.
///
/// A zero duration disables the timeout for that operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Time to establish the TCP connection (default: 5s).
    pub connect: Duration,
    /// Time to write one packet (default: 5s).
    pub send: Duration,
    /// Time to wait for one read from the server (default: 5s).
    pub receive: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            send: Duration::from_secs(5),
            receive: Duration::from_secs(5),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TCP connection timeout.
    #[must_use]
    pub fn connect(mut self, timeout: Duration) -> Self {
        self.connect = timeout;
        self
    }

    /// Set the send timeout.
    #[must_use]
    pub fn send(mut self, timeout: Duration) -> Self {
        self.send = timeout;
        self
    }

    /// Set the receive timeout.
    #[must_use]
    pub fn receive(mut self, timeout: Duration) -> Self {
        self.receive = timeout;
        self
    }

    /// Set both the send and receive timeouts.
    #[must_use]
    pub fn send_receive(self, timeout: Duration) -> Self {
        self.send(timeout).receive(timeout)
    }

    /// Disable every timeout.
    #[must_use]
    pub fn none() -> Self {
        Self {
            connect: Duration::ZERO,
            send: Duration::ZERO,
            receive: Duration::ZERO,
        }
    }

    /// Convert to transport timeouts.
    #[must_use]
    pub fn to_transport(&self) -> TransportTimeouts {
        TransportTimeouts::new()
            .connect(self.connect)
            .send(self.send)
            .receive(self.receive)
    }
}

/// Retry policy for establishing a connection.
///
/// Only transient (transport) failures are retried. Queries are never
/// retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first (default: 3).
    pub max_retries: u32,
    /// Pause between attempts (default: 5s).
    pub retry_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of additional attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the pause between attempts.
    #[must_use]
    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    /// Disable retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Check if another attempt is allowed after `attempt` retries.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Configuration for connecting to ClickHouse.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future releases without breaking semver. Use [`Config::default()`]
/// or [`Config::from_connection_string()`] to construct instances.
#[derive(Clone)]
#[non_exhaustive]
pub struct Config {
    /// Server addresses. Only the first is dialed.
    pub hosts: Vec<HostAddr>,

    /// User name.
    pub user: String,

    /// Password in clear text.
    pub password: String,

    /// Default database.
    pub database: String,

    /// Whether to request compressed blocks.
    ///
    /// The flag is sent to the server, but no decompressor exists on the
    /// read path; a server that honours it will produce blocks this client
    /// cannot decode.
    pub compression: bool,

    /// Transport timeouts.
    pub timeouts: TimeoutConfig,

    /// Connect retry policy.
    pub retry: RetryPolicy,

    /// Client name sent in the hello packet.
    pub client_name: String,

    /// Settings sent with every query, before per-query settings.
    pub settings: Vec<(String, String)>,

    /// Connection string options that are not recognised, kept verbatim.
    pub options: BTreeMap<String, String>,

    /// Capacity of the per-connection type descriptor cache.
    pub type_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts: vec![HostAddr::default()],
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            compression: false,
            timeouts: TimeoutConfig::default(),
            retry: RetryPolicy::default(),
            client_name: CLIENT_HELLO_NAME.to_string(),
            settings: Vec::new(),
            options: BTreeMap::new(),
            type_cache_capacity: DEFAULT_TYPE_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// ```text
    /// clickhouse://[user[:password]@]host[:port][,host[:port]...][/database][?key=value&...]
    /// ```
    ///
    /// Recognised options are `compression`, `connect_timeout`,
    /// `send_receive_timeout`, `retry_timeout` (seconds, fractions allowed)
    /// and `retry_count`. Anything else lands in [`Config::options`].
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        let conn_str = conn_str.trim();
        let (scheme, rest) = conn_str
            .split_once("://")
            .ok_or_else(|| Error::Config(format!("missing scheme in {conn_str:?}")))?;
        if scheme != SCHEME {
            return Err(Error::Config(format!(
                "invalid scheme: {scheme}, expected: {SCHEME}"
            )));
        }

        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };
        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, path),
            None => (rest, ""),
        };

        let mut config = Self::default();

        // The last '@' separates credentials; passwords may contain '@'.
        let hosts = match authority.rsplit_once('@') {
            Some((userinfo, hosts)) => {
                match userinfo.split_once(':') {
                    Some((user, password)) => {
                        config.user = user.to_string();
                        config.password = password.to_string();
                    }
                    None => config.user = userinfo.to_string(),
                }
                if config.user.is_empty() {
                    config.user = DEFAULT_USER.to_string();
                }
                hosts
            }
            None => authority,
        };

        config.hosts = hosts
            .split(',')
            .map(HostAddr::parse)
            .collect::<Result<Vec<_>>>()?;

        if !path.is_empty() {
            config.database = path.to_string();
        }

        if let Some(query) = query {
            for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                config.apply_option(&key, &value)?;
            }
        }

        Ok(config)
    }

    fn apply_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "compression" => self.compression = value.eq_ignore_ascii_case("true"),
            "connect_timeout" => self.timeouts.connect = parse_seconds(key, value)?,
            "send_receive_timeout" => {
                let timeout = parse_seconds(key, value)?;
                self.timeouts.send = timeout;
                self.timeouts.receive = timeout;
            }
            "retry_timeout" => self.retry.retry_timeout = parse_seconds(key, value)?,
            "retry_count" => {
                self.retry.max_retries = value
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid {key}: {value}")))?;
            }
            _ => {
                tracing::debug!(option = key, "keeping unrecognised connection option");
                self.options.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Render this configuration as a connection string.
    ///
    /// Values equal to their defaults are omitted. Settings and the type
    /// cache capacity have no connection string form.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        self.render(&self.password)
    }

    fn render(&self, password: &str) -> String {
        let mut out = format!("{SCHEME}://");

        if self.user != DEFAULT_USER || !self.password.is_empty() {
            out.push_str(&self.user);
            out.push(':');
            out.push_str(password);
            out.push('@');
        }

        let hosts: Vec<String> = self.hosts.iter().map(ToString::to_string).collect();
        out.push_str(&hosts.join(","));

        if self.database != DEFAULT_DATABASE {
            out.push('/');
            out.push_str(&self.database);
        }

        let defaults = Self::default();
        let mut query = form_urlencoded::Serializer::new(String::new());
        if self.compression {
            query.append_pair("compression", "true");
        }
        if self.timeouts.connect != defaults.timeouts.connect {
            query.append_pair("connect_timeout", &format_seconds(self.timeouts.connect));
        }
        if self.timeouts.send != defaults.timeouts.send
            || self.timeouts.receive != defaults.timeouts.receive
        {
            // The string form has one knob for both directions.
            query.append_pair(
                "send_receive_timeout",
                &format_seconds(self.timeouts.receive),
            );
        }
        if self.retry.retry_timeout != defaults.retry.retry_timeout {
            query.append_pair("retry_timeout", &format_seconds(self.retry.retry_timeout));
        }
        if self.retry.max_retries != defaults.retry.max_retries {
            query.append_pair("retry_count", &self.retry.max_retries.to_string());
        }
        for (key, value) in &self.options {
            query.append_pair(key, value);
        }
        let query = query.finish();
        if !query.is_empty() {
            out.push('?');
            out.push_str(&query);
        }

        out
    }

    /// The address that will be dialed.
    #[must_use]
    pub fn primary_host(&self) -> Option<&HostAddr> {
        self.hosts.first()
    }

    /// Set a single host, keeping the current port.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let port = self.primary_host().map_or(DEFAULT_PORT, |h| h.port);
        self.hosts = vec![HostAddr::new(host, port)];
        self
    }

    /// Set the port of the first host.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        match self.hosts.first_mut() {
            Some(first) => first.port = port,
            None => self.hosts.push(HostAddr::new("localhost", port)),
        }
        self
    }

    /// Replace the host list.
    #[must_use]
    pub fn with_hosts(mut self, hosts: impl IntoIterator<Item = HostAddr>) -> Self {
        self.hosts = hosts.into_iter().collect();
        self
    }

    /// Set the user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the default database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Set the transport timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the connect retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the client name sent in the hello packet.
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Add a setting sent with every query.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.push((key.into(), value.into()));
        self
    }

    /// Set the type descriptor cache capacity.
    #[must_use]
    pub fn with_type_cache_capacity(mut self, capacity: usize) -> Self {
        self.type_cache_capacity = capacity;
        self
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_connection_string(s)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "***" };
        f.write_str(&self.render(password))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("hosts", &self.hosts)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("compression", &self.compression)
            .field("timeouts", &self.timeouts)
            .field("retry", &self.retry)
            .field("client_name", &self.client_name)
            .field("settings", &self.settings)
            .field("options", &self.options)
            .field("type_cache_capacity", &self.type_cache_capacity)
            .finish()
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration> {
    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| Error::Config(format!("invalid {key}: {value}")))
}

fn format_seconds(duration: Duration) -> String {
    duration.as_secs_f64().to_string()
}
