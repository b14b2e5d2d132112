use serde::Deserialize;

/// Default cap on one request line: 1 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Top-level configuration settings for the application.
///
/// Includes settings for the listener, the broker and the snapshot store.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub persistence: PersistenceSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to, and the longest
/// request line a connection may send before it is closed.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_frame_bytes: usize,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for the broker.
///
/// `max_backlog` bounds each pub/sub topic's backlog (oldest evicted first);
/// `0` leaves it unbounded. `status_interval_secs` enables a periodic status
/// log; `0` disables it.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BrokerSettings {
    pub max_backlog: usize,
    pub status_interval_secs: u64,
}

impl BrokerSettings {
    pub fn backlog_limit(&self) -> Option<usize> {
        (self.max_backlog > 0).then_some(self.max_backlog)
    }
}

/// Where topic and queue snapshots are kept.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PersistenceSettings {
    pub data_dir: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub persistence: Option<PartialPersistenceSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_frame_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_backlog: Option<usize>,
    pub status_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPersistenceSettings {
    pub data_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "localhost".to_string(),
                port: 8888,
                max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            },
            broker: BrokerSettings {
                max_backlog: 0,
                status_interval_secs: 0,
            },
            persistence: PersistenceSettings {
                data_dir: ".msg_data".to_string(),
            },
        }
    }
}
