use serde::Deserialize;

use crate::broker::Broker;

/// Top-level configuration settings for the application.
///
/// Includes settings for both the server and the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
}

/// Configuration settings for the server.
///
/// Defines the address the server binds to and the default log filter.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Admission and subscription limits of the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub max_sessions: usize,
    pub max_subscriptions: usize,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from [`Settings::default`].
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_sessions: Option<usize>,
    pub max_subscriptions: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                log_level: "info".to_string(),
            },
            broker: BrokerSettings {
                max_sessions: Broker::DEFAULT_CAPACITY,
                max_subscriptions: Broker::DEFAULT_MAX_SUBSCRIPTIONS,
            },
        }
    }
}

impl Settings {
    /// Overlays whatever `partial` specifies on top of the defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Self::default();
        let server = partial.server.unwrap_or_default();
        let broker = partial.broker.unwrap_or_default();

        Self {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
                log_level: server.log_level.unwrap_or(default.server.log_level),
            },
            broker: BrokerSettings {
                max_sessions: broker.max_sessions.unwrap_or(default.broker.max_sessions),
                max_subscriptions: broker
                    .max_subscriptions
                    .unwrap_or(default.broker.max_subscriptions),
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
