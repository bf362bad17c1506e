use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Namespace to watch; all namespaces when unset.
    pub namespace: Option<String>,
    /// Scheduler the watched jobs are submitted to, attached to logs.
    pub scheduler_name: String,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Config {
            server: ServerConfig {
                addr: std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            },
            watch: WatchConfig {
                namespace: std::env::var("WATCH_NAMESPACE")
                    .ok()
                    .filter(|ns| !ns.trim().is_empty()),
                scheduler_name: std::env::var("SCHEDULER_NAME")
                    .unwrap_or_else(|_| "volcano".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::Error::Config(format!(
                "SERVER_ADDR must be a socket address, got {:?}",
                self.server.addr
            )));
        }

        if self.watch.scheduler_name.trim().is_empty() {
            return Err(crate::Error::Config(
                "SCHEDULER_NAME must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8080".to_string(),
            },
            watch: WatchConfig {
                namespace: None,
                scheduler_name: "volcano".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_server_addr() {
        let mut config = Config::default();
        config.server.addr = "localhost".to_string();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn rejects_empty_scheduler_name() {
        let mut config = Config::default();
        config.watch.scheduler_name = " ".to_string();
        assert!(config.validate().is_err());
    }
}
