//! Server configuration loaded from the environment.

use trident_protocol::WireFormat;

use crate::utils::{EnvError, env_bool, env_parse, env_string};

/// Default listen address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:25565";

/// Runtime settings for the server core.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
    /// Maximum players reported in status responses.
    pub max_players: u32,
    /// Message of the day reported in status responses.
    pub motd: String,
    /// Layout of outbound packets.
    pub wire_format: WireFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            max_players: 20,
            motd: "A Trident Server".to_string(),
            wire_format: WireFormat::Framed,
        }
    }
}

impl ServerConfig {
    /// Load the configuration from `TRIDENT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set to an invalid value.
    pub fn from_env() -> Result<Self, EnvError> {
        let defaults = Self::default();

        let wire_format = if env_bool("TRIDENT_UNFRAMED_IDS", false)? {
            WireFormat::Unframed
        } else {
            WireFormat::Framed
        };

        Ok(Self {
            bind_addr: env_string("TRIDENT_ADDR", &defaults.bind_addr)?,
            max_players: env_parse("TRIDENT_MAX_PLAYERS", defaults.max_players)?,
            motd: env_string("TRIDENT_MOTD", &defaults.motd)?,
            wire_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::with_env_vars;

    const ALL_VARS: [&str; 4] = [
        "TRIDENT_ADDR",
        "TRIDENT_MAX_PLAYERS",
        "TRIDENT_MOTD",
        "TRIDENT_UNFRAMED_IDS",
    ];

    #[test]
    fn test_defaults_when_unset() {
        let unset: Vec<_> = ALL_VARS.iter().map(|name| (*name, None)).collect();
        with_env_vars(&unset, || {
            let config = ServerConfig::from_env().unwrap();
            assert_eq!(config.bind_addr, DEFAULT_ADDR);
            assert_eq!(config.max_players, 20);
            assert_eq!(config.wire_format, WireFormat::Framed);
            assert_eq!(config.motd, "A Trident Server");
        });
    }

    #[test]
    fn test_overrides() {
        with_env_vars(
            &[
                ("TRIDENT_ADDR", Some("127.0.0.1:30000")),
                ("TRIDENT_MAX_PLAYERS", Some("100")),
                ("TRIDENT_MOTD", Some("Hello")),
                ("TRIDENT_UNFRAMED_IDS", Some("true")),
            ],
            || {
                let config = ServerConfig::from_env().unwrap();
                assert_eq!(config.bind_addr, "127.0.0.1:30000");
                assert_eq!(config.max_players, 100);
                assert_eq!(config.motd, "Hello");
                assert_eq!(config.wire_format, WireFormat::Unframed);
            },
        );
    }

    #[test]
    fn test_invalid_value_is_error() {
        with_env_vars(&[("TRIDENT_MAX_PLAYERS", Some("lots"))], || {
            let err = ServerConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("TRIDENT_MAX_PLAYERS"));
        });
    }
}
