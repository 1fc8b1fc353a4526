pub mod config;
pub mod hooks;

use std::{env, net::SocketAddr};

pub use config::{AppConfig, ConfigError, Environment};
pub use hooks::{
    BrokerConfig, BrokerKind, GatewayConfig, HookEntry, HookRoute, HooksConfig, ProviderKind, TravisSettings,
};

pub const DEFAULT_CONFIG_PATH: &str = "./webhookd.json";
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the bind address forced through `APP_BIND_ADDR`, if any.
///
/// When the variable is unset the address from the configuration file is used.
pub fn bind_address_override() -> Result<Option<SocketAddr>, std::net::AddrParseError> {
    match env::var("APP_BIND_ADDR") {
        Ok(value) if !value.trim().is_empty() => value.trim().parse().map(Some),
        _ => Ok(None),
    }
}
