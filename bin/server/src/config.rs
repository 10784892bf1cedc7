//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`LlmBackendConfig`] for model provider settings and
//! [`ConversationConfig`] for orchestrator settings.

use healthfirst_ai::LlmBackendConfig;
use healthfirst_conversation::ConversationConfig;
use serde::Deserialize;
use std::net::SocketAddr;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Model provider configuration.
    #[serde(default)]
    pub llm: LlmBackendConfig,

    /// Conversation orchestrator configuration.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// HTTP listener configuration.
    #[serde(default)]
    pub server: HttpConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Request header carrying the caller's identity.
    /// Must be set by a trusted upstream proxy, never by the client.
    #[serde(default = "default_owner_header")]
    pub owner_header: String,

    /// Maximum database connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_owner_header() -> String {
    "x-user-email".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            owner_header: default_owner_header(),
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Behind the HTTP surface every request must carry an identity.
            .set_default("conversation.allow_unscoped", false)?
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
