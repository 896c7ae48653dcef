//! Node configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Configuration for the tip page node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port the HTTP listener binds on
    pub port: u16,

    /// Directory holding one JSON file per tip page record
    pub data_dir: PathBuf,

    /// Directory with the static setup/tip pages
    pub public_dir: PathBuf,

    /// Maximum accepted request body size in bytes
    pub body_limit: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: PathBuf::from("data"),
            public_dir: PathBuf::from("public"),
            body_limit: 64 * 1024,
        }
    }
}

impl NodeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // TIPLINK_PORT
        if let Ok(val) = env::var("TIPLINK_PORT") {
            if let Ok(num) = val.trim().parse::<u16>() {
                config.port = num;
            }
        }

        // TIPLINK_DATA_DIR
        if let Ok(val) = env::var("TIPLINK_DATA_DIR") {
            if !val.trim().is_empty() {
                config.data_dir = PathBuf::from(val.trim());
            }
        }

        // TIPLINK_PUBLIC_DIR
        if let Ok(val) = env::var("TIPLINK_PUBLIC_DIR") {
            if !val.trim().is_empty() {
                config.public_dir = PathBuf::from(val.trim());
            }
        }

        // TIPLINK_BODY_LIMIT
        if let Ok(val) = env::var("TIPLINK_BODY_LIMIT") {
            if let Ok(num) = val.trim().parse::<usize>() {
                config.body_limit = num;
            }
        }

        config
    }
}
