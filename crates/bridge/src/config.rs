//! Bridge configuration.
//!
//! Loaded from environment variables (optionally via a `.env` file):
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `FRAMEBRIDGE_ENVIRONMENT` | `web`, `mobile` | `web` |
//! | `FRAMEBRIDGE_INSTANCE` | channel-key suffix | random UUID |
//! | `FRAMEBRIDGE_READINESS` | `suspend`, `fail_fast` | per environment |
//! | `FRAMEBRIDGE_STORAGE_PATH` | file path | platform config dir |
//!
//! Unparseable values fall back to the default with a warning.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messaging::ReadinessPolicy;

pub const ENV_ENVIRONMENT: &str = "FRAMEBRIDGE_ENVIRONMENT";
pub const ENV_INSTANCE: &str = "FRAMEBRIDGE_INSTANCE";
pub const ENV_READINESS: &str = "FRAMEBRIDGE_READINESS";
pub const ENV_STORAGE_PATH: &str = "FRAMEBRIDGE_STORAGE_PATH";

/// Host environment the bridge runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEnvironment {
    /// Browser host embedding the surface in an iframe
    #[default]
    Web,
    /// Mobile host embedding the surface in a webview
    Mobile,
}

impl HostEnvironment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "web" => Some(HostEnvironment::Web),
            "mobile" | "react-native" | "react_native" => Some(HostEnvironment::Mobile),
            _ => None,
        }
    }

    /// Web suspends until ready; mobile fails fast.
    pub fn default_readiness(&self) -> ReadinessPolicy {
        match self {
            HostEnvironment::Web => ReadinessPolicy::Suspend,
            HostEnvironment::Mobile => ReadinessPolicy::FailFast,
        }
    }

    /// Only web hosts have a signing capability for auth tokens.
    pub fn signs_requests(&self) -> bool {
        matches!(self, HostEnvironment::Web)
    }
}

fn parse_readiness(value: &str) -> Option<ReadinessPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "suspend" => Some(ReadinessPolicy::Suspend),
        "fail_fast" | "fail-fast" | "failfast" => Some(ReadinessPolicy::FailFast),
        _ => None,
    }
}

fn random_instance() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Configuration for one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    environment: HostEnvironment,
    instance: String,
    readiness: ReadinessPolicy,
    storage_path: Option<PathBuf>,
}

impl BridgeConfig {
    /// Defaults for `environment` with a fresh random instance suffix.
    pub fn new(environment: HostEnvironment) -> Self {
        Self {
            environment,
            instance: random_instance(),
            readiness: environment.default_readiness(),
            storage_path: None,
        }
    }

    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = match lookup(ENV_ENVIRONMENT) {
            Some(raw) => HostEnvironment::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown {}, using web", ENV_ENVIRONMENT);
                HostEnvironment::Web
            }),
            None => HostEnvironment::default(),
        };

        let mut config = Self::new(environment);

        if let Some(instance) = lookup(ENV_INSTANCE).filter(|s| !s.trim().is_empty()) {
            config.instance = instance.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_READINESS) {
            match parse_readiness(&raw) {
                Some(policy) => config.readiness = policy,
                None => tracing::warn!(
                    value = %raw,
                    "Unknown {}, using environment default",
                    ENV_READINESS
                ),
            }
        }

        config.storage_path = lookup(ENV_STORAGE_PATH)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        config
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn environment(&self) -> HostEnvironment {
        self.environment
    }

    /// Channel-key suffix scoping this bridge's messages.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn readiness(&self) -> ReadinessPolicy {
        self.readiness
    }

    /// Storage file path: explicit setting, else the platform config directory.
    ///
    /// - Linux: ~/.config/framebridge/storage.json
    /// - macOS: ~/Library/Application Support/io.framebridge.framebridge/storage.json
    /// - Windows: C:\Users\<User>\AppData\Roaming\framebridge\framebridge\config\storage.json
    pub fn storage_path(&self) -> PathBuf {
        if let Some(path) = &self.storage_path {
            return path.clone();
        }

        match ProjectDirs::from("io", "framebridge", "framebridge") {
            Some(dirs) => dirs.config_dir().join("storage.json"),
            None => PathBuf::from("framebridge_storage.json"),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(HostEnvironment::default())
    }
}
