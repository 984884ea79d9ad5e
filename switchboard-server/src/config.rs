//! Server configuration: a JSON provider file plus environment overrides.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use switchboard_pool::{PoolError, ProviderConfig, ProviderKind};

/// Environment variable naming the provider file.
pub const CONFIG_PATH_VAR: &str = "SWITCHBOARD_CONFIG";
/// Environment variable overriding the listen address.
pub const LISTEN_ADDR_VAR: &str = "SWITCHBOARD_ADDR";

const DEFAULT_CONFIG_PATH: &str = "switchboard.json";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// One provider as written in the JSON file.
///
/// The credential is indirected through `api_key_env` so the file itself
/// never holds a secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    pub kind: String,
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub priority: u32,
    pub requests_per_minute: u32,
}

impl ProviderEntry {
    /// Turns a file entry into a pool config, resolving the credential
    /// through `lookup` (the process environment in production).
    pub fn resolve(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ProviderConfig, PoolError> {
        let kind: ProviderKind = self.kind.parse()?;
        let api_key = lookup(&self.api_key_env).ok_or_else(|| {
            PoolError::Configuration(format!(
                "provider {} needs the {} environment variable",
                self.name, self.api_key_env
            ))
        })?;
        Ok(ProviderConfig {
            name: self.name,
            kind,
            api_key: SecretString::from(api_key),
            base_url: self.base_url,
            model: self.model,
            priority: self.priority,
            requests_per_minute: self.requests_per_minute,
        })
    }
}

/// The provider file as parsed, credentials still unresolved.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub providers: Vec<ProviderEntry>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, PoolError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PoolError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            PoolError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })
    }

    pub fn resolve(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<ProviderConfig>, PoolError> {
        self.providers
            .into_iter()
            .map(|entry| entry.resolve(&lookup))
            .collect()
    }
}

/// Fully resolved configuration for one server process.
#[derive(Debug)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub providers: Vec<ProviderConfig>,
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, PoolError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let addr = std::env::var(LISTEN_ADDR_VAR).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.into());
        Self::load_from(Path::new(&path), &addr, |var| std::env::var(var).ok())
    }

    pub fn load_from(
        path: &Path,
        listen_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PoolError> {
        let listen_addr = parse_listen_addr(listen_addr)?;
        let providers = FileConfig::read(path)?.resolve(lookup)?;
        Ok(Self {
            listen_addr,
            providers,
        })
    }
}

fn parse_listen_addr(raw: &str) -> Result<SocketAddr, PoolError> {
    raw.parse()
        .map_err(|_| PoolError::Configuration(format!("invalid listen address: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "providers": [
            {
                "name": "groq-fast",
                "kind": "groq",
                "api_key_env": "GROQ_API_KEY",
                "base_url": "https://api.groq.com/openai/v1",
                "model": "llama-3.3-70b-versatile",
                "priority": 1,
                "requests_per_minute": 30
            }
        ]
    }"#;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn resolves_credentials_through_the_lookup() {
        let file = write_config(SAMPLE);
        let config = ServerConfig::load_from(file.path(), "127.0.0.1:0", |var| {
            (var == "GROQ_API_KEY").then(|| "sk-123".to_string())
        })
        .unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].name, "groq-fast");
        assert_eq!(config.providers[0].kind, ProviderKind::Groq);
        assert_eq!(config.providers[0].requests_per_minute, 30);
    }

    #[test]
    fn a_missing_credential_names_the_variable() {
        let file = write_config(SAMPLE);
        let err = ServerConfig::load_from(file.path(), "127.0.0.1:0", |_| None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("GROQ_API_KEY"), "{message}");
        assert!(message.contains("groq-fast"), "{message}");
    }

    #[test]
    fn an_unknown_kind_is_rejected_up_front() {
        let file = write_config(
            r#"{"providers": [{"name": "x", "kind": "copilot", "api_key_env": "K",
                "base_url": "http://localhost", "model": "m", "priority": 1,
                "requests_per_minute": 1}]}"#,
        );
        let err = ServerConfig::load_from(file.path(), "127.0.0.1:0", |_| Some("key".into()))
            .unwrap_err();
        assert!(matches!(err, PoolError::UnsupportedProtocol(tag) if tag == "copilot"));
    }

    #[test]
    fn a_bad_listen_address_is_a_configuration_error() {
        let file = write_config(SAMPLE);
        let err =
            ServerConfig::load_from(file.path(), "not-an-addr", |_| Some("k".into())).unwrap_err();
        assert!(matches!(err, PoolError::Configuration(_)));
        assert!(err.to_string().contains("not-an-addr"));
    }

    #[test]
    fn a_missing_file_is_reported_with_its_path() {
        let err = ServerConfig::load_from(
            Path::new("/nonexistent/switchboard.json"),
            "127.0.0.1:0",
            |_| None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/switchboard.json"));
    }
}
