//! Configuration parser for loading resource files and credentials.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, TurbotError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{Credentials, ProviderConfig};

/// Environment variable holding the workspace URL.
pub const ENV_WORKSPACE: &str = "TURBOT_WORKSPACE";
/// Environment variable holding the access key.
pub const ENV_ACCESS_KEY: &str = "TURBOT_ACCESS_KEY";
/// Environment variable holding the secret key.
pub const ENV_SECRET_KEY: &str = "TURBOT_SECRET_KEY";
/// Environment variable selecting the credentials profile.
pub const ENV_PROFILE: &str = "TURBOT_PROFILE";

/// Configuration parser for loading provider configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ProviderConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(TurbotError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TurbotError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ProviderConfig> {
        debug!("Parsing YAML configuration");

        let config: ProviderConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            TurbotError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed {} resource(s)", config.resources.len());
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// `TURBOT_WORKSPACE` replaces `workspace.url` and `TURBOT_PROFILE`
    /// replaces `workspace.profile`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ProviderConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    fn apply_env_overrides(config: &mut ProviderConfig) {
        if let Ok(url) = std::env::var(ENV_WORKSPACE) {
            debug!("Overriding workspace.url from environment");
            config.workspace.url = Some(url);
        }

        if let Ok(profile) = std::env::var(ENV_PROFILE) {
            debug!("Overriding workspace.profile from environment");
            config.workspace.profile = profile;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                TurbotError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Resolves workspace credentials.
    ///
    /// Access and secret keys from the environment win. Otherwise the
    /// profile named by the configuration is read from the credentials file.
    /// The workspace URL from configuration (or `TURBOT_WORKSPACE`) overrides
    /// the one stored in the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if no complete set of credentials can be found.
    pub fn resolve_credentials(&self, config: &ProviderConfig) -> Result<Credentials> {
        let access_key = std::env::var(ENV_ACCESS_KEY).ok();
        let secret_key = std::env::var(ENV_SECRET_KEY).ok();

        if let (Some(access_key), Some(secret_key)) = (access_key, secret_key) {
            debug!("Using credentials from environment");
            let workspace = config.workspace.url.clone().ok_or_else(|| {
                TurbotError::Config(ConfigError::MissingEnvVar {
                    name: String::from(ENV_WORKSPACE),
                })
            })?;
            return Ok(Credentials {
                workspace,
                access_key,
                secret_key,
            });
        }

        let profile = &config.workspace.profile;
        let path = credentials_file_path().ok_or_else(|| {
            TurbotError::Config(ConfigError::MissingCredentials {
                profile: profile.clone(),
            })
        })?;
        let mut credentials = load_credentials_file(&path, profile)?;
        if let Some(url) = &config.workspace.url {
            credentials.workspace.clone_from(url);
        }
        Ok(credentials)
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["turbot.yaml", "turbot.yml"];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(TurbotError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

/// Location of the shared credentials file, `~/.config/turbot/credentials.yml`.
#[must_use]
pub fn credentials_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("turbot").join("credentials.yml"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileEntry {
    #[serde(default)]
    workspace: String,
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    secret_key: String,
}

/// Reads one profile from a credentials file.
///
/// The file maps profile names to `workspace`, `accessKey` and `secretKey`.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or the profile is missing
/// or incomplete.
pub fn load_credentials_file(path: &Path, profile: &str) -> Result<Credentials> {
    let missing = || {
        TurbotError::Config(ConfigError::MissingCredentials {
            profile: profile.to_string(),
        })
    };

    if !path.exists() {
        debug!("Credentials file not found at: {}", path.display());
        return Err(missing());
    }

    let content = std::fs::read_to_string(path)?;
    let mut profiles: BTreeMap<String, ProfileEntry> = serde_yaml::from_str(&content)
        .map_err(|e| {
            TurbotError::Config(ConfigError::ParseError {
                message: format!("Invalid credentials file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

    let entry = profiles.remove(profile).ok_or_else(missing)?;
    if entry.access_key.is_empty() || entry.secret_key.is_empty() {
        return Err(missing());
    }

    info!("Using credentials profile '{profile}'");
    Ok(Credentials {
        workspace: entry.workspace,
        access_key: entry.access_key,
        secret_key: entry.secret_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceKind;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
workspace:
  url: https://example.cloud.turbot.com
resources: []
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();
        assert_eq!(
            config.workspace.url.as_deref(),
            Some("https://example.cloud.turbot.com")
        );
        assert_eq!(config.workspace.profile, "default");
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
workspace:
  url: https://example.cloud.turbot.com
  profile: prod
state:
  path: state/turbot.json
resources:
  - name: readme
    kind: file
    fields:
      parent: "tmod:@turbot/turbot#/"
      title: Readme
      data: '{"owner": "ops"}'
  - name: ops-admin
    kind: grant
    fields:
      resource: "tmod:@turbot/turbot#/"
      identity: "profile-1"
      type: "tmod:@turbot/aws#/permission/types/aws"
      level: "tmod:@turbot/turbot-iam#/permission/levels/superuser"
  - name: baseline
    kind: smart_folder_attachment
    fields:
      resource: "204817"
      smart_folder: "171930"
"#;
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(config.resources.len(), 3);
        assert_eq!(config.resources[1].kind, ResourceKind::Grant);
        assert_eq!(config.state.path.as_deref(), Some("state/turbot.json"));
    }

    #[test]
    fn test_parse_unknown_kind_fails() {
        let yaml = r"
resources:
  - name: bucket
    kind: s3_bucket
";
        let err = ConfigParser::new().parse_yaml(yaml, None).unwrap_err();
        assert!(matches!(err, TurbotError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("turbot.yaml"), "resources: []").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("turbot.yaml"));
    }

    #[test]
    fn test_load_credentials_profile() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default:\n  workspace: https://a.cloud.turbot.com\n  accessKey: ak\n  secretKey: sk\n\
             broken:\n  accessKey: only-access"
        )
        .unwrap();

        let credentials = load_credentials_file(file.path(), "default").unwrap();
        assert_eq!(credentials.workspace, "https://a.cloud.turbot.com");
        assert_eq!(credentials.access_key, "ak");

        assert!(load_credentials_file(file.path(), "broken").is_err());
        assert!(load_credentials_file(file.path(), "missing").is_err());
    }
}
