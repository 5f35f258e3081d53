//! Configuration module for the Turbot provider.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `turbot.yaml`
//! - Resolving workspace credentials
//! - Validation against the resource schemas
//! - Computing configuration hashes for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    Credentials, DEFAULT_PROFILE, DEFAULT_STATE_PATH, ProviderConfig, ResourceConfig, StateConfig,
    WorkspaceConfig,
};
pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_ACCESS_KEY, ENV_PROFILE, ENV_SECRET_KEY, ENV_WORKSPACE,
    credentials_file_path, find_config_file, load_credentials_file,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use hash::ConfigHasher;
