//! Provider configuration.
//!
//! Options can be built in code, deserialized with serde from any format the
//! host application already reads, or taken from environment variables.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

const DEFAULT_MAX_DEPTH: usize = 1024;

/// Options applied when a [`ServiceCollection`](crate::ServiceCollection) is
/// turned into a provider.
///
/// # Examples
///
/// ```
/// use ferrous_flow::ProviderOptions;
///
/// let options: ProviderOptions = serde_json::from_str(r#"{ "validate_on_build": true }"#).unwrap();
/// assert!(options.validate_scopes);
/// assert!(options.validate_on_build);
/// assert_eq!(options.max_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    /// Reject Scoped resolutions from the root provider. When disabled, the
    /// root provider acts as an implicit scope of its own.
    pub validate_scopes: bool,
    /// Build every registration once in [`try_build`](crate::ServiceCollection::try_build).
    pub validate_on_build: bool,
    /// Maximum nesting of resolutions before giving up.
    pub max_depth: usize,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            validate_scopes: true,
            validate_on_build: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_scopes(mut self, enabled: bool) -> Self {
        self.validate_scopes = enabled;
        self
    }

    pub fn validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Reads `<PREFIX>_VALIDATE_SCOPES`, `<PREFIX>_VALIDATE_ON_BUILD` and
    /// `<PREFIX>_MAX_DEPTH`, keeping defaults for unset variables.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        Self::from_lookup(prefix, |name| env::var(name).ok())
    }

    fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> DiResult<Self> {
        let prefix = prefix.to_uppercase();
        let mut options = Self::default();
        if let Some(value) = lookup(&format!("{}_VALIDATE_SCOPES", prefix)) {
            options.validate_scopes = parse_option("validate_scopes", &value)?;
        }
        if let Some(value) = lookup(&format!("{}_VALIDATE_ON_BUILD", prefix)) {
            options.validate_on_build = parse_option("validate_on_build", &value)?;
        }
        if let Some(value) = lookup(&format!("{}_MAX_DEPTH", prefix)) {
            options.max_depth = parse_option("max_depth", &value)?;
        }
        Ok(options)
    }
}

fn parse_option<T: FromStr>(option: &'static str, value: &str) -> DiResult<T> {
    value.trim().parse().map_err(|_| DiError::InvalidOption {
        option,
        value: value.to_string(),
    })
}
