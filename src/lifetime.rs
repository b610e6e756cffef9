//! Service lifetime definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Service lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_flow::{Configurator, Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Repository;
/// struct RequestModel;
///
/// let mut services = ServiceCollection::new();
/// services.add_instance(Arc::new(Database { url: "postgres://localhost".to_string() }));
/// services.add_factory::<Repository, _>(Lifetime::Scoped, |_| Ok(Arc::new(Repository))).unwrap();
/// services.add_factory::<RequestModel, _>(Lifetime::Transient, |_| Ok(Arc::new(RequestModel))).unwrap();
///
/// let provider = services.build();
/// let scope1 = provider.create_scope().unwrap();
/// let scope2 = provider.create_scope().unwrap();
///
/// // Singleton: same instance across scopes
/// let db1 = scope1.resolver().resolve::<Database>().unwrap();
/// let db2 = scope2.resolver().resolve::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: same within a scope, different across scopes
/// let repo1a = scope1.resolver().resolve::<Repository>().unwrap();
/// let repo1b = scope1.resolver().resolve::<Repository>().unwrap();
/// let repo2 = scope2.resolver().resolve::<Repository>().unwrap();
/// assert!(Arc::ptr_eq(&repo1a, &repo1b));
/// assert!(!Arc::ptr_eq(&repo1a, &repo2));
///
/// // Transient: always different
/// let m1 = scope1.resolver().resolve::<RequestModel>().unwrap();
/// let m2 = scope1.resolver().resolve::<RequestModel>().unwrap();
/// assert!(!Arc::ptr_eq(&m1, &m2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// Single instance per provider, shared by every scope
    Singleton,
    /// Single instance per scope, torn down when the scope is released
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            "transient" => Ok(Lifetime::Transient),
            _ => Err(DiError::InvalidLifetime(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Lifetime {
    type Error = DiError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Lifetime::Singleton),
            1 => Ok(Lifetime::Scoped),
            2 => Ok(Lifetime::Transient),
            other => Err(DiError::InvalidLifetime(other.to_string())),
        }
    }
}

/// Anything that can name a lifetime at registration time.
///
/// Registration methods accept `impl IntoLifetime` so that lifetimes coming
/// from configuration (names, raw discriminants) are validated when the
/// service is registered instead of when it is first resolved.
pub trait IntoLifetime {
    fn into_lifetime(self) -> DiResult<Lifetime>;
}

impl IntoLifetime for Lifetime {
    fn into_lifetime(self) -> DiResult<Lifetime> {
        Ok(self)
    }
}

impl IntoLifetime for &str {
    fn into_lifetime(self) -> DiResult<Lifetime> {
        self.parse()
    }
}

impl IntoLifetime for String {
    fn into_lifetime(self) -> DiResult<Lifetime> {
        self.parse()
    }
}

impl IntoLifetime for u8 {
    fn into_lifetime(self) -> DiResult<Lifetime> {
        Lifetime::try_from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Scoped".parse::<Lifetime>().unwrap(), Lifetime::Scoped);
        assert_eq!(" transient ".parse::<Lifetime>().unwrap(), Lifetime::Transient);
        assert!(matches!(
            "request".parse::<Lifetime>(),
            Err(DiError::InvalidLifetime(name)) if name == "request"
        ));
    }

    #[test]
    fn raw_discriminants_follow_declaration_order() {
        assert_eq!(0u8.into_lifetime().unwrap(), Lifetime::Singleton);
        assert_eq!(2u8.into_lifetime().unwrap(), Lifetime::Transient);
        assert!(7u8.into_lifetime().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Lifetime::Singleton).unwrap();
        assert_eq!(json, "\"singleton\"");
        let back: Lifetime = serde_json::from_str("\"scoped\"").unwrap();
        assert_eq!(back, Lifetime::Scoped);
    }
}
