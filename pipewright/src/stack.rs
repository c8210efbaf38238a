//! Stack context threaded explicitly through pipeline assembly.
//!
//! The context carries the application name and the registry of known
//! source repositories. It is an explicit argument to assembly rather
//! than an ambient lookup against shared state.

use crate::errors::ConfigError;
use serde::Serialize;
use std::collections::HashMap;

/// A resolved reference to an external source repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRef {
    /// The repository name in the source-control system.
    pub name: String,
    /// Identifier of the reference within its owning stack.
    pub construct_id: String,
}

/// Naming context for one deployment stack.
///
/// Repositories must be registered before a source stage can resolve
/// them; resolution failure is a configuration error, not a runtime
/// condition.
#[derive(Debug, Clone)]
pub struct StackContext {
    app_name: String,
    repositories: HashMap<String, RepositoryRef>,
}

impl StackContext {
    /// Creates a context for the named application.
    #[must_use]
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            repositories: HashMap::new(),
        }
    }

    /// Returns the application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Registers a repository by name, returning its reference.
    ///
    /// Registering the same name twice returns the existing reference.
    pub fn register_repository(&mut self, name: impl Into<String>) -> RepositoryRef {
        let name = name.into();
        let app_name = &self.app_name;
        self.repositories
            .entry(name.clone())
            .or_insert_with(|| RepositoryRef {
                construct_id: format!("{app_name}-Repository-{name}"),
                name,
            })
            .clone()
    }

    /// Resolves a previously registered repository by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RepositoryNotFound`] if the name was never
    /// registered with this context.
    pub fn resolve_repository(&self, name: &str) -> Result<RepositoryRef, ConfigError> {
        self.repositories
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::RepositoryNotFound {
                name: name.to_string(),
                stack: self.app_name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut stack = StackContext::new("demo-app");
        let registered = stack.register_repository("lambda-demo");
        let resolved = stack.resolve_repository("lambda-demo").unwrap();

        assert_eq!(registered, resolved);
        assert_eq!(resolved.name, "lambda-demo");
        assert_eq!(resolved.construct_id, "demo-app-Repository-lambda-demo");
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut stack = StackContext::new("demo-app");
        let first = stack.register_repository("lambda-demo");
        let second = stack.register_repository("lambda-demo");
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_unknown_repository() {
        let stack = StackContext::new("demo-app");
        let err = stack.resolve_repository("missing").unwrap_err();
        assert_eq!(
            err,
            ConfigError::RepositoryNotFound {
                name: "missing".to_string(),
                stack: "demo-app".to_string(),
            }
        );
    }
}
