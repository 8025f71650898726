//! Service declarations.
//!
//! A [`ServiceDescriptor`] is what a dependency extractor reports for one
//! service: its name, its scope and the ordered list of constructor
//! parameters it wants injected.

use std::any::type_name;
use std::collections::BTreeMap;

use bootwire_support::rendering::{shorten_type_name, snake_case};
use serde::Deserialize;

use crate::scope::Scope;

/// One constructor parameter of a service.
///
/// # Examples
/// ```
/// use bootwire_container::descriptor::Dependency;
///
/// let db = Dependency::required("db", "database_client");
/// let cache = Dependency::optional("cache", "cache_service");
/// assert!(!db.optional);
/// assert!(cache.optional);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dependency {
    /// Parameter name the instance is injected under
    pub param_name: String,
    /// Name of the service that provides it
    pub target: String,
    /// Optional dependencies may be missing and never affect ordering
    #[serde(default)]
    pub optional: bool,
}

impl Dependency {
    /// A dependency that must be declared and built first.
    pub fn required(param_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            param_name: param_name.into(),
            target: target.into(),
            optional: false,
        }
    }

    /// A dependency that is injected as `None` when its target is absent.
    pub fn optional(param_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            param_name: param_name.into(),
            target: target.into(),
            optional: true,
        }
    }
}

/// Everything the registry knows about one service.
///
/// Never mutated once committed to a registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Free-form per-service settings handed to the constructor.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, scope: Scope, dependencies: Vec<Dependency>) -> Self {
        Self {
            name: name.into(),
            scope,
            dependencies,
            config: BTreeMap::new(),
        }
    }

    /// Adds one per-service setting.
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Required dependencies, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(|d| !d.optional)
    }
}

/// Conventional service name for type `T`.
///
/// Drops the module path and converts the type name to snake case.
///
/// ```
/// use bootwire_container::descriptor::service_name_of;
///
/// struct UserService;
/// assert_eq!(service_name_of::<UserService>(), "user_service");
/// ```
pub fn service_name_of<T: ?Sized + 'static>() -> String {
    snake_case(&shorten_type_name(type_name::<T>()))
}
