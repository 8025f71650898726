//! The boundary between service discovery and the container.
//!
//! A [`DependencyExtractor`] reports what services exist, what each one
//! needs, and how to construct it. How it learns that (annotations, a
//! config file, hand-written registrations) is its own business.
//!
//! [`ServiceCatalog`] is the in-memory extractor most applications use.
//!
//! # Examples
//! ```rust
//! use bootwire_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct DatabaseClient;
//!
//! struct UserRepository {
//!     db: Arc<DatabaseClient>,
//! }
//!
//! let locator = ServiceCatalog::new()
//!     .singleton("user_repository", [Dependency::required("db", "database_client")], |inj| {
//!         Ok(UserRepository { db: inj.required("db")? })
//!     })
//!     .singleton("database_client", [], |_| Ok(DatabaseClient))
//!     .bootstrap()
//!     .expect("Failed to bootstrap container");
//!
//! let repo: Arc<UserRepository> = locator.get_as("user_repository").unwrap();
//! # let _ = &repo.db;
//! ```

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::descriptor::{Dependency, ServiceDescriptor};
use crate::error::{BootwireError, BoxError, NotFoundError, Result};
use crate::provider::{Provider, ProviderRegistration, ProviderRegistry};
use crate::scope::Scope;

/// A constructed service, type-erased.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds one instance from its injected dependencies.
///
/// # Why `Arc` and not `Box`?
/// Factory-scoped services keep their constructor for the lifetime of the
/// locator, which is shared between threads.
pub type ConstructorFn =
    Arc<dyn Fn(&Injected<'_>) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Wraps a typed constructor closure into a [`ConstructorFn`].
pub fn constructor<T, F>(f: F) -> ConstructorFn
where
    T: Send + Sync + 'static,
    F: Fn(&Injected<'_>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
{
    Arc::new(move |injected: &Injected<'_>| Ok(Arc::new(f(injected)?) as Instance))
}

/// Source of service declarations and constructors.
pub trait DependencyExtractor {
    /// One descriptor per service, in discovery order.
    fn descriptors(&self) -> Vec<ServiceDescriptor>;

    /// Constructor for the service named `name`.
    fn constructor(&self, name: &str) -> Option<ConstructorFn>;
}

// ═══════════════════════════════════════════
// Injected
// ═══════════════════════════════════════════

/// One resolved constructor argument.
struct Injection {
    param_name: String,
    target: String,
    value: Option<Instance>,
}

/// The arguments handed to a constructor.
///
/// Parameters are looked up by the `param_name` they were declared with.
pub struct Injected<'a> {
    service: &'a str,
    injections: Vec<Injection>,
    config: &'a BTreeMap<String, serde_json::Value>,
}

impl<'a> Injected<'a> {
    pub(crate) fn new(
        service: &'a str,
        config: &'a BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            service,
            injections: Vec::new(),
            config,
        }
    }

    pub(crate) fn push(&mut self, dependency: &Dependency, value: Option<Instance>) {
        self.injections.push(Injection {
            param_name: dependency.param_name.clone(),
            target: dependency.target.clone(),
            value,
        });
    }

    /// Name of the service being constructed.
    pub fn service(&self) -> &str {
        self.service
    }

    /// Raw injected value of `param`. `None` when the parameter is unknown
    /// or its optional target is absent.
    pub fn instance(&self, param: &str) -> Option<&Instance> {
        self.find(param).and_then(|i| i.value.as_ref())
    }

    /// A dependency that must be present.
    ///
    /// # Errors
    /// [`BootwireError::NotFound`] if `param` was not declared or its target
    /// is absent, [`BootwireError::TypeMismatch`] if it is not a `T`.
    pub fn required<T: Send + Sync + 'static>(&self, param: &str) -> Result<Arc<T>> {
        let injection = self.find(param).ok_or_else(|| self.unknown_param(param))?;
        let value = injection.value.clone().ok_or_else(|| {
            BootwireError::NotFound(NotFoundError {
                name: injection.target.clone(),
                suggestions: Vec::new(),
            })
        })?;

        downcast(&injection.target, value)
    }

    /// A dependency that may be absent. Absent targets give `Ok(None)`.
    ///
    /// # Errors
    /// [`BootwireError::NotFound`] if `param` was not declared,
    /// [`BootwireError::TypeMismatch`] if the value is not a `T`.
    pub fn optional<T: Send + Sync + 'static>(&self, param: &str) -> Result<Option<Arc<T>>> {
        let injection = self.find(param).ok_or_else(|| self.unknown_param(param))?;

        match injection.value.clone() {
            Some(value) => downcast(&injection.target, value).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a per-service setting.
    pub fn config<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> std::result::Result<Option<T>, serde_json::Error> {
        self.config
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    fn find(&self, param: &str) -> Option<&Injection> {
        self.injections.iter().find(|i| i.param_name == param)
    }

    fn unknown_param(&self, param: &str) -> BootwireError {
        let declared: Vec<&str> = self
            .injections
            .iter()
            .map(|i| i.param_name.as_str())
            .collect();

        BootwireError::NotFound(NotFoundError {
            name: format!("{}.{param}", self.service),
            suggestions: bootwire_support::rendering::suggest_similar(param, &declared, 3),
        })
    }
}

impl fmt::Debug for Injected<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<(&str, bool)> = self
            .injections
            .iter()
            .map(|i| (i.param_name.as_str(), i.value.is_some()))
            .collect();

        f.debug_struct("Injected")
            .field("service", &self.service)
            .field("params", &params)
            .finish()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(name: &str, value: Instance) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| BootwireError::TypeMismatch {
        name: name.to_string(),
        expected: type_name::<T>(),
    })
}

// ═══════════════════════════════════════════
// ServiceCatalog
// ═══════════════════════════════════════════

/// A service declaration together with its constructor.
#[derive(Clone)]
pub struct ServiceDefinition {
    pub descriptor: ServiceDescriptor,
    pub constructor: ConstructorFn,
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// In-memory [`DependencyExtractor`] filled through a fluent API.
///
/// The catalog records definitions as given, duplicates included; the
/// registry rejects duplicates when the catalog is bootstrapped.
#[derive(Debug, Default, Clone)]
pub struct ServiceCatalog {
    definitions: Vec<ServiceDefinition>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a singleton: built once, shared by every dependent and lookup.
    pub fn singleton<T, F>(
        mut self,
        name: impl Into<String>,
        dependencies: impl IntoIterator<Item = Dependency>,
        ctor: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Injected<'_>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push(
            ServiceDescriptor::new(name, Scope::Singleton, dependencies.into_iter().collect()),
            constructor(ctor),
        );
        self
    }

    /// Adds a factory: a fresh instance for every resolution.
    pub fn factory<T, F>(
        mut self,
        name: impl Into<String>,
        dependencies: impl IntoIterator<Item = Dependency>,
        ctor: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Injected<'_>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push(
            ServiceDescriptor::new(name, Scope::Factory, dependencies.into_iter().collect()),
            constructor(ctor),
        );
        self
    }

    /// Adds a definition from a full descriptor.
    pub fn define(mut self, descriptor: ServiceDescriptor, constructor: ConstructorFn) -> Self {
        self.push(descriptor, constructor);
        self
    }

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Applying provider");
        provider.register(&mut self);
        self
    }

    /// Applies every provider submitted with `inventory::submit!`.
    ///
    /// Registrations are applied in name order so discovery is
    /// reproducible across builds.
    pub fn discover(mut self) -> Self {
        let mut registrations: Vec<&ProviderRegistration> =
            inventory::iter::<ProviderRegistration>.into_iter().collect();
        registrations.sort_by_key(|r| r.name);

        for registration in registrations {
            debug!(provider = registration.name, "Applying discovered provider");
            (registration.register)(&mut self);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn push(&mut self, descriptor: ServiceDescriptor, constructor: ConstructorFn) {
        self.definitions.push(ServiceDefinition {
            descriptor,
            constructor,
        });
    }
}

impl DependencyExtractor for ServiceCatalog {
    fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.definitions
            .iter()
            .map(|d| d.descriptor.clone())
            .collect()
    }

    fn constructor(&self, name: &str) -> Option<ConstructorFn> {
        let mut matches = self
            .definitions
            .iter()
            .filter(|d| d.descriptor.name == name);
        let first = matches.next()?;

        if matches.next().is_some() {
            warn!(service = name, "Several definitions share this name, using the first");
        }
        Some(first.constructor.clone())
    }
}

impl ProviderRegistry for ServiceCatalog {
    fn register_singleton(
        &mut self,
        name: &str,
        dependencies: Vec<Dependency>,
        constructor: ConstructorFn,
    ) {
        self.push(
            ServiceDescriptor::new(name, Scope::Singleton, dependencies),
            constructor,
        );
    }

    fn register_factory(
        &mut self,
        name: &str,
        dependencies: Vec<Dependency>,
        constructor: ConstructorFn,
    ) {
        self.push(
            ServiceDescriptor::new(name, Scope::Factory, dependencies),
            constructor,
        );
    }

    fn register_descriptor(&mut self, descriptor: ServiceDescriptor, constructor: ConstructorFn) {
        self.push(descriptor, constructor);
    }
}
