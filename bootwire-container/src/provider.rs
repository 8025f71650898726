//! Provider trait: a module of related service registrations.
//!
//! Providers group related services together, so an application can be
//! assembled from one provider per domain instead of one giant block.
//!
//! # Examples
//! ```rust,ignore
//! struct PersistenceProvider;
//!
//! impl Provider for PersistenceProvider {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) {
//!         registry.register_singleton("database_client", vec![], constructor(|_| {
//!             Ok(DatabaseClient::connect("postgres://localhost"))
//!         }));
//!     }
//! }
//! ```
//!
//! Providers can also be submitted at link time and picked up by
//! [`ServiceCatalog::discover`](crate::extractor::ServiceCatalog::discover):
//!
//! ```rust,ignore
//! inventory::submit! {
//!     ProviderRegistration {
//!         name: "persistence",
//!         register: |registry| PersistenceProvider.register(registry),
//!     }
//! }
//! ```

use crate::descriptor::{Dependency, ServiceDescriptor};
use crate::extractor::ConstructorFn;

/// A module that registers related services.
///
/// # Design Philosophy
/// Providers encourage modular architecture. Instead of one giant
/// registration block, split your services by domain:
///
/// ```rust,ignore
/// let locator = ServiceCatalog::new()
///     .add_provider(&PersistenceProvider)
///     .add_provider(&MailProvider)
///     .bootstrap()?;
/// ```
pub trait Provider: Send + Sync {
    /// Register services into the registry.
    fn register(&self, registry: &mut dyn ProviderRegistry);

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Interface that providers use to register services.
///
/// Implemented by [`ServiceCatalog`](crate::extractor::ServiceCatalog); a
/// separate trait so providers can be tested against a mock.
pub trait ProviderRegistry {
    /// Register a singleton service.
    fn register_singleton(
        &mut self,
        name: &str,
        dependencies: Vec<Dependency>,
        constructor: ConstructorFn,
    );

    /// Register a factory service.
    fn register_factory(
        &mut self,
        name: &str,
        dependencies: Vec<Dependency>,
        constructor: ConstructorFn,
    );

    /// Register a service from a full descriptor.
    fn register_descriptor(&mut self, descriptor: ServiceDescriptor, constructor: ConstructorFn);
}

/// A provider submitted at link time with `inventory::submit!`.
pub struct ProviderRegistration {
    /// Unique name, also the order in which discovered providers apply.
    pub name: &'static str,
    pub register: fn(&mut dyn ProviderRegistry),
}

inventory::collect!(ProviderRegistration);
