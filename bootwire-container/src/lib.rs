//! Core runtime for Bootwire DI.
//!
//! Declared services go into a [`ServiceRegistry`], get a deterministic
//! initialization order from [`compute_order`], and are constructed by a
//! [`ContainerBuilder`] into a read-only [`ServiceLocator`].

pub mod builder;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod locator;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod settings;

pub use builder::ContainerBuilder;
pub use container::{bootstrap, prelude};
pub use descriptor::{Dependency, ServiceDescriptor};
pub use error::{BootwireError, Result};
pub use extractor::{DependencyExtractor, ServiceCatalog};
pub use locator::ServiceLocator;
pub use registry::ServiceRegistry;
pub use resolver::{InitializationOrder, compute_order};
pub use scope::Scope;
pub use settings::ContainerSettings;
