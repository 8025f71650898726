//! # The ServiceLocator: read-only lookup surface
//!
//! Produced by [`ContainerBuilder::build`](crate::builder::ContainerBuilder::build)
//! and never mutated afterwards. Every entry is one of:
//!
//! ```text
//! Ready    eager singleton, already built
//! Lazy     singleton built on first use, behind a OnceCell
//! Factory  recipe: constructor + bindings to its dependencies' entries
//! ```
//!
//! The table is a plain `HashMap` filled before the locator is published,
//! so lookups take no locks. Lazy singletons rely on `OnceCell` to build
//! exactly once under concurrent first access.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bootwire_support::rendering::suggest_similar;
use once_cell::sync::OnceCell;
use tracing::{trace, warn};

use crate::descriptor::Dependency;
use crate::error::{BootwireError, NotFoundError, Result};
use crate::extractor::{ConstructorFn, Injected, Instance, downcast};
use crate::resolver::InitializationOrder;
use crate::scope::Scope;

// ═══════════════════════════════════════════
// Recipes and slots (internal)
// ═══════════════════════════════════════════

/// Everything needed to construct one instance of a service.
pub(crate) struct Recipe {
    pub name: String,
    pub constructor: ConstructorFn,
    pub config: BTreeMap<String, serde_json::Value>,
    /// One entry per declared dependency; `None` for absent optional targets.
    pub bindings: Vec<(Dependency, Option<Slot>)>,
}

impl Recipe {
    /// Produces every dependency value and invokes the constructor.
    pub fn construct(&self) -> Result<Instance> {
        let mut injected = Injected::new(&self.name, &self.config);

        for (dependency, slot) in &self.bindings {
            let value = match slot {
                Some(slot) => Some(slot.produce()?),
                None => None,
            };
            injected.push(dependency, value);
        }

        trace!(service = %self.name, "Constructing");
        (self.constructor)(&injected).map_err(|source| BootwireError::Construction {
            service: self.name.clone(),
            source,
        })
    }
}

/// A singleton whose construction is deferred to first use.
pub(crate) struct LazySingleton {
    cell: OnceCell<Instance>,
    recipe: Recipe,
}

impl LazySingleton {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            cell: OnceCell::new(),
            recipe,
        }
    }
}

/// How a service name turns into an instance.
#[derive(Clone)]
pub(crate) enum Slot {
    Ready(Instance),
    Lazy(Arc<LazySingleton>),
    Factory(Arc<Recipe>),
}

impl Slot {
    pub fn produce(&self) -> Result<Instance> {
        match self {
            Slot::Ready(instance) => Ok(instance.clone()),
            Slot::Lazy(lazy) => lazy
                .cell
                .get_or_try_init(|| lazy.recipe.construct())
                .cloned(),
            Slot::Factory(recipe) => recipe.construct(),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Slot::Ready(_) | Slot::Lazy(_) => Scope::Singleton,
            Slot::Factory(_) => Scope::Factory,
        }
    }
}

// ═══════════════════════════════════════════
// ServiceLocator
// ═══════════════════════════════════════════

/// Immutable, thread-safe lookup of constructed services by name.
///
/// Share it with `Arc<ServiceLocator>`; every method takes `&self`.
pub struct ServiceLocator {
    slots: HashMap<String, Slot>,
    order: InitializationOrder,
}

impl ServiceLocator {
    pub(crate) fn new(slots: HashMap<String, Slot>, order: InitializationOrder) -> Self {
        Self { slots, order }
    }

    /// Looks up a service by name.
    ///
    /// Singletons return the shared instance; factories build a new one on
    /// every call.
    ///
    /// # Errors
    /// - [`BootwireError::NotFound`] if no service has this name
    /// - [`BootwireError::Construction`] if a factory or lazy singleton
    ///   fails to build
    pub fn get(&self, name: &str) -> Result<Instance> {
        trace!(service = name, "Resolving");

        let slot = self.slots.get(name).ok_or_else(|| self.not_found(name))?;
        slot.produce()
    }

    /// Typed lookup.
    ///
    /// ```rust,ignore
    /// let repo: Arc<UserRepository> = locator.get_as("user_repository")?;
    /// ```
    pub fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        downcast(name, self.get(name)?)
    }

    /// Like [`get`](Self::get) but `Ok(None)` for unknown names, for
    /// callers probing an optional service.
    pub fn try_get(&self, name: &str) -> Result<Option<Instance>> {
        self.slots.get(name).map(Slot::produce).transpose()
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Scope of a registered service.
    pub fn scope_of(&self, name: &str) -> Option<Scope> {
        self.slots.get(name).map(Slot::scope)
    }

    /// Registered names in initialization order.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|name| self.slots.contains_key(*name))
    }

    pub fn initialization_order(&self) -> &InitializationOrder {
        &self.order
    }

    /// Every singleton instance, in initialization order.
    ///
    /// Lazy singletons are built here. One that fails to build is logged
    /// and left out.
    pub fn singletons(&self) -> Vec<(&str, Instance)> {
        self.service_names()
            .filter(|name| self.scope_of(name) == Some(Scope::Singleton))
            .filter_map(|name| match self.get(name) {
                Ok(instance) => Some((name, instance)),
                Err(error) => {
                    warn!(service = name, %error, "Unable to obtain singleton");
                    None
                }
            })
            .collect()
    }

    /// Returns the number of registered services.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn not_found(&self, name: &str) -> BootwireError {
        let known: Vec<&str> = self.service_names().collect();

        BootwireError::NotFound(NotFoundError {
            name: name.to_string(),
            suggestions: suggest_similar(name, &known, 3),
        })
    }
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("registered", &self.slots.len())
            .field("order", &self.order.as_slice())
            .finish()
    }
}
