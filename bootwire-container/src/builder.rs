//! Instance construction.
//!
//! [`ContainerBuilder::build`] walks an [`InitializationOrder`] left to
//! right and turns every service into a locator entry:
//!
//! ```text
//! singleton + eager  ──construct now──>  Ready(instance)
//! singleton + lazy   ──────────────────>  Lazy(OnceCell + recipe)
//! factory            ──────────────────>  Factory(recipe)
//! ```
//!
//! Required dependencies are always found already built, because the order
//! puts them first. An optional dependency on a declared service that comes
//! later in the order is built on demand, together with its own required
//! chain. When that chain leads back into a service still under
//! construction, the optional dependency is injected as `None` instead.
//! A `visiting` stack catches any chain that re-enters itself.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use crate::error::{BootwireError, Result, RuntimeCycleError};
use crate::extractor::DependencyExtractor;
use crate::locator::{LazySingleton, Recipe, ServiceLocator, Slot};
use crate::registry::ServiceRegistry;
use crate::resolver::InitializationOrder;
use crate::scope::Scope;
use crate::settings::{ContainerSettings, SingletonInit};

/// Builds a [`ServiceLocator`] from a frozen registry.
///
/// # Examples
/// ```rust,ignore
/// registry.freeze()?;
/// let order = compute_order(&registry)?;
/// let locator = ContainerBuilder::new(settings).build(&order, &registry, &catalog)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    settings: ContainerSettings,
}

impl ContainerBuilder {
    pub fn new(settings: ContainerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Constructs every service in `order`.
    ///
    /// Fail-fast: the first error aborts the build and no locator is
    /// returned.
    ///
    /// # Errors
    /// - [`BootwireError::NotFrozen`]: `registry` is still open
    /// - [`BootwireError::InternalOrder`]: `order` disagrees with the graph
    ///   or does not cover exactly the declared services
    /// - [`BootwireError::Construction`]: a constructor failed or is missing
    /// - [`BootwireError::RuntimeCycle`]: a required dependency re-entered
    ///   a service being built
    #[instrument(skip_all, fields(services = order.len()), name = "container_build")]
    pub fn build(
        &self,
        order: &InitializationOrder,
        registry: &ServiceRegistry,
        extractor: &dyn DependencyExtractor,
    ) -> Result<ServiceLocator> {
        if !registry.is_frozen() {
            return Err(BootwireError::NotFrozen);
        }
        check_coverage(order, registry)?;

        info!(
            services = order.len(),
            singleton_init = ?self.settings.singleton_init,
            "Building container"
        );
        debug!(plan = %order.render(registry), "Initialization plan");

        let mut state = BuildState {
            registry,
            extractor,
            settings: &self.settings,
            slots: HashMap::with_capacity(order.len()),
            visiting: Vec::new(),
            constructed: 0,
        };

        for name in order.iter() {
            state.materialize(name, true)?;
        }

        info!(
            constructed = state.constructed,
            "Container built successfully ✓"
        );
        Ok(ServiceLocator::new(state.slots, order.clone()))
    }
}

/// Every declared service appears in `order` exactly once, and nothing else
/// does.
fn check_coverage(order: &InitializationOrder, registry: &ServiceRegistry) -> Result<()> {
    let mut seen = HashSet::with_capacity(order.len());
    for name in order.iter() {
        if !registry.has_service(name) {
            return Err(BootwireError::InternalOrder {
                service: name.clone(),
                detail: "the order names a service that is not declared".to_string(),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(BootwireError::InternalOrder {
                service: name.clone(),
                detail: "the order lists this service more than once".to_string(),
            });
        }
    }

    if let Some(missing) = registry.service_names().find(|name| !seen.contains(name)) {
        return Err(BootwireError::InternalOrder {
            service: missing.to_string(),
            detail: "declared service is missing from the order".to_string(),
        });
    }

    Ok(())
}

/// Mutable state of one `build` call.
struct BuildState<'a> {
    registry: &'a ServiceRegistry,
    extractor: &'a dyn DependencyExtractor,
    settings: &'a ContainerSettings,
    slots: HashMap<String, Slot>,
    /// Services currently being materialized, outermost first.
    visiting: Vec<String>,
    /// Eager singletons constructed so far.
    constructed: usize,
}

impl BuildState<'_> {
    /// Returns the entry for `name`, creating it if needed.
    ///
    /// `in_order` is true for the top-level walk, where every required
    /// dependency must already exist.
    fn materialize(&mut self, name: &str, in_order: bool) -> Result<Slot> {
        if let Some(slot) = self.slots.get(name) {
            return Ok(slot.clone());
        }

        if let Some(pos) = self.visiting.iter().position(|n| n == name) {
            let mut chain = self.visiting[pos..].to_vec();
            chain.push(name.to_string());
            debug!(chain = ?chain, "Construction re-entered itself");
            return Err(BootwireError::RuntimeCycle(RuntimeCycleError { chain }));
        }

        self.visiting.push(name.to_string());
        let result = self.assemble(name, in_order);
        self.visiting.pop();

        let slot = result?;
        self.slots.insert(name.to_string(), slot.clone());
        Ok(slot)
    }

    fn assemble(&mut self, name: &str, in_order: bool) -> Result<Slot> {
        let registry = self.registry;
        let descriptor = registry
            .descriptor(name)
            .ok_or_else(|| BootwireError::InternalOrder {
                service: name.to_string(),
                detail: "no descriptor is declared under this name".to_string(),
            })?;

        let constructor = self.extractor.constructor(name).ok_or_else(|| {
            BootwireError::Construction {
                service: name.to_string(),
                source: "no constructor was provided for this service".into(),
            }
        })?;

        let mut bindings = Vec::with_capacity(descriptor.dependencies.len());
        for dependency in &descriptor.dependencies {
            let target = dependency.target.as_str();

            let slot = if !dependency.optional {
                match self.slots.get(target) {
                    Some(slot) => Some(slot.clone()),
                    None if in_order => {
                        return Err(BootwireError::InternalOrder {
                            service: name.to_string(),
                            detail: format!("dependency {target:?} was not built before it"),
                        });
                    }
                    None => Some(self.materialize(target, false)?),
                }
            } else if registry.has_service(target) {
                match self.materialize(target, false) {
                    Ok(slot) => Some(slot),
                    Err(BootwireError::RuntimeCycle(cycle)) => {
                        warn!(
                            service = name,
                            dependency = target,
                            chain = ?cycle.chain,
                            "Optional dependency leads back into a service under construction, injecting None"
                        );
                        None
                    }
                    Err(e) => return Err(e),
                }
            } else {
                if self.settings.warn_unresolved_optional {
                    warn!(
                        service = name,
                        dependency = target,
                        "Optional dependency is not declared, injecting None"
                    );
                }
                None
            };

            bindings.push((dependency.clone(), slot));
        }

        let recipe = Recipe {
            name: name.to_string(),
            constructor,
            config: descriptor.config.clone(),
            bindings,
        };

        let slot = match (descriptor.scope, self.settings.singleton_init) {
            (Scope::Singleton, SingletonInit::Eager) => {
                let instance = recipe.construct()?;
                self.constructed += 1;
                debug!(service = name, "Constructed singleton");
                Slot::Ready(instance)
            }
            (Scope::Singleton, SingletonInit::Lazy) => {
                debug!(service = name, "Deferred singleton");
                Slot::Lazy(std::sync::Arc::new(LazySingleton::new(recipe)))
            }
            (Scope::Factory, _) => {
                debug!(service = name, "Prepared factory");
                Slot::Factory(std::sync::Arc::new(recipe))
            }
        };

        Ok(slot)
    }
}
