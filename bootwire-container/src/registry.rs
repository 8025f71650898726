//! Service registry: stores descriptors and owns the dependency graph.
//!
//! Services may be declared in any order; a dependency may name a service
//! that has not been declared yet. [`ServiceRegistry::freeze`] checks that
//! every required target eventually got a descriptor and closes the
//! registry for good.

use std::collections::{BTreeMap, BTreeSet};

use bootwire_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, warn};

use crate::descriptor::{Dependency, ServiceDescriptor};
use crate::error::{BootwireError, DuplicateServiceError, Result, UnknownDependencyError};
use crate::graph::DependencyGraph;
use crate::scope::Scope;

/// Stores all service declarations and the graph derived from them.
///
/// The registry is populated during startup and becomes immutable once
/// frozen.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    descriptors: BTreeMap<String, ServiceDescriptor>,
    graph: DependencyGraph,
    frozen: bool,
}

impl ServiceRegistry {
    /// Creates an empty, open registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a service.
    ///
    /// # Errors
    /// - [`BootwireError::DuplicateService`] if `name` is already declared;
    ///   the registry is left untouched.
    /// - [`BootwireError::RegistryFrozen`] after [`freeze`](Self::freeze).
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        scope: Scope,
        dependencies: Vec<Dependency>,
    ) -> Result<()> {
        self.declare_descriptor(ServiceDescriptor::new(name, scope, dependencies))
    }

    /// Declares a service from a full descriptor, keeping its config.
    pub fn declare_descriptor(&mut self, descriptor: ServiceDescriptor) -> Result<()> {
        let name = descriptor.name.clone();

        if self.frozen {
            return Err(BootwireError::RegistryFrozen { name });
        }

        if self.descriptors.contains_key(&name) {
            return Err(BootwireError::DuplicateService(DuplicateServiceError { name }));
        }

        self.graph.ensure_node(&name);
        for dep in descriptor.required() {
            self.graph.add_edge(&name, &dep.target);
        }

        debug!(
            service = %name,
            scope = %descriptor.scope,
            dependencies = descriptor.dependencies.len(),
            "Declared service"
        );
        self.descriptors.insert(name, descriptor);
        Ok(())
    }

    /// Closes the registry.
    ///
    /// Every required dependency target must have a descriptor by now.
    /// Targets of optional dependencies may stay undeclared. On failure the
    /// registry stays open so the missing service can still be declared.
    /// Freezing an already frozen registry is a no-op.
    ///
    /// # Errors
    /// [`BootwireError::UnknownDependency`] for the first missing target,
    /// in service name order.
    #[instrument(skip(self), name = "registry_freeze")]
    pub fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }

        for (service, descriptor) in &self.descriptors {
            let missing = descriptor
                .required()
                .find(|dep| !self.descriptors.contains_key(&dep.target));

            if let Some(dep) = missing {
                let known: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
                let suggestions = suggest_similar(&dep.target, &known, 3);

                warn!(service = %service, target = %dep.target, "Unknown dependency");

                return Err(BootwireError::UnknownDependency(UnknownDependencyError {
                    service: service.clone(),
                    target: dep.target.clone(),
                    suggestions,
                }));
            }
        }

        debug_assert!(self.graph.is_consistent());
        self.frozen = true;
        info!(services = self.descriptors.len(), "Service registry frozen");
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The dependency graph. Read-only; only the registry mutates it.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Looks up a descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.descriptors.get(name)
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Required dependencies of `name`.
    pub fn dependencies_of(&self, name: &str) -> &BTreeSet<String> {
        self.graph.dependencies_of(name)
    }

    /// Services that require `name`.
    pub fn dependents_of(&self, name: &str) -> &BTreeSet<String> {
        self.graph.dependents_of(name)
    }

    /// Declared service names, sorted.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    /// Returns the number of declared services.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no services are declared.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(target: &str) -> Dependency {
        Dependency::required(target, target)
    }

    #[test]
    fn declare_and_lookup() {
        let mut reg = ServiceRegistry::new();
        reg.declare("database_client", Scope::Singleton, vec![]).unwrap();

        assert!(reg.has_service("database_client"));
        assert_eq!(
            reg.descriptor("database_client").map(|d| d.scope),
            Some(Scope::Singleton)
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn forward_reference_keeps_edges() {
        // Dependents declared before their dependencies.
        let mut reg = ServiceRegistry::new();
        reg.declare("user_service", Scope::Singleton, vec![req("user_repository")])
            .unwrap();
        reg.declare("user_repository", Scope::Singleton, vec![req("database_client")])
            .unwrap();
        reg.declare("database_client", Scope::Singleton, vec![]).unwrap();

        assert!(reg.dependents_of("user_repository").contains("user_service"));
        assert!(reg.dependents_of("database_client").contains("user_repository"));
        assert!(reg.dependencies_of("user_service").contains("user_repository"));
        assert!(reg.graph().is_consistent());
    }

    #[test]
    fn duplicate_leaves_state_unchanged() {
        let mut reg = ServiceRegistry::new();
        reg.declare("x", Scope::Singleton, vec![req("y")]).unwrap();
        let graph_before = reg.graph().clone();
        let desc_before = reg.descriptor("x").cloned();

        let err = reg
            .declare("x", Scope::Factory, vec![req("z")])
            .unwrap_err();

        assert!(matches!(err, BootwireError::DuplicateService(ref e) if e.name == "x"));
        assert_eq!(reg.graph(), &graph_before);
        assert_eq!(reg.descriptor("x").cloned(), desc_before);
        assert!(!reg.graph().contains("z"));
    }

    #[test]
    fn optional_dependencies_add_no_edges() {
        let mut reg = ServiceRegistry::new();
        reg.declare(
            "user_service",
            Scope::Singleton,
            vec![Dependency::optional("cache", "cache_service")],
        )
        .unwrap();

        assert!(reg.dependencies_of("user_service").is_empty());
        assert!(!reg.graph().contains("cache_service"));
        assert!(reg.freeze().is_ok());
    }

    #[test]
    fn freeze_rejects_unknown_required_target() {
        let mut reg = ServiceRegistry::new();
        reg.declare("database_client", Scope::Singleton, vec![]).unwrap();
        reg.declare("user_repository", Scope::Singleton, vec![req("database_clent")])
            .unwrap();

        match reg.freeze().unwrap_err() {
            BootwireError::UnknownDependency(e) => {
                assert_eq!(e.service, "user_repository");
                assert_eq!(e.target, "database_clent");
                assert_eq!(e.suggestions, vec!["database_client".to_string()]);
            }
            other => panic!("Expected UnknownDependency, got: {other:?}"),
        }
        assert!(!reg.is_frozen());

        // Still open: the missing service can be declared now.
        reg.declare("database_clent", Scope::Singleton, vec![]).unwrap();
        assert!(reg.freeze().is_ok());
    }

    #[test]
    fn declare_after_freeze_fails() {
        let mut reg = ServiceRegistry::new();
        reg.declare("a", Scope::Singleton, vec![]).unwrap();
        reg.freeze().unwrap();

        let err = reg.declare("b", Scope::Singleton, vec![]).unwrap_err();
        assert!(matches!(err, BootwireError::RegistryFrozen { ref name } if name == "b"));
        assert!(!reg.has_service("b"));

        // Second freeze is a no-op.
        assert!(reg.freeze().is_ok());
    }

    #[test]
    fn declare_descriptor_keeps_config() {
        let mut reg = ServiceRegistry::new();
        reg.declare_descriptor(
            ServiceDescriptor::new("mailer", Scope::Singleton, vec![])
                .with_config("host", serde_json::json!("smtp.local")),
        )
        .unwrap();

        let desc = reg.descriptor("mailer").unwrap();
        assert_eq!(desc.config["host"], "smtp.local");
    }
}
