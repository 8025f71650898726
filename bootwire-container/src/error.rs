//! Error types for Bootwire registration, resolution, build and lookup.
//!
//! Every error carries the offending service name, the cycle path or the
//! missing target, plus a hint on how to fix it.

use std::collections::BTreeMap;
use std::fmt;

use bootwire_support::rendering::render_chain;

/// Boxed cause returned by service constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Bootwire operations.
#[derive(Debug, thiserror::Error)]
pub enum BootwireError {
    /// The same service name was declared twice.
    #[error("{}", .0)]
    DuplicateService(DuplicateServiceError),

    /// `declare` was called after the registry was frozen.
    #[error("Cannot declare {name:?}: the service registry is frozen")]
    RegistryFrozen { name: String },

    /// A required dependency points at a service that was never declared.
    #[error("{}", .0)]
    UnknownDependency(UnknownDependencyError),

    /// Topological resolution could not order every service.
    #[error("{}", .0)]
    Cycle(CycleError),

    /// A service constructor failed during build or lookup.
    #[error("Failed to construct {service:?}: {source}")]
    Construction {
        service: String,
        #[source]
        source: BoxError,
    },

    /// The initialization order did not match the graph. This is a bug in
    /// the registry/resolver interaction, not a configuration error.
    #[error("Internal ordering error at {service:?}: {detail}")]
    InternalOrder { service: String, detail: String },

    /// A service re-entered its own construction chain.
    #[error("{}", .0)]
    RuntimeCycle(RuntimeCycleError),

    /// Lookup of a name with no descriptor.
    #[error("{}", .0)]
    NotFound(NotFoundError),

    /// A typed lookup found an instance of a different type.
    #[error("Service {name:?} is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// The resolver or builder was handed a registry that is still open.
    #[error("Service registry must be frozen before it is ordered or built")]
    NotFrozen,
}

impl BootwireError {
    /// Name of the service the error is about, when there is one.
    pub fn service_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateService(e) => Some(&e.name),
            Self::RegistryFrozen { name } => Some(name),
            Self::UnknownDependency(e) => Some(&e.service),
            Self::Cycle(e) => e.cycle.first().map(String::as_str),
            Self::Construction { service, .. } => Some(service),
            Self::InternalOrder { service, .. } => Some(service),
            Self::RuntimeCycle(e) => e.chain.first().map(String::as_str),
            Self::NotFound(e) => Some(&e.name),
            Self::TypeMismatch { name, .. } => Some(name),
            Self::NotFrozen => None,
        }
    }
}

/// Error when a service name is declared twice.
#[derive(Debug)]
pub struct DuplicateServiceError {
    pub name: String,
}

impl fmt::Display for DuplicateServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already declared: {:?}", self.name)?;
        write!(
            f,
            "\n  Hint: Service names must be unique; rename one of the declarations"
        )
    }
}

/// Error when a required dependency target was never declared.
#[derive(Debug)]
pub struct UnknownDependencyError {
    /// The service declaring the dependency
    pub service: String,
    /// The missing target
    pub target: String,
    /// Declared names close to `target`
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnknownDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown dependency: {:?} requires {:?}, which was never declared",
            self.service, self.target
        )?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Declare {:?} or mark the dependency as optional",
            self.target
        )
    }
}

/// Error when topological resolution cannot order every service.
///
/// Shows one concrete cycle so you can see WHERE the problem is, plus the
/// full unresolved set for diagnosis.
#[derive(Debug)]
pub struct CycleError {
    /// One cycle among the unresolved services, closed on its first name.
    /// Example: `["a", "b", "a"]`
    pub cycle: Vec<String>,
    /// Every service that could not be ordered, sorted.
    pub remaining: Vec<String>,
    /// Unsatisfied in-degree of each remaining service when resolution stopped.
    pub indegrees: BTreeMap<String, usize>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  ")?;
        write!(f, "{}", render_chain(&self.cycle))?;

        write!(f, "\n  Unresolved services: {}", self.remaining.join(", "))?;

        write!(
            f,
            "\n  Hint: Break the cycle by making one of these dependencies optional or restructuring the services"
        )
    }
}

/// Error when construction re-enters a service already being built.
#[derive(Debug)]
pub struct RuntimeCycleError {
    /// The construction stack, closed on the re-entered name.
    pub chain: Vec<String>,
}

impl fmt::Display for RuntimeCycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Construction re-entered itself:\n  ")?;
        write!(f, "{}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: Optional dependencies still need an acyclic construction chain"
        )
    }
}

/// Error when a lookup names no registered service.
#[derive(Debug)]
pub struct NotFoundError {
    /// The name that was requested
    pub name: String,
    /// Registered names close to the requested one
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not found: {:?}", self.name)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// Convenient Result type for Bootwire operations.
pub type Result<T> = std::result::Result<T, BootwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_service_display() {
        let err = BootwireError::DuplicateService(DuplicateServiceError {
            name: "user_service".into(),
        });

        let msg = format!("{err}");
        assert!(msg.contains("already declared"));
        assert!(msg.contains("user_service"));
        assert_eq!(err.service_name(), Some("user_service"));
    }

    #[test]
    fn unknown_dependency_display() {
        let err = BootwireError::UnknownDependency(UnknownDependencyError {
            service: "user_repository".into(),
            target: "database_clent".into(),
            suggestions: vec!["database_client".into()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("user_repository"));
        assert!(msg.contains("database_clent"));
        assert!(msg.contains("- database_client"));
    }

    #[test]
    fn cycle_error_display() {
        let err = BootwireError::Cycle(CycleError {
            cycle: vec!["a".into(), "b".into(), "a".into()],
            remaining: vec!["a".into(), "b".into(), "c".into()],
            indegrees: BTreeMap::from([
                ("a".into(), 1),
                ("b".into(), 1),
                ("c".into(), 1),
            ]),
        });

        let msg = format!("{err}");
        assert!(msg.contains("Circular"));
        assert!(msg.contains("a → b → a"));
        assert!(msg.contains("a, b, c"));
    }

    #[test]
    fn construction_error_keeps_source() {
        use std::error::Error as _;

        let err = BootwireError::Construction {
            service: "mailer".into(),
            source: "smtp host missing".into(),
        };

        assert!(format!("{err}").contains("smtp host missing"));
        assert!(err.source().is_some());
    }

    #[test]
    fn runtime_cycle_display() {
        let err = BootwireError::RuntimeCycle(RuntimeCycleError {
            chain: vec!["a".into(), "b".into(), "a".into()],
        });

        assert!(format!("{err}").contains("a → b → a"));
        assert_eq!(err.service_name(), Some("a"));
    }
}
