//! # Bootstrap: the whole pipeline in one call
//!
//! ```text
//! DependencyExtractor ──declare──> ServiceRegistry ──freeze──> DependencyGraph
//!                                                                   │
//!                                                            compute_order()
//!                                                                   │
//!                                                                   ▼
//! ServiceLocator <──build── ContainerBuilder <────────── InitializationOrder
//! ```
//!
//! Any error along the way is terminal: no locator is returned, and the
//! application must not start serving.
//!
//! # Examples
//! ```rust
//! use bootwire_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct DatabaseClient {
//!     url: String,
//! }
//!
//! struct UserRepository {
//!     db: Arc<DatabaseClient>,
//! }
//!
//! let locator = ServiceCatalog::new()
//!     .singleton("database_client", [], |_| {
//!         Ok(DatabaseClient { url: "postgres://localhost".into() })
//!     })
//!     .singleton(
//!         "user_repository",
//!         [Dependency::required("db", "database_client")],
//!         |inj| Ok(UserRepository { db: inj.required("db")? }),
//!     )
//!     .bootstrap()
//!     .expect("Failed to bootstrap container");
//!
//! let repo: Arc<UserRepository> = locator.get_as("user_repository").unwrap();
//! assert_eq!(repo.db.url, "postgres://localhost");
//! ```

use tracing::{info, instrument};

use crate::builder::ContainerBuilder;
use crate::error::Result;
use crate::extractor::{DependencyExtractor, ServiceCatalog};
use crate::locator::ServiceLocator;
use crate::registry::ServiceRegistry;
use crate::resolver::compute_order;
use crate::settings::ContainerSettings;

/// Registers, freezes, orders and builds everything `extractor` declares.
///
/// # Errors
/// The first error of any stage: duplicate or unknown services, a cycle,
/// or a construction failure.
#[instrument(skip_all, name = "bootstrap")]
pub fn bootstrap(
    extractor: &dyn DependencyExtractor,
    settings: &ContainerSettings,
) -> Result<ServiceLocator> {
    let mut registry = ServiceRegistry::new();
    for descriptor in extractor.descriptors() {
        registry.declare_descriptor(descriptor)?;
    }
    registry.freeze()?;

    let order = compute_order(&registry)?;
    info!(services = order.len(), "Initialization order computed");

    ContainerBuilder::new(settings.clone()).build(&order, &registry, extractor)
}

impl ServiceCatalog {
    /// Bootstraps the catalog with default settings.
    pub fn bootstrap(&self) -> Result<ServiceLocator> {
        bootstrap(self, &ContainerSettings::default())
    }

    pub fn bootstrap_with(&self, settings: &ContainerSettings) -> Result<ServiceLocator> {
        bootstrap(self, settings)
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::bootstrap;
    pub use crate::builder::ContainerBuilder;
    pub use crate::descriptor::{Dependency, ServiceDescriptor, service_name_of};
    pub use crate::error::{BootwireError, BoxError, Result};
    pub use crate::extractor::{
        ConstructorFn, DependencyExtractor, Injected, Instance, ServiceCatalog, constructor,
    };
    pub use crate::locator::ServiceLocator;
    pub use crate::provider::{Provider, ProviderRegistration, ProviderRegistry};
    pub use crate::registry::ServiceRegistry;
    pub use crate::resolver::{InitializationOrder, compute_order};
    pub use crate::scope::Scope;
    pub use crate::settings::{ContainerSettings, SingletonInit};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("bootwire_container=debug")
            .with_test_writer()
            .try_init();
    }

    struct DatabaseClient;

    struct UserRepository {
        db: Arc<DatabaseClient>,
    }

    struct CacheService;

    struct UserService {
        repo: Arc<UserRepository>,
        cache: Option<Arc<CacheService>>,
    }

    /// Catalog with dependents declared before their dependencies.
    fn user_catalog(log: &Arc<Mutex<Vec<&'static str>>>) -> ServiceCatalog {
        ServiceCatalog::new()
            .singleton(
                "UserService",
                [
                    Dependency::required("repo", "UserRepository"),
                    Dependency::optional("cache", "CacheService"),
                ],
                {
                    let log = log.clone();
                    move |inj| {
                        log.lock().push("UserService");
                        Ok(UserService {
                            repo: inj.required("repo")?,
                            cache: inj.optional("cache")?,
                        })
                    }
                },
            )
            .singleton(
                "UserRepository",
                [Dependency::required("db", "DatabaseClient")],
                {
                    let log = log.clone();
                    move |inj| {
                        log.lock().push("UserRepository");
                        Ok(UserRepository { db: inj.required("db")? })
                    }
                },
            )
            .singleton("DatabaseClient", [], {
                let log = log.clone();
                move |_| {
                    log.lock().push("DatabaseClient");
                    Ok(DatabaseClient)
                }
            })
    }

    #[test]
    fn dependents_declared_first_still_build_in_order() {
        init_tracing();
        let log = Arc::new(Mutex::new(Vec::new()));

        let locator = user_catalog(&log).bootstrap().unwrap();

        assert_eq!(
            locator.initialization_order().as_slice(),
            ["DatabaseClient", "UserRepository", "UserService"]
        );
        assert_eq!(
            *log.lock(),
            vec!["DatabaseClient", "UserRepository", "UserService"]
        );

        let service: Arc<UserService> = locator.get_as("UserService").unwrap();
        let repo: Arc<UserRepository> = locator.get_as("UserRepository").unwrap();
        let db: Arc<DatabaseClient> = locator.get_as("DatabaseClient").unwrap();
        assert!(Arc::ptr_eq(&service.repo, &repo));
        assert!(Arc::ptr_eq(&repo.db, &db));
    }

    #[test]
    fn unmet_optional_dependency_injects_none() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let locator = user_catalog(&log).bootstrap().unwrap();

        let service: Arc<UserService> = locator.get_as("UserService").unwrap();
        assert!(service.cache.is_none());
        assert!(!locator.has_service("CacheService"));
        assert!(locator.try_get("CacheService").unwrap().is_none());
    }

    #[test]
    fn declared_optional_dependency_is_injected() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let locator = user_catalog(&log)
            .singleton("CacheService", [], |_| Ok(CacheService))
            .bootstrap()
            .unwrap();

        let service: Arc<UserService> = locator.get_as("UserService").unwrap();
        let cache: Arc<CacheService> = locator.get_as("CacheService").unwrap();
        assert!(Arc::ptr_eq(service.cache.as_ref().unwrap(), &cache));
    }

    #[test]
    fn optional_only_service_resolves_without_target() {
        let locator = ServiceCatalog::new()
            .singleton("A", [Dependency::optional("b", "B")], |inj| {
                Ok(inj.instance("b").is_none())
            })
            .bootstrap()
            .unwrap();

        assert!(*locator.get_as::<bool>("A").unwrap());
    }

    #[test]
    fn mutual_dependency_is_a_cycle() {
        let result = ServiceCatalog::new()
            .singleton("A", [Dependency::required("b", "B")], |_| Ok(()))
            .singleton("B", [Dependency::required("a", "A")], |_| Ok(()))
            .bootstrap();

        match result.unwrap_err() {
            BootwireError::Cycle(err) => {
                assert_eq!(err.remaining, vec!["A", "B"]);
                assert!(err.cycle.contains(&"A".to_string()));
                assert!(err.cycle.contains(&"B".to_string()));
            }
            other => panic!("Expected Cycle, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_declaration_fails_startup() {
        let result = ServiceCatalog::new()
            .singleton("X", [], |_| Ok(1u8))
            .singleton("X", [], |_| Ok(2u8))
            .bootstrap();

        assert!(matches!(result, Err(BootwireError::DuplicateService(ref e)) if e.name == "X"));
    }

    #[test]
    fn unknown_required_target_fails_startup() {
        let result = ServiceCatalog::new()
            .singleton("repo", [Dependency::required("db", "database")], |_| Ok(()))
            .bootstrap();

        match result.unwrap_err() {
            BootwireError::UnknownDependency(e) => {
                assert_eq!(e.service, "repo");
                assert_eq!(e.target, "database");
            }
            other => panic!("Expected UnknownDependency, got: {other:?}"),
        }
    }

    #[test]
    fn construction_failure_aborts_whole_build() {
        let later = Arc::new(AtomicU32::new(0));

        let result = ServiceCatalog::new()
            .singleton("a_broken", [], |_| -> std::result::Result<(), BoxError> {
                Err("connection refused".into())
            })
            .singleton("b_after", [], {
                let later = later.clone();
                move |_| {
                    later.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .bootstrap();

        match result.unwrap_err() {
            BootwireError::Construction { service, source } => {
                assert_eq!(service, "a_broken");
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("Expected Construction, got: {other:?}"),
        }
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn singleton_constructed_once_per_build() {
        let built = Arc::new(AtomicU32::new(0));
        let mut catalog = ServiceCatalog::new().singleton("db", [], {
            let built = built.clone();
            move |_| {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(DatabaseClient)
            }
        });
        for consumer in ["orders", "users", "billing"] {
            catalog = catalog.singleton(consumer, [Dependency::required("db", "db")], |inj| {
                inj.required::<DatabaseClient>("db").map_err(Into::into)
            });
        }

        let first = catalog.bootstrap().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        let shared: Arc<DatabaseClient> = first.get_as("db").unwrap();
        for consumer in ["orders", "users", "billing"] {
            let held: Arc<Arc<DatabaseClient>> = first.get_as(consumer).unwrap();
            assert!(Arc::ptr_eq(held.as_ref(), &shared));
        }

        // Rebuilding from the same catalog builds it once more, not per dependent.
        let second = catalog.bootstrap().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(
            first.initialization_order(),
            second.initialization_order()
        );
    }

    #[test]
    fn factory_gives_distinct_instances() {
        struct UnitOfWork;

        let locator = ServiceCatalog::new()
            .factory("unit_of_work", [], |_| Ok(UnitOfWork))
            .bootstrap()
            .unwrap();

        let a = locator.get("unit_of_work").unwrap();
        let b = locator.get("unit_of_work").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(locator.scope_of("unit_of_work"), Some(Scope::Factory));
    }

    #[test]
    fn singleton_dependents_of_factory_each_get_their_own() {
        struct UnitOfWork(u32);
        struct Holder(Arc<UnitOfWork>);

        let counter = Arc::new(AtomicU32::new(0));
        let locator = ServiceCatalog::new()
            .factory("unit_of_work", [], {
                let counter = counter.clone();
                move |_| Ok(UnitOfWork(counter.fetch_add(1, Ordering::SeqCst)))
            })
            .singleton("left", [Dependency::required("uow", "unit_of_work")], |inj| {
                Ok(Holder(inj.required("uow")?))
            })
            .singleton("right", [Dependency::required("uow", "unit_of_work")], |inj| {
                Ok(Holder(inj.required("uow")?))
            })
            .bootstrap()
            .unwrap();

        let left: Arc<Holder> = locator.get_as("left").unwrap();
        let right: Arc<Holder> = locator.get_as("right").unwrap();
        assert_ne!(left.0.0, right.0.0);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        // Looking up a singleton never rebuilds its factory dependency.
        let _ = locator.get("left").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn factory_of_factory_is_fresh_each_time() {
        let counter = Arc::new(AtomicU32::new(0));
        let locator = ServiceCatalog::new()
            .factory("id", [], {
                let counter = counter.clone();
                move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))
            })
            .factory("request", [Dependency::required("id", "id")], |inj| {
                Ok(*inj.required::<u32>("id")?)
            })
            .bootstrap()
            .unwrap();

        let first = *locator.get_as::<u32>("request").unwrap();
        let second = *locator.get_as::<u32>("request").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn per_service_config_reaches_constructor() {
        let locator = ServiceCatalog::new()
            .define(
                ServiceDescriptor::new("mailer", Scope::Singleton, vec![])
                    .with_config("host", serde_json::json!("smtp.local")),
                constructor(|inj| Ok(inj.config::<String>("host")?.unwrap_or_default())),
            )
            .bootstrap()
            .unwrap();

        assert_eq!(locator.get_as::<String>("mailer").unwrap().as_str(), "smtp.local");
    }

    #[test]
    fn lazy_singleton_built_once_under_contention() {
        init_tracing();
        let built = Arc::new(AtomicU32::new(0));
        let locator = ServiceCatalog::new()
            .singleton("pool", [], {
                let built = built.clone();
                move |_| {
                    built.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    Ok(DatabaseClient)
                }
            })
            .bootstrap_with(&ContainerSettings::lazy())
            .unwrap();

        let seen: Vec<Arc<DatabaseClient>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| locator.get_as::<DatabaseClient>("pool").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(seen.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn concurrent_lookups_share_eager_singletons() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let locator = Arc::new(user_catalog(&log).bootstrap().unwrap());

        std::thread::scope(|s| {
            for _ in 0..4 {
                let locator = locator.clone();
                s.spawn(move || {
                    for _ in 0..100 {
                        locator.get("UserService").unwrap();
                    }
                });
            }
        });

        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn all_singletons_listed_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let locator = user_catalog(&log)
            .factory("request_id", [], |_| Ok(0u64))
            .bootstrap()
            .unwrap();

        let names: Vec<&str> = locator.singletons().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["DatabaseClient", "UserRepository", "UserService"]);
        assert_eq!(locator.len(), 4);
    }

    #[test]
    fn conventional_names_wire_up() {
        let locator = ServiceCatalog::new()
            .singleton(service_name_of::<DatabaseClient>(), [], |_| Ok(DatabaseClient))
            .bootstrap()
            .unwrap();

        assert!(locator.has_service("database_client"));
    }
}
