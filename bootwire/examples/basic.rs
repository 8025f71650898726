//! Basic example of the Bootwire DI runtime.
//!
//! Run with `RUST_LOG=bootwire_container=debug` to see the initialization plan.

use std::sync::Arc;

use bootwire::prelude::*;

// === Define your services ===

struct Config {
    database_url: String,
}

struct DatabaseClient {
    url: String,
}

impl DatabaseClient {
    fn query(&self, sql: &str) -> String {
        format!("{sql} -> results from {}", self.url)
    }
}

struct UserRepository {
    db: Arc<DatabaseClient>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

struct CacheService;

struct UserService {
    repo: Arc<UserRepository>,
    cache: Option<Arc<CacheService>>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        let source = if self.cache.is_some() { "cache" } else { "db" };
        format!("[{source}] {}", self.repo.find_user(id))
    }
}

/// A request-scoped unit of work.
struct UnitOfWork {
    id: u32,
}

struct PersistenceProvider;

impl Provider for PersistenceProvider {
    fn register(&self, registry: &mut dyn ProviderRegistry) {
        registry.register_singleton(
            "database_client",
            vec![Dependency::required("config", "config")],
            constructor(|inj| {
                let config: Arc<Config> = inj.required("config")?;
                Ok(DatabaseClient { url: config.database_url.clone() })
            }),
        );
        registry.register_singleton(
            "user_repository",
            vec![Dependency::required("db", "database_client")],
            constructor(|inj| Ok(UserRepository { db: inj.required("db")? })),
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bootwire_container=info".into()),
        )
        .init();

    let next_id = Arc::new(std::sync::atomic::AtomicU32::new(1));

    // Dependents first: declaration order does not matter.
    let locator = ServiceCatalog::new()
        .singleton(
            "user_service",
            [
                Dependency::required("repo", "user_repository"),
                Dependency::optional("cache", "cache_service"),
            ],
            |inj| {
                Ok(UserService {
                    repo: inj.required("repo")?,
                    cache: inj.optional("cache")?,
                })
            },
        )
        .add_provider(&PersistenceProvider)
        .singleton("config", [], |_| {
            Ok(Config { database_url: "postgres://localhost/myapp".to_string() })
        })
        .factory("unit_of_work", [], move |_| {
            Ok(UnitOfWork { id: next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst) })
        })
        .bootstrap()?;

    println!("Container built: {locator:?}");
    println!("{}", locator.initialization_order().join(" -> "));

    let service: Arc<UserService> = locator.get_as("user_service")?;
    println!("{}", service.get_user(42));

    let first: Arc<UnitOfWork> = locator.get_as("unit_of_work")?;
    let second: Arc<UnitOfWork> = locator.get_as("unit_of_work")?;
    println!("units of work: {} and {}", first.id, second.id);

    match locator.get("user_servise") {
        Err(BootwireError::NotFound(e)) => println!("{e}"),
        other => println!("unexpected: {:?}", other.map(|_| ())),
    }

    Ok(())
}
