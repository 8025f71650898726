//! Container settings.
//!
//! Loading is the host's job; [`ContainerSettings`] only has to deserialize
//! from whatever format the host reads (TOML, JSON, environment).

use serde::Deserialize;

/// When singletons are constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SingletonInit {
    /// Every singleton is built during `build`, in initialization order.
    #[default]
    Eager,
    /// Singletons are built on first use and then shared. Concurrent first
    /// lookups construct the instance exactly once.
    Lazy,
}

/// Options for [`ContainerBuilder`](crate::builder::ContainerBuilder).
///
/// ```
/// use bootwire_container::settings::{ContainerSettings, SingletonInit};
///
/// let settings: ContainerSettings =
///     serde_json::from_str(r#"{"singleton_init": "lazy"}"#).unwrap();
/// assert_eq!(settings.singleton_init, SingletonInit::Lazy);
/// assert!(settings.warn_unresolved_optional);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    pub singleton_init: SingletonInit,
    /// Log a warning when an optional dependency names a service that was
    /// never declared.
    pub warn_unresolved_optional: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            singleton_init: SingletonInit::Eager,
            warn_unresolved_optional: true,
        }
    }
}

impl ContainerSettings {
    /// Settings with lazy singletons.
    pub fn lazy() -> Self {
        Self {
            singleton_init: SingletonInit::Lazy,
            ..Self::default()
        }
    }
}
