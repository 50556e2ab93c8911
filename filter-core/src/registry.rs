//! Extension registry for filters.
//!
//! Discovery code calls [`FilterRegistry::register`] once per filter
//! implementation it finds. The registry keeps every extension under its
//! alias and, for extensions that declare [`AutoActive`] flags, also in the
//! provider and/or consumer activation index. Registrations and lookups may
//! interleave from any thread; a lookup racing a registration sees the index
//! either before or after it.

use crate::config::Role;
use crate::error::{ConstructionError, FilterResult};
use crate::filter::Filter;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces filter instances for an extension.
pub type FilterFactory = Arc<dyn Fn() -> FilterResult<Arc<dyn Filter>> + Send + Sync>;

/// Roles for which an extension joins chains without being named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoActive {
    /// Active by default on the provider side
    pub provider_side: bool,
    /// Active by default on the consumer side
    pub consumer_side: bool,
}

impl AutoActive {
    /// Active on the provider side only.
    pub fn provider() -> Self {
        Self {
            provider_side: true,
            consumer_side: false,
        }
    }

    /// Active on the consumer side only.
    pub fn consumer() -> Self {
        Self {
            provider_side: false,
            consumer_side: true,
        }
    }

    /// Active on both sides.
    pub fn both() -> Self {
        Self {
            provider_side: true,
            consumer_side: true,
        }
    }

    /// Whether the flags cover `role`.
    pub fn covers(&self, role: Role) -> bool {
        match role {
            Role::Provider => self.provider_side,
            Role::Consumer => self.consumer_side,
        }
    }
}

/// A registered filter implementation and its metadata.
pub struct FilterExtension {
    alias: String,
    order: i32,
    auto_active: Option<AutoActive>,
    singleton: bool,
    factory: FilterFactory,
    instance: Mutex<Option<Arc<dyn Filter>>>,
}

impl FilterExtension {
    /// Describe an extension whose instances come from `factory`.
    ///
    /// Extensions are singletons with order 0 and no auto-activation until
    /// configured otherwise.
    pub fn new<F>(alias: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> FilterResult<Arc<dyn Filter>> + Send + Sync + 'static,
    {
        Self {
            alias: alias.into(),
            order: 0,
            auto_active: None,
            singleton: true,
            factory: Arc::new(factory),
            instance: Mutex::new(None),
        }
    }

    /// Describe an extension backed by an existing instance.
    pub fn from_instance(alias: impl Into<String>, filter: Arc<dyn Filter>) -> Self {
        let extension = Self::new(alias, {
            let filter = filter.clone();
            move || Ok(filter.clone())
        });
        *extension.instance.lock() = Some(filter);
        extension
    }

    /// Set the sort order (lower runs earlier).
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Declare the roles this extension auto-activates for.
    pub fn with_auto_active(mut self, auto_active: AutoActive) -> Self {
        self.auto_active = Some(auto_active);
        self
    }

    /// Create a fresh instance for every chain instead of sharing one.
    pub fn prototype(mut self) -> Self {
        self.singleton = false;
        self
    }

    /// Alias the extension is registered under.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Sort order.
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Auto-activation flags, if any.
    pub fn auto_active(&self) -> Option<AutoActive> {
        self.auto_active
    }

    /// Whether one instance is shared by every chain.
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Get the filter instance for a new chain.
    ///
    /// Singletons are created on first use and cached; a failed creation is
    /// not cached, so the next chain build tries again.
    pub fn instance(&self) -> Result<Arc<dyn Filter>, ConstructionError> {
        if !self.singleton {
            return self.create();
        }

        let mut cached = self.instance.lock();
        if let Some(filter) = cached.as_ref() {
            return Ok(filter.clone());
        }
        let filter = self.create()?;
        *cached = Some(filter.clone());
        Ok(filter)
    }

    fn create(&self) -> Result<Arc<dyn Filter>, ConstructionError> {
        (self.factory)().map_err(|e| ConstructionError::instantiate(&self.alias, e.to_string()))
    }
}

impl fmt::Debug for FilterExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterExtension")
            .field("alias", &self.alias)
            .field("order", &self.order)
            .field("auto_active", &self.auto_active)
            .field("singleton", &self.singleton)
            .finish()
    }
}

/// Insertion-ordered alias -> extension map.
///
/// Re-inserting an alias replaces the extension but keeps its position.
#[derive(Debug, Default)]
pub struct ActivationIndex {
    aliases: Vec<String>,
    entries: HashMap<String, Arc<FilterExtension>>,
}

impl ActivationIndex {
    /// Insert or replace; returns the replaced extension.
    pub fn insert(&mut self, extension: Arc<FilterExtension>) -> Option<Arc<FilterExtension>> {
        let alias = extension.alias().to_string();
        let previous = self.entries.insert(alias.clone(), extension);
        if previous.is_none() {
            self.aliases.push(alias);
        }
        previous
    }

    /// Remove by alias; returns the removed extension.
    pub fn remove(&mut self, alias: &str) -> Option<Arc<FilterExtension>> {
        let removed = self.entries.remove(alias)?;
        self.aliases.retain(|existing| existing != alias);
        Some(removed)
    }

    /// Look up by alias.
    pub fn get(&self, alias: &str) -> Option<&Arc<FilterExtension>> {
        self.entries.get(alias)
    }

    /// Extensions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FilterExtension>> {
        self.aliases.iter().filter_map(|alias| self.entries.get(alias))
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Role-partitioned registry of filter extensions.
#[derive(Debug, Default)]
pub struct FilterRegistry {
    all: RwLock<ActivationIndex>,
    provider_auto_actives: RwLock<ActivationIndex>,
    consumer_auto_actives: RwLock<ActivationIndex>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration callback for discovery.
    ///
    /// Makes the extension resolvable by alias and, per its [`AutoActive`]
    /// flags, adds it to the provider and/or consumer activation index.
    pub fn register(&self, extension: FilterExtension) -> Arc<FilterExtension> {
        let extension = Arc::new(extension);
        let alias = extension.alias().to_string();

        if let Some(previous) = self.all.write().insert(extension.clone()) {
            warn!(
                "Filter alias '{}' re-registered, replacing {:?}",
                alias, previous
            );
        }

        let auto_active = extension.auto_active().unwrap_or_default();
        for role in [Role::Provider, Role::Consumer] {
            let mut index = self.index(role).write();
            if auto_active.covers(role) {
                index.insert(extension.clone());
            } else {
                // a replacement may drop an earlier activation
                index.remove(&alias);
            }
        }

        if let Some(auto_active) = extension.auto_active() {
            debug!(
                "Filter extension '{}' (order {}) will auto active for {:?}",
                alias,
                extension.order(),
                auto_active
            );
        }

        extension
    }

    /// Look up any registered extension by alias.
    pub fn get(&self, alias: &str) -> Option<Arc<FilterExtension>> {
        self.all.read().get(alias).cloned()
    }

    /// Snapshot of the auto-active extensions of `role`, in registration order.
    pub fn auto_actives(&self, role: Role) -> Vec<Arc<FilterExtension>> {
        self.index(role).read().iter().cloned().collect()
    }

    /// Aliases auto-active for `role`, in registration order.
    pub fn auto_active_aliases(&self, role: Role) -> Vec<String> {
        self.index(role)
            .read()
            .iter()
            .map(|extension| extension.alias().to_string())
            .collect()
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.all.read().len()
    }

    /// Whether nothing is registered yet.
    pub fn is_empty(&self) -> bool {
        self.all.read().is_empty()
    }

    fn index(&self, role: Role) -> &RwLock<ActivationIndex> {
        match role {
            Role::Provider => &self.provider_auto_actives,
            Role::Consumer => &self.consumer_auto_actives,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FilterError, RpcResult};
    use crate::invoker::FilterInvoker;
    use crate::messages::{RpcRequest, RpcResponse};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop(&'static str);

    #[async_trait]
    impl Filter for Noop {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(&self, next: &FilterInvoker, request: RpcRequest) -> RpcResult<RpcResponse> {
            crate::filter::Invoker::invoke(next, request).await
        }
    }

    fn counting(alias: &'static str, counter: Arc<AtomicUsize>) -> FilterExtension {
        FilterExtension::new(alias, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Noop(alias)) as Arc<dyn Filter>)
        })
    }

    #[test]
    fn test_register_splits_by_role() {
        let registry = FilterRegistry::new();
        registry.register(
            FilterExtension::from_instance("both", Arc::new(Noop("both")))
                .with_auto_active(AutoActive::both()),
        );
        registry.register(
            FilterExtension::from_instance("prov", Arc::new(Noop("prov")))
                .with_auto_active(AutoActive::provider()),
        );
        registry.register(
            FilterExtension::from_instance("cons", Arc::new(Noop("cons")))
                .with_auto_active(AutoActive::consumer()),
        );
        registry.register(FilterExtension::from_instance("manual", Arc::new(Noop("manual"))));

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.auto_active_aliases(Role::Provider), vec!["both", "prov"]);
        assert_eq!(registry.auto_active_aliases(Role::Consumer), vec!["both", "cons"]);
        assert!(registry.get("manual").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_reregistration_keeps_position() {
        let registry = FilterRegistry::new();
        for alias in ["a", "b"] {
            registry.register(
                FilterExtension::from_instance(alias, Arc::new(Noop("x")))
                    .with_auto_active(AutoActive::consumer()),
            );
        }
        registry.register(
            FilterExtension::from_instance("a", Arc::new(Noop("x")))
                .with_order(7)
                .with_auto_active(AutoActive::consumer()),
        );

        let actives = registry.auto_actives(Role::Consumer);
        assert_eq!(actives.len(), 2);
        assert_eq!(actives[0].alias(), "a");
        assert_eq!(actives[0].order(), 7);
        assert_eq!(actives[1].alias(), "b");
    }

    #[test]
    fn test_reregistration_can_drop_activation() {
        let registry = FilterRegistry::new();
        registry.register(
            FilterExtension::from_instance("a", Arc::new(Noop("a")))
                .with_auto_active(AutoActive::both()),
        );
        registry.register(
            FilterExtension::from_instance("a", Arc::new(Noop("a")))
                .with_auto_active(AutoActive::provider()),
        );

        assert_eq!(registry.auto_active_aliases(Role::Provider), vec!["a"]);
        assert!(registry.auto_active_aliases(Role::Consumer).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_singleton_instance_is_cached() {
        let counter = Arc::new(AtomicUsize::new(0));
        let extension = counting("s", counter.clone());

        let first = extension.instance().unwrap();
        let second = extension.instance().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prototype_creates_fresh_instances() {
        let counter = Arc::new(AtomicUsize::new(0));
        let extension = counting("p", counter.clone()).prototype();

        let first = extension.instance().unwrap();
        let second = extension.instance().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!extension.is_singleton());
    }

    #[test]
    fn test_factory_failure_is_construction_error() {
        let extension = FilterExtension::new("broken", || Err(FilterError::internal("no key")));

        assert_matches!(
            extension.instance().err(),
            Some(ConstructionError::Instantiate { alias, reason })
                if alias == "broken" && reason.contains("no key")
        );
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(FilterRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.register(
                        FilterExtension::from_instance(format!("f{i}"), Arc::new(Noop("x")))
                            .with_auto_active(AutoActive::provider()),
                    );
                    registry.auto_actives(Role::Provider).len()
                })
            })
            .collect();

        for handle in handles {
            let seen = handle.join().unwrap();
            assert!((1..=8).contains(&seen));
        }
        assert_eq!(registry.auto_actives(Role::Provider).len(), 8);
    }
}
