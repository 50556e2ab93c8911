//! Selection of the filters that make up a chain.
//!
//! Three inputs decide which filters run and in which order:
//!
//! 1. extensions auto-active for the role,
//! 2. the alias directives of the service (`name` to include, `-name` or
//!    `!name` to exclude, `*` / `default` with or without a prefix to drop
//!    every auto-active one),
//! 3. custom filter instances, possibly exclusion markers.
//!
//! Extension filters are stably sorted by order; custom filters follow them
//! in their original order. For example, with auto-actives `A(a)`, `B(b)`,
//! `C(c)`, directives `[-a, d]` and custom `[E, Exclude(b)]` the result is
//! `C, D, E` (C and D sorted by order).

use crate::config::{InterfaceConfig, Role};
use crate::error::ConstructionError;
use crate::filter::{strip_exclude_prefix, Filter, FilterRef, ALL, DEFAULT};
use crate::registry::{FilterExtension, FilterRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Select the filters of `config` for `role`.
pub fn select_for(
    config: &InterfaceConfig,
    registry: &FilterRegistry,
    role: Role,
) -> Result<Vec<Arc<dyn Filter>>, ConstructionError> {
    select_actual_filters(&config.filter_ref, &config.filter, registry, role)
}

/// Merge auto-active extensions, alias directives and custom instances into
/// the ordered list of filters for one chain.
///
/// Unknown aliases are skipped. Any instantiation failure aborts the
/// selection.
pub fn select_actual_filters(
    custom_filters: &[FilterRef],
    aliases: &[String],
    registry: &FilterRegistry,
    role: Role,
) -> Result<Vec<Arc<dyn Filter>>, ConstructionError> {
    let (custom_filters, mut excludes) = parse_exclude_filters(custom_filters);

    let mut extensions: Vec<Arc<FilterExtension>> = Vec::new();
    for alias in aliases.iter().map(|alias| alias.trim()) {
        if alias.is_empty() {
            continue;
        }
        if let Some(excluded) = strip_exclude_prefix(alias) {
            excludes.insert(excluded.to_string());
        } else if alias == ALL || alias == DEFAULT {
            // a bare sentinel suppresses auto-actives just like `-default`
            excludes.insert(alias.to_string());
        } else if let Some(extension) = registry.get(alias) {
            extensions.push(extension);
        } else {
            debug!("Filter alias '{}' is not registered, skipping", alias);
        }
    }

    // an excluded alias never runs, even when it was also listed explicitly
    extensions.retain(|extension| !excludes.contains(extension.alias()));

    if !excludes.contains(ALL) && !excludes.contains(DEFAULT) {
        extensions.extend(
            registry
                .auto_actives(role)
                .into_iter()
                .filter(|extension| !excludes.contains(extension.alias())),
        );
    }

    if extensions.len() > 1 {
        extensions.sort_by_key(|extension| extension.order());
    }

    let mut actual_filters = extensions
        .iter()
        .map(|extension| extension.instance())
        .collect::<Result<Vec<_>, _>>()?;
    actual_filters.extend(custom_filters);

    debug!(
        "Selected {} {} filters: {:?}",
        actual_filters.len(),
        role,
        actual_filters.iter().map(|f| f.name()).collect::<Vec<_>>()
    );
    Ok(actual_filters)
}

/// Split custom entries into filter instances and normalized exclusions.
fn parse_exclude_filters(custom_filters: &[FilterRef]) -> (Vec<Arc<dyn Filter>>, HashSet<String>) {
    let mut filters = Vec::with_capacity(custom_filters.len());
    let mut excludes = HashSet::new();

    for filter_ref in custom_filters {
        match filter_ref {
            FilterRef::Filter(filter) => filters.push(filter.clone()),
            FilterRef::Exclude(exclude) => {
                if let Some(name) = exclude.normalized() {
                    excludes.insert(name.to_string());
                }
            }
        }
    }

    if !excludes.is_empty() {
        info!("Find exclude filters: {:?}", excludes);
    }
    (filters, excludes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FilterError, RpcResult};
    use crate::filter::Invoker;
    use crate::invoker::FilterInvoker;
    use crate::messages::{RpcRequest, RpcResponse};
    use crate::registry::AutoActive;
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    struct Named(String);

    #[async_trait]
    impl Filter for Named {
        fn name(&self) -> &str {
            &self.0
        }

        async fn invoke(&self, next: &FilterInvoker, request: RpcRequest) -> RpcResult<RpcResponse> {
            next.invoke(request).await
        }
    }

    fn named(name: &str) -> Arc<dyn Filter> {
        Arc::new(Named(name.to_string()))
    }

    fn extension(alias: &str, order: i32, auto: Option<AutoActive>) -> FilterExtension {
        let ext = FilterExtension::from_instance(alias, named(alias)).with_order(order);
        match auto {
            Some(flags) => ext.with_auto_active(flags),
            None => ext,
        }
    }

    fn registry(entries: &[(&str, i32)]) -> FilterRegistry {
        let registry = FilterRegistry::new();
        for (alias, order) in entries {
            registry.register(extension(alias, *order, Some(AutoActive::both())));
        }
        registry
    }

    fn names(filters: &[Arc<dyn Filter>]) -> Vec<&str> {
        filters.iter().map(|f| f.name()).collect()
    }

    fn aliases(directives: &[&str]) -> Vec<String> {
        directives.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_auto_actives_sorted_by_order() {
        let registry = registry(&[("trace", 2), ("auth", 1)]);
        let selected = select_actual_filters(&[], &[], &registry, Role::Consumer).unwrap();
        assert_eq!(names(&selected), vec!["auth", "trace"]);
    }

    #[test]
    fn test_equal_orders_keep_registration_order() {
        let registry = registry(&[("c", 5), ("a", 5), ("b", 5), ("first", 1)]);
        let selected = select_actual_filters(&[], &[], &registry, Role::Provider).unwrap();
        assert_eq!(names(&selected), vec!["first", "c", "a", "b"]);
    }

    #[test]
    fn test_prefix_exclusion() {
        let registry = registry(&[("auth", 1), ("trace", 2)]);
        for directive in ["-auth", "!auth"] {
            let selected =
                select_actual_filters(&[], &aliases(&[directive]), &registry, Role::Consumer)
                    .unwrap();
            assert_eq!(names(&selected), vec!["trace"]);
        }
    }

    #[test]
    fn test_default_sentinel_keeps_custom_filters() {
        let registry = registry(&[("auth", 1), ("trace", 2)]);
        let custom = vec![FilterRef::Filter(named("X"))];

        for sentinel in ["default", "-default", "-*", "!*"] {
            let selected =
                select_actual_filters(&custom, &aliases(&[sentinel]), &registry, Role::Consumer)
                    .unwrap();
            assert_eq!(names(&selected), vec!["X"], "sentinel {sentinel}");
        }
    }

    #[test]
    fn test_sentinel_keeps_explicit_aliases() {
        let registry = registry(&[("auth", 1), ("trace", 2)]);
        registry.register(extension("audit", 0, None));

        let selected = select_actual_filters(
            &[],
            &aliases(&["-default", "trace", "audit"]),
            &registry,
            Role::Provider,
        )
        .unwrap();
        assert_eq!(names(&selected), vec!["audit", "trace"]);
    }

    #[test]
    fn test_unresolved_alias_dropped() {
        let registry = registry(&[("a", 1), ("b", 2)]);
        let selected =
            select_actual_filters(&[], &aliases(&["c"]), &registry, Role::Consumer).unwrap();
        assert_eq!(names(&selected), vec!["a", "b"]);
    }

    #[test]
    fn test_excluded_alias_absent_even_if_listed() {
        let registry = registry(&[("auth", 1), ("trace", 2)]);
        let selected = select_actual_filters(
            &[],
            &aliases(&["auth", "-auth"]),
            &registry,
            Role::Consumer,
        )
        .unwrap();
        assert_eq!(names(&selected), vec!["trace"]);
    }

    #[test]
    fn test_custom_filters_appended_in_order() {
        let registry = registry(&[("late", 100), ("early", -100)]);
        let custom = vec![
            FilterRef::Filter(named("Z")),
            FilterRef::exclude("late"),
            FilterRef::Filter(named("A")),
        ];
        let selected = select_actual_filters(&custom, &[], &registry, Role::Consumer).unwrap();
        assert_eq!(names(&selected), vec!["early", "Z", "A"]);
    }

    #[test]
    fn test_adjacent_exclusion_markers_all_apply() {
        let registry = registry(&[("a", 1), ("b", 2), ("c", 3)]);
        let custom = vec![
            FilterRef::exclude("a"),
            FilterRef::exclude("-b"),
            FilterRef::Filter(named("X")),
        ];
        let selected = select_actual_filters(&custom, &[], &registry, Role::Consumer).unwrap();
        assert_eq!(names(&selected), vec!["c", "X"]);
    }

    #[test]
    fn test_exclusion_marker_sentinel() {
        let registry = registry(&[("a", 1)]);
        let custom = vec![FilterRef::exclude("!default"), FilterRef::Filter(named("X"))];
        let selected = select_actual_filters(&custom, &[], &registry, Role::Consumer).unwrap();
        assert_eq!(names(&selected), vec!["X"]);
    }

    #[test]
    fn test_role_partitioning() {
        let registry = FilterRegistry::new();
        registry.register(extension("p", 1, Some(AutoActive::provider())));
        registry.register(extension("c", 1, Some(AutoActive::consumer())));

        let provider = select_actual_filters(&[], &[], &registry, Role::Provider).unwrap();
        let consumer = select_actual_filters(&[], &[], &registry, Role::Consumer).unwrap();
        assert_eq!(names(&provider), vec!["p"]);
        assert_eq!(names(&consumer), vec!["c"]);
    }

    #[test]
    fn test_instantiation_failure_aborts() {
        let registry = registry(&[("ok", 1)]);
        registry.register(
            FilterExtension::new("broken", || Err(FilterError::internal("missing key")))
                .with_auto_active(AutoActive::both()),
        );

        assert_matches!(
            select_actual_filters(&[], &[], &registry, Role::Provider).err(),
            Some(ConstructionError::Instantiate { alias, .. }) if alias == "broken"
        );
    }

    #[test]
    fn test_select_for_config() {
        let registry = registry(&[("auth", 1), ("trace", 2)]);
        let config = InterfaceConfig::new("svc")
            .with_filters(["-trace"])
            .with_filter_ref(FilterRef::Filter(named("custom")));

        let selected = select_for(&config, &registry, Role::Consumer).unwrap();
        assert_eq!(names(&selected), vec!["auth", "custom"]);
    }
}
