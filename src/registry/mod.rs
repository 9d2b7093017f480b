//! Condition registry
//!
//! The fixed catalog of customer attributes a segment can be built from,
//! indexed once on first use.

mod catalog;

pub use catalog::*;

use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Key index over the catalog, including legacy aliases
static INDEX: Lazy<AHashMap<&'static str, &'static ConditionDefinition>> = Lazy::new(|| {
    let mut map = AHashMap::with_capacity(CONDITIONS.len() + LEGACY_ALIASES.len());
    for definition in CONDITIONS.iter() {
        map.insert(definition.key, definition);
    }
    for (alias, key) in LEGACY_ALIASES.iter() {
        if let Some(definition) = CONDITIONS.iter().find(|d| d.key == *key) {
            map.insert(*alias, definition);
        }
    }
    map
});

/// Look up a condition definition by key. Unknown keys are not an error.
#[inline]
pub fn lookup(key: &str) -> Option<&'static ConditionDefinition> {
    INDEX.get(key).copied()
}

/// All condition definitions in display order
pub fn conditions() -> &'static [ConditionDefinition] {
    &CONDITIONS
}

/// Resolve a legacy alias to its catalog key; other keys pass through
#[inline]
pub fn canonical_key(key: &str) -> &str {
    match lookup(key) {
        Some(definition) => definition.key,
        None => key,
    }
}

/// Display label for a key, falling back to the raw key
#[inline]
pub fn label_for(key: &str) -> &str {
    match lookup(key) {
        Some(definition) => definition.label,
        None => key,
    }
}
