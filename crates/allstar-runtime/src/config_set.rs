//! Ordered unique sets of ATN configurations.

use indexmap::IndexMap;

use allstar_core::murmur;

use crate::config::AtnConfig;
use crate::context::{MergeCache, PredictionContextCache, merge};
use crate::semantic::SemanticContext;

/// How the set indexes configurations.
///
/// Parser prediction collapses configs that differ only in context by
/// merging their contexts; the lexer keeps exact configurations apart
/// (the pending action and non-greedy flag are part of identity there).
#[derive(Clone, PartialEq, Eq, Hash)]
enum LookupKey {
    Merged(usize, usize, SemanticContext),
    Exact(AtnConfig),
}

/// Insertion-ordered set of configurations with merge-on-collision.
///
/// Once a set is attached to a DFA state it is frozen; further mutation
/// is a contract violation.
#[derive(Clone, Default)]
pub struct AtnConfigSet {
    configs: Vec<AtnConfig>,
    lookup: IndexMap<LookupKey, usize>,
    pub unique_alt: Option<usize>,
    /// Alternatives found to conflict, sorted ascending.
    pub conflicting_alts: Option<Vec<usize>>,
    pub has_semantic_context: bool,
    pub dips_into_outer_context: bool,
    pub full_ctx: bool,
    ordered: bool,
    read_only: bool,
}

impl AtnConfigSet {
    /// Parser-prediction set. `full_ctx` selects the non-wildcard merge
    /// root.
    pub fn new(full_ctx: bool) -> Self {
        Self {
            full_ctx,
            ..Self::default()
        }
    }

    /// Lexer set: exact identity, no context merging.
    pub fn new_ordered() -> Self {
        Self {
            ordered: true,
            ..Self::default()
        }
    }

    /// Add a configuration, merging contexts on `(state, alt, predicate)`
    /// collision. Returns false when the set already covered it.
    pub fn add(&mut self, config: AtnConfig, cache: &mut MergeCache) -> bool {
        assert!(!self.read_only, "attempt to modify frozen config set");

        if config.semantic_context != SemanticContext::None {
            self.has_semantic_context = true;
        }
        if config.reaches_into_outer_context > 0 {
            self.dips_into_outer_context = true;
        }

        let key = if self.ordered {
            LookupKey::Exact(config.clone())
        } else {
            LookupKey::Merged(config.state, config.alt, config.semantic_context.clone())
        };

        match self.lookup.get(&key) {
            None => {
                self.lookup.insert(key, self.configs.len());
                self.configs.push(config);
                true
            }
            Some(&index) => {
                if self.ordered {
                    return false;
                }
                let root_is_wildcard = !self.full_ctx;
                let existing = &mut self.configs[index];
                let merged = merge(&existing.context, &config.context, root_is_wildcard, cache);
                existing.reaches_into_outer_context = existing
                    .reaches_into_outer_context
                    .max(config.reaches_into_outer_context);
                existing.precedence_filter_suppressed |= config.precedence_filter_suppressed;
                existing.context = merged;
                false
            }
        }
    }

    pub fn configs(&self) -> &[AtnConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Distinct alternatives, ascending.
    pub fn alts(&self) -> Vec<usize> {
        let mut alts: Vec<usize> = self.configs.iter().map(|c| c.alt).collect();
        alts.sort_unstable();
        alts.dedup();
        alts
    }

    /// Canonicalise every configuration's context through the shared
    /// cache, so structurally equal stacks become identical handles.
    pub fn optimize_contexts(&mut self, cache: &PredictionContextCache) {
        assert!(!self.read_only, "attempt to modify frozen config set");
        for config in &mut self.configs {
            config.context = cache.get_cached(&config.context);
        }
    }

    /// Forbid further mutation (set is now owned by a DFA state).
    pub fn freeze(&mut self) {
        self.read_only = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.read_only
    }

    /// Content hash over the ordered configurations.
    pub fn hash_value(&self) -> u32 {
        let mut h = murmur::initialize(murmur::DEFAULT_SEED);
        for config in &self.configs {
            h = murmur::update(h, config.hash_value());
        }
        murmur::finish(h, self.configs.len())
    }
}

// Two sets are equal when they hold the same configurations in the same
// order under the same context mode; the DFA relies on this to
// canonicalise states.
impl PartialEq for AtnConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.full_ctx == other.full_ctx && self.configs == other.configs
    }
}

impl Eq for AtnConfigSet {}

impl std::fmt::Debug for AtnConfigSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtnConfigSet")
            .field("configs", &self.configs)
            .field("unique_alt", &self.unique_alt)
            .field("conflicting_alts", &self.conflicting_alts)
            .field("full_ctx", &self.full_ctx)
            .finish()
    }
}
