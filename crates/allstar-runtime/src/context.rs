//! Prediction contexts: merge-able, shared call-stack summaries.
//!
//! A prediction context is an immutable DAG node held behind an [`Arc`].
//! The empty context is a process-wide singleton; singleton nodes carry one
//! `(parent, return state)` frame; array nodes carry several, with return
//! states kept in canonical order (`$` last). Hashes are content-addressed
//! and cached at construction, so structural equality is cheap to reject.
//!
//! Merging never mutates: structurally equal results may be fresh nodes,
//! which is why the per-prediction [`MergeCache`] and the shared
//! [`PredictionContextCache`] exist. Without them the graph blows up
//! exponentially on ambiguous inputs.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::{Arc, LazyLock, Mutex};

use allstar_atn::{Atn, Transition};
use allstar_core::murmur;

use crate::tree::RuleNode;

/// Return state marking "the stack is empty past here".
///
/// Numerically the smallest representable payload, but it sorts *after*
/// every real state number so `$` stays canonical-last; compare through
/// [`return_state_sort_key`].
pub const EMPTY_RETURN_STATE: i32 = i32::MIN + 1;

/// Shared handle to an immutable context node.
pub type Ctx = Arc<PredictionContext>;

#[inline]
fn return_state_sort_key(return_state: i32) -> i64 {
    if return_state == EMPTY_RETURN_STATE {
        i64::MAX
    } else {
        i64::from(return_state)
    }
}

/// One node of the context DAG.
#[derive(Debug)]
pub enum PredictionContext {
    /// The empty stack. Presents as a single `$` frame with no parent.
    Empty,
    Singleton {
        parent: Ctx,
        return_state: i32,
        hash: u32,
    },
    /// Several frames; `return_states` strictly ascending under the `$`-last
    /// ordering, `parents` of equal length. A `None` parent belongs to the
    /// `$` slot only.
    Array {
        parents: Vec<Option<Ctx>>,
        return_states: Vec<i32>,
        hash: u32,
    },
}

static EMPTY: LazyLock<Ctx> = LazyLock::new(|| Arc::new(PredictionContext::Empty));

impl PredictionContext {
    /// The process-wide empty context.
    pub fn empty() -> Ctx {
        Arc::clone(&EMPTY)
    }

    /// Create a singleton frame. A `$` frame with no parent collapses to
    /// the empty context.
    pub fn new_singleton(parent: Option<Ctx>, return_state: i32) -> Ctx {
        match parent {
            None => {
                debug_assert_eq!(return_state, EMPTY_RETURN_STATE, "parentless non-$ frame");
                Self::empty()
            }
            Some(parent) => {
                let hash = {
                    let mut h = murmur::initialize(murmur::DEFAULT_SEED);
                    h = murmur::update(h, parent.hash_value());
                    h = murmur::update(h, return_state as u32);
                    murmur::finish(h, 2)
                };
                Arc::new(PredictionContext::Singleton {
                    parent,
                    return_state,
                    hash,
                })
            }
        }
    }

    /// Create an array node; collapses a single-slot array to a singleton.
    pub fn new_array(parents: Vec<Option<Ctx>>, return_states: Vec<i32>) -> Ctx {
        assert_eq!(parents.len(), return_states.len());
        assert!(!parents.is_empty());
        if parents.len() == 1 {
            return Self::new_singleton(parents.into_iter().next().unwrap(), return_states[0]);
        }
        debug_assert!(
            return_states
                .windows(2)
                .all(|w| return_state_sort_key(w[0]) < return_state_sort_key(w[1])),
            "return states not canonically ordered: {return_states:?}"
        );
        let hash = {
            let mut h = murmur::initialize(murmur::DEFAULT_SEED);
            for parent in &parents {
                h = murmur::update(h, parent.as_ref().map_or(0, |p| p.hash_value()));
            }
            for &rs in &return_states {
                h = murmur::update(h, rs as u32);
            }
            murmur::finish(h, parents.len() + return_states.len())
        };
        Arc::new(PredictionContext::Array {
            parents,
            return_states,
            hash,
        })
    }

    /// Build the context of a rule invocation chain, walking parse-tree
    /// parent pointers outward.
    pub fn from_rule_context(atn: &Atn, ctx: Option<&Rc<RefCell<RuleNode>>>) -> Ctx {
        let Some(node) = ctx else {
            return Self::empty();
        };
        let (parent, invoking_state) = {
            let node = node.borrow();
            (node.parent(), node.invoking_state)
        };
        let Ok(invoking_state) = usize::try_from(invoking_state) else {
            // nobody called us
            return Self::empty();
        };
        let outer = Self::from_rule_context(atn, parent.as_ref());

        let state = atn.state(invoking_state);
        match state.transitions.first() {
            Some(Transition::Rule { follow_state, .. }) => {
                Self::new_singleton(Some(outer), *follow_state as i32)
            }
            _ => panic!("invoking state {invoking_state} has no rule transition"),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PredictionContext::Empty)
    }

    /// Number of frames visible at this node (the empty context presents
    /// one `$` frame).
    pub fn size(&self) -> usize {
        match self {
            PredictionContext::Empty | PredictionContext::Singleton { .. } => 1,
            PredictionContext::Array { return_states, .. } => return_states.len(),
        }
    }

    pub fn return_state(&self, index: usize) -> i32 {
        match self {
            PredictionContext::Empty => EMPTY_RETURN_STATE,
            PredictionContext::Singleton { return_state, .. } => {
                debug_assert_eq!(index, 0);
                *return_state
            }
            PredictionContext::Array { return_states, .. } => return_states[index],
        }
    }

    pub fn parent(&self, index: usize) -> Option<Ctx> {
        match self {
            PredictionContext::Empty => None,
            PredictionContext::Singleton { parent, .. } => {
                debug_assert_eq!(index, 0);
                Some(Arc::clone(parent))
            }
            PredictionContext::Array { parents, .. } => parents[index].clone(),
        }
    }

    /// True when the last frame is `$`.
    pub fn has_empty_path(&self) -> bool {
        self.return_state(self.size() - 1) == EMPTY_RETURN_STATE
    }

    /// The cached content hash.
    #[inline]
    pub fn hash_value(&self) -> u32 {
        match self {
            PredictionContext::Empty => murmur::finish(murmur::initialize(murmur::DEFAULT_SEED), 0),
            PredictionContext::Singleton { hash, .. } | PredictionContext::Array { hash, .. } => {
                *hash
            }
        }
    }
}

/// Structural equality with identity and hash fast paths.
pub fn contexts_equal(a: &Ctx, b: &Ctx) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    if a.hash_value() != b.hash_value() {
        return false;
    }
    match (a.as_ref(), b.as_ref()) {
        (PredictionContext::Empty, PredictionContext::Empty) => true,
        (
            PredictionContext::Singleton {
                parent: pa,
                return_state: ra,
                ..
            },
            PredictionContext::Singleton {
                parent: pb,
                return_state: rb,
                ..
            },
        ) => ra == rb && contexts_equal(pa, pb),
        (
            PredictionContext::Array {
                parents: pa,
                return_states: ra,
                ..
            },
            PredictionContext::Array {
                parents: pb,
                return_states: rb,
                ..
            },
        ) => {
            ra == rb
                && pa.len() == pb.len()
                && pa.iter().zip(pb).all(|(x, y)| match (x, y) {
                    (None, None) => true,
                    (Some(x), Some(y)) => contexts_equal(x, y),
                    _ => false,
                })
        }
        _ => false,
    }
}

fn optional_contexts_equal(a: &Option<Ctx>, b: &Option<Ctx>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => contexts_equal(a, b),
        _ => false,
    }
}

/// Hash/Eq adapter so contexts can key maps structurally.
#[derive(Clone, Debug)]
pub struct CtxKey(pub Ctx);

impl PartialEq for CtxKey {
    fn eq(&self, other: &Self) -> bool {
        contexts_equal(&self.0, &other.0)
    }
}

impl Eq for CtxKey {}

impl Hash for CtxKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.0.hash_value());
    }
}

/// Memo for one prediction's merges; looked up in either operand order.
#[derive(Default)]
pub struct MergeCache {
    map: HashMap<(CtxKey, CtxKey), Ctx>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, a: &Ctx, b: &Ctx) -> Option<Ctx> {
        let key = (CtxKey(Arc::clone(a)), CtxKey(Arc::clone(b)));
        if let Some(hit) = self.map.get(&key) {
            return Some(Arc::clone(hit));
        }
        let reversed = (key.1, key.0);
        self.map.get(&reversed).map(Arc::clone)
    }

    fn put(&mut self, a: &Ctx, b: &Ctx, merged: Ctx) {
        self.map
            .insert((CtxKey(Arc::clone(a)), CtxKey(Arc::clone(b))), merged);
    }
}

/// Merge two contexts. `root_is_wildcard` is true for SLL prediction,
/// where the empty root stands for "any caller".
pub fn merge(a: &Ctx, b: &Ctx, root_is_wildcard: bool, cache: &mut MergeCache) -> Ctx {
    if contexts_equal(a, b) {
        return Arc::clone(a);
    }

    let a_is_single = a.size() == 1;
    let b_is_single = b.size() == 1;
    if a_is_single && b_is_single {
        return merge_singletons(a, b, root_is_wildcard, cache);
    }

    // at least one side is an array
    if root_is_wildcard {
        if a.is_empty() {
            return Arc::clone(a);
        }
        if b.is_empty() {
            return Arc::clone(b);
        }
    }
    merge_arrays(a, b, root_is_wildcard, cache)
}

fn merge_singletons(a: &Ctx, b: &Ctx, root_is_wildcard: bool, cache: &mut MergeCache) -> Ctx {
    if let Some(hit) = cache.get(a, b) {
        return hit;
    }

    if let Some(root) = merge_root(a, b, root_is_wildcard) {
        cache.put(a, b, Arc::clone(&root));
        return root;
    }

    // past merge_root, both are real singletons
    let parent_a = a.parent(0).expect("non-empty singleton has a parent");
    let parent_b = b.parent(0).expect("non-empty singleton has a parent");
    let rs_a = a.return_state(0);
    let rs_b = b.return_state(0);

    let merged = if rs_a == rs_b {
        // a^x + a^y = a^(x|y)
        let parent = merge(&parent_a, &parent_b, root_is_wildcard, cache);
        if contexts_equal(&parent, &parent_a) {
            Arc::clone(a)
        } else if contexts_equal(&parent, &parent_b) {
            Arc::clone(b)
        } else {
            PredictionContext::new_singleton(Some(parent), rs_a)
        }
    } else if contexts_equal(&parent_a, &parent_b) {
        // same parent, different tops: one array under the shared parent
        let (lo, hi) = if return_state_sort_key(rs_a) <= return_state_sort_key(rs_b) {
            (rs_a, rs_b)
        } else {
            (rs_b, rs_a)
        };
        PredictionContext::new_array(
            vec![Some(Arc::clone(&parent_a)), Some(parent_a)],
            vec![lo, hi],
        )
    } else if return_state_sort_key(rs_a) <= return_state_sort_key(rs_b) {
        PredictionContext::new_array(vec![Some(parent_a), Some(parent_b)], vec![rs_a, rs_b])
    } else {
        PredictionContext::new_array(vec![Some(parent_b), Some(parent_a)], vec![rs_b, rs_a])
    };

    cache.put(a, b, Arc::clone(&merged));
    merged
}

/// Handle empty-root cases. `None` means neither side is empty.
fn merge_root(a: &Ctx, b: &Ctx, root_is_wildcard: bool) -> Option<Ctx> {
    if root_is_wildcard {
        // * + x = *
        if a.is_empty() {
            return Some(Arc::clone(a));
        }
        if b.is_empty() {
            return Some(Arc::clone(b));
        }
        return None;
    }

    match (a.is_empty(), b.is_empty()) {
        (true, true) => Some(PredictionContext::empty()), // $ + $ = $
        (true, false) => {
            // $ + x = [x, $] with $ last
            Some(PredictionContext::new_array(
                vec![b.parent(0), None],
                vec![b.return_state(0), EMPTY_RETURN_STATE],
            ))
        }
        (false, true) => Some(PredictionContext::new_array(
            vec![a.parent(0), None],
            vec![a.return_state(0), EMPTY_RETURN_STATE],
        )),
        (false, false) => None,
    }
}

fn merge_arrays(a: &Ctx, b: &Ctx, root_is_wildcard: bool, cache: &mut MergeCache) -> Ctx {
    if let Some(hit) = cache.get(a, b) {
        return hit;
    }

    let (parents_a, states_a) = array_view(a);
    let (parents_b, states_b) = array_view(b);

    let mut merged_parents: Vec<Option<Ctx>> = Vec::with_capacity(states_a.len() + states_b.len());
    let mut merged_states: Vec<i32> = Vec::with_capacity(states_a.len() + states_b.len());

    // classic sorted merge on return states
    let (mut i, mut j) = (0, 0);
    while i < states_a.len() && j < states_b.len() {
        let key_a = return_state_sort_key(states_a[i]);
        let key_b = return_state_sort_key(states_b[j]);
        match key_a.cmp(&key_b) {
            Ordering::Equal => {
                // equal stack tops collapse to one slot
                let payload = states_a[i];
                let both_empty = payload == EMPTY_RETURN_STATE
                    && parents_a[i].is_none()
                    && parents_b[j].is_none();
                let parent = if both_empty
                    || optional_contexts_equal(&parents_a[i], &parents_b[j])
                {
                    parents_a[i].clone()
                } else {
                    let pa = parents_a[i].as_ref().expect("non-$ slot has a parent");
                    let pb = parents_b[j].as_ref().expect("non-$ slot has a parent");
                    Some(merge(pa, pb, root_is_wildcard, cache))
                };
                merged_parents.push(parent);
                merged_states.push(payload);
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                merged_parents.push(parents_a[i].clone());
                merged_states.push(states_a[i]);
                i += 1;
            }
            Ordering::Greater => {
                merged_parents.push(parents_b[j].clone());
                merged_states.push(states_b[j]);
                j += 1;
            }
        }
    }
    merged_parents.extend(parents_a[i..].iter().cloned());
    merged_states.extend_from_slice(&states_a[i..]);
    merged_parents.extend(parents_b[j..].iter().cloned());
    merged_states.extend_from_slice(&states_b[j..]);

    combine_common_parents(&mut merged_parents);
    let merged = PredictionContext::new_array(merged_parents, merged_states);

    // reuse an operand when the merge reproduced it
    let merged = if contexts_equal(&merged, a) {
        Arc::clone(a)
    } else if contexts_equal(&merged, b) {
        Arc::clone(b)
    } else {
        merged
    };

    cache.put(a, b, Arc::clone(&merged));
    merged
}

fn array_view(ctx: &Ctx) -> (Vec<Option<Ctx>>, Vec<i32>) {
    match ctx.as_ref() {
        PredictionContext::Empty => (vec![None], vec![EMPTY_RETURN_STATE]),
        PredictionContext::Singleton {
            parent,
            return_state,
            ..
        } => (vec![Some(Arc::clone(parent))], vec![*return_state]),
        PredictionContext::Array {
            parents,
            return_states,
            ..
        } => (parents.clone(), return_states.clone()),
    }
}

/// Deduplicate structurally equal parents to shared handles.
fn combine_common_parents(parents: &mut [Option<Ctx>]) {
    let mut unique: HashMap<CtxKey, Ctx> = HashMap::new();
    for slot in parents.iter_mut() {
        if let Some(parent) = slot {
            let canon = unique
                .entry(CtxKey(Arc::clone(parent)))
                .or_insert_with(|| Arc::clone(parent));
            *slot = Some(Arc::clone(canon));
        }
    }
}

/// Insert-only canonicalising cache shared by parses of one grammar.
///
/// Structurally equal graphs become identical handles, which keeps
/// DFA-attached contexts compact and makes later equality checks cheap.
#[derive(Default)]
pub struct PredictionContextCache {
    map: Mutex<HashMap<CtxKey, Ctx>>,
}

impl PredictionContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().unwrap().len() == 0
    }

    /// Canonicalise `context` and (recursively) its parents.
    pub fn get_cached(&self, context: &Ctx) -> Ctx {
        let mut visited = HashMap::new();
        self.get_cached_inner(context, &mut visited)
    }

    fn get_cached_inner(&self, context: &Ctx, visited: &mut HashMap<CtxKey, Ctx>) -> Ctx {
        if context.is_empty() {
            return Arc::clone(context);
        }
        if let Some(hit) = visited.get(&CtxKey(Arc::clone(context))) {
            return Arc::clone(hit);
        }
        if let Some(hit) = self.map.lock().unwrap().get(&CtxKey(Arc::clone(context))) {
            let hit = Arc::clone(hit);
            visited.insert(CtxKey(Arc::clone(context)), Arc::clone(&hit));
            return hit;
        }

        let mut changed = false;
        let size = context.size();
        let mut parents = Vec::with_capacity(size);
        for i in 0..size {
            let parent = context.parent(i);
            let canon = parent
                .as_ref()
                .map(|p| self.get_cached_inner(p, visited));
            if let (Some(p), Some(c)) = (&parent, &canon) {
                changed |= !Arc::ptr_eq(p, c);
            }
            parents.push(canon);
        }

        let updated = if !changed {
            Arc::clone(context)
        } else if size == 1 {
            PredictionContext::new_singleton(parents.pop().unwrap(), context.return_state(0))
        } else {
            let return_states = (0..size).map(|i| context.return_state(i)).collect();
            PredictionContext::new_array(parents, return_states)
        };

        let mut map = self.map.lock().unwrap();
        let canon = map
            .entry(CtxKey(Arc::clone(&updated)))
            .or_insert_with(|| Arc::clone(&updated));
        let canon = Arc::clone(canon);
        drop(map);

        visited.insert(CtxKey(Arc::clone(&updated)), Arc::clone(&canon));
        visited.insert(CtxKey(Arc::clone(context)), Arc::clone(&canon));
        canon
    }
}
