//! Per-evaluation state and the compiled-expression cache
//!
//! The context is the engine's only stateful object: it owns the
//! compiled-expression cache, user variables and custom functions, the
//! temporal memoization slots for `now`/`today`/`timeOfDay`, and the scratch
//! state threaded through a single evaluation (`defineVariable` bindings and
//! the `$index`/`$total` slots). It is not thread-safe; compiled nodes
//! themselves are immutable and may be shared across contexts.

use crate::compile::CompiledNode;
use crate::model::{Sequence, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::rc::Rc;

/// Custom function: receives the focus and the eagerly evaluated argument
/// sequences, returns a result sequence or an error message.
pub type CustomFunction = Rc<dyn Fn(&[Value], &[Sequence]) -> Result<Sequence, String>>;

/// Snapshot of the expression cache for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub expressions: Vec<String>,
}

struct CacheEntry {
    compiled: Rc<CompiledNode>,
    last_used: u64,
}

/// Compiled-expression cache with least-recently-used eviction. `get`
/// promotes on hit; `put` evicts the stalest entry when full.
struct LruCache {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
    capacity: Option<usize>,
}

impl LruCache {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            clock: 0,
            capacity,
        }
    }

    fn get(&mut self, expression: &str) -> Option<Rc<CompiledNode>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(expression).map(|entry| {
            entry.last_used = clock;
            entry.compiled.clone()
        })
    }

    fn put(&mut self, expression: &str, compiled: Rc<CompiledNode>) {
        self.clock += 1;
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            if !self.entries.contains_key(expression) && self.entries.len() >= capacity {
                if let Some(stalest) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone())
                {
                    self.entries.remove(&stalest);
                }
            }
        }
        self.entries.insert(
            expression.to_string(),
            CacheEntry {
                compiled,
                last_used: self.clock,
            },
        );
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn stats(&self) -> CacheStats {
        let mut expressions: Vec<String> = self.entries.keys().cloned().collect();
        expressions.sort();
        CacheStats {
            size: self.entries.len(),
            expressions,
        }
    }
}

/// Long-lived evaluation state. Create once, reuse across documents.
pub struct EvaluationContext {
    cache: LruCache,
    variables: HashMap<String, Value>,
    functions: HashMap<String, CustomFunction>,

    // One wall-clock instant per evaluation, shared between the function
    // forms and `%now`. Cleared at the start of each top-level evaluate.
    now_slot: Option<Value>,
    today_slot: Option<Value>,
    time_of_day_slot: Option<Value>,

    // Per-evaluation scratch
    defined: HashMap<String, Sequence>,
    index_slot: Option<i64>,
    total_slot: Option<Sequence>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    // === cache ===

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub(crate) fn cache_get(&mut self, expression: &str) -> Option<Rc<CompiledNode>> {
        self.cache.get(expression)
    }

    pub(crate) fn cache_put(&mut self, expression: &str, compiled: Rc<CompiledNode>) {
        self.cache.put(expression, compiled);
    }

    // === variables and functions ===

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn set_function(&mut self, name: impl Into<String>, function: CustomFunction) {
        self.functions.insert(name.into(), function);
    }

    pub(crate) fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub(crate) fn custom_function(&self, name: &str) -> Option<CustomFunction> {
        self.functions.get(name).cloned()
    }

    pub(crate) fn define(&mut self, name: String, value: Sequence) {
        self.defined.insert(name, value);
    }

    pub(crate) fn defined(&self, name: &str) -> Option<&Sequence> {
        self.defined.get(name)
    }

    // === per-element slots ===

    pub(crate) fn set_index(&mut self, index: Option<i64>) -> Option<i64> {
        std::mem::replace(&mut self.index_slot, index)
    }

    pub(crate) fn index(&self) -> Option<i64> {
        self.index_slot
    }

    /// Thread a `$total` value through an evaluation (the engine itself does
    /// not populate it; aggregate callers may).
    pub fn set_total(&mut self, total: Option<Sequence>) -> Option<Sequence> {
        std::mem::replace(&mut self.total_slot, total)
    }

    pub(crate) fn total(&self) -> Option<&Sequence> {
        self.total_slot.as_ref()
    }

    // === temporal memoization ===

    pub(crate) fn now_value(&mut self) -> Value {
        self.now_slot
            .get_or_insert_with(|| {
                Value::String(
                    chrono::Local::now()
                        .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
                        .to_string(),
                )
            })
            .clone()
    }

    pub(crate) fn today_value(&mut self) -> Value {
        self.today_slot
            .get_or_insert_with(|| {
                Value::String(chrono::Local::now().format("%Y-%m-%d").to_string())
            })
            .clone()
    }

    pub(crate) fn time_of_day_value(&mut self) -> Value {
        self.time_of_day_slot
            .get_or_insert_with(|| {
                Value::String(chrono::Local::now().format("T%H:%M:%S%.3f").to_string())
            })
            .clone()
    }

    /// Reset per-evaluation state so each top-level `evaluate` observes one
    /// fresh wall-clock instant and a clean variable scope.
    pub(crate) fn begin_evaluation(&mut self) {
        self.now_slot = None;
        self.today_slot = None;
        self.time_of_day_slot = None;
        self.defined.clear();
        self.index_slot = None;
        self.total_slot = None;
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder mirroring the `createContext` options: initial variables, custom
/// functions, and an optional cache bound.
#[derive(Default)]
pub struct ContextBuilder {
    variables: HashMap<String, Value>,
    functions: HashMap<String, CustomFunction>,
    cache_size: Option<usize>,
}

impl ContextBuilder {
    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn function(mut self, name: impl Into<String>, function: CustomFunction) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Bound the compiled-expression cache; unbounded when unset.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    pub fn build(self) -> EvaluationContext {
        EvaluationContext {
            cache: LruCache::new(self.cache_size),
            variables: self.variables,
            functions: self.functions,
            now_slot: None,
            today_slot: None,
            time_of_day_slot: None,
            defined: HashMap::new(),
            index_slot: None,
            total_slot: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(tag: &str) -> Rc<CompiledNode> {
        Rc::new(CompiledNode::Identifier {
            name: tag.to_string(),
            type_filter: false,
        })
    }

    #[test]
    fn cache_hits_return_shared_nodes() {
        let mut ctx = EvaluationContext::new();
        ctx.cache_put("a", compiled("a"));
        let first = ctx.cache_get("a").unwrap();
        let second = ctx.cache_get("a").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(ctx.cache_get("b").is_none());
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut ctx = EvaluationContext::builder().cache_size(2).build();
        ctx.cache_put("a", compiled("a"));
        ctx.cache_put("b", compiled("b"));
        // Touch `a` so `b` becomes the eviction candidate.
        ctx.cache_get("a");
        ctx.cache_put("c", compiled("c"));

        let stats = ctx.cache_stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.expressions, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn reinserting_existing_key_does_not_evict() {
        let mut ctx = EvaluationContext::builder().cache_size(2).build();
        ctx.cache_put("a", compiled("a"));
        ctx.cache_put("b", compiled("b"));
        ctx.cache_put("a", compiled("a2"));
        assert_eq!(ctx.cache_stats().size, 2);
    }

    #[test]
    fn clear_cache_empties_stats() {
        let mut ctx = EvaluationContext::new();
        ctx.cache_put("a", compiled("a"));
        ctx.clear_cache();
        assert_eq!(ctx.cache_stats().size, 0);
        assert!(ctx.cache_stats().expressions.is_empty());
    }

    #[test]
    fn temporal_slots_memoize_until_reset() {
        let mut ctx = EvaluationContext::new();
        let first = ctx.now_value();
        let again = ctx.now_value();
        assert_eq!(first, again);

        ctx.begin_evaluation();
        // Slot is clear; a new instant will be recorded on next use.
        assert!(ctx.now_slot.is_none());
    }

    #[test]
    fn builder_seeds_variables() {
        let ctx = EvaluationContext::builder()
            .variable("threshold", Value::from(10))
            .build();
        assert_eq!(ctx.variable("threshold"), Some(&Value::from(10)));
        assert!(ctx.variable("missing").is_none());
    }

    #[test]
    fn index_slot_swaps() {
        let mut ctx = EvaluationContext::new();
        assert_eq!(ctx.set_index(Some(3)), None);
        assert_eq!(ctx.index(), Some(3));
        assert_eq!(ctx.set_index(None), Some(3));
    }
}
