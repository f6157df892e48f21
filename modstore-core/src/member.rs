//! Declared module members
//!
//! A module lists its actions, mutations and getters in a [`Members`] table
//! from [`Module::declare`](crate::Module::declare). Each category keeps its
//! entries in declaration order. An entry is either a named handler, whose
//! dispatch key is derived from the module namespace and name overrides, or a
//! bulk map of already-complete keys that is merged verbatim.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::handle::ModuleHandle;
use crate::state::State;

/// Boxed future returned by action handlers
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Result of running an action
pub type ActionResult = anyhow::Result<Value>;

/// Synchronous state replacement: `(state, payload)`
pub type MutationFn = Arc<dyn Fn(&mut State, Value) + Send + Sync>;

/// Read of raw or derived state
pub type GetterFn = Arc<dyn Fn(&State) -> Value + Send + Sync>;

/// Possibly asynchronous operation, driven with the module's facade
pub type ActionFn = Arc<dyn Fn(ModuleHandle, Value) -> BoxFuture<ActionResult> + Send + Sync>;

/// Member category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Action,
    Mutation,
    Getter,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Action => "action",
            Category::Mutation => "mutation",
            Category::Getter => "getter",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a category list
#[derive(Clone)]
pub enum Entry<H> {
    /// Handler declared under a member name
    Named { name: String, handler: H },
    /// Complete key -> handler map, merged without name resolution
    Bulk(BTreeMap<String, H>),
}

impl<H> Entry<H> {
    /// Member name for named entries
    pub fn name(&self) -> Option<&str> {
        match self {
            Entry::Named { name, .. } => Some(name),
            Entry::Bulk(_) => None,
        }
    }
}

impl<H> fmt::Debug for Entry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Named { name, .. } => f.debug_tuple("Named").field(name).finish(),
            Entry::Bulk(map) => f.debug_tuple("Bulk").field(&map.keys()).finish(),
        }
    }
}

/// Wrap an async function as an [`ActionFn`], for bulk maps
pub fn action_fn<F, Fut>(handler: F) -> ActionFn
where
    F: Fn(ModuleHandle, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    Arc::new(
        move |module: ModuleHandle, payload: Value| -> BoxFuture<ActionResult> {
            Box::pin(handler(module, payload))
        },
    )
}

/// Wrap a closure as a [`MutationFn`], for bulk maps
pub fn mutation_fn<F>(handler: F) -> MutationFn
where
    F: Fn(&mut State, Value) + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Wrap a closure as a [`GetterFn`], for bulk maps
pub fn getter_fn<F>(handler: F) -> GetterFn
where
    F: Fn(&State) -> Value + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Per-category member lists of a module.
///
/// Declaring the same name twice appends it twice; how the duplicate is
/// treated is up to the synthesizer's collision policy.
///
/// A module that extends another starts from a clone of the parent's table:
///
/// ```ignore
/// fn declare(&self, members: &mut Members) {
///     self.base.declare(members);
///     members.action("leave", leave);
/// }
/// ```
#[derive(Clone, Default)]
pub struct Members {
    actions: Vec<Entry<ActionFn>>,
    mutations: Vec<Entry<MutationFn>>,
    getters: Vec<Entry<GetterFn>>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an action
    pub fn action<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(ModuleHandle, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.actions.push(Entry::Named {
            name: name.into(),
            handler: action_fn(handler),
        });
        self
    }

    /// Declare a mutation
    pub fn mutation<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut State, Value) + Send + Sync + 'static,
    {
        self.mutations.push(Entry::Named {
            name: name.into(),
            handler: mutation_fn(handler),
        });
        self
    }

    /// Declare a getter
    pub fn getter<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&State) -> Value + Send + Sync + 'static,
    {
        self.getters.push(Entry::Named {
            name: name.into(),
            handler: getter_fn(handler),
        });
        self
    }

    /// Merge complete action keys verbatim
    pub fn bulk_actions<K: Into<String>>(
        &mut self,
        map: impl IntoIterator<Item = (K, ActionFn)>,
    ) -> &mut Self {
        self.actions.push(Entry::Bulk(collect_bulk(map)));
        self
    }

    /// Merge complete mutation keys verbatim
    pub fn bulk_mutations<K: Into<String>>(
        &mut self,
        map: impl IntoIterator<Item = (K, MutationFn)>,
    ) -> &mut Self {
        self.mutations.push(Entry::Bulk(collect_bulk(map)));
        self
    }

    /// Merge complete getter keys verbatim
    pub fn bulk_getters<K: Into<String>>(
        &mut self,
        map: impl IntoIterator<Item = (K, GetterFn)>,
    ) -> &mut Self {
        self.getters.push(Entry::Bulk(collect_bulk(map)));
        self
    }

    pub fn actions(&self) -> &[Entry<ActionFn>] {
        &self.actions
    }

    pub fn mutations(&self) -> &[Entry<MutationFn>] {
        &self.mutations
    }

    pub fn getters(&self) -> &[Entry<GetterFn>] {
        &self.getters
    }

    /// Declared names of one category, in declaration order
    pub fn names(&self, category: Category) -> Vec<&str> {
        match category {
            Category::Action => self.actions.iter().filter_map(Entry::name).collect(),
            Category::Mutation => self.mutations.iter().filter_map(Entry::name).collect(),
            Category::Getter => self.getters.iter().filter_map(Entry::name).collect(),
        }
    }

    /// Whether any category declares a member called `name`
    pub fn declares(&self, name: &str) -> bool {
        self.actions.iter().any(|e| e.name() == Some(name))
            || self.mutations.iter().any(|e| e.name() == Some(name))
            || self.getters.iter().any(|e| e.name() == Some(name))
    }

    /// Total number of entries across categories
    pub fn len(&self) -> usize {
        self.actions.len() + self.mutations.len() + self.getters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn collect_bulk<K: Into<String>, H>(map: impl IntoIterator<Item = (K, H)>) -> BTreeMap<String, H> {
    map.into_iter().map(|(k, h)| (k.into(), h)).collect()
}

impl fmt::Debug for Members {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Members")
            .field("actions", &self.actions)
            .field("mutations", &self.mutations)
            .field("getters", &self.getters)
            .finish()
    }
}
