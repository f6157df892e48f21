//! Synthesized store modules

use std::collections::BTreeMap;
use std::fmt;

use crate::member::{ActionFn, Category, GetterFn, MutationFn};
use crate::names::NameMap;
use crate::namespace::Namespace;
use crate::state::State;

/// Constant name (SCREAMING_SNAKE_CASE) -> namespaced dispatch key
pub type Constants = BTreeMap<String, String>;

/// Logical member name -> namespaced key, per category.
///
/// This is the generated facade of a module: the declared handlers stay as
/// written, and callers reach them through these keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub actions: BTreeMap<String, String>,
    pub mutations: BTreeMap<String, String>,
    pub getters: BTreeMap<String, String>,
}

impl Bindings {
    /// Key bound to `member` in `category`
    pub fn key(&self, category: Category, member: &str) -> Option<&str> {
        let map = match category {
            Category::Action => &self.actions,
            Category::Mutation => &self.mutations,
            Category::Getter => &self.getters,
        };
        map.get(member).map(String::as_str)
    }

    /// Whether `member` is bound in any category
    pub fn contains(&self, member: &str) -> bool {
        self.actions.contains_key(member)
            || self.mutations.contains_key(member)
            || self.getters.contains_key(member)
    }
}

/// Everything a store needs to host one module.
///
/// Produced once per [`create`](crate::create) call. The handler maps are
/// fixed from then on; only the state changes, through mutations.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub state: State,
    pub mutations: BTreeMap<String, MutationFn>,
    pub actions: BTreeMap<String, ActionFn>,
    pub getters: BTreeMap<String, GetterFn>,
    pub namespace: Namespace,
    pub constants: Constants,
    pub bindings: Bindings,
    pub name_map: NameMap,
    /// Type name of the module the descriptor was built from
    pub type_name: &'static str,
    /// Composed children, keyed by their `$field` name
    pub children: BTreeMap<String, ModuleDescriptor>,
}

impl ModuleDescriptor {
    /// Reported namespace (terminator stripped), also the registration key
    pub fn key(&self) -> &str {
        self.namespace.trimmed()
    }

    /// Composed child by field name, with or without the `$` prefix
    pub fn child(&self, field: &str) -> Option<&ModuleDescriptor> {
        let field = field.strip_prefix('$').unwrap_or(field);
        self.children.get(&format!("${field}"))
    }

    /// Keys of one category, sorted
    pub fn keys(&self, category: Category) -> Vec<&str> {
        match category {
            Category::Action => self.actions.keys().map(String::as_str).collect(),
            Category::Mutation => self.mutations.keys().map(String::as_str).collect(),
            Category::Getter => self.getters.keys().map(String::as_str).collect(),
        }
    }

    /// Detach the composed children: `self` first, then descendants depth-first
    pub fn into_batch(mut self) -> Vec<ModuleDescriptor> {
        let children = std::mem::take(&mut self.children);
        let mut batch = vec![self];
        for (_, child) in children {
            batch.extend(child.into_batch());
        }
        batch
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("namespace", &self.namespace)
            .field("type_name", &self.type_name)
            .field("state", &self.state)
            .field("mutations", &self.mutations.keys())
            .field("actions", &self.actions.keys())
            .field("getters", &self.getters.keys())
            .field("constants", &self.constants)
            .field("children", &self.children)
            .finish()
    }
}
