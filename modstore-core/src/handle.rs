//! Generated facade of a registered module

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::casing::update_member;
use crate::descriptor::Bindings;
use crate::error::StoreError;
use crate::member::Category;
use crate::names::NameMap;
use crate::namespace::Namespace;
use crate::state::State;
use crate::store::Store;

/// Handle through which actions and application code drive one module.
///
/// `dispatch`, `commit` and `getter` are dual-mode: a name that is a member
/// of this module goes to the module's own key, anything else is passed to
/// the store as a fully qualified key. So inside a `test:` action,
/// `commit("updateName", ..)` hits `test:updateName` while
/// `commit("other:reset", ..)` reaches another module.
#[derive(Clone)]
pub struct ModuleHandle {
    store: Store,
    namespace: Namespace,
    name_map: Arc<NameMap>,
    bindings: Arc<Bindings>,
}

impl ModuleHandle {
    pub(crate) fn new(
        store: Store,
        namespace: Namespace,
        name_map: Arc<NameMap>,
        bindings: Arc<Bindings>,
    ) -> Self {
        Self {
            store,
            namespace,
            name_map,
            bindings,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The store this module is registered in
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Own key for `name` in `category`, if `name` is one of this module's members
    fn own_key(&self, category: Category, name: &str) -> Option<String> {
        if let Some(key) = self.bindings.key(category, name) {
            return Some(key.to_owned());
        }
        // Callers may also use the external (renamed) name
        let key = self.namespace.qualify(self.name_map.resolve(name));
        let bound = match category {
            Category::Action => &self.bindings.actions,
            Category::Mutation => &self.bindings.mutations,
            Category::Getter => &self.bindings.getters,
        };
        bound.values().any(|k| *k == key).then_some(key)
    }

    fn target(&self, category: Category, name: &str) -> String {
        self.own_key(category, name)
            .unwrap_or_else(|| name.to_owned())
    }

    /// Dispatch an own action by member name, or any action by full key
    pub async fn dispatch(&self, name: &str, payload: Value) -> Result<Value, StoreError> {
        let key = self.target(Category::Action, name);
        self.store.dispatch(&key, payload).await
    }

    /// Commit an own mutation by member name, or any mutation by full key
    pub fn commit(&self, name: &str, payload: Value) -> Result<(), StoreError> {
        let key = self.target(Category::Mutation, name);
        self.store.commit(&key, payload)
    }

    /// Read an own getter by member name, or any getter by full key.
    ///
    /// Names that are not members are resolved through the name map first.
    pub fn getter(&self, name: &str) -> Option<Value> {
        let key = self
            .own_key(Category::Getter, name)
            .unwrap_or_else(|| self.name_map.resolve(name).to_owned());
        self.store.getter(&key)
    }

    /// Run one of this module's actions by member name
    pub async fn call(&self, member: &str, payload: Value) -> Result<Value, StoreError> {
        let key = self.member_key(Category::Action, member)?;
        self.store.dispatch(&key, payload).await
    }

    /// Commit one of this module's mutations by member name
    pub fn mutate(&self, member: &str, payload: Value) -> Result<(), StoreError> {
        let key = self.member_key(Category::Mutation, member)?;
        self.store.commit(&key, payload)
    }

    /// Replace a top-level state key through its `update<Key>` mutation
    pub fn update(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.mutate(&update_member(key), value)
    }

    /// Live read of one of this module's getters by member name
    pub fn get(&self, member: &str) -> Result<Value, StoreError> {
        let key = self.member_key(Category::Getter, member)?;
        self.store
            .getter(&key)
            .ok_or_else(|| self.unknown_member(Category::Getter, member))
    }

    /// Snapshot of this module's state
    pub fn state(&self) -> State {
        self.store
            .state(self.namespace.as_str())
            .unwrap_or_default()
    }

    /// Handle of a composed child, by field name (`$` prefix optional)
    pub fn child(&self, field: &str) -> Option<ModuleHandle> {
        let field = field.strip_prefix('$').unwrap_or(field);
        self.store.module(self.namespace.child(field).as_str())
    }

    fn member_key(&self, category: Category, member: &str) -> Result<String, StoreError> {
        self.own_key(category, member)
            .ok_or_else(|| self.unknown_member(category, member))
    }

    fn unknown_member(&self, category: Category, member: &str) -> StoreError {
        StoreError::UnknownMember {
            category,
            member: member.to_owned(),
            namespace: self.namespace.trimmed().to_owned(),
        }
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("namespace", &self.namespace)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::Compositions;
    use crate::error::SynthError;
    use crate::member::{ActionResult, Members};
    use crate::module::{Module, ModuleMeta};
    use crate::state;
    use serde_json::json;

    #[derive(Default)]
    struct Rows;

    impl ModuleMeta for Rows {
        fn type_name(&self) -> &'static str {
            "Rows"
        }
    }

    impl Module for Rows {
        fn state(&self) -> State {
            state::from_value(json!({ "rows": [] }))
        }

        fn declare(&self, _members: &mut Members) {}
    }

    #[derive(Default)]
    struct Profile;

    impl ModuleMeta for Profile {
        fn type_name(&self) -> &'static str {
            "Profile"
        }

        fn namespace(&self) -> Namespace {
            Namespace::new("profile:")
        }

        fn name_map(&self) -> NameMap {
            NameMap::new().rename("rename", "setName")
        }
    }

    async fn rename(module: ModuleHandle, name: Value) -> ActionResult {
        module.commit("updateName", name)?;
        module.commit("log:push", json!("renamed"))?;
        Ok(module.get("name")?)
    }

    impl Module for Profile {
        fn state(&self) -> State {
            state::from_value(json!({ "name": null }))
        }

        fn declare(&self, members: &mut Members) {
            members.action("rename", rename);
        }

        fn compose(&self, compositions: &mut Compositions) -> Result<(), SynthError> {
            compositions.add::<Rows>()?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Log;

    impl ModuleMeta for Log {
        fn type_name(&self) -> &'static str {
            "Log"
        }

        fn namespace(&self) -> Namespace {
            Namespace::new("log:")
        }
    }

    impl Module for Log {
        fn state(&self) -> State {
            state::from_value(json!({ "entries": [] }))
        }

        fn declare(&self, members: &mut Members) {
            members.mutation("push", |state, entry| {
                if let Some(Value::Array(entries)) = state.get_mut("entries") {
                    entries.push(entry);
                }
            });
        }
    }

    fn store() -> Store {
        let store = Store::new();
        store.register::<Profile>().unwrap();
        store.register::<Log>().unwrap();
        store
    }

    #[tokio::test]
    async fn test_own_and_foreign_names() {
        let store = store();
        let profile = store.module("profile").unwrap();

        let out = profile.dispatch("rename", json!("abc")).await.unwrap();
        assert_eq!(out, json!("abc"));
        assert_eq!(store.getter("profile:name"), Some(json!("abc")));
        assert_eq!(store.getter("log:entries"), Some(json!(["renamed"])));
    }

    #[tokio::test]
    async fn test_external_name_and_full_key_reach_the_same_action() {
        let store = store();
        let profile = store.module("profile").unwrap();

        profile.dispatch("setName", json!("a")).await.unwrap();
        assert_eq!(profile.get("name").unwrap(), json!("a"));
        profile.dispatch("profile:setName", json!("b")).await.unwrap();
        assert_eq!(profile.get("name").unwrap(), json!("b"));
        profile.call("rename", json!("c")).await.unwrap();
        assert_eq!(profile.getter("name"), Some(json!("c")));
    }

    #[test]
    fn test_convenience_calls() {
        let store = store();
        let profile = store.module("profile:").unwrap();

        profile.update("name", json!("x")).unwrap();
        assert_eq!(profile.state()["name"], json!("x"));

        let err = profile.mutate("missing", Value::Null).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnknownMember { category: Category::Mutation, ref namespace, .. }
                if namespace == "profile"
        ));
        assert!(profile.get("nope").is_err());
    }

    #[test]
    fn test_getter_passes_foreign_names_through() {
        let store = store();
        let profile = store.module("profile").unwrap();
        assert_eq!(profile.getter("log:entries"), Some(json!([])));
        assert_eq!(profile.getter("nowhere"), None);
    }

    #[test]
    fn test_child_handle() {
        let store = store();
        let profile = store.module("profile").unwrap();

        let rows = profile.child("rows").unwrap();
        assert_eq!(rows.namespace().as_str(), "profile:rows:");
        rows.update("rows", json!([1, 2])).unwrap();
        assert_eq!(store.getter("profile:rows:rows"), Some(json!([1, 2])));
        assert!(profile.child("$rows").is_some());
        assert!(profile.child("missing").is_none());
    }
}
