//! Reactive store hosting registered modules
//!
//! The store owns every registered module's state and routes fully qualified
//! mutation, action and getter names to the module that declared them.
//! Modules can be registered at any time; nothing is ever unregistered.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::StoreConfig;
use crate::descriptor::{Bindings, Constants, ModuleDescriptor};
use crate::error::StoreError;
use crate::handle::ModuleHandle;
use crate::member::{ActionFn, Category, GetterFn, MutationFn};
use crate::middleware::{AfterGuard, Middleware, NoopMiddleware, Operation};
use crate::module::{instantiate, Module};
use crate::names::NameMap;
use crate::namespace::Namespace;
use crate::state::State;

/// Upper bound for the subscriber buffer; `broadcast::channel` rejects
/// capacities above `usize::MAX / 2`.
pub const MAX_EVENT_CAPACITY: usize = 1 << 16;

/// Broadcast to subscribers after every successful commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationEvent {
    /// Fully qualified mutation name
    pub mutation: String,
    /// Registration key of the module whose state changed
    pub module: String,
    pub payload: Value,
}

struct Route<H> {
    module: String,
    handler: H,
}

struct Slot {
    namespace: Namespace,
    type_name: &'static str,
    state: State,
    constants: Constants,
    bindings: Arc<Bindings>,
    name_map: Arc<NameMap>,
}

#[derive(Default)]
struct Registry {
    modules: BTreeMap<String, Slot>,
    mutations: HashMap<String, Route<MutationFn>>,
    actions: HashMap<String, Route<ActionFn>>,
    getters: HashMap<String, Route<GetterFn>>,
}

impl Registry {
    fn owner(&self, category: Category, key: &str) -> Option<&str> {
        let owner = match category {
            Category::Action => self.actions.get(key).map(|r| &r.module),
            Category::Mutation => self.mutations.get(key).map(|r| &r.module),
            Category::Getter => self.getters.get(key).map(|r| &r.module),
        };
        owner.map(String::as_str)
    }

    /// Validate a whole batch before any of it is inserted
    fn check(&self, batch: &[ModuleDescriptor]) -> Result<(), StoreError> {
        let mut modules = BTreeSet::new();
        let mut claimed: HashMap<(Category, &str), &str> = HashMap::new();

        for descriptor in batch {
            let module = descriptor.key();
            if self.modules.contains_key(module) || !modules.insert(module) {
                return Err(StoreError::ModuleExists(module.to_owned()));
            }

            for category in [Category::Mutation, Category::Action, Category::Getter] {
                for key in descriptor.keys(category) {
                    let owner = self
                        .owner(category, key)
                        .or_else(|| claimed.get(&(category, key)).copied());
                    if let Some(owner) = owner {
                        return Err(StoreError::KeyTaken {
                            category,
                            key: key.to_owned(),
                            owner: owner.to_owned(),
                        });
                    }
                    claimed.insert((category, key), module);
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, descriptor: ModuleDescriptor) {
        let module = descriptor.key().to_owned();

        for (key, handler) in descriptor.mutations {
            let route = Route {
                module: module.clone(),
                handler,
            };
            self.mutations.insert(key, route);
        }
        for (key, handler) in descriptor.actions {
            let route = Route {
                module: module.clone(),
                handler,
            };
            self.actions.insert(key, route);
        }
        for (key, handler) in descriptor.getters {
            let route = Route {
                module: module.clone(),
                handler,
            };
            self.getters.insert(key, route);
        }

        self.modules.insert(
            module,
            Slot {
                namespace: descriptor.namespace,
                type_name: descriptor.type_name,
                state: descriptor.state,
                constants: descriptor.constants,
                bindings: Arc::new(descriptor.bindings),
                name_map: Arc::new(descriptor.name_map),
            },
        );
    }
}

struct Inner {
    config: StoreConfig,
    registry: RwLock<Registry>,
    middleware: Arc<dyn Middleware>,
    events: broadcast::Sender<MutationEvent>,
}

/// Shared handle to the module registry.
///
/// Cloning is cheap; all clones see the same modules and state.
///
/// # Example
///
/// ```ignore
/// let store = Store::new();
/// let constants = store.register::<Test>()?;
///
/// store.commit("test:updateName", json!("abc"))?;
/// assert_eq!(store.getter("test:name"), Some(json!("abc")));
///
/// store.dispatch(&constants["UPDATE_NAME_ACTION"], json!("def")).await?;
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .field("modules", &self.namespaces())
            .finish()
    }
}

impl Store {
    /// Create a store with the default (strict) config
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_middleware(config, NoopMiddleware)
    }

    /// Create a store whose commits and dispatches pass through `middleware`
    pub fn with_middleware<M: Middleware + 'static>(config: StoreConfig, middleware: M) -> Self {
        let capacity = config.event_capacity.clamp(1, MAX_EVENT_CAPACITY);
        if capacity != config.event_capacity {
            tracing::warn!(
                requested = config.event_capacity,
                capacity,
                "event capacity out of range, clamped"
            );
        }
        let (events, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                registry: RwLock::new(Registry::default()),
                middleware: Arc::new(middleware),
                events,
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Build the descriptor tree of a default `M` with this store's config
    pub fn create<M: Module + Default>(&self) -> Result<ModuleDescriptor, StoreError> {
        Ok(instantiate(&M::default(), None, self.inner.config.collisions)?)
    }

    /// Create and register a default `M`, returning its constant map
    pub fn register<M: Module + Default>(&self) -> Result<Constants, StoreError> {
        self.register_instance(M::default())
    }

    /// Create and register an already constructed module
    pub fn register_instance<M: Module>(&self, module: M) -> Result<Constants, StoreError> {
        let descriptor = instantiate(&module, None, self.inner.config.collisions)?;
        self.register_module(descriptor)
    }

    /// Register a descriptor together with its composed children.
    ///
    /// The batch is checked as a whole first: if any module namespace is
    /// already registered, or any key is owned by another module, nothing is
    /// registered. Returns the host's constant map.
    pub fn register_module(&self, descriptor: ModuleDescriptor) -> Result<Constants, StoreError> {
        let constants = descriptor.constants.clone();
        let batch = descriptor.into_batch();

        let mut registry = self.inner.registry.write();
        registry.check(&batch)?;
        for descriptor in batch {
            tracing::debug!(
                module = descriptor.type_name,
                namespace = %descriptor.namespace,
                "registering module"
            );
            registry.insert(descriptor);
        }
        Ok(constants)
    }

    /// Commit a fully qualified mutation
    pub fn commit(&self, name: &str, payload: Value) -> Result<(), StoreError> {
        let op = Operation::commit(name, &payload);
        let guard = AfterGuard::enter(&*self.inner.middleware, op);
        let result = self.apply_mutation(name, payload.clone());
        guard.finish(result.is_ok());
        result
    }

    fn apply_mutation(&self, name: &str, payload: Value) -> Result<(), StoreError> {
        let applied = {
            let mut registry = self.inner.registry.write();
            let Registry {
                modules, mutations, ..
            } = &mut *registry;
            mutations.get(name).and_then(|route| {
                let slot = modules.get_mut(&route.module)?;
                (route.handler)(&mut slot.state, payload.clone());
                Some(route.module.clone())
            })
        };
        let Some(module) = applied else {
            return self.unknown(StoreError::UnknownMutation(name.to_owned()));
        };

        tracing::trace!(mutation = %name, module = %module, "committed");
        // No receivers is fine
        let _ = self.inner.events.send(MutationEvent {
            mutation: name.to_owned(),
            module,
            payload,
        });
        Ok(())
    }

    /// Dispatch a fully qualified action and wait for it to finish.
    ///
    /// The action's own error is returned as [`StoreError::Action`].
    pub async fn dispatch(&self, name: &str, payload: Value) -> Result<Value, StoreError> {
        let route = {
            let registry = self.inner.registry.read();
            registry
                .actions
                .get(name)
                .map(|r| (r.handler.clone(), r.module.clone()))
        };
        let Some((handler, module)) = route else {
            return self.unknown(StoreError::UnknownAction(name.to_owned()));
        };
        let Some(handle) = self.handle_for(&module) else {
            return self.unknown(StoreError::UnknownAction(name.to_owned()));
        };

        // `after` still runs if this future is dropped mid-action
        let op = Operation::dispatch(name, &payload);
        let guard = AfterGuard::enter(&*self.inner.middleware, op);
        let result = handler(handle, payload.clone())
            .await
            .map_err(StoreError::Action);
        guard.finish(result.is_ok());
        result
    }

    /// Read a fully qualified getter against current state
    pub fn getter(&self, name: &str) -> Option<Value> {
        let registry = self.inner.registry.read();
        let route = registry.getters.get(name)?;
        let slot = registry.modules.get(&route.module)?;
        Some((route.handler)(&slot.state))
    }

    /// Snapshot of a module's state (`test`, `test:` and `test:list` all work)
    pub fn state(&self, namespace: &str) -> Option<State> {
        let key = module_key(namespace);
        self.inner
            .registry
            .read()
            .modules
            .get(&key)
            .map(|slot| slot.state.clone())
    }

    /// Constant map of a registered module
    pub fn constants(&self, namespace: &str) -> Option<Constants> {
        let key = module_key(namespace);
        self.inner
            .registry
            .read()
            .modules
            .get(&key)
            .map(|slot| slot.constants.clone())
    }

    /// Facade of a registered module
    pub fn module(&self, namespace: &str) -> Option<ModuleHandle> {
        self.handle_for(&module_key(namespace))
    }

    pub fn has_module(&self, namespace: &str) -> bool {
        self.inner
            .registry
            .read()
            .modules
            .contains_key(&module_key(namespace))
    }

    /// Registration keys of all modules, sorted
    pub fn namespaces(&self) -> Vec<String> {
        self.inner.registry.read().modules.keys().cloned().collect()
    }

    /// Type name a module was registered from
    pub fn type_name(&self, namespace: &str) -> Option<&'static str> {
        self.inner
            .registry
            .read()
            .modules
            .get(&module_key(namespace))
            .map(|slot| slot.type_name)
    }

    /// Receive a [`MutationEvent`] for every commit from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MutationEvent> {
        self.inner.events.subscribe()
    }

    /// Commits as a stream (requires the `subscriptions` feature)
    #[cfg(feature = "subscriptions")]
    pub fn mutation_stream(&self) -> tokio_stream::wrappers::BroadcastStream<MutationEvent> {
        tokio_stream::wrappers::BroadcastStream::new(self.subscribe())
    }

    fn handle_for(&self, key: &str) -> Option<ModuleHandle> {
        let registry = self.inner.registry.read();
        let slot = registry.modules.get(key)?;
        Some(ModuleHandle::new(
            self.clone(),
            slot.namespace.clone(),
            slot.name_map.clone(),
            slot.bindings.clone(),
        ))
    }

    fn unknown<T: Default>(&self, error: StoreError) -> Result<T, StoreError> {
        if self.inner.config.strict {
            return Err(error);
        }
        tracing::error!(error = %error, "ignoring unknown name");
        Ok(T::default())
    }
}

fn module_key(namespace: &str) -> String {
    Namespace::new(namespace).trimmed().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Members;
    use crate::module::ModuleMeta;
    use crate::state;
    use serde_json::json;
    use std::sync::{mpsc, OnceLock};
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Counter;

    impl ModuleMeta for Counter {
        fn type_name(&self) -> &'static str {
            "Counter"
        }

        fn namespace(&self) -> Namespace {
            Namespace::new("counter:")
        }
    }

    impl Module for Counter {
        fn state(&self) -> State {
            state::from_value(json!({ "count": 0 }))
        }

        fn declare(&self, members: &mut Members) {
            members
                .mutation("increment", |state, by| {
                    let count = state::read(state, "count").as_i64().unwrap_or(0);
                    state.insert("count".into(), json!(count + by.as_i64().unwrap_or(1)));
                })
                .getter("doubled", |state| {
                    json!(state::read(state, "count").as_i64().unwrap_or(0) * 2)
                });
        }
    }

    #[test]
    fn test_register_and_commit() {
        let store = Store::new();
        let constants = store.register::<Counter>().unwrap();
        assert_eq!(constants["COUNT"], "counter:count");
        assert_eq!(constants["DOUBLED"], "counter:doubled");

        store.commit("counter:increment", json!(2)).unwrap();
        store.commit("counter:increment", json!(3)).unwrap();

        assert_eq!(store.getter("counter:count"), Some(json!(5)));
        assert_eq!(store.getter("counter:doubled"), Some(json!(10)));
        assert_eq!(store.state("counter").unwrap()["count"], json!(5));
        assert_eq!(store.state("counter:").unwrap()["count"], json!(5));
    }

    #[test]
    fn test_register_twice_fails() {
        let store = Store::new();
        store.register::<Counter>().unwrap();
        let err = store.register::<Counter>().unwrap_err();
        assert!(matches!(err, StoreError::ModuleExists(ref m) if m == "counter"));
    }

    #[test]
    fn test_unknown_names_strict_and_lenient() {
        let strict = Store::new();
        assert!(matches!(
            strict.commit("nope", Value::Null),
            Err(StoreError::UnknownMutation(_))
        ));
        assert_eq!(strict.getter("nope"), None);

        let lenient = Store::with_config(StoreConfig::lenient());
        assert!(lenient.commit("nope", Value::Null).is_ok());
    }

    #[test]
    fn test_subscribers_see_commits() {
        let store = Store::new();
        store.register::<Counter>().unwrap();
        let mut events = store.subscribe();

        store.commit("counter:updateCount", json!(7)).unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.mutation, "counter:updateCount");
        assert_eq!(event.module, "counter");
        assert_eq!(event.payload, json!(7));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_failed_commit_is_not_broadcast() {
        let store = Store::with_config(StoreConfig::lenient());
        let mut events = store.subscribe();
        store.commit("missing", json!(1)).unwrap();
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_module_lookup() {
        let store = Store::new();
        store.register::<Counter>().unwrap();
        assert!(store.has_module("counter"));
        assert!(store.has_module("counter:"));
        assert!(!store.has_module("count"));
        assert_eq!(store.namespaces(), vec!["counter".to_string()]);
        assert_eq!(store.type_name("counter"), Some("Counter"));
        assert!(store.module("counter").is_some());
        assert!(store.constants("counter").unwrap().contains_key("COUNT"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_action() {
        let store = Store::new();
        let err = store.dispatch("counter:missing", Value::Null).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownAction(ref n) if n == "counter:missing"));

        let lenient = Store::with_config(StoreConfig::lenient());
        assert_eq!(lenient.dispatch("missing", Value::Null).await.unwrap(), Value::Null);
    }

    /// Overwrites the count after every successful increment
    struct Reset {
        store: Arc<OnceLock<Store>>,
    }

    impl Middleware for Reset {
        fn before(&self, _op: &Operation<'_>) {}

        fn after(&self, op: &Operation<'_>, succeeded: bool) {
            if succeeded && op.name == "counter:increment" {
                if let Some(store) = self.store.get() {
                    store.commit("counter:updateCount", json!(100)).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_middleware_can_commit_from_after() {
        let cell = Arc::new(OnceLock::new());
        let store = Store::with_middleware(
            StoreConfig::default(),
            Reset {
                store: cell.clone(),
            },
        );
        store.register::<Counter>().unwrap();
        cell.set(store.clone()).unwrap();

        let (done, finished) = mpsc::channel();
        let committer = store.clone();
        thread::spawn(move || {
            let _ = done.send(committer.commit("counter:increment", json!(1)));
        });

        let result = finished.recv_timeout(Duration::from_secs(5));
        assert!(matches!(result, Ok(Ok(()))), "commit did not return");
        assert_eq!(store.getter("counter:count"), Some(json!(100)));
    }

    #[test]
    fn test_event_capacity_is_clamped() {
        let config =
            StoreConfig::from_json(r#"{ "event_capacity": 18446744073709551615 }"#).unwrap();
        let store = Store::with_config(config);
        store.register::<Counter>().unwrap();
        let mut events = store.subscribe();

        store.commit("counter:increment", json!(1)).unwrap();
        assert_eq!(events.try_recv().unwrap().mutation, "counter:increment");

        let store = Store::with_config(StoreConfig::default().with_event_capacity(0));
        store.register::<Counter>().unwrap();
        store.commit("counter:increment", json!(1)).unwrap();
    }

    #[cfg(feature = "subscriptions")]
    #[tokio::test]
    async fn test_mutation_stream() {
        use tokio_stream::StreamExt;

        let store = Store::new();
        store.register::<Counter>().unwrap();
        let mut stream = store.mutation_stream();

        store.commit("counter:increment", json!(1)).unwrap();
        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(event.mutation, "counter:increment");
        assert_eq!(store.getter("counter:count"), Some(json!(1)));
    }
}
