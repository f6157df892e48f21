//! Test utilities for store modules
//!
//! [`TestStore`] wraps a [`Store`] with a subscriber that records every
//! commit, and the `*_committed!` macros make assertions over the recorded
//! [`MutationEvent`]s.
//!
//! # Example
//!
//! ```ignore
//! use modstore::testing::*;
//!
//! #[tokio::test]
//! async fn test_update_name() {
//!     let store = TestStore::new();
//!     let constants = store.register::<Test>();
//!
//!     store.dispatch(&constants["UPDATE_NAME_ACTION"], json!("abc")).await.unwrap();
//!
//!     let commits = store.drain_commits();
//!     assert_committed!(commits, "test:updateName", json!("abc"));
//!     assert_not_committed!(commits, "test:list:updateList");
//! }
//! ```

use std::ops::Deref;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::config::StoreConfig;
use crate::descriptor::Constants;
use crate::handle::ModuleHandle;
use crate::module::Module;
use crate::store::{MutationEvent, Store};

/// A store that records its commits for later assertions.
///
/// Derefs to [`Store`], so `commit`, `dispatch` and `getter` are available
/// directly.
pub struct TestStore {
    store: Store,
    commits: Mutex<broadcast::Receiver<MutationEvent>>,
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStore {
    /// Strict store with the default config
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::from_store(Store::with_config(config))
    }

    /// Record commits of an existing store from now on
    pub fn from_store(store: Store) -> Self {
        let commits = Mutex::new(store.subscribe());
        Self { store, commits }
    }

    /// Register a default `M`, panicking on failure
    pub fn register<M: Module + Default>(&self) -> Constants {
        match self.store.register::<M>() {
            Ok(constants) => constants,
            Err(e) => panic!("failed to register {}: {e}", std::any::type_name::<M>()),
        }
    }

    /// Facade of a registered module, panicking if it is missing
    pub fn handle(&self, namespace: &str) -> ModuleHandle {
        match self.store.module(namespace) {
            Some(handle) => handle,
            None => panic!("no module registered under `{namespace}`"),
        }
    }

    /// Take every commit recorded since the last drain.
    ///
    /// If the subscriber fell behind, the oldest commits are skipped.
    pub fn drain_commits(&self) -> Vec<MutationEvent> {
        let mut receiver = self.commits.lock();
        let mut commits = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(event) => commits.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "test store lagged behind commits");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        commits
    }

    /// Whether any commit is waiting to be drained
    pub fn has_commits(&self) -> bool {
        !self.commits.lock().is_empty()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Store {
        &self.store
    }
}

/// Assert that a mutation was committed, optionally with a given payload.
///
/// ```ignore
/// let commits = store.drain_commits();
/// assert_committed!(commits, "test:updateName");
/// assert_committed!(commits, "test:updateName", json!("abc"));
/// ```
#[macro_export]
macro_rules! assert_committed {
    ($commits:expr, $name:expr) => {
        assert!(
            $commits.iter().any(|c| c.mutation == $name),
            "Expected `{}` to be committed, but got: {:?}",
            $name,
            $commits.iter().map(|c| c.mutation.as_str()).collect::<Vec<_>>()
        );
    };
    ($commits:expr, $name:expr, $payload:expr) => {
        assert!(
            $commits
                .iter()
                .any(|c| c.mutation == $name && c.payload == $payload),
            "Expected `{}` to be committed with {}, but got: {:?}",
            $name,
            $payload,
            $commits
        );
    };
}

/// Assert that a mutation was NOT committed.
#[macro_export]
macro_rules! assert_not_committed {
    ($commits:expr, $name:expr) => {
        assert!(
            !$commits.iter().any(|c| c.mutation == $name),
            "Expected `{}` NOT to be committed, but it was",
            $name
        );
    };
}

/// Find the first commit of a mutation.
///
/// ```ignore
/// let commit = find_committed!(commits, "test:updateName").unwrap();
/// assert_eq!(commit.payload, json!("abc"));
/// ```
#[macro_export]
macro_rules! find_committed {
    ($commits:expr, $name:expr) => {
        $commits.iter().find(|c| c.mutation == $name)
    };
}

/// Count the commits of a mutation.
#[macro_export]
macro_rules! count_committed {
    ($commits:expr, $name:expr) => {
        $commits.iter().filter(|c| c.mutation == $name).count()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Members;
    use crate::module::ModuleMeta;
    use crate::namespace::Namespace;
    use crate::state::{self, State};
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Cart;

    impl ModuleMeta for Cart {
        fn type_name(&self) -> &'static str {
            "Cart"
        }

        fn namespace(&self) -> Namespace {
            Namespace::new("cart:")
        }
    }

    async fn checkout(cart: ModuleHandle, _: Value) -> crate::ActionResult {
        cart.commit("updateItems", json!([]))?;
        cart.commit("updateTotal", json!(0))?;
        Ok(Value::Null)
    }

    impl Module for Cart {
        fn state(&self) -> State {
            state::from_value(json!({ "items": [], "total": 0 }))
        }

        fn declare(&self, members: &mut Members) {
            members.action("checkout", checkout);
        }
    }

    #[tokio::test]
    async fn test_records_commits_in_order() {
        let store = TestStore::new();
        let constants = store.register::<Cart>();

        store.commit("cart:updateTotal", json!(12)).unwrap();
        store.dispatch(&constants["CHECKOUT"], Value::Null).await.unwrap();

        let commits = store.drain_commits();
        assert_eq!(commits.len(), 3);
        assert_committed!(commits, "cart:updateItems");
        assert_committed!(commits, "cart:updateTotal", json!(12));
        assert_not_committed!(commits, "cart:checkout");
        assert_eq!(count_committed!(commits, "cart:updateTotal"), 2);
        assert_eq!(
            find_committed!(commits, "cart:updateTotal").unwrap().payload,
            json!(12)
        );

        assert!(!store.has_commits());
        assert!(store.drain_commits().is_empty());
    }

    #[test]
    fn test_lagging_subscriber_keeps_newest() {
        let store = TestStore::with_config(StoreConfig::default().with_event_capacity(2));
        store.register::<Cart>();
        for total in 0..5 {
            store.commit("cart:updateTotal", json!(total)).unwrap();
        }

        let commits = store.drain_commits();
        let totals: Vec<_> = commits.iter().map(|c| c.payload.clone()).collect();
        assert_eq!(totals, vec![json!(3), json!(4)]);
    }

    #[test]
    fn test_handle_lookup() {
        let store = TestStore::new();
        store.register::<Cart>();
        assert_eq!(store.handle("cart").namespace().as_str(), "cart:");
    }
}
