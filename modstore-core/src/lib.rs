//! Core traits and types for modstore
//!
//! This crate turns a declared module (state, actions, mutations, getters)
//! into a namespaced store module, and hosts such modules in a [`Store`].
//!
//! # Core Concepts
//!
//! - **Module**: a type with initial state and a [`Members`] table
//! - **Namespace**: `test:list:`-style prefix shared by a module's keys
//! - **Descriptor**: the synthesized handler maps plus the constant map
//! - **Composition**: nesting a module under `<host namespace><field>:`
//! - **Store**: registry that routes commits, dispatches and getter reads
//! - **ModuleHandle**: facade through which actions drive their module
//!
//! # Basic Example
//!
//! ```ignore
//! use modstore_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Test;
//!
//! impl ModuleMeta for Test {
//!     fn type_name(&self) -> &'static str { "Test" }
//!     fn namespace(&self) -> Namespace { Namespace::new("test:") }
//! }
//!
//! async fn update_name_action(module: ModuleHandle, name: Value) -> ActionResult {
//!     module.commit("updateName", name)?;
//!     Ok(Value::Null)
//! }
//!
//! impl Module for Test {
//!     fn state(&self) -> State {
//!         state::from_value(json!({ "name": null }))
//!     }
//!
//!     fn declare(&self, members: &mut Members) {
//!         members.action("updateNameAction", update_name_action);
//!     }
//! }
//!
//! let store = Store::new();
//! let constants = Test::register(&store)?;
//! store.dispatch(&constants["UPDATE_NAME_ACTION"], json!("abc")).await?;
//! assert_eq!(store.getter("test:name"), Some(json!("abc")));
//! ```
//!
//! Actions never touch state directly: they commit mutations through their
//! [`ModuleHandle`], and mutations are plain `(state, payload)` functions.

pub mod casing;
pub mod compose;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod logger;
pub mod member;
pub mod middleware;
pub mod module;
pub mod names;
pub mod namespace;
pub mod state;
pub mod store;
pub mod synth;
pub mod testing;

pub use compose::{composition, Composed, Composition, Compositions};
pub use config::{CollisionPolicy, StoreConfig};
pub use descriptor::{Bindings, Constants, ModuleDescriptor};
pub use error::{StoreError, SynthError};
pub use handle::ModuleHandle;
pub use member::{
    action_fn, getter_fn, mutation_fn, ActionFn, ActionResult, BoxFuture, Category, Entry,
    GetterFn, Members, MutationFn,
};
pub use middleware::{ComposedMiddleware, Middleware, NoopMiddleware, Operation, OperationKind};
pub use module::{create, instantiate, Module, ModuleMeta};
pub use names::NameMap;
pub use namespace::Namespace;
pub use state::State;
pub use store::{MutationEvent, Store, MAX_EVENT_CAPACITY};
pub use synth::synthesize;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::state::{self, State};
    pub use crate::{
        composition, ActionResult, Category, CollisionPolicy, Compositions, Constants, Members,
        Module, ModuleHandle, ModuleMeta, NameMap, Namespace, Store, StoreConfig, StoreError,
        SynthError,
    };
    pub use serde_json::{json, Value};
}
