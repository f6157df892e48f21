//! modstore: namespaced store modules from declared members
//!
//! Declare a module's state, actions, mutations and getters once; modstore
//! namespaces them, derives an `update<Key>` mutation and a getter for every
//! state key, builds a constant map for dispatch names, and nests composed
//! modules under `<host namespace><field>:`.
//!
//! # Example
//! ```ignore
//! use modstore::prelude::*;
//!
//! #[derive(Default, ModuleMeta)]
//! #[module(namespace = "list:")]
//! struct List;
//!
//! impl Module for List {
//!     fn state(&self) -> State {
//!         state::from_value(json!({ "list": ["123"] }))
//!     }
//!
//!     fn declare(&self, _members: &mut Members) {}
//! }
//!
//! #[derive(Default, ModuleMeta)]
//! #[module(namespace = "test:")]
//! struct Test;
//!
//! impl Module for Test {
//!     fn state(&self) -> State {
//!         state::from_value(json!({ "name": null }))
//!     }
//!
//!     fn declare(&self, _members: &mut Members) {}
//!
//!     fn compose(&self, compositions: &mut Compositions) -> Result<(), SynthError> {
//!         compositions.add::<List>()?;
//!         Ok(())
//!     }
//! }
//!
//! let store = Store::new();
//! Test::register(&store)?;
//! store.commit("test:list:updateList", json!([]))?;
//! ```

// Re-export everything from core
pub use modstore_core::*;

// Re-export derive macros
pub use modstore_macros::ModuleMeta;

/// Prelude for convenient imports
pub mod prelude {
    pub use modstore_core::prelude::*;

    // Derive macros
    pub use modstore_macros::ModuleMeta;
}
