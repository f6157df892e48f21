//! Declared modules
//!
//! A module type describes its identity through [`ModuleMeta`] (usually
//! derived) and its members through [`Module`]. Nothing is discovered at
//! runtime: [`Module::declare`] lists every action, mutation and getter
//! explicitly, and [`Module::compose`] lists nested modules.

use std::collections::BTreeMap;

use crate::compose::Compositions;
use crate::config::CollisionPolicy;
use crate::descriptor::{Constants, ModuleDescriptor};
use crate::error::{StoreError, SynthError};
use crate::member::Members;
use crate::names::NameMap;
use crate::namespace::Namespace;
use crate::state::State;
use crate::store::Store;
use crate::synth;

/// Identity of a module type.
///
/// Use `#[derive(ModuleMeta)]` from `modstore-macros` to implement it:
///
/// ```ignore
/// #[derive(Default, ModuleMeta)]
/// #[module(namespace = "test:", rename(from = "updateNameAction", to = "rename"))]
/// struct Test;
/// ```
pub trait ModuleMeta {
    /// Type name, used to derive composition field names
    fn type_name(&self) -> &'static str;

    /// Namespace the module registers under when it is not composed
    fn namespace(&self) -> Namespace {
        Namespace::root()
    }

    /// Overrides from declared member names to external names
    fn name_map(&self) -> NameMap {
        NameMap::new()
    }
}

/// A store module: initial state plus declared members.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, ModuleMeta)]
/// #[module(namespace = "test:")]
/// struct Test;
///
/// async fn update_name_action(module: ModuleHandle, name: Value) -> ActionResult {
///     module.mutate("updateName", name)?;
///     Ok(Value::Null)
/// }
///
/// impl Module for Test {
///     fn state(&self) -> State {
///         state::from_value(json!({ "name": null }))
///     }
///
///     fn declare(&self, members: &mut Members) {
///         members.action("updateNameAction", update_name_action);
///     }
/// }
///
/// let store = Store::new();
/// let constants = Test::register(&store)?;
/// assert_eq!(constants["UPDATE_NAME_ACTION"], "test:updateNameAction");
/// ```
pub trait Module: ModuleMeta + Send + Sync + 'static {
    /// Initial state; every top-level key gets a default mutation and getter
    fn state(&self) -> State {
        State::new()
    }

    /// List the module's actions, mutations and getters
    fn declare(&self, members: &mut Members);

    /// List nested modules
    fn compose(&self, _compositions: &mut Compositions) -> Result<(), SynthError> {
        Ok(())
    }

    /// Build the descriptor without registering it
    fn create() -> Result<ModuleDescriptor, SynthError>
    where
        Self: Sized + Default,
    {
        create::<Self>()
    }

    /// Build and register into `store`, returning the constant map
    fn register(store: &Store) -> Result<Constants, StoreError>
    where
        Self: Sized + Default,
    {
        store.register::<Self>()
    }
}

/// Build the descriptor of a default-constructed `M` under its own namespace
pub fn create<M: Module + Default>() -> Result<ModuleDescriptor, SynthError> {
    instantiate(&M::default(), None, CollisionPolicy::default())
}

/// Build the descriptor tree of `module`.
///
/// `namespace` replaces the module's own namespace when given; composed
/// children always get `<namespace><field>:`. Compositions are collected
/// first, so a duplicate field fails before anything is synthesized.
pub fn instantiate(
    module: &dyn Module,
    namespace: Option<Namespace>,
    policy: CollisionPolicy,
) -> Result<ModuleDescriptor, SynthError> {
    let namespace = namespace.unwrap_or_else(|| module.namespace());

    let mut members = Members::new();
    module.declare(&mut members);

    let mut compositions = Compositions::new(module.type_name(), &members);
    module.compose(&mut compositions)?;

    let mut descriptor = synth::synthesize(module, &members, namespace.clone(), policy)?;

    let mut children = BTreeMap::new();
    for (field, child) in compositions.into_entries() {
        let child_namespace = namespace.child(&field);
        tracing::debug!(
            host = module.type_name(),
            child = child.type_name(),
            namespace = %child_namespace,
            "composing module"
        );
        let child = instantiate(child.as_ref(), Some(child_namespace), policy)?;
        children.insert(format!("${field}"), child);
    }
    descriptor.children = children;

    Ok(descriptor)
}
