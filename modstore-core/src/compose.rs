//! Module composition
//!
//! A host module nests child modules under `<host namespace><field>:`. The
//! child's own namespace is ignored: composition always decides where a child
//! lives. Children are resolved once, when the host is instantiated, and are
//! registered together with it.
//!
//! Two equivalent ways to compose:
//!
//! ```ignore
//! // 1. from the host's own `compose` hook
//! impl Module for Test {
//!     fn compose(&self, compositions: &mut Compositions) -> Result<(), SynthError> {
//!         compositions.add::<List>()?;
//!         Ok(())
//!     }
//!     // ...
//! }
//!
//! // 2. as a transformer applied to an existing host
//! let host = composition::<List>(Some("items")).apply(Test::default());
//! store.register_instance(host)?;
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::casing::camel_case;
use crate::error::SynthError;
use crate::member::{Category, Members};
use crate::module::{Module, ModuleMeta};
use crate::names::NameMap;
use crate::namespace::Namespace;
use crate::state::State;

/// Children collected from a host's [`Module::compose`] hook
pub struct Compositions {
    host: &'static str,
    reserved: BTreeSet<String>,
    entries: Vec<(String, Box<dyn Module>)>,
}

impl Compositions {
    pub(crate) fn new(host: &'static str, members: &Members) -> Self {
        let reserved = [Category::Action, Category::Mutation, Category::Getter]
            .into_iter()
            .flat_map(|c| members.names(c))
            .map(str::to_owned)
            .collect();
        Self {
            host,
            reserved,
            entries: Vec::new(),
        }
    }

    /// Compose a default `C` under the camelCase of its type name
    pub fn add<C: Module + Default>(&mut self) -> Result<&mut Self, SynthError> {
        self.add_boxed(Box::new(C::default()), None)
    }

    /// Compose a default `C` under an explicit field name
    pub fn add_named<C: Module + Default>(
        &mut self,
        field: impl Into<String>,
    ) -> Result<&mut Self, SynthError> {
        self.add_boxed(Box::new(C::default()), Some(field.into()))
    }

    /// Compose an already constructed child
    pub fn add_instance<C: Module>(
        &mut self,
        child: C,
        field: Option<String>,
    ) -> Result<&mut Self, SynthError> {
        self.add_boxed(Box::new(child), field)
    }

    /// Compose a boxed child.
    ///
    /// Fails with [`SynthError::DuplicateField`] when `$field` is already
    /// taken on the host, by another child or by a declared member.
    pub fn add_boxed(
        &mut self,
        child: Box<dyn Module>,
        field: Option<String>,
    ) -> Result<&mut Self, SynthError> {
        let field = field.unwrap_or_else(|| camel_case(child.type_name()));
        let internal = format!("${field}");

        if self.reserved.contains(&internal) || self.entries.iter().any(|(f, _)| *f == field) {
            return Err(SynthError::DuplicateField {
                field: internal,
                host: self.host,
            });
        }

        self.entries.push((field, child));
        Ok(self)
    }

    /// Field names in composition order
    pub fn fields(&self) -> Vec<&str> {
        self.entries.iter().map(|(f, _)| f.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Box<dyn Module>)> {
        self.entries
    }
}

impl fmt::Debug for Compositions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compositions")
            .field("host", &self.host)
            .field("fields", &self.fields())
            .finish()
    }
}

/// A pending composition of one child type, see [`composition`]
#[derive(Clone)]
pub struct Composition {
    factory: Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>,
    field: Option<String>,
}

/// Compose `C` into a host, under `field` or the camelCase of `C`'s type name.
///
/// The returned value is applied to a host with [`Composition::apply`].
pub fn composition<C: Module + Default>(field: Option<&str>) -> Composition {
    Composition {
        factory: Arc::new(|| -> Box<dyn Module> { Box::new(C::default()) }),
        field: field.map(str::to_owned),
    }
}

impl Composition {
    /// Field name given at construction, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Wrap `host` so that instantiating it also composes this child
    pub fn apply<H: Module>(self, host: H) -> Composed<H> {
        Composed {
            host,
            compositions: vec![self],
        }
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// A host module extended with extra compositions.
///
/// Identity, state and members are the host's; the host's own compositions
/// run first, then the added ones in order.
pub struct Composed<H> {
    host: H,
    compositions: Vec<Composition>,
}

impl<H: Module> Composed<H> {
    /// Add one more composition
    pub fn with(mut self, composition: Composition) -> Self {
        self.compositions.push(composition);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}

impl<H: Module> ModuleMeta for Composed<H> {
    fn type_name(&self) -> &'static str {
        self.host.type_name()
    }

    fn namespace(&self) -> Namespace {
        self.host.namespace()
    }

    fn name_map(&self) -> NameMap {
        self.host.name_map()
    }
}

impl<H: Module> Module for Composed<H> {
    fn state(&self) -> State {
        self.host.state()
    }

    fn declare(&self, members: &mut Members) {
        self.host.declare(members);
    }

    fn compose(&self, compositions: &mut Compositions) -> Result<(), SynthError> {
        self.host.compose(compositions)?;
        for composition in &self.compositions {
            compositions.add_boxed((composition.factory)(), composition.field.clone())?;
        }
        Ok(())
    }
}
