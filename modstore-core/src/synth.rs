//! Module synthesis
//!
//! Turns a module's declared members into namespaced handler maps, derives
//! the per-key default mutations and getters, and builds the constant map.
//! Categories are processed in a fixed order: mutations, actions, getters.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::casing::{constant_case, snake_constant_case, update_member};
use crate::config::CollisionPolicy;
use crate::descriptor::{Bindings, Constants, ModuleDescriptor};
use crate::error::SynthError;
use crate::member::{ActionFn, Category, Entry, GetterFn, Members, MutationFn};
use crate::module::Module;
use crate::names::NameMap;
use crate::namespace::Namespace;
use crate::state::{self, State};

use serde_json::Value;

/// Inputs shared by the per-category passes
struct Scan<'a> {
    namespace: &'a Namespace,
    names: &'a NameMap,
    members: &'a Members,
    state: &'a State,
    policy: CollisionPolicy,
}

impl Scan<'_> {
    /// External name and namespaced key of a declared member
    fn resolve(&self, member: &str) -> (String, String) {
        let external = self.names.resolve(member);
        (external.to_owned(), self.namespace.qualify(external))
    }
}

/// Build the descriptor of `module` under `namespace`.
///
/// `members` is the module's declared table; composed children are not
/// handled here (see [`instantiate`](crate::instantiate)).
pub fn synthesize(
    module: &dyn Module,
    members: &Members,
    namespace: Namespace,
    policy: CollisionPolicy,
) -> Result<ModuleDescriptor, SynthError> {
    let names = module.name_map();
    let state = module.state();
    let mut bindings = Bindings::default();
    let mut constants = Constants::new();

    let scan = Scan {
        namespace: &namespace,
        names: &names,
        members,
        state: &state,
        policy,
    };
    let mutations = synthesize_mutations(&scan, &mut bindings)?;
    let actions = synthesize_actions(&scan, &mut constants, &mut bindings)?;
    let getters = synthesize_getters(&scan, &mut constants, &mut bindings)?;

    tracing::debug!(
        namespace = %namespace,
        module = module.type_name(),
        mutations = mutations.len(),
        actions = actions.len(),
        getters = getters.len(),
        "synthesized module"
    );

    Ok(ModuleDescriptor {
        state,
        mutations,
        actions,
        getters,
        namespace,
        constants,
        bindings,
        name_map: names,
        type_name: module.type_name(),
        children: BTreeMap::new(),
    })
}

fn synthesize_mutations(
    scan: &Scan<'_>,
    bindings: &mut Bindings,
) -> Result<BTreeMap<String, MutationFn>, SynthError> {
    let mut out = BTreeMap::new();

    for entry in scan.members.mutations() {
        match entry {
            Entry::Bulk(map) => merge_bulk(&mut out, Category::Mutation, map),
            Entry::Named { name, handler } => {
                let (_, key) = scan.resolve(name);
                insert_named(&mut out, Category::Mutation, &key, handler.clone(), scan.policy)?;
                bindings.mutations.insert(name.clone(), key);
            }
        }
    }

    // Full-value replace for every top-level key without its own update mutation
    for field in scan.state.keys() {
        let member = update_member(field);
        let (_, key) = scan.resolve(&member);
        if scan.members.declares(&member) || bindings.contains(&member) || out.contains_key(&key) {
            tracing::trace!(key = %key, "explicit mutation shadows default");
            continue;
        }

        let field = field.clone();
        let handler: MutationFn = Arc::new(move |state: &mut State, data: Value| {
            state.insert(field.clone(), data);
        });
        out.insert(key.clone(), handler);
        bindings.mutations.insert(member, key);
    }

    Ok(out)
}

fn synthesize_actions(
    scan: &Scan<'_>,
    constants: &mut Constants,
    bindings: &mut Bindings,
) -> Result<BTreeMap<String, ActionFn>, SynthError> {
    let mut out = BTreeMap::new();

    for entry in scan.members.actions() {
        match entry {
            Entry::Bulk(map) => merge_bulk(&mut out, Category::Action, map),
            Entry::Named { name, handler } => {
                let (external, key) = scan.resolve(name);
                insert_named(&mut out, Category::Action, &key, handler.clone(), scan.policy)?;
                record_constant(constants, constant_case(&external), &key, scan.policy)?;
                bindings.actions.insert(name.clone(), key);
            }
        }
    }

    Ok(out)
}

fn synthesize_getters(
    scan: &Scan<'_>,
    constants: &mut Constants,
    bindings: &mut Bindings,
) -> Result<BTreeMap<String, GetterFn>, SynthError> {
    let mut out = BTreeMap::new();

    for entry in scan.members.getters() {
        match entry {
            Entry::Bulk(map) => merge_bulk(&mut out, Category::Getter, map),
            Entry::Named { name, handler } => {
                let (external, key) = scan.resolve(name);
                insert_named(&mut out, Category::Getter, &key, handler.clone(), scan.policy)?;
                record_constant(constants, constant_case(&external), &key, scan.policy)?;
                bindings.getters.insert(name.clone(), key);
            }
        }
    }

    // Raw read of every top-level key not already exposed under its own name
    for field in scan.state.keys() {
        let (external, key) = scan.resolve(field);
        if scan.members.declares(field) || bindings.contains(field) || out.contains_key(&key) {
            tracing::trace!(key = %key, "explicit getter shadows default");
            continue;
        }

        let read = field.clone();
        let handler: GetterFn = Arc::new(move |s: &State| state::read(s, &read));
        out.insert(key.clone(), handler);
        record_constant(constants, snake_constant_case(&external), &key, scan.policy)?;
        bindings.getters.insert(field.clone(), key);
    }

    Ok(out)
}

fn insert_named<H>(
    out: &mut BTreeMap<String, H>,
    category: Category,
    key: &str,
    handler: H,
    policy: CollisionPolicy,
) -> Result<(), SynthError> {
    if out.contains_key(key) {
        match policy {
            CollisionPolicy::Reject => {
                return Err(SynthError::DuplicateKey {
                    category,
                    key: key.to_owned(),
                });
            }
            CollisionPolicy::Overwrite => {
                tracing::warn!(%category, key, "overwriting generated key");
            }
        }
    }
    out.insert(key.to_owned(), handler);
    Ok(())
}

// Bulk entries are explicit overrides: they always win.
fn merge_bulk<H: Clone>(
    out: &mut BTreeMap<String, H>,
    category: Category,
    bulk: &BTreeMap<String, H>,
) {
    for (key, handler) in bulk {
        if out.insert(key.clone(), handler.clone()).is_some() {
            tracing::debug!(%category, key = %key, "bulk entry replaced generated key");
        }
    }
}

fn record_constant(
    constants: &mut Constants,
    constant: String,
    key: &str,
    policy: CollisionPolicy,
) -> Result<(), SynthError> {
    if let Some(existing) = constants.get(&constant) {
        if existing != key {
            match policy {
                CollisionPolicy::Reject => {
                    return Err(SynthError::DuplicateConstant {
                        constant,
                        existing: existing.clone(),
                        incoming: key.to_owned(),
                    });
                }
                CollisionPolicy::Overwrite => {
                    tracing::warn!(constant = %constant, existing = %existing, key, "overwriting constant");
                }
            }
        }
    }
    constants.insert(constant, key.to_owned());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{getter_fn, mutation_fn};
    use crate::module::ModuleMeta;
    use serde_json::{json, Value};

    struct Profile {
        names: NameMap,
    }

    impl Profile {
        fn new() -> Self {
            Self {
                names: NameMap::new(),
            }
        }
    }

    impl ModuleMeta for Profile {
        fn type_name(&self) -> &'static str {
            "Profile"
        }

        fn namespace(&self) -> Namespace {
            Namespace::new("profile:")
        }

        fn name_map(&self) -> NameMap {
            self.names.clone()
        }
    }

    impl crate::Module for Profile {
        fn state(&self) -> State {
            state::from_value(json!({ "name": null, "age": 1 }))
        }

        fn declare(&self, members: &mut Members) {
            members
                .mutation("updateAge", |state, payload| {
                    let age = payload.as_i64().unwrap_or(0).max(0);
                    state.insert("age".into(), json!(age));
                })
                .action("updateNameAction", |_, _| async { Ok(Value::Null) })
                .getter("greeting", |s| json!(format!("hello {}", state::read(s, "name"))));
        }
    }

    fn build(module: &Profile, policy: CollisionPolicy) -> Result<ModuleDescriptor, SynthError> {
        let mut members = Members::new();
        crate::Module::declare(module, &mut members);
        synthesize(module, &members, module.namespace(), policy)
    }

    #[test]
    fn test_every_key_is_namespaced() {
        let descriptor = build(&Profile::new(), CollisionPolicy::Reject).unwrap();
        for category in [Category::Action, Category::Mutation, Category::Getter] {
            for key in descriptor.keys(category) {
                assert!(key.starts_with("profile:"), "{key} is not namespaced");
            }
        }
        assert_eq!(descriptor.key(), "profile");
    }

    #[test]
    fn test_default_mutations_skip_explicit_ones() {
        let descriptor = build(&Profile::new(), CollisionPolicy::Reject).unwrap();
        assert_eq!(
            descriptor.keys(Category::Mutation),
            vec!["profile:updateAge", "profile:updateName"]
        );

        // explicit updateAge clamps, the default one would not
        let mut state = descriptor.state.clone();
        (descriptor.mutations["profile:updateAge"])(&mut state, json!(-5));
        assert_eq!(state["age"], json!(0));

        (descriptor.mutations["profile:updateName"])(&mut state, json!({ "first": "a" }));
        (descriptor.mutations["profile:updateName"])(&mut state, json!({ "last": "b" }));
        assert_eq!(state["name"], json!({ "last": "b" }));
    }

    #[test]
    fn test_default_mutation_adds_missing_key() {
        let descriptor = build(&Profile::new(), CollisionPolicy::Reject).unwrap();
        let mut state = State::new();
        (descriptor.mutations["profile:updateName"])(&mut state, json!("abc"));
        assert_eq!(state["name"], json!("abc"));
    }

    #[test]
    fn test_default_getters_and_constants() {
        let descriptor = build(&Profile::new(), CollisionPolicy::Reject).unwrap();
        assert_eq!(
            descriptor.keys(Category::Getter),
            vec!["profile:age", "profile:greeting", "profile:name"]
        );
        assert_eq!(
            descriptor.constants,
            [
                ("AGE", "profile:age"),
                ("GREETING", "profile:greeting"),
                ("NAME", "profile:name"),
                ("UPDATE_NAME_ACTION", "profile:updateNameAction"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Constants>()
        );

        let state = descriptor.state.clone();
        assert_eq!((descriptor.getters["profile:age"])(&state), json!(1));
        assert_eq!(
            (descriptor.getters["profile:greeting"])(&state),
            json!("hello null")
        );
    }

    #[test]
    fn test_mutations_have_no_constants() {
        let descriptor = build(&Profile::new(), CollisionPolicy::Reject).unwrap();
        assert!(!descriptor.constants.contains_key("UPDATE_AGE"));
        assert!(!descriptor.constants.contains_key("UPDATE_NAME"));
    }

    #[test]
    fn test_name_map_drives_keys_and_constants() {
        let module = Profile {
            names: NameMap::new()
                .rename("updateNameAction", "rename")
                .rename("name", "fullName")
                .rename("updateAge", "setAge"),
        };
        let descriptor = build(&module, CollisionPolicy::Reject).unwrap();

        assert_eq!(descriptor.constants["RENAME"], "profile:rename");
        assert_eq!(descriptor.constants["FULL_NAME"], "profile:fullName");
        assert!(descriptor.actions.contains_key("profile:rename"));
        assert!(descriptor.mutations.contains_key("profile:setAge"));
        assert_eq!(descriptor.bindings.actions["updateNameAction"], "profile:rename");
        assert_eq!(descriptor.bindings.getters["name"], "profile:fullName");
        assert_eq!(descriptor.bindings.mutations["updateAge"], "profile:setAge");
    }

    #[test]
    fn test_bindings_cover_generated_members() {
        let descriptor = build(&Profile::new(), CollisionPolicy::Reject).unwrap();
        let bindings = &descriptor.bindings;
        assert_eq!(bindings.key(Category::Mutation, "updateName"), Some("profile:updateName"));
        assert_eq!(bindings.key(Category::Getter, "name"), Some("profile:name"));
        assert_eq!(bindings.key(Category::Action, "updateNameAction"), Some("profile:updateNameAction"));
        assert!(bindings.contains("greeting"));
        assert!(!bindings.contains("profile:name"));
    }

    struct Doubled;

    impl ModuleMeta for Doubled {
        fn type_name(&self) -> &'static str {
            "Doubled"
        }

        fn namespace(&self) -> Namespace {
            Namespace::new("d:")
        }
    }

    impl crate::Module for Doubled {
        fn declare(&self, members: &mut Members) {
            members
                .getter("value", |_| json!(1))
                .getter("value", |_| json!(2));
        }
    }

    #[test]
    fn test_duplicate_named_member_is_rejected() {
        let mut members = Members::new();
        crate::Module::declare(&Doubled, &mut members);
        let err = synthesize(&Doubled, &members, Namespace::new("d:"), CollisionPolicy::Reject)
            .unwrap_err();
        assert!(matches!(
            err,
            SynthError::DuplicateKey { category: Category::Getter, ref key } if key == "d:value"
        ));
    }

    #[test]
    fn test_overwrite_policy_keeps_last_entry() {
        let mut members = Members::new();
        crate::Module::declare(&Doubled, &mut members);
        let descriptor =
            synthesize(&Doubled, &members, Namespace::new("d:"), CollisionPolicy::Overwrite)
                .unwrap();
        assert_eq!((descriptor.getters["d:value"])(&State::new()), json!(2));
    }

    #[test]
    fn test_conflicting_constant_is_rejected() {
        let mut members = Members::new();
        members
            .action("loadPage", |_, _| async { Ok(Value::Null) })
            .getter("load_page", |_| Value::Null);
        let err = synthesize(&Doubled, &members, Namespace::new("d:"), CollisionPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, SynthError::DuplicateConstant { ref constant, .. } if constant == "LOAD_PAGE"));
    }

    struct Links;

    impl ModuleMeta for Links {
        fn type_name(&self) -> &'static str {
            "Links"
        }

        fn namespace(&self) -> Namespace {
            Namespace::new("links:")
        }
    }

    impl crate::Module for Links {
        fn state(&self) -> State {
            state::from_value(json!({ "pageURL": null, "load-more": false }))
        }

        fn declare(&self, members: &mut Members) {
            members
                .action("loadURL", |_, _| async { Ok(Value::Null) })
                .getter("Name", |_| Value::Null)
                .getter("load-next", |_| Value::Null);
        }
    }

    #[test]
    fn test_named_and_default_constants_use_their_own_casing() {
        let mut members = Members::new();
        crate::Module::declare(&Links, &mut members);
        let descriptor =
            synthesize(&Links, &members, Links.namespace(), CollisionPolicy::Reject).unwrap();

        let constants: Vec<_> = descriptor
            .constants
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            constants,
            vec![
                ("LOAD-NEXT", "links:load-next"),
                ("LOAD_MORE", "links:load-more"),
                ("LOAD__U_R_L", "links:loadURL"),
                ("PAGE_URL", "links:pageURL"),
                ("_NAME", "links:Name"),
            ]
        );
    }

    #[test]
    fn test_bulk_entries_merge_verbatim() {
        let mut members = Members::new();
        members
            .mutation("reset", |state, _| state.clear())
            .bulk_mutations([
                ("d:reset", mutation_fn(|state, _| {
                    state.insert("reset".into(), json!(true));
                })),
                ("elsewhere:poke", mutation_fn(|_, _| {})),
            ])
            .bulk_getters([("raw", getter_fn(|_| json!("raw")))]);

        let descriptor =
            synthesize(&Doubled, &members, Namespace::new("d:"), CollisionPolicy::Reject).unwrap();

        assert!(descriptor.mutations.contains_key("elsewhere:poke"));
        assert!(descriptor.getters.contains_key("raw"));
        // bulk entries never produce constants or bindings
        assert!(!descriptor.constants.contains_key("RAW"));
        assert!(!descriptor.bindings.contains("raw"));

        let mut state = State::new();
        (descriptor.mutations["d:reset"])(&mut state, Value::Null);
        assert_eq!(state["reset"], json!(true));
    }
}
