//! Procedural macros for modstore

use darling::{FromDeriveInput, FromMeta};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(ModuleMeta)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(module), supports(struct_any))]
struct ModuleOpts {
    ident: syn::Ident,
    generics: syn::Generics,

    /// Namespace literal, must end with `:` unless empty
    namespace: Option<syn::LitStr>,

    /// Type name override (defaults to the struct name)
    name: Option<String>,

    /// Member name overrides, one `rename(from = "..", to = "..")` each
    #[darling(multiple)]
    rename: Vec<RenameOpt>,
}

#[derive(Debug, FromMeta)]
struct RenameOpt {
    from: String,
    to: String,
}

/// Derive macro for the ModuleMeta trait
///
/// Generates `type_name()` from the struct name, plus `namespace()` and
/// `name_map()` from the `#[module(...)]` attribute.
///
/// # Example
/// ```ignore
/// #[derive(Default, ModuleMeta)]
/// #[module(namespace = "test:", rename(from = "updateNameAction", to = "rename"))]
/// struct Test;
///
/// assert_eq!(Test.type_name(), "Test");
/// assert_eq!(Test.namespace().as_str(), "test:");
/// assert_eq!(Test.name_map().resolve("updateNameAction"), "rename");
/// ```
#[proc_macro_derive(ModuleMeta, attributes(module))]
pub fn derive_module_meta(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ModuleOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();
    let type_name = opts.name.clone().unwrap_or_else(|| name.to_string());

    let namespace_fn = match &opts.namespace {
        None => quote! {},
        Some(lit) => {
            let namespace = lit.value();
            if !namespace.is_empty() && !namespace.ends_with(':') {
                return syn::Error::new_spanned(lit, "namespace must end with `:`")
                    .to_compile_error()
                    .into();
            }
            if namespace.split(':').rev().skip(1).any(str::is_empty) {
                return syn::Error::new_spanned(lit, "namespace segments must not be empty")
                    .to_compile_error()
                    .into();
            }
            quote! {
                fn namespace(&self) -> ::modstore::Namespace {
                    ::modstore::Namespace::new(#namespace)
                }
            }
        }
    };

    let name_map_fn = if opts.rename.is_empty() {
        quote! {}
    } else {
        let renames = opts.rename.iter().map(|r| {
            let from = &r.from;
            let to = &r.to;
            quote! { .rename(#from, #to) }
        });
        quote! {
            fn name_map(&self) -> ::modstore::NameMap {
                ::modstore::NameMap::new() #(#renames)*
            }
        }
    };

    let expanded = quote! {
        impl #impl_generics ::modstore::ModuleMeta for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            #namespace_fn

            #name_map_fn
        }
    };

    TokenStream::from(expanded)
}
