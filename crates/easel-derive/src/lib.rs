//! Proc-macro support for easel fingerprints.

use proc_macro_error::*;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericParam, Generics, Index, ext::IdentExt,
    parse_macro_input, parse_quote,
};

/// How a single field takes part in the fingerprint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum FieldMode {
    /// Recurse through the field's own `Fingerprint` implementation.
    #[default]
    Structural,
    /// Use the field's `Debug` output.
    Debug,
    /// Leave the field out entirely.
    Skip,
}

/// Parse `#[fingerprint(...)]` attributes on a field.
fn field_mode(attrs: &[Attribute]) -> FieldMode {
    let mut mode = FieldMode::default();
    for attr in attrs {
        if !attr.path().is_ident("fingerprint") {
            continue;
        }
        let res = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                mode = FieldMode::Skip;
                Ok(())
            } else if meta.path.is_ident("debug") {
                mode = FieldMode::Debug;
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `debug`"))
            }
        });
        if let Err(e) = res {
            abort!(e.span(), "{}", e);
        }
    }
    mode
}

/// Add a `Fingerprint` bound to every type parameter.
fn add_bounds(mut generics: Generics) -> Generics {
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(easel::fingerprint::Fingerprint));
        }
    }
    generics
}

/// Build the `(name, &dyn Fingerprint)` entry for one field. `access` is an
/// expression of reference type.
fn field_entry(name: &str, access: &TokenStream, mode: FieldMode) -> Option<TokenStream> {
    match mode {
        FieldMode::Skip => None,
        FieldMode::Structural => Some(quote! {
            (#name, #access as &dyn easel::fingerprint::Fingerprint)
        }),
        FieldMode::Debug => Some(quote! {
            (#name, &easel::fingerprint::DebugShape(#access) as &dyn easel::fingerprint::Fingerprint)
        }),
    }
}

/// Pattern and field entries for an enum variant's fields.
fn variant_fields(fields: &Fields) -> (TokenStream, Vec<TokenStream>) {
    match fields {
        Fields::Unit => (quote! {}, vec![]),
        Fields::Named(named) => {
            let mut binds = Vec::new();
            let mut entries = Vec::new();
            for f in &named.named {
                let Some(ident) = &f.ident else { continue };
                let mode = field_mode(&f.attrs);
                if mode == FieldMode::Skip {
                    binds.push(quote! { #ident: _ });
                    continue;
                }
                let name = ident.unraw().to_string();
                let bind = quote::format_ident!("__{}", name);
                binds.push(quote! { #ident: #bind });
                let access = quote! { #bind };
                entries.extend(field_entry(&name, &access, mode));
            }
            (quote! { { #(#binds),* } }, entries)
        }
        Fields::Unnamed(unnamed) => {
            let mut binds = Vec::new();
            let mut entries = Vec::new();
            for (i, f) in unnamed.unnamed.iter().enumerate() {
                let mode = field_mode(&f.attrs);
                if mode == FieldMode::Skip {
                    binds.push(quote! { _ });
                    continue;
                }
                let bind = quote::format_ident!("__f{}", i);
                binds.push(quote! { #bind });
                let access = quote! { #bind };
                entries.extend(field_entry(&i.to_string(), &access, mode));
            }
            (quote! { ( #(#binds),* ) }, entries)
        }
    }
}

/// Derive `easel::fingerprint::Fingerprint`.
///
/// Structs fingerprint as a composite of their fields, enums as the active
/// variant plus its fields. Field attributes:
///
/// - `#[fingerprint(skip)]` leaves the field out, so changes to it are never
///   reported.
/// - `#[fingerprint(debug)]` uses the field's `Debug` output, for types with
///   no `Fingerprint` implementation.
#[proc_macro_error]
#[proc_macro_derive(Fingerprint, attributes(fingerprint))]
pub fn derive_fingerprint(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;
    let generics = add_bounds(input.generics.clone());
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => {
            let mut entries = Vec::new();
            for (i, f) in data.fields.iter().enumerate() {
                let (name, access) = match &f.ident {
                    Some(id) => (id.unraw().to_string(), quote! { &self.#id }),
                    None => {
                        let idx = Index::from(i);
                        (i.to_string(), quote! { &self.#idx })
                    }
                };
                if let Some(e) = field_entry(&name, &access, field_mode(&f.attrs)) {
                    entries.push(e);
                }
            }
            quote! { fp.composite(&[#(#entries),*]) }
        }
        Data::Enum(data) => {
            let arms = data.variants.iter().map(|v| {
                let vident = &v.ident;
                let vname = vident.to_string();
                let (pat, entries) = variant_fields(&v.fields);
                quote! {
                    Self::#vident #pat => fp.variant(#vname, &[#(#entries),*])
                }
            });
            if data.variants.is_empty() {
                quote! { match *self {} }
            } else {
                quote! {
                    match self {
                        #(#arms,)*
                    }
                }
            }
        }
        Data::Union(_) => abort_call_site!("Fingerprint cannot be derived for unions"),
    };

    let expanded = quote! {
        impl #impl_generics easel::fingerprint::Fingerprint for #ident #ty_generics #where_clause {
            fn shape(
                &self,
                fp: &mut easel::fingerprint::Fingerprinter,
            ) -> easel::fingerprint::Shape {
                #body
            }
        }
    };

    expanded.into()
}
