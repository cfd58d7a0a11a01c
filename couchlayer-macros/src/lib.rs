//! Procedural macros for the couchlayer project.
//!
//! Provides `#[derive(Entity)]`, which implements `couchlayer::document::Entity`
//! for a struct with named fields. The id and revision fields are the ones marked
//! `#[entity(id)]` and `#[entity(rev)]`, or else the fields named `id` and `rev`.
//! Both must be `String` or `Option<String>`.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Entity)]
//! pub struct Order {
//!     #[entity(id)]
//!     #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
//!     pub number: Option<String>,
//!     #[entity(rev)]
//!     #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
//!     pub version: Option<String>,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_macros;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, parse_macro_input, spanned::Spanned};

#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_entity(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new(input.span(), "Entity can only be derived for structs")),
    };

    let id = find_field(&fields, "id", &["id"])?;
    let rev = find_field(&fields, "rev", &["rev", "revision"])?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::couchlayer::document::Entity for #name #ty_generics #where_clause {
            fn id(&self) -> ::core::option::Option<&str> {
                ::couchlayer::document::EntityField::field_value(&self.#id)
            }

            fn revision(&self) -> ::core::option::Option<&str> {
                ::couchlayer::document::EntityField::field_value(&self.#rev)
            }

            fn set_id(&mut self, id: ::std::string::String) {
                ::couchlayer::document::EntityField::assign(&mut self.#id, id)
            }

            fn set_revision(&mut self, revision: ::std::string::String) {
                ::couchlayer::document::EntityField::assign(&mut self.#rev, revision)
            }
        }
    })
}

/// Picks the field marked `#[entity(<marker>)]`, falling back to the first field
/// named after one of `defaults`.
fn find_field<'f>(fields: &[&'f Field], marker: &str, defaults: &[&str]) -> syn::Result<&'f Ident> {
    let mut marked = None;

    for field in fields {
        if has_marker(field, marker)? {
            if marked.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    format!("more than one field is marked #[entity({marker})]"),
                ));
            }
            marked = field.ident.as_ref();
        }
    }

    if let Some(ident) = marked {
        return Ok(ident);
    }

    defaults
        .iter()
        .find_map(|default| {
            fields
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .find(|ident| *ident == default)
        })
        .ok_or_else(|| {
            syn::Error::new(
                Span::call_site(),
                format!("no {marker} field: name a field `{}` or mark one #[entity({marker})]", defaults[0]),
            )
        })
}

fn has_marker(field: &Field, marker: &str) -> syn::Result<bool> {
    let mut found = false;

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(marker) {
                found = true;
                Ok(())
            } else if meta.path.is_ident("id") || meta.path.is_ident("rev") {
                Ok(())
            } else {
                Err(meta.error("expected `id` or `rev`"))
            }
        })?;
    }

    Ok(found)
}
