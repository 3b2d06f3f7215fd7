//! Struct-specific `Debug` derivation.
//!
//! Produces two bodies per struct: one that substitutes the redaction marker
//! for `#[sensitive]` fields and one that formats every field as-is.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote, quote_spanned};
use syn::{spanned::Spanned, DataStruct, Fields, Result};

use crate::{
    crate_path,
    generics::collect_generics_from_type,
    strategy::{parse_field_strategy, Strategy},
};

pub(crate) struct StructDeriveOutput {
    pub(crate) debug_redacted_body: TokenStream,
    pub(crate) debug_redacted_generics: Vec<Ident>,
    pub(crate) debug_unredacted_body: TokenStream,
    pub(crate) debug_unredacted_generics: Vec<Ident>,
    pub(crate) sensitive_fields: usize,
}

pub(crate) fn derive_struct(
    name: &Ident,
    data: DataStruct,
    generics: &syn::Generics,
) -> Result<StructDeriveOutput> {
    let marker = crate_path("REDACTED_PLACEHOLDER");
    let tuple = matches!(data.fields, Fields::Unnamed(_));

    let mut bindings = Vec::new();
    let mut redacted_fields = Vec::new();
    let mut unredacted_fields = Vec::new();
    let mut debug_redacted_generics = Vec::new();
    let mut debug_unredacted_generics = Vec::new();
    let mut sensitive_fields = 0;

    for (index, field) in data.fields.into_iter().enumerate() {
        let span = field.span();
        let strategy = parse_field_strategy(&field.attrs)?;
        let binding = field
            .ident
            .clone()
            .unwrap_or_else(|| format_ident!("field_{index}"));

        collect_generics_from_type(&field.ty, generics, &mut debug_unredacted_generics);
        if strategy == Strategy::Show {
            collect_generics_from_type(&field.ty, generics, &mut debug_redacted_generics);
        } else {
            sensitive_fields += 1;
        }

        let shown = if tuple {
            quote_spanned! { span => debug.field(#binding); }
        } else {
            quote_spanned! { span => debug.field(stringify!(#binding), #binding); }
        };
        let redacted = match (strategy, tuple) {
            (Strategy::Show, _) => shown.clone(),
            (Strategy::Redact, true) => quote_spanned! { span =>
                debug.field(&#marker);
            },
            (Strategy::Redact, false) => quote_spanned! { span =>
                debug.field(stringify!(#binding), &#marker);
            },
        };

        bindings.push(binding);
        redacted_fields.push(redacted);
        unredacted_fields.push(shown);
    }

    let (pattern, builder) = match (tuple, bindings.is_empty()) {
        (_, true) => (quote! { Self { .. } }, quote! { f.debug_struct(stringify!(#name)) }),
        (true, false) => (
            quote! { Self ( #(#bindings),* ) },
            quote! { f.debug_tuple(stringify!(#name)) },
        ),
        (false, false) => (
            quote! { Self { #(#bindings),* } },
            quote! { f.debug_struct(stringify!(#name)) },
        ),
    };

    let body = |fields: &[TokenStream]| {
        quote! {
            match self {
                #pattern => {
                    let mut debug = #builder;
                    #(#fields)*
                    debug.finish()
                }
            }
        }
    };

    Ok(StructDeriveOutput {
        debug_redacted_body: body(&redacted_fields),
        debug_redacted_generics,
        debug_unredacted_body: body(&unredacted_fields),
        debug_unredacted_generics,
        sensitive_fields,
    })
}
