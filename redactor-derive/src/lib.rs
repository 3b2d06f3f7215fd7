//! Derive macros for `redactor`.
//!
//! This crate generates the `Debug` implementation behind `#[derive(Sensitive)]`.
//! It:
//! - reads bare `#[sensitive]` field attributes
//! - emits a `Debug` impl that prints the redaction marker for those fields
//!
//! It does **not** decide which values are sensitive. Types in the `redactor`
//! crate mark their original-value fields explicitly.

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::redundant_pub_crate
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::non_ascii_literal, clippy::unwrap_used))]

#[allow(unused_extern_crates)]
extern crate proc_macro;

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Result};

mod derive_struct;
mod generics;
mod strategy;
use derive_struct::derive_struct;
use generics::add_debug_bounds;

/// Derives a redacting `core::fmt::Debug` for structs.
///
/// # Field Attributes
///
/// - **No annotation**: the field is formatted with its own `Debug`.
/// - `#[sensitive]`: the field is formatted as `redactor::REDACTED_PLACEHOLDER`
///   (`"[REDACTED]"`). The field type does not need to implement `Debug`.
///
/// At least one field must be `#[sensitive]`; otherwise derive `Debug` directly.
/// Enums and unions are rejected at compile time.
///
/// When building with `cfg(any(test, feature = "testing"))` every field is
/// formatted as-is.
#[proc_macro_derive(Sensitive, attributes(sensitive))]
pub fn derive_sensitive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Returns the token stream to reference the redactor crate root.
///
/// Handles crate renaming (e.g., `my_redactor = { package = "redactor", ... }`)
/// and internal usage (when derive is used inside the redactor crate itself).
fn crate_root() -> TokenStream {
    match crate_name("redactor") {
        Ok(FoundCrate::Itself) => quote! { crate },
        Ok(FoundCrate::Name(name)) => {
            let ident = format_ident!("{}", name);
            quote! { ::#ident }
        }
        Err(_) => quote! { ::redactor },
    }
}

fn crate_path(item: &str) -> TokenStream {
    let root = crate_root();
    let item_ident = format_ident!("{}", item);
    quote! { #root::#item_ident }
}

fn expand(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput {
        ident,
        generics,
        data,
        ..
    } = input;

    let output = match data {
        Data::Struct(data) => derive_struct(&ident, data, &generics)?,
        Data::Enum(data) => {
            return Err(syn::Error::new(
                data.enum_token.span(),
                "`Sensitive` can only be derived for structs",
            ));
        }
        Data::Union(u) => {
            return Err(syn::Error::new(
                u.union_token.span(),
                "`Sensitive` cannot be derived for unions",
            ));
        }
    };

    if output.sensitive_fields == 0 {
        return Err(syn::Error::new(
            ident.span(),
            "`Sensitive` requires at least one #[sensitive] field; derive `Debug` instead",
        ));
    }

    let redacted_generics = add_debug_bounds(generics.clone(), &output.debug_redacted_generics);
    let (redacted_impl, redacted_ty, redacted_where) = redacted_generics.split_for_impl();
    let unredacted_generics = add_debug_bounds(generics, &output.debug_unredacted_generics);
    let (unredacted_impl, unredacted_ty, unredacted_where) = unredacted_generics.split_for_impl();
    let redacted_body = &output.debug_redacted_body;
    let unredacted_body = &output.debug_unredacted_body;

    Ok(quote! {
        #[cfg(any(test, feature = "testing"))]
        #[allow(unused_mut)]
        impl #unredacted_impl ::core::fmt::Debug for #ident #unredacted_ty #unredacted_where {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                #unredacted_body
            }
        }

        #[cfg(not(any(test, feature = "testing")))]
        #[allow(unused_variables, unused_mut)]
        impl #redacted_impl ::core::fmt::Debug for #ident #redacted_ty #redacted_where {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                #redacted_body
            }
        }
    })
}
