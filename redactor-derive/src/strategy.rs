//! Parsing of `#[sensitive]` field attributes.
//!
//! Only the bare form is accepted. Anything else is a compile error so a typo
//! never silently leaves a field printable.

use proc_macro2::Span;
use syn::{spanned::Spanned, Attribute, Meta, Result};

/// How a field is rendered by the generated `Debug` impl.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Strategy {
    /// No annotation: the field is formatted with its own `Debug`.
    Show,
    /// Bare `#[sensitive]`: the field is formatted as the redaction marker.
    Redact,
}

fn set_strategy(target: &mut Option<Strategy>, next: Strategy, span: Span) -> Result<()> {
    if target.is_some() {
        return Err(syn::Error::new(
            span,
            "multiple #[sensitive] attributes specified on the same field",
        ));
    }
    *target = Some(next);
    Ok(())
}

pub(crate) fn parse_field_strategy(attrs: &[Attribute]) -> Result<Strategy> {
    let mut strategy: Option<Strategy> = None;
    for attr in attrs {
        if !attr.path().is_ident("sensitive") {
            continue;
        }

        match &attr.meta {
            Meta::Path(_) => set_strategy(&mut strategy, Strategy::Redact, attr.span())?,
            Meta::List(_) => {
                return Err(syn::Error::new(
                    attr.span(),
                    "#[sensitive] takes no arguments",
                ));
            }
            Meta::NameValue(_) => {
                return Err(syn::Error::new(
                    attr.span(),
                    "name-value syntax is not supported for #[sensitive]",
                ));
            }
        }
    }

    Ok(strategy.unwrap_or(Strategy::Show))
}
