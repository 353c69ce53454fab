//! Procedural macros for databasing
//!
//! This crate provides the `MessageCatalog` derive macro, which turns an enum of
//! unit variants annotated with `#[message(id = .., text = "..")]` into a
//! lookup table between integer message ids and their format templates.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use std::collections::HashMap;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitInt, LitStr};

/// One `#[message(...)]` entry collected from a variant
struct MessageEntry {
    variant: Ident,
    id: u32,
    text: String,
}

/// Derive macro for message catalogs
#[proc_macro_derive(MessageCatalog, attributes(message))]
pub fn derive_message_catalog(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_catalog(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(error) => TokenStream::from(error.to_compile_error()),
    }
}

/// Generate the `MessageCatalog` implementation for an enum
fn expand_catalog(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "MessageCatalog only supports enums",
            ))
        }
    };

    let mut entries = Vec::with_capacity(variants.len());
    let mut seen: HashMap<u32, Ident> = HashMap::new();

    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "MessageCatalog variants must not carry fields",
            ));
        }

        let entry = parse_message_attribute(variant)?;

        if let Some(previous) = seen.insert(entry.id, entry.variant.clone()) {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                format!("message id {} is already used by {}", entry.id, previous),
            ));
        }

        entries.push(entry);
    }

    let id_arms = entries.iter().map(|entry| {
        let variant = &entry.variant;
        let id = entry.id;
        quote! { #name::#variant => #id }
    });

    let template_arms = entries.iter().map(|entry| {
        let variant = &entry.variant;
        let text = &entry.text;
        quote! { #name::#variant => #text }
    });

    let from_id_arms = entries.iter().map(|entry| {
        let variant = &entry.variant;
        let id = entry.id;
        quote! { #id => ::core::option::Option::Some(#name::#variant) }
    });

    let expanded = quote! {
        #[automatically_derived]
        impl databasing::logging::MessageCatalog for #name {
            fn id(self) -> u32 {
                match self {
                    #(#id_arms,)*
                }
            }

            fn template(self) -> &'static str {
                match self {
                    #(#template_arms,)*
                }
            }

            fn from_id(id: u32) -> ::core::option::Option<Self> {
                match id {
                    #(#from_id_arms,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };

    Ok(expanded)
}

/// Parse `#[message(id = 1, text = "...")]` on a single variant
fn parse_message_attribute(variant: &syn::Variant) -> syn::Result<MessageEntry> {
    let mut id = None;
    let mut text = None;

    for attr in variant.attrs.iter().filter(|attr| attr.path().is_ident("message")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                let lit: LitInt = meta.value()?.parse()?;
                id = Some(lit.base10_parse::<u32>()?);
                Ok(())
            } else if meta.path.is_ident("text") {
                let lit: LitStr = meta.value()?.parse()?;
                text = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `id` or `text`"))
            }
        })?;
    }

    match (id, text) {
        (Some(id), Some(text)) => Ok(MessageEntry {
            variant: variant.ident.clone(),
            id,
            text,
        }),
        _ => Err(syn::Error::new_spanned(
            &variant.ident,
            "every variant needs #[message(id = .., text = \"..\")]",
        )),
    }
}
