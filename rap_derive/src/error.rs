//! Derive macro for error types.
//!
//! # Usage
//!
//! ```ignore
//! use rap_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum LoadError {
//!     #[error("{argument} must be an integer")]
//!     NotAnInteger { argument: &'static str, token: String },
//!
//!     #[error("unknown keyword {0:?}")]
//!     UnknownKeyword(String),
//!
//!     #[error("expected instruction")]
//!     Missing,
//! }
//! ```
//!
//! Only the fields a message interpolates are bound, so a variant may carry
//! extra context (like `token` above) without it showing up in `Display`.
//! A placeholder naming a field that does not exist is a compile error.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) if data.variants.is_empty() => quote! { match *self {} },
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let ident = &variant.ident;
                    let message = message(&variant.attrs, variant, "variant", &ident.to_string())?;
                    display_arm(quote!(Self::#ident), &variant.fields, &message, variant)
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message(&input.attrs, &input.ident, "type", &name.to_string())?;
            let arm = display_arm(quote!(Self), &data.fields, &message, &input.ident)?;
            quote! {
                match self {
                    #arm
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds `pattern => write!(f, ...)` for one variant (or the struct itself).
fn display_arm<T: ToTokens>(
    path: TokenStream2,
    fields: &Fields,
    message: &str,
    target: &T,
) -> syn::Result<TokenStream2> {
    let used = placeholders(message);

    match fields {
        Fields::Unit => {
            if let Some(name) = used.first() {
                return Err(syn::Error::new_spanned(
                    target,
                    format!("#[error] message refers to `{name}` but there are no fields"),
                ));
            }
            Ok(quote! { #path => ::std::write!(f, #message), })
        }
        Fields::Named(named) => {
            let mut bound = Vec::with_capacity(used.len());
            for name in &used {
                let field = named
                    .named
                    .iter()
                    .filter_map(|field| field.ident.as_ref())
                    .find(|ident| *ident == name)
                    .ok_or_else(|| {
                        syn::Error::new_spanned(
                            target,
                            format!("#[error] message refers to unknown field `{name}`"),
                        )
                    })?;
                bound.push(field);
            }
            Ok(quote! {
                #path { #(#bound,)* .. } => ::std::write!(f, #message, #(#bound = #bound),*),
            })
        }
        Fields::Unnamed(unnamed) => {
            let count = unnamed.unnamed.len();
            let mut slots = vec![quote!(_); count];
            let mut args = Vec::with_capacity(used.len());
            for name in &used {
                let index = name
                    .parse::<usize>()
                    .ok()
                    .filter(|index| *index < count)
                    .ok_or_else(|| {
                        syn::Error::new_spanned(
                            target,
                            format!("#[error] message refers to `{name}` but only {count} positional fields exist"),
                        )
                    })?;
                let ident = format_ident!("f{}", index);
                slots[index] = ident.to_token_stream();
                args.push(quote!(#ident = #ident));
            }
            let format = rename_positional(message, count);
            Ok(quote! {
                #path ( #(#slots),* ) => ::std::write!(f, #format, #(#args),*),
            })
        }
    }
}

/// Reads the string literal out of an `#[error("...")]` attribute.
fn message<T: ToTokens>(
    attrs: &[Attribute],
    target: &T,
    kind: &str,
    name: &str,
) -> syn::Result<String> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                target,
                format!("missing #[error(\"...\")] on {kind} `{name}`"),
            )
        })?;

    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(lit)) => Ok(lit.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] takes a single string literal",
        )),
    }
}

/// Argument names a format string interpolates, in first-use order.
///
/// Handles `{name}`, `{name:?}`, `{0}` and skips `{{` / `}}` escapes.
fn placeholders(format: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
            }
            '{' => {
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                let name = name.split(':').next().unwrap_or_default().trim();
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            _ => {}
        }
    }

    names
}

/// Rewrites `{0}` / `{0:?}` into `{f0}` / `{f0:?}` so tuple fields can be passed by name.
fn rename_positional(format: &str, count: usize) -> String {
    let mut result = format.to_string();
    for i in 0..count {
        result = result
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}
