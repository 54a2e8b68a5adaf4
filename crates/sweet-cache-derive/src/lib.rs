//! `#[derive(CacheKey)]` for sweet-cache
//!
//! Joins the struct's fields (in declaration order) with a separator:
//!
//! ```ignore
//! #[derive(CacheKey)]
//! #[cache_key(prefix = "user", separator = "/")]
//! struct UserKey {
//!     org: String,
//!     id: u64,
//!     #[cache_key(skip)]
//!     trace_id: String,
//! }
//! // UserKey { org: "acme".into(), id: 7, .. }.cache_key() == "user/acme/7"
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

#[proc_macro_derive(CacheKey, attributes(cache_key))]
pub fn derive_cache_key(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    // Parse struct attributes
    let mut prefix: Option<String> = None;
    let mut separator = ":".to_string();

    for attr in &input.attrs {
        if attr.path().is_ident("cache_key") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("prefix") {
                    let s: LitStr = meta.value()?.parse()?;
                    prefix = Some(s.value());
                    Ok(())
                } else if meta.path.is_ident("separator") {
                    let s: LitStr = meta.value()?.parse()?;
                    separator = s.value();
                    Ok(())
                } else {
                    Err(meta.error("expected `prefix` or `separator`"))
                }
            })?;
        }
    }

    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "CacheKey derive only supports structs",
            ));
        }
    };

    let mut key_parts = Vec::new();
    if let Some(prefix) = &prefix {
        key_parts.push(quote! { ::std::string::String::from(#prefix) });
    }

    let fields = match &data.fields {
        Fields::Named(fields) => fields.named.iter().collect(),
        Fields::Unnamed(fields) => fields.unnamed.iter().collect(),
        Fields::Unit => Vec::new(),
    };

    for (i, field) in fields.into_iter().enumerate() {
        let mut skip = false;
        for attr in &field.attrs {
            if attr.path().is_ident("cache_key") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("skip") {
                        skip = true;
                        Ok(())
                    } else {
                        Err(meta.error("expected `skip`"))
                    }
                })?;
            }
        }
        if skip {
            continue;
        }

        match &field.ident {
            Some(ident) => key_parts.push(quote! { self.#ident.to_string() }),
            None => {
                let index = syn::Index::from(i);
                key_parts.push(quote! { self.#index.to_string() });
            }
        }
    }

    let body = if key_parts.is_empty() {
        quote! { ::std::string::String::new() }
    } else {
        quote! {
            let parts: ::std::vec::Vec<::std::string::String> = vec![#(#key_parts),*];
            parts.join(#separator)
        }
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::sweet_cache::CacheKey for #name #ty_generics #where_clause {
            fn cache_key(&self) -> ::std::string::String {
                #body
            }
        }
    })
}
