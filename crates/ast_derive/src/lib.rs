//! `#[derive(WalkAst)]` for go-syntax nodes.
//!
//! Every field is walked in declaration order. A field marked `#[walk(skip)]`
//! is left out, which is how side lists that alias other fields avoid being
//! visited twice.

use proc_macro::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Field, Fields, Index};

#[proc_macro_derive(WalkAst, attributes(walk))]
pub fn derive_walk_ast(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let span = input.span();

    let walk_body = match generate_walk_body(&input.data) {
        Ok(body) => body,
        Err(err) => return err.into_compile_error().into(),
    };

    let expanded = quote_spanned! {span =>
        impl<'ast> crate::walk::Walk<'ast> for #name {
            #[inline(always)]
            fn walk<V: crate::walk::Visitor<'ast> + ?Sized>(
                &self,
                a: &'ast crate::ast::AstArena,
                v: &mut V
            ) {
                #walk_body
            }
        }
    };

    expanded.into()
}

fn is_skipped(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("walk")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

fn generate_walk_body(data: &Data) -> syn::Result<proc_macro2::TokenStream> {
    match data {
        Data::Struct(data_struct) => generate_fields_walk(&data_struct.fields),
        Data::Enum(data_enum) => {
            let arms = data_enum
                .variants
                .iter()
                .map(|variant| generate_variant_arm(&variant.ident, &variant.fields))
                .collect::<syn::Result<Vec<_>>>()?;

            Ok(quote! {
                match self {
                    #(#arms)*
                }
            })
        }
        Data::Union(u) => Err(syn::Error::new_spanned(
            u.union_token,
            "WalkAst cannot be derived for unions",
        )),
    }
}

fn generate_fields_walk(fields: &Fields) -> syn::Result<proc_macro2::TokenStream> {
    let mut calls = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if is_skipped(field)? {
            continue;
        }
        let access = match &field.ident {
            Some(ident) => quote! { &self.#ident },
            None => {
                let index = Index::from(i);
                quote! { &self.#index }
            }
        };
        calls.push(quote! { crate::walk::Walk::walk(#access, a, v); });
    }

    Ok(quote! { #(#calls)* })
}

fn generate_variant_arm(
    variant_name: &syn::Ident,
    fields: &Fields,
) -> syn::Result<proc_macro2::TokenStream> {
    let mut bindings = Vec::new();
    let mut calls = Vec::new();

    for (i, field) in fields.iter().enumerate() {
        let binding = match &field.ident {
            Some(ident) => ident.clone(),
            None => format_ident!("f{}", i),
        };
        if is_skipped(field)? {
            bindings.push(quote! { #binding: _ });
            continue;
        }
        calls.push(quote! { crate::walk::Walk::walk(#binding, a, v); });
        bindings.push(quote! { #binding });
    }

    Ok(match fields {
        Fields::Unit => quote! { Self::#variant_name => {} },
        Fields::Named(_) => quote! {
            Self::#variant_name { #(#bindings),* } => { #(#calls)* }
        },
        Fields::Unnamed(_) => {
            // positional patterns can't use `name: _`, so rebuild them plainly
            let positional = fields.iter().enumerate().map(|(i, field)| {
                if is_skipped(field).unwrap_or(false) {
                    quote! { _ }
                } else {
                    let b = format_ident!("f{}", i);
                    quote! { #b }
                }
            });
            quote! {
                Self::#variant_name(#(#positional),*) => { #(#calls)* }
            }
        }
    })
}
