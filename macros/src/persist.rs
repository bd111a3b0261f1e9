use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{
    parse_macro_input,
    Attribute,
    Data,
    DataStruct,
    DeriveInput,
    Generics,
    Ident,
    Index,
    Member,
    Path,
};

use crate::crate_path;

pub fn derive(input: TokenStream) -> TokenStream {
    let DerivePersist { ident, generics, members, crate_path } =
        parse_macro_input!(input);
    let (impl_generics, type_generics, where_clause) =
        generics.split_for_impl();

    // `Persist::persist(&mut self.field, archive, seri)?;`
    let persist_fields: Vec<TokenStream2> = members
        .iter()
        .map(|member| {
            quote! {
                ::#crate_path::serialize::Persist::persist(
                    &mut self.#member,
                    archive,
                    seri,
                )?;
            }
        })
        .collect();

    quote! {
        #[automatically_derived]
        impl #impl_generics ::#crate_path::serialize::Persist for #ident #type_generics
        #where_clause
        {
            #[allow(unused_variables)]
            fn persist<__A: ::#crate_path::serialize::Archive + ?Sized>(
                &mut self,
                archive: &mut __A,
                seri: &mut ::#crate_path::serialize::EntitySerializer,
            ) -> ::core::result::Result<(), ::#crate_path::serialize::ArchiveError> {
                #(#persist_fields)*

                ::core::result::Result::Ok(())
            }
        }
    }
    .into()
}

struct DerivePersist {
    ident: Ident,
    generics: Generics,
    /// The fields that aren't skipped, in declaration order.
    members: Vec<Member>,
    crate_path: Path,
}

impl Parse for DerivePersist {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let DeriveInput { ident, generics, data, .. } = input.parse()?;
        let Data::Struct(DataStruct { fields, .. }) = data else {
            return Err(input.error("`Persist` can only be derived for structs"));
        };
        let crate_path = crate_path()?;
        let mut members = Vec::new();

        for (i, field) in fields.iter().enumerate() {
            let mut skip = false;

            for attr in &field.attrs {
                skip |= parse_attr(attr)?;
            }

            if !skip {
                members.push(match &field.ident {
                    Some(ident) => Member::Named(ident.clone()),
                    None => Member::Unnamed(Index {
                        index: i as u32,
                        span: Span::call_site(),
                    }),
                });
            }
        }

        Ok(Self { ident, generics, members, crate_path })
    }
}

/// Returns `true` if the attribute is `#[persist(skip)]`.
fn parse_attr(attr: &Attribute) -> syn::Result<bool> {
    let mut skip = false;

    if !attr.path().is_ident("persist") {
        return Ok(skip);
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("skip") {
            skip = true;

            Ok(())
        } else {
            Err(meta.error("expected `skip`"))
        }
    })?;

    Ok(skip)
}
