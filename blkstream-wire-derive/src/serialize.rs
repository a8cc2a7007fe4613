use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, Fields, Index};

pub fn impl_ser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();
    let data = match ast.data {
        Data::Struct(ref data) => data,
        _ => {
            return syn::Error::new_spanned(
                &ast.ident,
                "BlkSerialize can only be derived for structs; wire enums need hand-written impls",
            )
            .to_compile_error()
            .into()
        }
    };

    let writes: Vec<proc_macro2::TokenStream> = match data.fields {
        Fields::Named(ref fields) => fields
            .named
            .iter()
            .map(|field| {
                let ident = field.ident.clone().expect("named fields have identifiers");
                quote! { self.#ident.wire_serialize(&mut target)?; }
            })
            .collect(),
        Fields::Unnamed(ref fields) => fields
            .unnamed
            .iter()
            .enumerate()
            .map(|(index, _)| {
                let index = Index::from(index);
                quote! { self.#index.wire_serialize(&mut target)?; }
            })
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let expanded = quote! {
        impl WireSerialize for #name {
            fn wire_serialize<W>(&self, mut target: W) -> std::result::Result<(), std::io::Error>
            where
                W: std::io::Write,
            {
                #(#writes)*
                Ok(())
            }
        }
    };
    TokenStream::from(expanded)
}
