use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, Fields};

pub fn impl_deser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();
    let data = match ast.data {
        Data::Struct(ref data) => data,
        _ => {
            return syn::Error::new_spanned(
                &ast.ident,
                "BlkDeserialize can only be derived for structs; wire enums need hand-written impls",
            )
            .to_compile_error()
            .into()
        }
    };

    let body = match data.fields {
        Fields::Named(ref fields) => {
            let reads = fields.named.iter().map(|field| {
                let ident = field.ident.clone().expect("named fields have identifiers");
                let ty = field.ty.clone();
                quote! { #ident: <#ty as WireDeserialize>::wire_deserialize(&mut reader)?, }
            });
            quote! { Ok(#name { #(#reads)* }) }
        }
        Fields::Unnamed(ref fields) => {
            let reads = fields.unnamed.iter().map(|field| {
                let ty = field.ty.clone();
                quote! { <#ty as WireDeserialize>::wire_deserialize(&mut reader)?, }
            });
            quote! { Ok(#name ( #(#reads)* )) }
        }
        Fields::Unit => quote! { Ok(#name) },
    };

    let expanded = quote! {
        impl WireDeserialize for #name {
            fn wire_deserialize<R: std::io::Read>(
                mut reader: R,
            ) -> std::result::Result<Self, DecodeError> {
                #body
            }
        }
    };
    TokenStream::from(expanded)
}
