//! Derive macros for the blkstream wire codec traits.
//!
//! `#[derive(BlkSerialize)]` and `#[derive(BlkDeserialize)]` emit
//! `WireSerialize`/`WireDeserialize` impls that encode a struct's fields in
//! declaration order, which for wire types is also their on-disk order. The
//! traits and `DecodeError` must be in scope at the derive site.
//!
//! Enums are not supported: the only enums in the wire model carry sentinel
//! encodings that need hand-written impls.

extern crate proc_macro;
use proc_macro::TokenStream;

mod deserialize;
mod serialize;

#[proc_macro_derive(BlkSerialize)]
pub fn derive_serialize(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).expect("BlkSerialize input parses as a derive item");
    serialize::impl_ser_macro(&ast)
}

#[proc_macro_derive(BlkDeserialize)]
pub fn derive_deserialize(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).expect("BlkDeserialize input parses as a derive item");
    deserialize::impl_deser_macro(&ast)
}
