//! Define procedural macro to build feature option structs from the config file
extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod feature_config;

/// Implement `FromFeatureConfig` by assigning every named field from the matching parameter
/// of a feature section. Fields annotated with `#[feature_config(skip)]` keep their default.
#[proc_macro_derive(FromFeatureConfig, attributes(feature_config))]
pub fn derive_from_feature_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    feature_config::expand_derive_from_feature_config(&input)
        .unwrap_or_else(to_compile_errors)
        .into()
}

fn to_compile_errors(errors: Vec<syn::Error>) -> proc_macro2::TokenStream {
    let compile_errors = errors.iter().map(syn::Error::to_compile_error);
    quote::quote!(#(#compile_errors)*)
}
