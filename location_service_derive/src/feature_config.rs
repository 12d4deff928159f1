use proc_macro2::TokenStream;
use quote::{quote, quote_spanned, ToTokens};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Field, Fields, Type};

pub fn expand_derive_from_feature_config(
    input: &DeriveInput,
) -> Result<TokenStream, Vec<syn::Error>> {
    let name = &input.ident;
    let setters = config_setters(input)?;
    let expanded = quote! {
        impl crate::config::FromFeatureConfig for #name {
            fn from_config(
                config: &crate::config::FeatureConfig,
            ) -> ::std::result::Result<Self, crate::Error> {
                let mut base = Self::default();
                for key in config.parameters() {
                    match key.as_str() {
                        #setters
                        _ => log::warn!(
                            "unknown configuration parameter for {}: {}={:?}",
                            stringify!(#name),
                            key,
                            config.get_parameter(key)
                        ),
                    }
                }
                Ok(base)
            }
        }
    };

    Ok(expanded)
}

/// Generate a match arm for each field that isn't annotated with #[feature_config(skip)]
fn config_setters(input: &DeriveInput) -> Result<TokenStream, Vec<syn::Error>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(vec![syn::Error::new(
                    input.span(),
                    "FromFeatureConfig requires a struct with named fields",
                )])
            }
        },
        _ => {
            return Err(vec![syn::Error::new(
                input.span(),
                "FromFeatureConfig can only be derived for structs",
            )])
        }
    };

    let mut arms = Vec::new();
    let mut errors = Vec::new();
    for field in fields {
        match skip_field(field) {
            Ok(true) => continue,
            Ok(false) => match generate_setter(field) {
                Ok(arm) => arms.push(arm),
                Err(e) => errors.push(e),
            },
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(quote! { #(#arms)* })
}

fn skip_field(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("feature_config") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported feature_config attribute, expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

/// Kind of accessor used to read a field from the feature parameters
enum Accessor<'a> {
    Text,
    OptionalText,
    Flag,
    Integer(&'a Type),
    Float(&'a Type),
}

fn accessor_for(ty: &Type) -> Option<Accessor<'_>> {
    let type_str = ty.to_token_stream().to_string().replace(' ', "");
    match type_str.as_ref() {
        "String" => Some(Accessor::Text),
        "Option<String>" => Some(Accessor::OptionalText),
        "bool" => Some(Accessor::Flag),
        "f32" | "f64" => Some(Accessor::Float(ty)),
        "u8" | "u16" | "u32" | "u64" | "usize" | "i8" | "i16" | "i32" | "i64" | "isize" => {
            Some(Accessor::Integer(ty))
        }
        _ => None,
    }
}

fn generate_setter(field: &Field) -> syn::Result<TokenStream> {
    let name = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
    let key = name.to_string();
    let accessor = accessor_for(&field.ty).ok_or_else(|| {
        syn::Error::new(
            field.ty.span(),
            format!(
                "FromFeatureConfig doesn't support fields of type {}",
                field.ty.to_token_stream()
            ),
        )
    })?;

    let assignment = match accessor {
        Accessor::Text => quote_spanned! { field.span() =>
            if let Some(val) = config.get_parameter_as_string(key) {
                base.#name = val?;
            }
        },
        Accessor::OptionalText => quote_spanned! { field.span() =>
            if let Some(val) = config.get_parameter_as_optional_string(key) {
                base.#name = val?;
            }
        },
        Accessor::Flag => quote_spanned! { field.span() =>
            if let Some(val) = config.get_parameter_as_bool(key) {
                base.#name = val?;
            }
        },
        Accessor::Float(ty) => quote_spanned! { field.span() =>
            if let Some(val) = config.get_parameter_as_f64(key) {
                base.#name = val? as #ty;
            }
        },
        Accessor::Integer(ty) => quote_spanned! { field.span() =>
            if let Some(val) = config.get_parameter_as_i64(key) {
                let val = val?;
                base.#name = <#ty as ::std::convert::TryFrom<i64>>::try_from(val).map_err(|_| {
                    crate::Error::InvalidConfigurationValue(format!(
                        "value for {} is out of range for {}: {}",
                        key,
                        stringify!(#ty),
                        val
                    ))
                })?;
            }
        },
    };

    Ok(quote! { #key => { #assignment } })
}
