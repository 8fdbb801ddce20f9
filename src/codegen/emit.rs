//! Rust source emitter for a [`GeneratedUnit`].
//!
//! Values travel as `Arc<K>`: runtime inputs are stored as `Arc<K>`, cached fields
//! as `OnceLock<Arc<K>>`, constructors receive `Arc` arguments and module factories
//! return `Arc<K>`. Every binding gets a private `provide_*` method; entry points are
//! public accessors calling into them.

use crate::codegen::unit::{Access, Factory, GeneratedUnit, InputSource, UnitInput};
use crate::config::CompilerOptions;
use crate::error::EmitError;
use crate::model::TypeKey;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::{Path, Type};

pub fn emit_rust(unit: &GeneratedUnit, options: &CompilerOptions) -> Result<TokenStream, EmitError> {
    let runtime = runtime_path(&options.runtime_crate)?;
    let unit_ident = ident(&unit.name)?;
    let builder_ident = ident(&unit.builder.name)?;
    let unit_name = &unit.name;

    let mut struct_fields = Vec::new();
    let mut builder_fields = Vec::new();
    let mut setters = Vec::new();
    let mut init_fields = Vec::new();

    let required: Vec<&UnitInput> = unit.inputs.iter().filter(|i| i.required).collect();
    let required_idents = required
        .iter()
        .map(|input| ident(&input.name))
        .collect::<Result<Vec<_>, _>>()?;
    let required_names: Vec<&str> = required.iter().map(|i| i.name.as_str()).collect();

    for input in &unit.inputs {
        let name = ident(&input.name)?;
        let stored = match &input.source {
            InputSource::Binding { key } => {
                let ty = key_type(key, &input.name)?;
                quote!(::std::sync::Arc<#ty>)
            }
            InputSource::Module { module } => {
                let ty = parse_type(module, &input.name)?;
                quote!(#ty)
            }
        };
        struct_fields.push(quote!(#name: #stored));
        builder_fields.push(quote!(#name: ::std::option::Option<#stored>));

        setters.push(match &input.source {
            InputSource::Binding { key } => {
                let ty = key_type(key, &input.name)?;
                quote! {
                    pub fn #name(mut self, value: impl ::std::convert::Into<::std::sync::Arc<#ty>>) -> Self {
                        self.#name = ::std::option::Option::Some(value.into());
                        self
                    }
                }
            }
            InputSource::Module { .. } => quote! {
                pub fn #name(mut self, value: #stored) -> Self {
                    self.#name = ::std::option::Option::Some(value);
                    self
                }
            },
        });

        if input.required {
            init_fields.push(quote!(#name));
        } else {
            init_fields.push(match &input.source {
                InputSource::Binding { .. } => quote! {
                    #name: self.#name.unwrap_or_else(|| ::std::sync::Arc::new(::std::default::Default::default()))
                },
                InputSource::Module { .. } => quote!(#name: self.#name.unwrap_or_default()),
            });
        }
    }

    let mut provider_methods = Vec::new();
    for field in &unit.fields {
        let name = ident(&field.name)?;
        let method = format_ident!("provide_{}", field.name);
        let ty = key_type(&field.key, &field.name)?;
        let body = factory_body(&field.factory, &ty, &field.name)?;
        struct_fields.push(quote!(#name: ::std::sync::OnceLock<::std::sync::Arc<#ty>>));
        init_fields.push(quote!(#name: ::std::sync::OnceLock::new()));
        provider_methods.push(quote! {
            fn #method(&self) -> ::std::sync::Arc<#ty> {
                ::std::sync::Arc::clone(self.#name.get_or_init(|| { #body }))
            }
        });
    }
    for provider in &unit.providers {
        let method = format_ident!("provide_{}", ident(&provider.name)?);
        let ty = key_type(&provider.key, &provider.name)?;
        let body = factory_body(&provider.factory, &ty, &provider.name)?;
        provider_methods.push(quote! {
            fn #method(&self) -> ::std::sync::Arc<#ty> {
                #body
            }
        });
    }

    let accessors = unit
        .accessors
        .iter()
        .map(|accessor| {
            let name = ident(&accessor.name)?;
            let ty = key_type(&accessor.key, &accessor.name)?;
            let value = access_expr(&accessor.access)?;
            Ok(quote! {
                pub fn #name(&self) -> ::std::sync::Arc<#ty> {
                    #value
                }
            })
        })
        .collect::<Result<Vec<_>, EmitError>>()?;

    let construct = quote! {
        #unit_ident {
            #(#init_fields,)*
        }
    };
    let build_body = if required.is_empty() {
        quote!(::std::result::Result::Ok(#construct))
    } else {
        quote! {
            match (#(self.#required_idents,)*) {
                (#(::std::option::Option::Some(#required_idents),)*) => ::std::result::Result::Ok(#construct),
                (#(#required_idents,)*) => {
                    let mut inputs = ::std::vec::Vec::new();
                    #(
                        if #required_idents.is_none() {
                            inputs.push(::std::string::String::from(#required_names));
                        }
                    )*
                    ::std::result::Result::Err(#runtime::BuildError::MissingRequiredInput {
                        unit: ::std::string::String::from(#unit_name),
                        inputs,
                    })
                }
            }
        }
    };

    tracing::debug!("Emitting {} ({} provider methods)", unit.name, provider_methods.len());

    Ok(quote! {
        pub struct #unit_ident {
            #(#struct_fields,)*
        }

        impl #unit_ident {
            pub fn builder() -> #builder_ident {
                #builder_ident::default()
            }

            #(#accessors)*

            #(#provider_methods)*
        }

        #[derive(Default)]
        pub struct #builder_ident {
            #(#builder_fields,)*
        }

        impl #builder_ident {
            #(#setters)*

            pub fn build(self) -> ::std::result::Result<#unit_ident, #runtime::BuildError> {
                #build_body
            }
        }
    })
}

/// Source text of the unit, checked by reparsing it as a file.
pub fn emit_rust_source(unit: &GeneratedUnit, options: &CompilerOptions) -> Result<String, EmitError> {
    let tokens = emit_rust(unit, options)?;
    let file: syn::File = syn::parse2(tokens).map_err(|e| EmitError::InvalidType {
        ty: unit.name.clone(),
        context: "the generated unit".to_string(),
        message: e.to_string(),
    })?;
    Ok(quote!(#file).to_string())
}

fn factory_body(factory: &Factory, ty: &Type, owner: &str) -> Result<TokenStream, EmitError> {
    let args = factory
        .args()
        .iter()
        .map(access_expr)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match factory {
        Factory::Construct {
            ty: target,
            constructor,
            ..
        }
        | Factory::NewInstance {
            ty: target,
            constructor,
            ..
        } => {
            let target = parse_type(target, owner)?;
            let constructor = ident(constructor)?;
            quote! {
                let value: ::std::sync::Arc<#ty> = ::std::sync::Arc::new(<#target>::#constructor(#(#args),*));
                value
            }
        }
        Factory::ModuleCall {
            module_input,
            method,
            ..
        } => {
            let module_input = ident(module_input)?;
            let method = ident(method)?;
            quote!(self.#module_input.#method(#(#args),*))
        }
        Factory::Delegate { .. } => quote! {
            let value: ::std::sync::Arc<#ty> = #(#args)*;
            value
        },
    })
}

fn access_expr(access: &Access) -> Result<TokenStream, EmitError> {
    Ok(match access {
        Access::Input(name) => {
            let name = ident(name)?;
            quote!(::std::sync::Arc::clone(&self.#name))
        }
        Access::Field(name) | Access::Provider(name) => {
            let method = format_ident!("provide_{}", ident(name)?);
            quote!(self.#method())
        }
    })
}

fn ident(name: &str) -> Result<Ident, EmitError> {
    syn::parse_str::<Ident>(name).map_err(|_| EmitError::InvalidIdent {
        name: name.to_string(),
    })
}

fn key_type(key: &TypeKey, context: &str) -> Result<Type, EmitError> {
    parse_type(&key.ty, context)
}

fn parse_type(ty: &str, context: &str) -> Result<Type, EmitError> {
    syn::parse_str::<Type>(ty).map_err(|e| EmitError::InvalidType {
        ty: ty.to_string(),
        context: context.to_string(),
        message: e.to_string(),
    })
}

/// `meshestra_compiler` becomes `::meshestra_compiler`; `crate::..`, `self::..` and
/// `super::..` paths are kept relative.
fn runtime_path(raw: &str) -> Result<Path, EmitError> {
    let mut path = syn::parse_str::<Path>(raw).map_err(|e| EmitError::InvalidType {
        ty: raw.to_string(),
        context: "the runtime crate path".to_string(),
        message: e.to_string(),
    })?;
    let relative = path
        .segments
        .first()
        .is_some_and(|s| s.ident == "crate" || s.ident == "self" || s.ident == "super");
    if !relative && path.leading_colon.is_none() {
        path.leading_colon = Some(Default::default());
    }
    Ok(path)
}
