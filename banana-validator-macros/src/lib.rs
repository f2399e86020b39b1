//! `#[derive(Validate)]`
//!
//! 为结构体同时生成 `banana_validator::Validate`（字段规则）和
//! `banana_validator::Schema`（声明的字段列表）。

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Data, DeriveInput, Expr, Fields, LitStr, Type};

// 检测类型是否是 Option<T>
fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

/// 规则参数：`min`、`max`、`regex`、`message`
#[derive(Default)]
struct RuleArgs {
    min: Option<Expr>,
    max: Option<Expr>,
    regex: Option<Expr>,
    message: Option<LitStr>,
}

impl RuleArgs {
    fn parse(meta: &ParseNestedMeta) -> syn::Result<Self> {
        let mut args = RuleArgs::default();
        if !meta.input.peek(syn::token::Paren) {
            return Ok(args);
        }
        meta.parse_nested_meta(|arg| {
            if arg.path.is_ident("min") {
                args.min = Some(arg.value()?.parse()?);
            } else if arg.path.is_ident("max") {
                args.max = Some(arg.value()?.parse()?);
            } else if arg.path.is_ident("regex") {
                args.regex = Some(arg.value()?.parse()?);
            } else if arg.path.is_ident("message") {
                args.message = Some(arg.value()?.parse()?);
            } else {
                return Err(arg.error("unsupported argument, expected min, max, regex or message"));
            }
            Ok(())
        })?;
        Ok(args)
    }

    fn message(&self) -> TokenStream2 {
        match &self.message {
            Some(msg) => quote!(::core::option::Option::Some(#msg)),
            None => quote!(::core::option::Option::None),
        }
    }

    fn bound(expr: &Option<Expr>) -> TokenStream2 {
        match expr {
            Some(value) => quote!(::core::option::Option::Some(#value)),
            None => quote!(::core::option::Option::None),
        }
    }
}

/// 为单条规则生成调用，`__value` 为字段值的引用
fn rule_call(meta: &ParseNestedMeta, field: &str) -> syn::Result<TokenStream2> {
    let rule = meta
        .path
        .get_ident()
        .map(|ident| ident.to_string())
        .ok_or_else(|| meta.error("expected a rule name"))?;
    let args = RuleArgs::parse(meta)?;
    let message = args.message();
    let min = RuleArgs::bound(&args.min);
    let max = RuleArgs::bound(&args.max);

    let call = match rule.as_str() {
        "not_blank" => quote! {
            ::banana_validator::ValidationRules::not_blank_with_message(__value, #field, #message)
        },
        "not_empty" => quote! {
            ::banana_validator::ValidationRules::not_empty_with_message(__value, #field, #message)
        },
        "email" => quote! {
            ::banana_validator::ValidationRules::email_with_message(__value, #field, #message)
        },
        "length" => quote! {
            ::banana_validator::ValidationRules::length_with_message(__value, #field, #min, #max, #message)
        },
        "range" => quote! {
            ::banana_validator::ValidationRules::range_with_message(*__value, #field, #min, #max, #message)
        },
        "size" => quote! {
            ::banana_validator::ValidationRules::size_with_message(__value, #field, #min, #max, #message)
        },
        "pattern" => {
            let regex = args
                .regex
                .as_ref()
                .ok_or_else(|| meta.error("pattern requires `regex = \"...\"`"))?;
            quote! {
                ::banana_validator::ValidationRules::pattern_with_message(__value, #field, #regex, #message)
            }
        }
        other => {
            return Err(meta.error(format!(
                "unknown validation rule `{}`, expected one of not_blank, not_empty, email, length, range, size, pattern",
                other
            )))
        }
    };

    Ok(quote!(validator.add_result(#call);))
}

/// 读取 `#[serde(rename = "...")]` / `#[serde(rename_all = "...")]`，其余 serde 参数原样跳过
fn serde_string(attrs: &[syn::Attribute], key: &str) -> syn::Result<Option<String>> {
    let mut found = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let lit: LitStr = meta.value()?.parse()?;
                found = Some(lit.value());
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<TokenStream2>()?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}

fn split_words(name: &str) -> Vec<String> {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn apply_rename_all(name: &str, rule: &str) -> syn::Result<String> {
    let words = split_words(name);
    let renamed = match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "snake_case" => words.join("_"),
        "SCREAMING_SNAKE_CASE" => words.join("_").to_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_uppercase(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        other => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported rename_all rule `{}`", other),
            ))
        }
    };
    Ok(renamed)
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Validate can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Validate can only be derived for structs",
            ))
        }
    };

    let rename_all = serde_string(&input.attrs, "rename_all")?;

    let mut checks = Vec::new();
    let mut specs = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let property = match serde_string(&field.attrs, "rename")? {
            Some(renamed) => renamed,
            None => match &rename_all {
                Some(rule) => apply_rename_all(&ident.to_string(), rule)?,
                None => ident.to_string(),
            },
        };
        let optional = is_option(&field.ty);
        specs.push(quote! {
            ::banana_validator::FieldSpec { name: #property, optional: #optional }
        });

        let mut calls = Vec::new();
        for attr in &field.attrs {
            if attr.path().is_ident("validate") {
                attr.parse_nested_meta(|meta| {
                    calls.push(rule_call(&meta, &property)?);
                    Ok(())
                })?;
            }
        }
        if calls.is_empty() {
            continue;
        }

        // Option 字段只校验存在的值
        if optional {
            checks.push(quote! {
                if let ::core::option::Option::Some(__value) = &self.#ident {
                    #(#calls)*
                }
            });
        } else {
            checks.push(quote! {
                {
                    let __value = &self.#ident;
                    #(#calls)*
                }
            });
        }
    }

    Ok(quote! {
        impl #impl_generics ::banana_validator::Validate for #name #ty_generics #where_clause {
            fn validate(&self) -> ::banana_validator::ValidationResult<()> {
                let mut validator = ::banana_validator::ValidatorBuilder::new();

                #(#checks)*

                validator.build()
            }
        }

        impl #impl_generics ::banana_validator::Schema for #name #ty_generics #where_clause {
            fn fields() -> &'static [::banana_validator::FieldSpec] {
                const FIELDS: &[::banana_validator::FieldSpec] = &[#(#specs),*];
                FIELDS
            }
        }
    })
}

#[proc_macro_derive(Validate, attributes(validate))]
pub fn derive_validate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
