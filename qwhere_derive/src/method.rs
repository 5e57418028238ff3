use darling::{FromDeriveInput, FromVariant, ast};
use heck::ToSnakeCase;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, parse_macro_input};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(enum_unit))]
struct MethodInput {
    ident: syn::Ident,
    data: ast::Data<MethodVariant, ()>,
}

#[derive(Debug, FromVariant)]
#[darling(attributes(method))]
struct MethodVariant {
    ident: syn::Ident,
    #[darling(default)]
    rename: Option<String>,
}

pub fn method_operator_methods_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let op = match MethodInput::from_derive_input(&input) {
        Ok(v) => v,
        Err(e) => return e.write_errors().into(),
    };

    let enum_name = &op.ident;
    let variants = op.data.take_enum().unwrap_or_default();

    let names = variants.iter().map(|v| {
        let var = &v.ident;
        let name = var.to_string();
        quote! { #enum_name::#var => #name }
    });

    let lookups = variants.iter().map(|v| {
        let var = &v.ident;
        let name = var.to_string();
        quote! { #name => Some(#enum_name::#var) }
    });

    let methods = variants.iter().map(|v| {
        let var = &v.ident;
        let method = v
            .rename
            .clone()
            .unwrap_or_else(|| var.to_string().to_snake_case());
        let method_fn = format_ident!("{}", method);
        let doc = format!(" `self.{}(arg)`", var);

        quote! {
            #[doc = #doc]
            pub fn #method_fn<A>(self, arg: A) -> crate::Expr
            where
                A: crate::IntoExpr,
            {
                crate::Expr::call(self, #enum_name::#var.name(), [arg.into_expr()])
            }
        }
    });

    quote! {
        impl #enum_name {
            /// Method name as it appears in a predicate tree.
            pub const fn name(&self) -> &'static str {
                match self {
                    #(#names,)*
                }
            }

            /// Resolve a method name, `None` when it is not part of the set.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    #(#lookups,)*
                    _ => None,
                }
            }
        }

        impl crate::Expr {
            #(#methods)*
        }
    }
    .into()
}
