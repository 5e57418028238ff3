use darling::{FromDeriveInput, FromVariant, ast};
use heck::ToSnakeCase;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, parse_macro_input};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(enum_unit))]
struct BinaryDeriveInput {
    ident: syn::Ident,
    data: ast::Data<BinaryVariant, ()>,
}

#[derive(Debug, FromVariant)]
#[darling(attributes(binary))]
struct BinaryVariant {
    ident: syn::Ident,
    #[darling(default)]
    method: Option<String>,
}

pub fn operator_methods_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let enum_info = match BinaryDeriveInput::from_derive_input(&input) {
        Ok(v) => v,
        Err(e) => return e.write_errors().into(),
    };

    let enum_name = &enum_info.ident;

    let variants = enum_info
        .data
        .take_enum()
        .expect("only enum is supported for now");

    let methods = variants.iter().map(|var| {
        let var_name = &var.ident;
        let method = var
            .method
            .clone()
            .unwrap_or_else(|| var_name.to_string().to_snake_case());
        let method_fn = format_ident!("{}", method);
        let doc = format!(" `self {} rhs`", var_name);

        quote! {
            #[doc = #doc]
            pub fn #method_fn<R>(self, rhs: R) -> crate::Expr
            where
                R: crate::IntoExpr,
            {
                crate::Expr::binary(self, #enum_name::#var_name, rhs)
            }
        }
    });

    quote! {
        impl crate::Expr {
            #(#methods)*
        }
    }
    .into()
}
