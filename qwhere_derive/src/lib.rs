use proc_macro::TokenStream;

mod binary;
mod method;

#[proc_macro_derive(BinaryOperator, attributes(binary))]
pub fn operator_methods(input: TokenStream) -> TokenStream {
    binary::operator_methods_impl(input)
}

#[proc_macro_derive(MethodOperator, attributes(method))]
pub fn method_operator_methods(input: TokenStream) -> TokenStream {
    method::method_operator_methods_impl(input)
}
