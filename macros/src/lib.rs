extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn};

/// Turns `fn main(plugin: &mut yocki::Plugin) { .. }` into a plugin
/// binary: the body registers handlers, then the plugin serves calls.
#[proc_macro_attribute]
pub fn plugin_main(_args: TokenStream, input: TokenStream) -> TokenStream {
    let func = parse_macro_input!(input as ItemFn);

    let (binding, ty) = match (func.sig.inputs.len(), func.sig.inputs.first()) {
        (1, Some(FnArg::Typed(arg))) => (arg.pat.clone(), arg.ty.clone()),
        _ => {
            return syn::Error::new_spanned(
                &func.sig,
                "expected `fn main(plugin: &mut yocki::Plugin)`",
            )
            .to_compile_error()
            .into();
        }
    };
    let body = func.block;

    let expanded = quote! {
        fn main() {
            ::yocki::internal_main(|#binding: #ty| #body);
        }
    };

    TokenStream::from(expanded)
}
