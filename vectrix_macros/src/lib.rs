use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, PatType, Type};

fn unsupported(span: proc_macro2::Span, message: &str) -> TokenStream {
    syn::Error::new(span, message).to_compile_error().into()
}

/// Turns `fn name(a: f64, b: f64) -> Result<f64, Error>` into a native table
/// entry point `pub fn name(args: &[f64]) -> Result<f64, Error>`.
///
/// The generated body checks the argument count and reports a mismatch as
/// `crate::error::Error::Arity`, so the attribute is meant for use inside
/// `vectrix-rs` itself.
#[proc_macro_attribute]
pub fn vectrix_fn(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let fn_name = &input.sig.ident;
    let fn_args = &input.sig.inputs;
    let fn_body = &input.block;
    let fn_output = &input.sig.output;
    let display_name = fn_name.to_string();

    let mut arg_extractions = Vec::new();

    for (i, arg) in fn_args.iter().enumerate() {
        let FnArg::Typed(PatType { pat, ty, .. }) = arg else {
            return unsupported(fn_name.span(), "native functions cannot take `self`");
        };

        let arg_name = match **pat {
            syn::Pat::Ident(ref ident) => &ident.ident,
            _ => return unsupported(fn_name.span(), "unsupported argument pattern"),
        };

        let is_f64 = match **ty {
            Type::Path(ref type_path) => type_path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "f64"),
            _ => false,
        };
        if !is_f64 {
            return unsupported(
                arg_name.span(),
                "native function arguments must be `f64`",
            );
        }

        arg_extractions.push(quote! {
            let #arg_name = args[#i];
        });
    }

    let args_len = arg_extractions.len();
    let expanded = quote! {
        #(#attrs)*
        pub fn #fn_name(args: &[f64]) #fn_output {
            if args.len() != #args_len {
                return Err(crate::error::Error::Arity {
                    name: #display_name.to_string(),
                    expected: #args_len,
                    found: args.len(),
                });
            }

            #(#arg_extractions)*

            #fn_body
        }
    };

    TokenStream::from(expanded)
}
