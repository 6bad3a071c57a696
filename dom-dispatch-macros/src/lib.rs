//! Procedural macros for dom-dispatch

use darling::ast::NestedMeta;
use darling::FromMeta;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ItemFn, ReturnType, Type};

mod deps;

/// Arguments of `#[component(...)]`
#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct ComponentArgs {
    /// Registry name; defaults to the PascalCase function name
    name: Option<String>,

    /// Explicit comma-separated dependency list, replacing inference
    deps: Option<String>,

    /// Path to the dom-dispatch crate
    #[darling(rename = "crate")]
    krate: Option<syn::Path>,
}

/// Convert snake_case to PascalCase
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// The `S` in a `&S` parameter
fn state_type(func: &ItemFn) -> syn::Result<&Type> {
    let Some(FnArg::Typed(param)) = func.sig.inputs.first() else {
        return Err(syn::Error::new_spanned(
            &func.sig,
            "component render functions take the state as their only parameter",
        ));
    };
    match param.ty.as_ref() {
        Type::Reference(r) if r.mutability.is_none() => Ok(r.elem.as_ref()),
        other => Err(syn::Error::new_spanned(
            other,
            "the state parameter must be a shared reference, e.g. `state: &AppState`",
        )),
    }
}

fn check_signature(func: &ItemFn) -> syn::Result<()> {
    let sig = &func.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "component render functions cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "component render functions cannot be generic",
        ));
    }
    if let ReturnType::Default = sig.output {
        return Err(syn::Error::new_spanned(
            sig,
            "component render functions must return the markup as a String",
        ));
    }
    Ok(())
}

fn expand_component(args: ComponentArgs, func: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    check_signature(&func)?;
    let state_ty = state_type(&func)?;

    let fields: Vec<String> = match &args.deps {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect(),
        None => deps::infer(&func)?.into_iter().collect(),
    };

    let fn_ident = &func.sig.ident;
    let vis = &func.vis;
    let struct_ident = format_ident!("{}", to_pascal_case(&fn_ident.to_string()));
    let name = args
        .name
        .unwrap_or_else(|| struct_ident.to_string());
    let krate = args
        .krate
        .unwrap_or_else(|| syn::parse_quote!(::dom_dispatch));
    let doc = format!("Component rendered by [`{fn_ident}`]");

    Ok(quote! {
        #func

        #[doc = #doc]
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #struct_ident;

        impl #struct_ident {
            /// State fields this component reads
            pub const DEPENDENCIES: &'static [&'static str] = &[#(#fields),*];
        }

        impl #krate::Component<#state_ty> for #struct_ident {
            fn name(&self) -> &str {
                #name
            }

            fn dependencies(&self) -> #krate::KeySet {
                Self::DEPENDENCIES.iter().copied().collect()
            }

            fn render(&self, state: &#state_ty) -> ::std::string::String {
                #fn_ident(state)
            }
        }
    })
}

/// Turn a render function into a component
///
/// The function must take the state by shared reference and return the
/// component's markup. The macro keeps the function and adds a unit struct
/// named after it in PascalCase that implements `Component`.
///
/// Dependencies are inferred from the function body: fields read as
/// `state.field`, `state["field"]`, `state.get("field")` or bound by
/// destructuring the state. Reads hidden behind other functions are not
/// seen; list them explicitly with `deps` in that case.
///
/// # Attributes
///
/// - `name = "..."`: registry name (default: the struct name)
/// - `deps = "a, b"`: explicit dependency list, replacing inference
/// - `crate = "path"`: path to the dom-dispatch crate (default `::dom_dispatch`)
///
/// # Example
///
/// ```ignore
/// #[component]
/// fn counter(state: &AppState) -> String {
///     format!("<div><strong>{}</strong></div>", state.counter)
/// }
///
/// runtime.register_component(Counter)?;
/// assert_eq!(Counter::DEPENDENCIES, &["counter"]);
/// ```
#[proc_macro_attribute]
pub fn component(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(list) => list,
        Err(e) => return TokenStream::from(darling::Error::from(e).write_errors()),
    };
    let args = match ComponentArgs::from_list(&attr_args) {
        Ok(args) => args,
        Err(e) => return TokenStream::from(e.write_errors()),
    };
    let func = parse_macro_input!(item as ItemFn);

    expand_component(args, func)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
