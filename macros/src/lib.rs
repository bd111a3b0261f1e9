use proc_macro::TokenStream;
use syn::Path;

mod persist;

/// Derives `Persist` by persisting every field in declaration order.
///
/// Fields marked `#[persist(skip)]` are left untouched and must implement
/// `Default` for the containing type to be readable.
#[proc_macro_derive(Persist, attributes(persist))]
pub fn derive_persist(input: TokenStream) -> TokenStream {
    persist::derive(input)
}

/// The path of the runtime crate, overridable for re-exports.
fn crate_path() -> syn::Result<Path> {
    let crate_path = option_env!("SPARSEWORLD_PATH").unwrap_or("sparseworld");

    syn::parse_str(crate_path)
}
