//! Procedural macros for statehub

use darling::{FromDeriveInput, FromMeta, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any, struct_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Name reported for a struct action (structs only)
    #[darling(default)]
    rename: Option<String>,

    /// Case convention applied to names that are not renamed explicitly
    #[darling(default)]
    rename_all: Option<RenameRule>,

    /// Also implement `ActionSummary` with its default `Debug` rendering
    #[darling(default)]
    summary: bool,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit name override
    #[darling(default)]
    rename: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum RenameRule {
    Snake,
    ScreamingSnake,
    Kebab,
}

impl FromMeta for RenameRule {
    fn from_string(value: &str) -> darling::Result<Self> {
        match value {
            "snake_case" => Ok(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnake),
            "kebab-case" => Ok(RenameRule::Kebab),
            other => Err(darling::Error::unknown_value(other)),
        }
    }
}

impl RenameRule {
    fn apply(self, name: &str) -> String {
        let snake = to_snake_case(name);
        match self {
            RenameRule::Snake => snake,
            RenameRule::ScreamingSnake => snake.to_uppercase(),
            RenameRule::Kebab => snake.replace('_', "-"),
        }
    }
}

/// Convert PascalCase to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

fn action_name(ident: &syn::Ident, rename: Option<&String>, rule: Option<RenameRule>) -> String {
    match (rename, rule) {
        (Some(explicit), _) => explicit.clone(),
        (None, Some(rule)) => rule.apply(&ident.to_string()),
        (None, None) => ident.to_string(),
    }
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method returning the variant name (or, for a struct,
/// the type name) as a static string.
///
/// Attributes:
/// - `#[action(rename = "...")]` on a variant (or on a struct) overrides its name
/// - `#[action(rename_all = "snake_case")]` on the type converts every other
///   name; also accepts `"SCREAMING_SNAKE_CASE"` and `"kebab-case"`
/// - `#[action(summary)]` on the type also implements `ActionSummary`
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(summary)]
/// enum TodoAction {
///     AddTodo(String),
///     ToggleTodo(usize),
///     #[action(rename = "SetFilter")]
///     ChangeVisibility(Filter),
/// }
///
/// assert_eq!(TodoAction::ToggleTodo(0).name(), "ToggleTodo");
/// assert_eq!(TodoAction::ChangeVisibility(Filter::All).name(), "SetFilter");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let body = match &opts.data {
        darling::ast::Data::Enum(variants) => {
            if opts.rename.is_some() {
                return syn::Error::new_spanned(
                    &input.ident,
                    "`rename` on an enum is not supported; rename its variants instead",
                )
                .to_compile_error()
                .into();
            }

            let name_arms = variants.iter().map(|v| {
                let variant_name = &v.ident;
                let variant_str = action_name(variant_name, v.rename.as_ref(), opts.rename_all);

                match &v.fields.style {
                    darling::ast::Style::Unit => quote! {
                        #name::#variant_name => #variant_str
                    },
                    darling::ast::Style::Tuple => quote! {
                        #name::#variant_name(..) => #variant_str
                    },
                    darling::ast::Style::Struct => quote! {
                        #name::#variant_name { .. } => #variant_str
                    },
                }
            });

            if variants.is_empty() {
                quote! { match *self {} }
            } else {
                quote! {
                    match self {
                        #(#name_arms),*
                    }
                }
            }
        }
        darling::ast::Data::Struct(_) => {
            let struct_str = action_name(name, opts.rename.as_ref(), opts.rename_all);
            quote! { #struct_str }
        }
    };

    let mut expanded = quote! {
        impl #impl_generics statehub::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                #body
            }
        }
    };

    if opts.summary {
        expanded.extend(quote! {
            impl #impl_generics statehub::ActionSummary for #name #ty_generics #where_clause {}
        });
    }

    TokenStream::from(expanded)
}
