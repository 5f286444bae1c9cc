// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Procedural macros for the Tessera ECS crates.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

/// Implements `tessera_data::ecs::Component` for a `'static` type.
#[proc_macro_derive(Component)]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::tessera_data::ecs::Component for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

/// Implements `tessera_control::System`.
///
/// The reported name defaults to the type's identifier and can be overridden
/// with `#[system(name = "...")]`.
#[proc_macro_derive(System, attributes(system))]
pub fn derive_system(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut display = name.to_string();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("system")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                display = value.value();
                Ok(())
            } else {
                Err(meta.error("unsupported system attribute, expected `name`"))
            }
        });
        if let Err(e) = parsed {
            return e.to_compile_error().into();
        }
    }

    let expanded = quote! {
        impl #impl_generics ::tessera_control::System for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                #display
            }
        }
    };

    TokenStream::from(expanded)
}
