//! Derive macros generating the field tables `mockrule` scans instead of runtime reflection.
//!
//! - `MockFixture`: implements `mockrule::MockFixture` for a test fixture. Fields marked `#[mock]`
//!   receive doubles; fields marked `#[inject_mocks]` receive a constructed object wired with them.
//! - `Injectable`: implements `mockrule::MockFixture` and `mockrule::Injectable` for a type that
//!   can sit behind an `#[inject_mocks]` field. Every `Option<T>` field is a wiring candidate and
//!   needs `T: Clone + 'static`; use `#[inject(skip)]` for fields that should never receive a double.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Data, DeriveInput, Field, Fields, GenericArgument, Ident, PathArguments, Type, parse_macro_input};

/// How a field shows up in the generated table.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Mock,
    Inject,
    /// `Option<_>` field of an injectable type; may receive a double.
    Slot,
    Ordinary,
}

/// How an injectable type is built when its `#[inject_mocks]` field is empty.
enum Constructor {
    Default,
    Path(syn::Path),
    None,
}

/// Generates `mockrule::MockFixture` for a test fixture.
///
/// # Example
/// ```ignore
/// #[derive(MockFixture)]
/// struct CheckoutTest {
///     #[mock]
///     payments: Option<Arc<dyn Payments>>,
///     #[inject_mocks]
///     checkout: Option<Checkout>,
///     label: &'static str,
/// }
/// ```
///
/// `#[mock]` fields must be `Option<T>` with `T: Clone + 'static`; `#[inject_mocks]` fields must be
/// `Option<S>` with `S: Injectable`.
#[proc_macro_derive(MockFixture, attributes(mock, inject_mocks))]
pub fn derive_mock_fixture(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_mock_fixture(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Generates `mockrule::MockFixture` and `mockrule::Injectable` for an injection target.
///
/// # Example
/// ```ignore
/// #[derive(Default, Injectable)]
/// struct Checkout {
///     payments: Option<Arc<dyn Payments>>,
///     #[inject(skip)]
///     audit: Option<AuditLog>,
///     currency: String,
/// }
///
/// #[derive(Injectable)]
/// #[injectable(constructor = Ledger::empty)]
/// struct Ledger { /* ... */ }
///
/// #[derive(Injectable)]
/// #[injectable(no_default)]
/// struct Session { /* ... */ }
/// ```
///
/// Construction uses `Default` unless `constructor = path` names a zero-argument function, or
/// `no_default` declares that the type has no zero-argument construction path.
#[proc_macro_derive(Injectable, attributes(injectable, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_injectable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_mock_fixture(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let mut classified = Vec::new();
    for field in named_fields(input)? {
        let mock = find_marker(field, "mock")?;
        let inject = find_marker(field, "inject_mocks")?;
        let kind = match (mock, inject) {
            (true, true) => {
                return Err(syn::Error::new_spanned(
                    field,
                    "a field cannot be both `#[mock]` and `#[inject_mocks]`",
                ));
            }
            (true, false) => FieldKind::Mock,
            (false, true) => FieldKind::Inject,
            (false, false) => FieldKind::Ordinary,
        };
        if kind != FieldKind::Ordinary && option_inner(&field.ty).is_none() {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "`#[mock]` and `#[inject_mocks]` fields must be declared as `Option<_>`",
            ));
        }
        classified.push((field, kind));
    }
    Ok(fixture_impl(input, &classified))
}

fn expand_injectable(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let constructor = parse_constructor(input)?;

    let mut classified = Vec::new();
    for field in named_fields(input)? {
        let kind = if !is_skipped(field)? && option_inner(&field.ty).is_some() {
            FieldKind::Slot
        } else {
            FieldKind::Ordinary
        };
        classified.push((field, kind));
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let construct = match constructor {
        Constructor::Default => Some(quote! {
            ::core::result::Result::Ok(<Self as ::core::default::Default>::default())
        }),
        Constructor::Path(path) => Some(quote! { ::core::result::Result::Ok(#path()) }),
        Constructor::None => None,
    };
    let construct_fn = construct.map(|body| {
        quote! {
            fn construct() -> ::core::result::Result<Self, ::mockrule::ConstructionError> {
                #body
            }
        }
    });

    let fixture = fixture_impl(input, &classified);
    Ok(quote! {
        #fixture

        impl #impl_generics ::mockrule::Injectable for #name #ty_generics #where_clause {
            #construct_fn
        }
    })
}

fn fixture_impl(input: &DeriveInput, fields: &[(&Field, FieldKind)]) -> TokenStream2 {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut descriptors = Vec::new();
    let mut slot_idents: Vec<&Ident> = Vec::new();
    let mut slot_names = Vec::new();
    let mut inject_idents: Vec<&Ident> = Vec::new();
    let mut inject_names = Vec::new();

    for (field, kind) in fields {
        // named_fields() guarantees an identifier.
        let Some(ident) = field.ident.as_ref() else { continue };
        let field_name = ident.to_string();
        let descriptor = match kind {
            FieldKind::Mock => quote!(::mockrule::FieldDescriptor::mock(#field_name, &self.#ident)),
            FieldKind::Inject => quote!(::mockrule::FieldDescriptor::inject(#field_name, &self.#ident)),
            FieldKind::Slot => quote!(::mockrule::FieldDescriptor::slot(#field_name, &self.#ident)),
            FieldKind::Ordinary => {
                let ty = &field.ty;
                let type_name = quote!(#ty).to_string();
                quote!(::mockrule::FieldDescriptor::ordinary(#field_name, #type_name))
            }
        };
        descriptors.push(descriptor);

        match kind {
            FieldKind::Mock | FieldKind::Slot => {
                slot_idents.push(ident);
                slot_names.push(field_name);
            }
            FieldKind::Inject => {
                inject_idents.push(ident);
                inject_names.push(field_name);
            }
            FieldKind::Ordinary => {}
        }
    }

    quote! {
        impl #impl_generics ::mockrule::MockFixture for #name #ty_generics #where_clause {
            fn fixture_name(&self) -> &'static str {
                #name_str
            }

            fn fields(&self) -> ::std::vec::Vec<::mockrule::FieldDescriptor> {
                ::std::vec![#(#descriptors),*]
            }

            fn slot(&self, name: &str) -> ::core::option::Option<&dyn ::mockrule::Slot> {
                match name {
                    #(#slot_names => ::core::option::Option::Some(&self.#slot_idents as &dyn ::mockrule::Slot),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn slot_mut(&mut self, name: &str) -> ::core::option::Option<&mut dyn ::mockrule::Slot> {
                match name {
                    #(#slot_names => ::core::option::Option::Some(&mut self.#slot_idents as &mut dyn ::mockrule::Slot),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn inject_slot(&self, name: &str) -> ::core::option::Option<&dyn ::mockrule::InjectSlot> {
                match name {
                    #(#inject_names => ::core::option::Option::Some(&self.#inject_idents as &dyn ::mockrule::InjectSlot),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn inject_slot_mut(&mut self, name: &str) -> ::core::option::Option<&mut dyn ::mockrule::InjectSlot> {
                match name {
                    #(#inject_names => ::core::option::Option::Some(&mut self.#inject_idents as &mut dyn ::mockrule::InjectSlot),)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    }
}

fn named_fields(input: &DeriveInput) -> syn::Result<&Punctuated<Field, Comma>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "mockrule derives require a struct with named fields",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "mockrule derives can only be used on structs",
        )),
    }
}

/// Whether `field` carries the bare marker attribute `#[name]`.
fn find_marker(field: &Field, name: &str) -> syn::Result<bool> {
    let mut found = false;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident(name)) {
        attr.meta.require_path_only()?;
        found = true;
    }
    Ok(found)
}

fn is_skipped(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `#[inject(skip)]`"))
            }
        })?;
    }
    Ok(skip)
}

fn parse_constructor(input: &DeriveInput) -> syn::Result<Constructor> {
    let mut constructor = Constructor::Default;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("injectable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("no_default") {
                constructor = Constructor::None;
                Ok(())
            } else if meta.path.is_ident("constructor") {
                constructor = Constructor::Path(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `no_default` or `constructor = path`"))
            }
        })?;
    }
    Ok(constructor)
}

/// The `T` of an `Option<T>` type, matched on the last path segment.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
