//! Event derive macro implementation, **parent-in-child** design.
//!
//! # Overview
//!
//! `#[derive(BotEvent)]` generates:
//!
//! 1. `impl Event`: metadata, identity accessors and `downgrade_any` for
//!    parent chain traversal
//! 2. `impl Deref[Mut]`: auto-generated when a parent field exists
//! 3. `SUB_TYPE`: an associated constant for leaves with a fixed sub-type
//!
//! # Root events: `#[root_event(...)]`
//!
//! Used for the top-level event of a platform. It has no parent.
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `platform` | `"kaiheila"` | **Yes** | Platform name |
//! | `projection` | | No | Route accessors through `EventProjection` |
//!
//! # Child events: `#[event(...)]`
//!
//! Used for all non-root events. The parent is detected from the field
//! marked with `#[event(parent)]`.
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `type` | `"notice"` | No | `EventType` variant (default: inherited from parent) |
//! | `projection` | | No | Route accessors through `EventProjection` |
//! | `sub_type` | `"added_reaction"` | No | Emits `pub const SUB_TYPE: &str` |
//! | `notice_type` | `"channel"` | No | Discriminator literal checked on decode |
//! | `message_type` | `"group"` | No | Discriminator literal checked on decode |
//!
//! `notice_type`, `message_type` and `sub_type` also generate
//! `TryFrom<Parent>`, which rejects a parent whose field of that name holds
//! another value. Pair it with `#[serde(try_from = "Parent")]` so decoding
//! enforces the literal. Only structs whose sole field is the parent can
//! carry discriminators.
//!
//! # Field-level attributes `#[event(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `parent` | Marks this field as the parent (type is auto-detected) |
//! | `raw_json` | Root field that stores `Option<Arc<str>>` of raw JSON |
//! | `bot_id` | Root field that stores the receiving bot's id as `String` |

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type, spanned::Spanned};

// ============================================================================
// Attribute structures
// ============================================================================

/// Which kind of struct-level attribute was found.
enum EventKind {
    /// `#[root_event(platform = "…", projection)]`
    Root { platform: String, projection: bool },
    /// `#[event(type = "…", projection, sub_type = "…", notice_type = "…")]`
    Child {
        event_type: Option<String>,
        projection: bool,
        sub_type: Option<String>,
        /// `(field, literal)` pairs checked by the generated `TryFrom`.
        discriminators: Vec<(String, String)>,
    },
}

/// Per-field `#[event(…)]` markers.
#[derive(Default)]
struct FieldAttrs {
    is_parent: bool,
    is_raw_json: bool,
    is_bot_id: bool,
}

/// Fields found while scanning the struct body.
#[derive(Default)]
struct MarkedFields {
    parent: Option<(Ident, Type)>,
    raw_json: Option<Ident>,
    bot_id: Option<Ident>,
    /// Number of named fields, marked or not.
    count: usize,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_bot_event(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;

    match &input.data {
        Data::Struct(data) => {
            let kind = parse_struct_attrs(&input.attrs, name.span())?;
            let marked = scan_fields(&data.fields)?;
            generate_struct_impl(name, kind, marked)
        }
        Data::Enum(_) => Err(syn::Error::new(
            input.span(),
            "BotEvent does not support enums. Use structs with a parent field instead.",
        )),
        Data::Union(_) => Err(syn::Error::new(
            input.span(),
            "BotEvent cannot be derived for unions",
        )),
    }
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_struct_attrs(attrs: &[Attribute], span: Span) -> syn::Result<EventKind> {
    for attr in attrs {
        if attr.path().is_ident("root_event") {
            let mut platform: Option<String> = None;
            let mut projection = false;

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("platform") {
                    platform = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("projection") {
                    projection = true;
                } else {
                    return Err(meta.error("unknown #[root_event] key"));
                }
                Ok(())
            })?;

            let platform = platform.ok_or_else(|| {
                syn::Error::new(span, "#[root_event] requires `platform = \"…\"`")
            })?;

            return Ok(EventKind::Root {
                platform,
                projection,
            });
        }
    }

    for attr in attrs {
        if attr.path().is_ident("event") {
            let mut event_type: Option<String> = None;
            let mut projection = false;
            let mut sub_type: Option<String> = None;
            let mut discriminators = Vec::new();

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("type") {
                    event_type = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("projection") {
                    projection = true;
                } else if meta.path.is_ident("sub_type") {
                    let value = meta.value()?.parse::<LitStr>()?.value();
                    discriminators.push(("sub_type".to_string(), value.clone()));
                    sub_type = Some(value);
                } else if meta.path.is_ident("notice_type") {
                    let value = meta.value()?.parse::<LitStr>()?.value();
                    discriminators.push(("notice_type".to_string(), value));
                } else if meta.path.is_ident("message_type") {
                    let value = meta.value()?.parse::<LitStr>()?.value();
                    discriminators.push(("message_type".to_string(), value));
                } else {
                    return Err(meta.error("unknown #[event] key"));
                }
                Ok(())
            })?;

            return Ok(EventKind::Child {
                event_type,
                projection,
                sub_type,
                discriminators,
            });
        }
    }

    Err(syn::Error::new(
        span,
        "BotEvent requires either #[root_event(...)] or #[event(...)] attribute",
    ))
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("parent") {
                result.is_parent = true;
            } else if meta.path.is_ident("raw_json") {
                result.is_raw_json = true;
            } else if meta.path.is_ident("bot_id") {
                result.is_bot_id = true;
            } else {
                return Err(meta.error("unknown field marker"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn scan_fields(fields: &Fields) -> syn::Result<MarkedFields> {
    let mut marked = MarkedFields::default();

    let Fields::Named(named) = fields else {
        return Ok(marked);
    };

    marked.count = named.named.len();
    for f in &named.named {
        let fa = parse_field_attrs(&f.attrs)?;
        let Some(ident) = f.ident.as_ref() else {
            continue;
        };
        if fa.is_parent {
            if marked.parent.is_some() {
                return Err(syn::Error::new(
                    ident.span(),
                    "only one field may be marked #[event(parent)]",
                ));
            }
            marked.parent = Some((ident.clone(), f.ty.clone()));
        }
        if fa.is_raw_json {
            marked.raw_json = Some(ident.clone());
        }
        if fa.is_bot_id {
            marked.bot_id = Some(ident.clone());
        }
    }

    Ok(marked)
}

// ============================================================================
// Code generation
// ============================================================================

fn generate_struct_impl(
    name: &Ident,
    kind: EventKind,
    marked: MarkedFields,
) -> syn::Result<TokenStream> {
    match kind {
        EventKind::Root {
            platform,
            projection,
        } => {
            if marked.parent.is_some() {
                return Err(syn::Error::new(
                    name.span(),
                    "#[root_event] must not have a #[event(parent)] field",
                ));
            }
            Ok(generate_root_event(name, &platform, projection, &marked))
        }
        EventKind::Child {
            event_type,
            projection,
            sub_type,
            discriminators,
        } => {
            let (pf_ident, pf_ty) = marked.parent.ok_or_else(|| {
                syn::Error::new(
                    name.span(),
                    "#[event] requires a field marked with #[event(parent)]",
                )
            })?;
            if !discriminators.is_empty() && marked.count != 1 {
                return Err(syn::Error::new(
                    name.span(),
                    "discriminator keys require the parent to be the only field",
                ));
            }
            let event_impl = generate_child_event(
                name,
                event_type.as_deref(),
                projection,
                sub_type.as_deref(),
                &pf_ident,
                &pf_ty,
            );
            let check_impl = (!discriminators.is_empty())
                .then(|| generate_discriminator_check(name, &pf_ident, &pf_ty, &discriminators));
            Ok(quote! {
                #event_impl
                #check_impl
            })
        }
    }
}

/// Accessors that `EventProjection` can take over.
fn projected_accessors() -> TokenStream {
    quote! {
        fn event_name(&self) -> String {
            <Self as ::kaiheila_core::EventProjection>::event_name(self)
        }

        fn description(&self) -> String {
            <Self as ::kaiheila_core::EventProjection>::description(self)
        }

        fn user_id(&self) -> ::kaiheila_core::EventResult<String> {
            <Self as ::kaiheila_core::EventProjection>::user_id(self)
        }

        fn session_id(&self) -> ::kaiheila_core::EventResult<String> {
            <Self as ::kaiheila_core::EventProjection>::session_id(self)
        }

        fn is_tome(&self) -> bool {
            <Self as ::kaiheila_core::EventProjection>::is_tome(self)
        }

        fn plain_text(&self) -> ::kaiheila_core::EventResult<String> {
            <Self as ::kaiheila_core::EventProjection>::plain_text(self)
        }
    }
}

// ============================================================================
// Root event generation
// ============================================================================

fn generate_root_event(
    name: &Ident,
    platform: &str,
    projection: bool,
    marked: &MarkedFields,
) -> TokenStream {
    let platform_lit = LitStr::new(platform, name.span());

    let raw_json_impl = marked.raw_json.as_ref().map(|rj| {
        quote! {
            fn raw_json(&self) -> Option<&str> {
                self.#rj.as_deref()
            }
        }
    });

    let bot_id_impl = marked.bot_id.as_ref().map(|bid| {
        quote! {
            fn bot_id(&self) -> Option<&str> {
                Some(self.#bid.as_str())
            }
        }
    });

    // Without a projection the root answers with the trait defaults.
    let accessors_impl = if projection {
        projected_accessors()
    } else {
        quote! {
            fn event_name(&self) -> String {
                #platform_lit.to_string()
            }
        }
    };

    quote! {
        impl ::kaiheila_core::Event for #name {
            #accessors_impl

            fn platform(&self) -> &'static str {
                #platform_lit
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn downgrade_any(&self, type_id: ::std::any::TypeId) -> Option<Box<dyn ::std::any::Any>> {
                // Root event: only matches self
                if type_id == ::std::any::TypeId::of::<Self>() {
                    Some(Box::new(self.clone()))
                } else {
                    None
                }
            }

            #raw_json_impl
            #bot_id_impl
        }
    }
}

// ============================================================================
// Child event generation
// ============================================================================

fn generate_child_event(
    name: &Ident,
    event_type: Option<&str>,
    projection: bool,
    sub_type: Option<&str>,
    parent_field_ident: &Ident,
    parent_ty: &Type,
) -> TokenStream {
    let parent = quote! { <#parent_ty as ::kaiheila_core::Event> };

    // ── event_type ──
    let event_type_impl = match event_type {
        Some(t) => {
            let variant = match t.to_lowercase().as_str() {
                "message" => quote! { ::kaiheila_core::EventType::Message },
                "notice" => quote! { ::kaiheila_core::EventType::Notice },
                _ => quote! { ::kaiheila_core::EventType::Other },
            };
            quote! { fn event_type(&self) -> ::kaiheila_core::EventType { #variant } }
        }
        None => quote! {
            fn event_type(&self) -> ::kaiheila_core::EventType {
                #parent::event_type(&self.#parent_field_ident)
            }
        },
    };

    // ── naming and identity ──
    let accessors_impl = if projection {
        projected_accessors()
    } else {
        quote! {
            fn event_name(&self) -> String {
                #parent::event_name(&self.#parent_field_ident)
            }

            fn description(&self) -> String {
                #parent::description(&self.#parent_field_ident)
            }

            fn user_id(&self) -> ::kaiheila_core::EventResult<String> {
                #parent::user_id(&self.#parent_field_ident)
            }

            fn session_id(&self) -> ::kaiheila_core::EventResult<String> {
                #parent::session_id(&self.#parent_field_ident)
            }

            fn is_tome(&self) -> bool {
                #parent::is_tome(&self.#parent_field_ident)
            }

            fn plain_text(&self) -> ::kaiheila_core::EventResult<String> {
                #parent::plain_text(&self.#parent_field_ident)
            }
        }
    };

    // ── SUB_TYPE ──
    let sub_type_impl = sub_type.map(|st| {
        let lit = LitStr::new(st, name.span());
        quote! {
            impl #name {
                /// The `sub_type` literal this event is decoded for.
                pub const SUB_TYPE: &'static str = #lit;
            }
        }
    });

    quote! {
        impl ::std::ops::Deref for #name {
            type Target = #parent_ty;
            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.#parent_field_ident
            }
        }

        impl ::std::ops::DerefMut for #name {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.#parent_field_ident
            }
        }

        impl ::kaiheila_core::Event for #name {
            #accessors_impl
            #event_type_impl

            fn platform(&self) -> &'static str {
                #parent::platform(&self.#parent_field_ident)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn downgrade_any(&self, type_id: ::std::any::TypeId) -> Option<Box<dyn ::std::any::Any>> {
                if type_id == ::std::any::TypeId::of::<Self>() {
                    return Some(Box::new(self.clone()));
                }
                #parent::downgrade_any(&self.#parent_field_ident, type_id)
            }

            fn raw_json(&self) -> Option<&str> {
                #parent::raw_json(&self.#parent_field_ident)
            }

            fn bot_id(&self) -> Option<&str> {
                #parent::bot_id(&self.#parent_field_ident)
            }
        }

        #sub_type_impl
    }
}

// ============================================================================
// Discriminator check generation
// ============================================================================

fn generate_discriminator_check(
    name: &Ident,
    parent_field_ident: &Ident,
    parent_ty: &Type,
    discriminators: &[(String, String)],
) -> TokenStream {
    let checks = discriminators.iter().map(|(field, literal)| {
        let field_ident = Ident::new(field, name.span());
        let lit = LitStr::new(literal, name.span());
        quote! {
            if parent.#field_ident != #lit {
                return Err(format!(
                    "expected {} {:?}, found {:?}",
                    #field,
                    #lit,
                    parent.#field_ident
                ));
            }
        }
    });

    quote! {
        impl ::std::convert::TryFrom<#parent_ty> for #name {
            type Error = String;

            fn try_from(parent: #parent_ty) -> Result<Self, Self::Error> {
                #(#checks)*
                Ok(Self {
                    #parent_field_ident: parent,
                })
            }
        }
    }
}
