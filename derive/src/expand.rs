//! Code generation for `#[derive(Reflect)]`. Mirrors how the teacher's own
//! `generator.rs` built up a `TokenStream` from a parsed description --
//! here the description comes from the struct's own AST (its `#[repr(C)]`
//! attribute, its fields, and each field's `#[flatpack(tag = N)]`) rather
//! than from a parsed format string.

use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Type};

pub fn expand(input: DeriveInput) -> TokenStream {
    let name = &input.ident;

    if let Err(e) = require_repr_c(&input) {
        return e.to_compile_error();
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return syn::Error::new_spanned(
                    other,
                    "#[derive(Reflect)] only supports structs with named fields",
                )
                .to_compile_error()
            }
        },
        other => {
            return syn::Error::new_spanned(
                other,
                "#[derive(Reflect)] only supports structs, not enums or unions",
            )
            .to_compile_error()
        }
    };

    let mut parsed = Vec::new();
    let mut seen_tags = std::collections::HashSet::new();
    for field in fields {
        let tag = match field_tag(field) {
            Ok(tag) => tag,
            Err(e) => return e.to_compile_error(),
        };
        if !seen_tags.insert(tag) {
            return syn::Error::new_spanned(
                field,
                format!("duplicate #[flatpack(tag = {tag})] in this struct"),
            )
            .to_compile_error();
        }
        parsed.push(ParsedField {
            ident: field.ident.clone().expect("named field"),
            ty: field.ty.clone(),
            tag,
        });
    }

    let reflect_impl = gen_reflect(name, &parsed);
    let exact_impl = gen_exact(name, &parsed);
    let versioned_impl = gen_versioned(name, &parsed);

    quote! {
        #reflect_impl
        #exact_impl
        #versioned_impl
    }
}

struct ParsedField {
    ident: syn::Ident,
    ty: Type,
    tag: u32,
}

fn require_repr_c(input: &DeriveInput) -> syn::Result<()> {
    let has_repr_c = input.attrs.iter().any(|attr| {
        if !attr.path().is_ident("repr") {
            return false;
        }
        let mut found = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                found = true;
            }
            Ok(())
        });
        found
    });
    if has_repr_c {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Reflect)] requires #[repr(C)] -- field offsets are only meaningful for a stable, C-compatible layout",
        ))
    }
}

fn field_tag(field: &syn::Field) -> syn::Result<u32> {
    for attr in &field.attrs {
        if !attr.path().is_ident("flatpack") {
            continue;
        }
        let mut tag = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value = meta.value()?;
                let lit: syn::LitInt = value.parse()?;
                tag = Some(lit.base10_parse::<u32>()?);
                Ok(())
            } else {
                Err(meta.error("unrecognized #[flatpack(...)] key, expected `tag`"))
            }
        })?;
        return tag.ok_or_else(|| syn::Error::new_spanned(attr, "#[flatpack(tag = N)] requires a `tag`"));
    }
    Err(syn::Error::new_spanned(
        field,
        "every field of a #[derive(Reflect)] struct needs #[flatpack(tag = N)]",
    ))
}

/// What shape a field's type has, as far as the versioned reader's
/// per-category dispatch is concerned. Determined purely from the field's
/// own type syntax at macro-expansion time.
enum FieldKind<'a> {
    Primitive,
    NestedStruct,
    FixedArray { elem: &'a Type, len: &'a syn::Expr, elem_primitive: bool },
    Vector { elem: &'a Type, elem_primitive: bool },
    Str,
}

const PRIMITIVE_IDENTS: &[&str] = &[
    "u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "f32", "f64",
];

fn is_primitive_type(ty: &Type) -> bool {
    match ty {
        Type::Path(p) => p
            .path
            .get_ident()
            .map(|id| PRIMITIVE_IDENTS.contains(&id.to_string().as_str()))
            .unwrap_or(false),
        _ => false,
    }
}

fn classify(ty: &Type) -> FieldKind<'_> {
    match ty {
        Type::Array(arr) => FieldKind::FixedArray {
            elem: &arr.elem,
            len: &arr.len,
            elem_primitive: is_primitive_type(&arr.elem),
        },
        Type::Path(p) => {
            let segment = p.path.segments.last().expect("non-empty path");
            if segment.ident == "String" {
                return FieldKind::Str;
            }
            if segment.ident == "Vec" {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(elem)) = args.args.first() {
                        return FieldKind::Vector {
                            elem,
                            elem_primitive: is_primitive_type(elem),
                        };
                    }
                }
            }
            if is_primitive_type(ty) {
                FieldKind::Primitive
            } else {
                FieldKind::NestedStruct
            }
        }
        _ => FieldKind::NestedStruct,
    }
}

fn gen_reflect(name: &syn::Ident, fields: &[ParsedField]) -> TokenStream {
    let members = fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let tag = f.tag;
        quote_spanned! {ty.span()=>
            flatpack::schema::compiler::MemberSpec {
                tag: #tag,
                offset: (std::mem::offset_of!(#name, #ident)) as u32,
                size: std::mem::size_of::<#ty>() as u32,
                category: <#ty as flatpack::Reflect>::CATEGORY,
                link_index: compiler.link::<#ty>(),
            }
        }
    });

    quote! {
        impl flatpack::Reflect for #name {
            const CATEGORY: flatpack::TypeCategory = flatpack::TypeCategory::Struct;

            fn schema() -> &'static flatpack::Schema {
                static SCHEMA: std::sync::OnceLock<flatpack::Schema> = std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    let mut compiler = flatpack::schema::compiler::SchemaCompiler::new();
                    let members = vec![#(#members),*];
                    compiler.finish_struct(std::mem::size_of::<#name>() as u32, members)
                })
            }
        }
    }
}

fn gen_exact(name: &syn::Ident, fields: &[ParsedField]) -> TokenStream {
    let field_idents: Vec<_> = fields.iter().map(|f| &f.ident).collect();

    quote! {
        impl flatpack::exact::ExactCodec for #name {
            fn write_exact<W: flatpack::stream::StreamWriter + ?Sized>(&self, w: &mut W) -> flatpack::Result<()> {
                use flatpack::exact::ExactCodec as _;
                use flatpack::stream::StreamWriter as _;
                if <Self as flatpack::Reflect>::schema().is_recursively_packed_at(0) {
                    // SAFETY: the schema compiler proved this struct has no
                    // padding and no `Vector` members, so its raw bytes are
                    // exactly its wire representation.
                    let bytes = unsafe {
                        std::slice::from_raw_parts(
                            (self as *const Self).cast::<u8>(),
                            std::mem::size_of::<Self>(),
                        )
                    };
                    w.write_bytes(bytes)
                } else {
                    #(self.#field_idents.write_exact(w)?;)*
                    Ok(())
                }
            }

            fn read_exact<R: flatpack::stream::StreamReader + ?Sized>(r: &mut R) -> flatpack::Result<Self> {
                use flatpack::exact::ExactCodec as _;
                use flatpack::stream::StreamReader as _;
                if <Self as flatpack::Reflect>::schema().is_recursively_packed_at(0) {
                    let mut buf = vec![0u8; std::mem::size_of::<Self>()];
                    r.read_bytes(&mut buf)?;
                    // SAFETY: see `write_exact`.
                    Ok(unsafe { std::ptr::read(buf.as_ptr().cast::<Self>()) })
                } else {
                    Ok(Self {
                        #(#field_idents: flatpack::exact::ExactCodec::read_exact(r)?,)*
                    })
                }
            }
        }
    }
}

fn gen_versioned(name: &syn::Ident, fields: &[ParsedField]) -> TokenStream {
    let arms = fields.iter().map(|f| gen_versioned_arm(f));

    quote! {
        impl flatpack::versioned::VersionedCodec for #name {
            fn read_versioned_member<R: flatpack::stream::StreamReader + ?Sized>(
                &mut self,
                tag: u32,
                src_category: flatpack::TypeCategory,
                src_schema: &flatpack::Schema,
                src_index: usize,
                r: &mut R,
                options: flatpack::Options,
            ) -> flatpack::Result<bool> {
                #[allow(unused_imports)]
                use flatpack::stream::StreamReader as _;
                match tag {
                    #(#arms)*
                    _ => Ok(false),
                }
            }
        }
    }
}

fn gen_versioned_arm(f: &ParsedField) -> TokenStream {
    let ident = &f.ident;
    let ty = &f.ty;
    let tag = f.tag;
    let kind = classify(ty);

    let body = match kind {
        FieldKind::Primitive => quote! {
            if !src_category.is_primitive() {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: <#ty as flatpack::Reflect>::CATEGORY,
                    found: src_category,
                });
            }
            self.#ident = flatpack::versioned::read_primitive(src_category, r, options)?;
        },
        FieldKind::NestedStruct => quote! {
            if src_category != flatpack::TypeCategory::Struct {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Struct,
                    found: src_category,
                });
            }
            self.#ident = flatpack::versioned::read_nested_struct(src_schema, src_index, r, options)?;
        },
        FieldKind::Str => quote! {
            if src_category != flatpack::TypeCategory::Vector {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Vector,
                    found: src_category,
                });
            }
            let raw = flatpack::versioned::read_vector_bounded(r)?;
            self.#ident = String::from_utf8(raw).map_err(|_| flatpack::Error::TypeMismatch)?;
        },
        // A source is matched against a sink `Vec`/`[T; N]` identically
        // whether it was written as a fixed `Array` or a dynamic `Vector`
        // (`SPEC_FULL.md` §4.4): both carry their element descriptor at
        // `src_index + 1`, differing only in where the element count comes
        // from (the schema itself for `Array`, the wire's length prefix for
        // `Vector`).
        FieldKind::Vector { elem, elem_primitive: true } => quote! {
            if src_category != flatpack::TypeCategory::Array && src_category != flatpack::TypeCategory::Vector {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Vector,
                    found: src_category,
                });
            }
            let elem_category = src_schema.types[src_index + 1].category;
            if !elem_category.is_primitive() {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Invalid,
                    found: elem_category,
                });
            }
            let elem_size = elem_category.primitive_size().expect("primitive category has a size") as usize;
            let src_count = flatpack::versioned::source_element_count(src_category, src_schema, src_index, elem_size, r)?;
            self.#ident = if elem_category == <#elem as flatpack::Reflect>::CATEGORY {
                let mut out = vec![<#elem as Default>::default(); src_count as usize];
                flatpack::versioned::read_primitive_span(&mut out, r)?;
                out
            } else {
                let mut out = Vec::with_capacity(src_count as usize);
                for _ in 0..src_count {
                    out.push(flatpack::versioned::read_primitive(elem_category, r, options)?);
                }
                out
            };
        },
        FieldKind::Vector { elem_primitive: false, .. } => quote! {
            if src_category != flatpack::TypeCategory::Array && src_category != flatpack::TypeCategory::Vector {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Vector,
                    found: src_category,
                });
            }
            self.#ident = flatpack::versioned::read_struct_elements(src_category, src_schema, src_index, usize::MAX, r, options)?;
        },
        FieldKind::FixedArray { elem, len, elem_primitive: true } => quote! {
            if src_category != flatpack::TypeCategory::Array && src_category != flatpack::TypeCategory::Vector {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Array,
                    found: src_category,
                });
            }
            let elem_category = src_schema.types[src_index + 1].category;
            if !elem_category.is_primitive() {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Invalid,
                    found: elem_category,
                });
            }
            let elem_size = elem_category.primitive_size().expect("primitive category has a size") as usize;
            let src_length = flatpack::versioned::source_element_count(src_category, src_schema, src_index, elem_size, r)?;
            let sink_len = #len;
            let copy_count = (src_length as usize).min(sink_len);
            if src_length as usize > sink_len && !options.allow_drop_excess_array_items {
                return Err(flatpack::Error::ExcessNotAllowed { what: "array element" });
            }
            if elem_category == <#elem as flatpack::Reflect>::CATEGORY {
                flatpack::versioned::read_primitive_span(&mut self.#ident[..copy_count], r)?;
            } else {
                for i in 0..copy_count {
                    self.#ident[i] = flatpack::versioned::read_primitive(elem_category, r, options)?;
                }
            }
            for _ in copy_count..(src_length as usize) {
                r.advance(elem_size)?;
            }
        },
        FieldKind::FixedArray { len, elem_primitive: false, .. } => quote! {
            if src_category != flatpack::TypeCategory::Array && src_category != flatpack::TypeCategory::Vector {
                return Err(flatpack::Error::SchemaMismatch {
                    expected: flatpack::TypeCategory::Array,
                    found: src_category,
                });
            }
            let sink_len = #len;
            let elements = flatpack::versioned::read_struct_elements(src_category, src_schema, src_index, sink_len, r, options)?;
            for (i, elem) in elements.into_iter().enumerate() {
                self.#ident[i] = elem;
            }
        },
    };

    quote! {
        #tag => {
            #body
            Ok(true)
        }
    }
}
