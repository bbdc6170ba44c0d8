use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use chumsky::{prelude::*, text::digits};
use smallvec::SmallVec;

use crate::{
    ops::{
        LairOp,
        buffer::{BufferAlloc, BufferDealloc, BufferSize},
        control::Yield,
        view::{Dim, SubView},
    },
    region::Region,
    types::{
        AnyType, TypeRegistry, Typeref,
        elem::{ElemType, FloatType, IntType},
        shaped::{BufferType, Extent, ViewType},
    },
    utils::{Error, ParseDiagnostic},
    values::Name,
};

pub fn whitespace<'src>() -> impl Parser<'src, &'src str, (), extra::Err<Rich<'src, char>>> + Clone
{
    any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .ignored()
        .labelled("whitespace")
}

pub fn integer_parser<'src>()
-> impl Parser<'src, &'src str, u64, extra::Err<Rich<'src, char>>> + Clone {
    digits(10)
        .to_slice()
        .try_map(|digits: &str, span| match u64::from_str_radix(digits, 10) {
            Ok(value) => Ok(value),
            Err(_) => Err(Rich::custom(
                span,
                format!("invalid integer literal: {}", digits),
            )),
        })
        .labelled("integer")
}

pub fn int_type_parser<'src>()
-> impl Parser<'src, &'src str, IntType, extra::Err<Rich<'src, char>>> + Clone {
    just("i")
        .ignore_then(digits(10).to_slice().try_map(|digits, span| {
            let width: u32 = match u32::from_str_radix(digits, 10) {
                Ok(w) => w,
                Err(_) => {
                    return Err(Rich::custom(span, {
                        format!("invalid integer type width: {}", digits)
                    }));
                }
            };

            match IntType::new(width) {
                Some(ty) => Ok(ty),
                None => Err(Rich::custom(span, {
                    format!(
                        "integer type width must be between {} and {}, got {}",
                        IntType::MIN_BITS,
                        IntType::MAX_BITS,
                        width
                    )
                })),
            }
        }))
        .labelled("integer element type")
}

pub fn float_type_parser<'src>()
-> impl Parser<'src, &'src str, FloatType, extra::Err<Rich<'src, char>>> + Clone {
    choice((
        just("f16").to(FloatType::F16),
        just("bf16").to(FloatType::Bf16),
        just("f32").to(FloatType::F32),
        just("f64").to(FloatType::F64),
    ))
    .labelled("floating-point element type")
}

pub fn elem_type_parser<'src>()
-> impl Parser<'src, &'src str, ElemType, extra::Err<Rich<'src, char>>> + Clone {
    choice((
        int_type_parser().map(ElemType::Int),
        float_type_parser().map(ElemType::Float),
    ))
    .labelled("element type")
}

pub fn extent_parser<'src>()
-> impl Parser<'src, &'src str, Extent, extra::Err<Rich<'src, char>>> + Clone {
    choice((
        just("?").to(Extent::Dynamic),
        integer_parser().map(Extent::Static),
    ))
    .labelled("extent")
}

pub fn buffer_type_parser<'src>()
-> impl Parser<'src, &'src str, BufferType, extra::Err<Rich<'src, char>>> + Clone {
    // An absent size reads as dynamic, so `Buffer<f32>` and `Buffer<?xf32>`
    // denote the same type. Printing always spells the size out.
    just("Buffer")
        .ignore_then(
            extent_parser()
                .then_ignore(just("x"))
                .or_not()
                .then(elem_type_parser())
                .delimited_by(just("<"), just(">")),
        )
        .map(|(size, elem)| BufferType {
            elem,
            size: size.unwrap_or(Extent::Dynamic),
        })
        .labelled("buffer type")
}

pub fn view_type_parser<'src>()
-> impl Parser<'src, &'src str, ViewType, extra::Err<Rich<'src, char>>> + Clone {
    just("View")
        .ignore_then(
            extent_parser()
                .then_ignore(just("x"))
                .repeated()
                .collect::<Vec<_>>()
                .then(elem_type_parser())
                .delimited_by(just("<"), just(">")),
        )
        .map(|(dims, elem)| ViewType::new(elem, dims))
        .labelled("view type")
}

pub fn type_parser<'src>(
    registry: &'src TypeRegistry,
) -> impl Parser<'src, &'src str, Typeref, extra::Err<Rich<'src, char>>> {
    choice((
        just("index").to(AnyType::Index),
        buffer_type_parser().map(AnyType::Buffer),
        view_type_parser().map(AnyType::View),
        elem_type_parser().map(AnyType::Elem),
    ))
    .map(|ty| registry.search_or_insert(ty))
    .labelled("type")
}

pub fn percent_name_parser<'src>()
-> impl Parser<'src, &'src str, String, extra::Err<Rich<'src, char>>> + Clone {
    just("%")
        .ignore_then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated()
                .at_least(1)
                .collect::<String>()
                .labelled("identifier"),
        )
        .labelled("name")
}

pub fn value_parser<'src>(
    named_name: impl Fn(String) -> Name + 'src,
) -> impl Parser<'src, &'src str, Name, extra::Err<Rich<'src, char>>> {
    percent_name_parser()
        .labelled("value")
        .map(move |x| named_name(x))
}

fn op_dest_parser<'src>(
    named_name: impl Fn(String) -> Name + Clone + 'src,
) -> impl Parser<'src, &'src str, Name, extra::Err<Rich<'src, char>>> + Clone {
    percent_name_parser()
        .padded()
        .then_ignore(just('='))
        .padded()
        .map(move |s: String| named_name(s))
        .labelled("operation destination")
}

fn op_parser<'src>(
    named_name: impl Fn(String) -> Name + Clone + 'src,
    registry: &'src TypeRegistry,
) -> impl Parser<'src, &'src str, LairOp, extra::Err<Rich<'src, char>>> {
    let alloc = op_dest_parser(named_name.clone())
        .then_ignore(just("alloc"))
        .then(
            value_parser(named_name.clone())
                .padded()
                .separated_by(just(","))
                .collect::<Vec<_>>()
                .delimited_by(just("("), just(")")),
        )
        .then_ignore(just(":").padded())
        .then(buffer_type_parser())
        .validate(|((dest, dynamic_sizes), buffer), extra, emit| {
            let expected = match buffer.size {
                Extent::Static(_) => 0,
                Extent::Dynamic => 1,
            };
            if dynamic_sizes.len() != expected {
                emit.emit(Rich::custom(
                    extra.span(),
                    format!(
                        "allocating a buffer of type `{}` takes exactly {} dynamic size operand(s), but {} were provided",
                        buffer,
                        expected,
                        dynamic_sizes.len()
                    ),
                ));
            }

            LairOp::BufferAlloc(BufferAlloc {
                dest,
                ty: registry.search_or_insert(buffer.into()),
                dynamic_sizes: SmallVec::from_vec(dynamic_sizes),
            })
        })
        .labelled("alloc operation");

    let dealloc = just("dealloc")
        .ignore_then(whitespace())
        .ignore_then(value_parser(named_name.clone()))
        .then_ignore(just(":").padded())
        .then(buffer_type_parser())
        .map(|(buffer, ty)| {
            LairOp::BufferDealloc(BufferDealloc {
                buffer,
                ty: registry.search_or_insert(ty.into()),
            })
        })
        .labelled("dealloc operation");

    let buffer_size = op_dest_parser(named_name.clone())
        .then_ignore(just("buffer_size"))
        .then_ignore(whitespace())
        .then(value_parser(named_name.clone()))
        .then_ignore(just(":").padded())
        .then(buffer_type_parser())
        .map(|((dest, buffer), ty)| {
            LairOp::BufferSize(BufferSize {
                dest,
                buffer,
                ty: registry.search_or_insert(ty.into()),
            })
        })
        .labelled("buffer_size operation");

    let dim = op_dest_parser(named_name.clone())
        .then_ignore(just("dim"))
        .then_ignore(whitespace())
        .then(value_parser(named_name.clone()))
        .then_ignore(just(",").padded())
        .then(integer_parser())
        .then_ignore(just(":").padded())
        .then(view_type_parser())
        .map(|(((dest, view), index), ty)| {
            LairOp::Dim(Dim {
                dest,
                view,
                ty: registry.search_or_insert(ty.into()),
                index,
            })
        })
        .labelled("dim operation");

    let subview = op_dest_parser(named_name.clone())
        .then_ignore(just("subview"))
        .then_ignore(whitespace())
        .then(value_parser(named_name.clone()))
        .then(
            value_parser(named_name.clone())
                .padded()
                .separated_by(just(","))
                .collect::<Vec<_>>()
                .delimited_by(just("["), just("]"))
                .padded(),
        )
        .then_ignore(just(":").padded())
        .then(view_type_parser())
        .map(|(((dest, view), indices), ty)| {
            LairOp::SubView(SubView {
                dest,
                view,
                ty: registry.search_or_insert(ty.into()),
                indices: SmallVec::from_vec(indices),
            })
        })
        .labelled("subview operation");

    let yield_op = just("yield")
        .ignore_then(
            whitespace()
                .ignore_then(
                    value_parser(named_name.clone())
                        .padded()
                        .separated_by(just(","))
                        .at_least(1)
                        .collect::<Vec<_>>()
                        .then_ignore(just(":").padded())
                        .then(
                            type_parser(registry)
                                .padded()
                                .separated_by(just(","))
                                .at_least(1)
                                .collect::<Vec<_>>(),
                        ),
                )
                .or_not(),
        )
        .validate(|operands, extra, emit| match operands {
            Some((values, types)) => {
                if values.len() != types.len() {
                    emit.emit(Rich::custom(
                        extra.span(),
                        format!(
                            "yield lists {} value(s) but {} type(s)",
                            values.len(),
                            types.len()
                        ),
                    ));
                }
                LairOp::Yield(Yield::new(values.into_iter().zip(types)))
            }
            None => LairOp::Yield(Yield::default()),
        })
        .labelled("yield operation");

    choice((alloc, buffer_size, dim, subview, dealloc, yield_op)).labelled("operation")
}

pub fn region_parser<'src>(
    registry: &'src TypeRegistry,
) -> impl Parser<'src, &'src str, Region, extra::Err<Rich<'src, char>>> {
    let name_hashmap: Rc<RefCell<BTreeMap<String, Name>>> = Default::default();
    let named_name = move |string: String| {
        let hashmap = &mut *name_hashmap.borrow_mut();
        if let Some(name) = hashmap.get(&string) {
            *name
        } else {
            let next_name = Name(hashmap.len() as u32);
            hashmap.insert(string, next_name);
            next_name
        }
    };

    just("region")
        .padded()
        .ignore_then(
            value_parser(named_name.clone())
                .then_ignore(just(":").padded())
                .then(type_parser(registry))
                .padded()
                .separated_by(just(","))
                .collect::<Vec<_>>()
                .delimited_by(just("("), just(")"))
                .padded(),
        )
        .then(
            op_parser(named_name.clone(), registry)
                .padded()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just("{"), just("}"))
                .padded(),
        )
        .map(|(params, ops)| Region { params, ops })
        .labelled("region")
}

/// Parse the textual form of a single region.
///
/// Names are interned in order of first appearance, so a region printed via
/// [`Region::fmt`] parses back to a structurally equal region whenever the
/// printed region used dense definition-order names (see
/// [`Region::normalize_names`]).
///
/// Example:
/// ```rust
/// # use lair::{parser::parse_region_from_string, types::TypeRegistry};
/// let registry = TypeRegistry::new([0; 6]);
/// let region = parse_region_from_string(
///     "region (%size: index) {
///        %buf = alloc(%size) : Buffer<?xf32>
///        dealloc %buf : Buffer<?xf32>
///        yield
///      }",
///     &registry,
/// )
/// .expect("valid region");
/// assert_eq!(region.ops.len(), 3);
/// region.verify(&registry).expect("region verifies");
/// ```
pub fn parse_region_from_string(source: &str, registry: &TypeRegistry) -> Result<Region, Error> {
    let (output, errors) = region_parser(registry)
        .then_ignore(end())
        .parse(source)
        .into_output_errors();

    match output {
        Some(region) if errors.is_empty() => Ok(region),
        _ => Err(Error::ParserErrors {
            errors: errors
                .into_iter()
                .map(|error| ParseDiagnostic {
                    message: error.to_string(),
                    start: error.span().start,
                    end: error.span().end,
                })
                .collect(),
        }),
    }
}
