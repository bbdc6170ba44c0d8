use lair::{
    builder::RegionBuilder,
    geometry::Range,
    ops::{
        LairOp, LairOpKind, Op,
        buffer::{BufferAlloc, BufferDealloc, BufferSize},
        control::Yield,
    },
    region::Region,
    types::{
        TypeRegistry,
        elem::{FloatType, IntType},
        shaped::{BufferType, ViewType},
    },
    utils::Error,
    values::{Attr, Name},
};

#[test]
fn build_measure_release_verifies() {
    let registry = TypeRegistry::new([0; 6]);
    let mut builder = RegionBuilder::new(&registry);

    let size = builder.param(registry.index_type());
    let buffer = builder
        .alloc(BufferType::dynamic(FloatType::F32), &[size])
        .expect("alloc");
    let measured = builder.buffer_size(buffer).expect("buffer_size");
    assert_eq!(builder.region().ops.len(), 2);

    builder.dealloc(buffer).expect("dealloc");
    builder.yield_values(&[measured]).expect("yield");

    let region = builder.finish();
    region.verify(&registry).expect("region verifies");
    assert_eq!(region.ops.len(), 4);
    assert_eq!(region.params.len(), 1);
}

#[test]
fn empty_regions_verify() {
    let registry = TypeRegistry::new([0; 6]);
    Region::default().verify(&registry).expect("empty body");

    let params_only = Region::new(vec![(Name(0), registry.index_type())]);
    params_only
        .verify(&registry)
        .expect("parameters without a body");
}

#[test]
fn dim_within_rank_verifies_and_keeps_position() {
    let registry = TypeRegistry::new([0; 6]);
    for rank in 1..4usize {
        let view_ty =
            registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, rank).into());
        for index in 0..rank as u64 {
            let mut builder = RegionBuilder::new(&registry);
            let view = builder.param(view_ty);
            let dest = builder.dim(view, index).expect("dim");
            builder.yield_values(&[dest]).expect("yield");

            let region = builder.finish();
            region
                .verify(&registry)
                .expect("a position below the rank verifies");

            let LairOp::Dim(dim) = &region.ops[0] else {
                panic!("first operation should be a dim");
            };
            assert_eq!(dim.index, index);
        }
    }
}

#[test]
fn dim_at_or_past_rank_is_rejected() {
    let registry = TypeRegistry::new([0; 6]);
    let view_ty = registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, 3).into());

    let mut builder = RegionBuilder::new(&registry);
    let view = builder.param(view_ty);
    builder
        .dim(view, 3)
        .expect("construction records the position as given");
    builder.yield_values(&[]).expect("yield");

    let err = builder
        .finish()
        .verify(&registry)
        .expect_err("position 3 does not exist on a rank-3 view");
    assert!(err.is_dim_index_out_of_range());
    assert!(
        err.to_string().contains("index is out of range"),
        "got: {err}"
    );
}

#[test]
fn subview_takes_one_triple_per_dimension() {
    let registry = TypeRegistry::new([0; 6]);
    for rank in 0..4usize {
        let view_ty =
            registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, rank).into());

        let mut builder = RegionBuilder::new(&registry);
        let view = builder.param(view_ty);
        let mut ranges = Vec::new();
        for _ in 0..rank {
            let min = builder.param(registry.index_type());
            let max = builder.param(registry.index_type());
            let step = builder.param(registry.index_type());
            ranges.push(Range::new(min, max, step));
        }
        let sliced = builder.subview(view, &ranges).expect("subview");
        builder.yield_values(&[sliced]).expect("yield");

        let region = builder.finish();
        region
            .verify(&registry)
            .expect("one triple per dimension verifies");

        let LairOp::SubView(subview) = &region.ops[0] else {
            panic!("first operation should be a subview");
        };
        assert_eq!(subview.num_ranges(), rank);
        let grouped = subview.ranges().expect("triples group");
        assert_eq!(grouped.as_slice(), ranges.as_slice());
    }
}

#[test]
fn subview_with_incomplete_triples_is_rejected() {
    let registry = TypeRegistry::new([0; 6]);
    let view_ty = registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, 2).into());

    let mut builder = RegionBuilder::new(&registry);
    let view = builder.param(view_ty);
    let indices: Vec<Name> = (0..5)
        .map(|_| builder.param(registry.index_type()))
        .collect();
    builder
        .subview_flat(view, &indices)
        .expect("construction accepts any flat list");
    builder.yield_values(&[]).expect("yield");

    let err = builder
        .finish()
        .verify(&registry)
        .expect_err("five operands cannot cover rank 2");
    assert!(matches!(
        err,
        Error::SubViewRangeArity {
            operands: 5,
            rank: 2
        }
    ));
}

#[test]
fn subview_triple_count_must_equal_the_rank() {
    let registry = TypeRegistry::new([0; 6]);
    let view_ty = registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, 3).into());

    // Six operands form two whole triples, still short of rank 3.
    let mut builder = RegionBuilder::new(&registry);
    let view = builder.param(view_ty);
    let indices: Vec<Name> = (0..6)
        .map(|_| builder.param(registry.index_type()))
        .collect();
    builder.subview_flat(view, &indices).expect("subview");
    builder.yield_values(&[]).expect("yield");

    let err = builder
        .finish()
        .verify(&registry)
        .expect_err("two triples cannot cover rank 3");
    assert!(matches!(
        err,
        Error::SubViewRangeArity {
            operands: 6,
            rank: 3
        }
    ));
}

#[test]
fn subview_range_accessor_returns_the_requested_triple() {
    let registry = TypeRegistry::new([0; 6]);
    let view_ty = registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, 2).into());

    let mut builder = RegionBuilder::new(&registry);
    let view = builder.param(view_ty);
    let operands: Vec<Name> = (0..6)
        .map(|_| builder.param(registry.index_type()))
        .collect();
    builder.subview_flat(view, &operands).expect("subview");
    builder.yield_values(&[]).expect("yield");

    let region = builder.finish();
    region
        .verify(&registry)
        .expect("rank-2 subview with six operands verifies");

    let LairOp::SubView(subview) = &region.ops[0] else {
        panic!("first operation should be a subview");
    };
    assert_eq!(
        subview.range(1),
        Some(Range::new(operands[3], operands[4], operands[5]))
    );
    assert_eq!(subview.range(2), None);
}

#[test]
fn range_and_flat_construction_produce_identical_operands() {
    let registry = TypeRegistry::new([0; 6]);
    let view_ty = registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, 2).into());

    let build = |use_ranges: bool| {
        let mut builder = RegionBuilder::new(&registry);
        let view = builder.param(view_ty);
        let names: Vec<Name> = (0..6)
            .map(|_| builder.param(registry.index_type()))
            .collect();
        let sliced = if use_ranges {
            let ranges = [
                Range::new(names[0], names[1], names[2]),
                Range::new(names[3], names[4], names[5]),
            ];
            builder.subview(view, &ranges).expect("subview from ranges")
        } else {
            builder
                .subview_flat(view, &names)
                .expect("subview from a flat list")
        };
        builder.yield_values(&[sliced]).expect("yield");
        builder.finish()
    };

    let from_ranges = build(true);
    let from_flat = build(false);
    assert_eq!(from_ranges, from_flat);

    let LairOp::SubView(subview) = &from_ranges.ops[0] else {
        panic!("first operation should be a subview");
    };
    let operands: Vec<Name> = subview.operands().collect();
    assert_eq!(operands.len(), 7, "view operand plus six range components");
}

#[test]
fn subview_result_keeps_the_source_view_type() {
    let registry = TypeRegistry::new([0; 6]);
    let view_ty = registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, 1).into());

    let mut builder = RegionBuilder::new(&registry);
    let view = builder.param(view_ty);
    let min = builder.param(registry.index_type());
    let max = builder.param(registry.index_type());
    let step = builder.param(registry.index_type());
    builder
        .subview(view, &[Range::new(min, max, step)])
        .expect("subview");
    builder.yield_values(&[]).expect("yield");

    let region = builder.finish();
    region.verify(&registry).expect("verifies");

    let LairOp::SubView(subview) = &region.ops[0] else {
        panic!("first operation should be a subview");
    };
    assert_eq!(subview.result_type(&registry), Some(view_ty));
}

#[test]
fn alloc_size_operands_must_match_the_buffer_type() {
    let registry = TypeRegistry::new([0; 6]);
    let mut builder = RegionBuilder::new(&registry);
    let size = builder.param(registry.index_type());

    let err = builder
        .alloc(BufferType::fixed(FloatType::F32, 4), &[size])
        .expect_err("static buffers take no dynamic size");
    assert!(matches!(
        err,
        Error::AllocSizeOperands {
            expected: 0,
            found: 1,
            ..
        }
    ));

    let err = builder
        .alloc(BufferType::dynamic(FloatType::F32), &[])
        .expect_err("dynamic buffers take exactly one dynamic size");
    assert!(matches!(
        err,
        Error::AllocSizeOperands {
            expected: 1,
            found: 0,
            ..
        }
    ));

    let buffer = builder
        .alloc(BufferType::dynamic(FloatType::F32), &[size])
        .expect("alloc");
    builder.dealloc(buffer).expect("dealloc");
    builder.yield_values(&[]).expect("yield");
    builder.finish().verify(&registry).expect("verifies");
}

#[test]
fn generic_build_rejects_wrong_operand_counts() {
    let registry = TypeRegistry::new([0; 6]);
    let buffer_ty = registry.search_or_insert(BufferType::fixed(FloatType::F32, 8).into());

    let mut builder = RegionBuilder::new(&registry);
    let buffer = builder
        .build(LairOpKind::BufferAlloc, &[], &[Attr::ty("type", buffer_ty)])
        .expect("generic alloc")
        .expect("alloc produces a result");

    let err = builder
        .build(LairOpKind::BufferDealloc, &[], &[])
        .expect_err("dealloc requires its buffer operand");
    assert!(matches!(
        err,
        Error::OperandCountMismatch {
            op: "dealloc",
            found: 0,
            ..
        }
    ));

    let err = builder
        .build(LairOpKind::BufferSize, &[buffer, buffer], &[])
        .expect_err("buffer_size takes exactly one operand");
    assert!(matches!(
        err,
        Error::OperandCountMismatch {
            op: "buffer_size",
            found: 2,
            ..
        }
    ));

    builder
        .build(LairOpKind::BufferDealloc, &[buffer], &[])
        .expect("dealloc");
    builder
        .build(LairOpKind::Yield, &[], &[])
        .expect("yield");
    builder.finish().verify(&registry).expect("verifies");
}

#[test]
fn generic_build_decodes_declared_attributes() {
    let registry = TypeRegistry::new([0; 6]);
    let view_ty = registry.search_or_insert(ViewType::fully_dynamic(FloatType::F32, 2).into());

    let mut builder = RegionBuilder::new(&registry);
    let view = builder.param(view_ty);

    let err = builder
        .build(LairOpKind::Dim, &[view], &[])
        .expect_err("dim requires its position attribute");
    assert!(matches!(
        err,
        Error::MissingAttribute {
            op: "dim",
            attr: "index"
        }
    ));

    let err = builder
        .build(LairOpKind::Dim, &[view], &[Attr::ty("index", view_ty)])
        .expect_err("the position attribute must be an integer");
    assert!(matches!(
        err,
        Error::AttributeTypeMismatch {
            op: "dim",
            attr: "index",
            ..
        }
    ));

    let dest = builder
        .build(LairOpKind::Dim, &[view], &[Attr::int("index", 1)])
        .expect("dim builds")
        .expect("dim produces a result");
    builder
        .build(LairOpKind::Yield, &[dest], &[])
        .expect("yield");
    builder.finish().verify(&registry).expect("verifies");
}

#[test]
fn non_empty_region_requires_a_trailing_terminator() {
    let registry = TypeRegistry::new([0; 6]);

    let mut builder = RegionBuilder::new(&registry);
    builder
        .alloc(BufferType::fixed(IntType::I32, 2), &[])
        .expect("alloc");
    let err = builder
        .finish()
        .verify(&registry)
        .expect_err("a non-empty body needs a terminator");
    assert!(err.is_missing_terminator());

    let mut builder = RegionBuilder::new(&registry);
    builder.yield_values(&[]).expect("early yield");
    builder
        .alloc(BufferType::fixed(IntType::I32, 2), &[])
        .expect("alloc");
    builder.yield_values(&[]).expect("trailing yield");
    let err = builder
        .finish()
        .verify(&registry)
        .expect_err("a terminator may only appear last");
    assert!(matches!(err, Error::TerminatorNotLast { position: 0 }));
}

#[test]
fn names_must_be_defined_exactly_once_and_before_use() {
    let registry = TypeRegistry::new([0; 6]);
    let buffer_ty = registry.search_or_insert(BufferType::fixed(FloatType::F32, 8).into());

    // %1 measures %0 although %0 is only defined one operation later.
    let region = Region {
        params: vec![],
        ops: vec![
            LairOp::BufferSize(BufferSize {
                dest: Name(1),
                buffer: Name(0),
                ty: buffer_ty,
            }),
            LairOp::BufferAlloc(BufferAlloc {
                dest: Name(0),
                ty: buffer_ty,
                dynamic_sizes: Default::default(),
            }),
            LairOp::Yield(Yield::default()),
        ],
    };
    let err = region.verify(&registry).expect_err("use before definition");
    assert!(matches!(
        err,
        Error::UseBeforeDef {
            name: Name(0),
            position: 0
        }
    ));

    let region = Region {
        params: vec![],
        ops: vec![
            LairOp::BufferDealloc(BufferDealloc {
                buffer: Name(7),
                ty: buffer_ty,
            }),
            LairOp::Yield(Yield::default()),
        ],
    };
    let err = region.verify(&registry).expect_err("dangling operand");
    assert!(matches!(err, Error::UndefinedName { undefined: Name(7) }));

    let region = Region {
        params: vec![(Name(0), registry.index_type())],
        ops: vec![
            LairOp::BufferAlloc(BufferAlloc {
                dest: Name(0),
                ty: buffer_ty,
                dynamic_sizes: Default::default(),
            }),
            LairOp::Yield(Yield::default()),
        ],
    };
    let err = region
        .verify(&registry)
        .expect_err("destination collides with the parameter");
    assert!(matches!(err, Error::DuplicateName { duplicate: Name(0) }));
}

#[test]
fn schema_checks_cover_operand_kinds_and_declared_types() {
    let registry = TypeRegistry::new([0; 6]);
    let fixed_ty = registry.search_or_insert(BufferType::fixed(FloatType::F32, 8).into());
    let dynamic_ty = registry.search_or_insert(BufferType::dynamic(FloatType::F32).into());

    // buffer_size over an index value violates the schema constraint.
    let region = Region {
        params: vec![(Name(0), registry.index_type())],
        ops: vec![
            LairOp::BufferSize(BufferSize {
                dest: Name(1),
                buffer: Name(0),
                ty: dynamic_ty,
            }),
            LairOp::Yield(Yield::default()),
        ],
    };
    let err = region
        .verify(&registry)
        .expect_err("buffer_size needs a buffer operand");
    assert!(matches!(
        err,
        Error::OperandTypeMismatch {
            op: "buffer_size",
            position: 0,
            expected: "buffer",
            ..
        }
    ));

    // dealloc declares a different buffer type than the bound value carries.
    let region = Region {
        params: vec![(Name(0), dynamic_ty)],
        ops: vec![
            LairOp::BufferDealloc(BufferDealloc {
                buffer: Name(0),
                ty: fixed_ty,
            }),
            LairOp::Yield(Yield::default()),
        ],
    };
    let err = region
        .verify(&registry)
        .expect_err("declared type must match the bound value");
    assert!(matches!(
        err,
        Error::TypeMismatch {
            op: "dealloc",
            position: 0,
            ..
        }
    ));
}

#[test]
fn normalize_names_renumbers_densely() {
    let registry = TypeRegistry::new([0; 6]);
    let buffer_ty = registry.search_or_insert(BufferType::fixed(FloatType::F32, 8).into());

    let mut region = Region {
        params: vec![(Name(10), registry.index_type())],
        ops: vec![
            LairOp::BufferAlloc(BufferAlloc {
                dest: Name(20),
                ty: buffer_ty,
                dynamic_sizes: Default::default(),
            }),
            LairOp::BufferSize(BufferSize {
                dest: Name(30),
                buffer: Name(20),
                ty: buffer_ty,
            }),
            LairOp::Yield(Yield::new([(Name(30), registry.index_type())])),
        ],
    };
    region
        .verify(&registry)
        .expect("sparse names are still valid SSA");
    assert_eq!(region.next_available_name(), Name(31));

    region.normalize_names();
    assert_eq!(region.params[0].0, Name(0));
    assert_eq!(region.ops[0].destination(), Some(Name(1)));
    assert_eq!(region.ops[1].destination(), Some(Name(2)));

    let LairOp::BufferSize(size) = &region.ops[1] else {
        panic!("second operation should be a buffer_size");
    };
    assert_eq!(size.buffer, Name(1));

    let LairOp::Yield(yld) = &region.ops[2] else {
        panic!("third operation should be a yield");
    };
    assert_eq!(yld.values[0].0, Name(2));

    assert_eq!(region.next_available_name(), Name(3));
    region
        .verify(&registry)
        .expect("normalization preserves validity");
}
