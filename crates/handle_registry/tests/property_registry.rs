use cvbind_handle_registry::{
    HandleRegistry, HandleRegistryError, ObjectKind, ObjectSpec, ObjectValue, Point, Rect, Scalar,
    Size,
};
use proptest::prelude::*;
use serde_json::json;

// Property-based tests for the registry contract: conversions round-trip,
// copies are independent, released handles stay dead and regions read the
// right pixels.

fn arbitrary_rect() -> impl Strategy<Value = Rect> {
    (-1000i32..1000, -1000i32..1000, 0i32..5000, 0i32..5000)
        .prop_map(|(x, y, width, height)| Rect::new(x, y, width, height))
}

fn arbitrary_scalar() -> impl Strategy<Value = Vec<f64>> {
    prop_oneof![
        prop::collection::vec(-1e6f64..1e6, 1),
        prop::collection::vec(-1e6f64..1e6, 3),
        prop::collection::vec(-1e6f64..1e6, 4),
    ]
}

/// Matrix dimensions plus a region that fits inside them.
fn matrix_and_region() -> impl Strategy<Value = (usize, usize, Rect)> {
    (1usize..12, 1usize..12).prop_flat_map(|(rows, cols)| {
        (0..cols, 0..rows).prop_flat_map(move |(x, y)| {
            (0..=cols - x, 0..=rows - y).prop_map(move |(w, h)| {
                (rows, cols, Rect::new(x as i32, y as i32, w as i32, h as i32))
            })
        })
    })
}

proptest! {
    #[test]
    fn rect_round_trips(rect in arbitrary_rect()) {
        let registry = HandleRegistry::new();
        let h = registry.create(ObjectSpec::Rectangle(rect)).unwrap();
        prop_assert_eq!(registry.to_value(&h).unwrap(), ObjectValue::Rect(rect));
    }

    #[test]
    fn point_and_size_round_trip(
        x in -1e9f64..1e9,
        y in -1e9f64..1e9,
        width in 0i32..=i32::MAX,
        height in 0i32..=i32::MAX,
    ) {
        let registry = HandleRegistry::new();
        let p = registry.create_from_args(ObjectKind::Point, &[json!(x), json!(y)]).unwrap();
        prop_assert_eq!(registry.to_value(&p).unwrap(), ObjectValue::Point(Point { x, y }));

        let s = registry
            .create_from_args(ObjectKind::Size, &[json!(width), json!(height)])
            .unwrap();
        prop_assert_eq!(registry.to_value(&s).unwrap(), ObjectValue::Size(Size { width, height }));
    }

    #[test]
    fn scalar_keeps_only_supplied_components(components in arbitrary_scalar()) {
        let registry = HandleRegistry::new();
        let args: Vec<_> = components.iter().map(|c| json!(c)).collect();
        let h = registry.create_from_args(ObjectKind::Scalar, &args).unwrap();

        let value = registry.to_value(&h).unwrap().to_json().unwrap();
        let object = value.as_object().unwrap();
        prop_assert_eq!(object.len(), components.len());
        prop_assert_eq!(
            registry.to_value(&h).unwrap(),
            ObjectValue::Scalar(Scalar::from_components(&components).unwrap())
        );
    }

    #[test]
    fn matrix_data_length_must_match(
        rows in 0usize..6,
        cols in 0usize..6,
        code in prop::sample::select(vec![0i64, 8, 16, 24, 5, 21]),
        len in 0usize..160,
    ) {
        let registry = HandleRegistry::new();
        let channels = (code as usize >> 3) + 1;
        let expected = rows * cols * channels;
        let data = vec![1; len];
        let result = registry.create_from_args(
            ObjectKind::Matrix,
            &[json!(rows), json!(cols), json!(code), json!(data)],
        );
        if len == expected {
            prop_assert!(result.is_ok());
        } else {
            let is_mismatch = matches!(
                result,
                Err(HandleRegistryError::DataSizeMismatch { expected: e, actual: a })
                    if e == expected && a == len
            );
            prop_assert!(is_mismatch);
            prop_assert_eq!(registry.live_count(), 0);
        }
    }

    #[test]
    fn copied_elements_match_and_are_independent(
        points in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 1..16),
        pick in any::<prop::sample::Index>(),
    ) {
        let registry = HandleRegistry::new();
        let v = registry.create(ObjectSpec::PointVector).unwrap();
        for (x, y) in &points {
            let p = registry.create(ObjectSpec::Point(Point { x: *x, y: *y })).unwrap();
            registry.push_element(&v, &p).unwrap();
            registry.release(&p).unwrap();
        }

        let i = pick.index(points.len());
        let copy = registry.copy_element(&v, i).unwrap();
        prop_assert_ne!(copy.id, v.id);

        let expected = match registry.to_value(&v).unwrap() {
            ObjectValue::Array { array } => array[i].clone(),
            other => panic!("unexpected vector value {other:?}"),
        };
        prop_assert_eq!(registry.to_value(&copy).unwrap(), expected);

        registry.release(&copy).unwrap();
        prop_assert_eq!(registry.vector_len(&v).unwrap(), points.len());

        let out_of_range = matches!(
            registry.copy_element(&v, points.len()),
            Err(HandleRegistryError::IndexOutOfRange { .. })
        );
        prop_assert!(out_of_range);
    }

    #[test]
    fn released_handles_fail_every_operation(kind_index in 0usize..ObjectKind::ALL.len()) {
        let registry = HandleRegistry::new();
        let kind = ObjectKind::ALL[kind_index];
        let args = match kind {
            ObjectKind::Matrix => vec![json!(2), json!(2), json!(0)],
            ObjectKind::Point | ObjectKind::Size => vec![json!(1), json!(2)],
            ObjectKind::Rectangle => vec![json!(0), json!(0), json!(1), json!(1)],
            ObjectKind::Scalar => vec![json!(1)],
            ObjectKind::ByteTriple => vec![json!(1), json!(2), json!(3)],
            ObjectKind::RotatedRectangle => vec![json!(0), json!(0), json!(1), json!(1), json!(0)],
            _ => vec![],
        };
        let h = registry.create_from_args(kind, &args).unwrap();
        let rect = registry.create(ObjectSpec::Rectangle(Rect::new(0, 0, 1, 1))).unwrap();
        registry.release(&h).unwrap();

        let dead = |r: Result<(), HandleRegistryError>| {
            matches!(r, Err(HandleRegistryError::InvalidHandle { .. }))
        };
        prop_assert!(dead(registry.release(&h)));
        prop_assert!(dead(registry.to_value(&h).map(drop)));
        prop_assert!(dead(registry.kind_of(&h).map(drop)));
        prop_assert!(dead(registry.copy_element(&h, 0).map(drop)));
        prop_assert!(dead(registry.read_raw(&h).map(drop)));
        prop_assert!(dead(registry.sub_region(&h, &rect).map(drop)));
        prop_assert!(dead(registry.vector_len(&h).map(drop)));
    }

    #[test]
    fn sub_region_reads_restricted_data((rows, cols, rect) in matrix_and_region()) {
        let registry = HandleRegistry::new();
        let data: Vec<u8> = (0..rows * cols).map(|v| (v % 251) as u8).collect();
        let m = registry
            .create_from_args(ObjectKind::Matrix, &[json!(rows), json!(cols), json!(0), json!(data)])
            .unwrap();

        let view = registry.sub_region_at(&m, rect).unwrap();
        let raw = registry.read_raw(&view).unwrap();

        let (x, y) = (rect.x as usize, rect.y as usize);
        let (w, h) = (rect.width as usize, rect.height as usize);
        let mut expected = Vec::with_capacity(w * h);
        for r in y..y + h {
            expected.extend_from_slice(&data[r * cols + x..r * cols + x + w]);
        }
        prop_assert_eq!(raw.data, expected);
        prop_assert_eq!((raw.rows, raw.cols), (h, w));
    }

    #[test]
    fn sub_region_outside_bounds_fails(
        rows in 1usize..12,
        cols in 1usize..12,
        rect in arbitrary_rect(),
    ) {
        let registry = HandleRegistry::new();
        let m = registry
            .create_from_args(ObjectKind::Matrix, &[json!(rows), json!(cols), json!(0)])
            .unwrap();
        let inside = rect.x >= 0
            && rect.y >= 0
            && rect.x as usize + rect.width as usize <= cols
            && rect.y as usize + rect.height as usize <= rows;
        let result = registry.sub_region_at(&m, rect);
        if inside {
            prop_assert!(result.is_ok());
        } else {
            let out_of_bounds = matches!(result, Err(HandleRegistryError::RegionOutOfBounds { .. }));
            prop_assert!(out_of_bounds);
        }
    }
}
