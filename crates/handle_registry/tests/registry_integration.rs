use cvbind_handle_registry::{
    BufferFormat, Handle, HandleRegistry, HandleRegistryError, ObjectKind, ObjectValue,
    RegistryConfig,
};
use serde_json::{json, Value};
use std::sync::Once;
use std::thread;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn args(values: Value) -> Vec<Value> {
    values.as_array().cloned().unwrap_or_default()
}

#[test]
fn test_host_session_workflow() {
    init_tracing();
    let registry = HandleRegistry::new();

    // A 4x4 single channel image with a bright 2x2 block in the middle.
    let mut pixels = vec![0u8; 16];
    for i in [5, 6, 9, 10] {
        pixels[i] = 200;
    }
    let image = registry
        .create_from_args(ObjectKind::Matrix, &args(json!([4, 4, 0, pixels])))
        .unwrap();
    let roi = registry
        .create_from_args(ObjectKind::Rectangle, &args(json!([1, 1, 2, 2])))
        .unwrap();

    let crop = registry.sub_region(&image, &roi).unwrap();
    assert_eq!(registry.read_raw(&crop).unwrap().data, vec![200; 4]);

    // Collect the crop into a vector and hand the host a copy.
    let crops = registry
        .create_from_args(ObjectKind::MatrixVector, &[])
        .unwrap();
    registry.push_element(&crops, &crop).unwrap();
    let copy = registry.copy_element(&crops, 0).unwrap();

    let host_value = registry.to_value(&copy).unwrap().to_json().unwrap();
    assert_eq!(host_value["rows"], json!(2));
    assert_eq!(host_value["cols"], json!(2));
    assert_eq!(host_value["size"], json!(4));
    assert_eq!(host_value["base64"], json!("yMjIyA=="));

    // Handles cross the host boundary as JSON and come back intact.
    let wire = serde_json::to_string(&copy).unwrap();
    let back: Handle = serde_json::from_str(&wire).unwrap();
    assert_eq!(back, copy);
    assert_eq!(registry.kind_of(&back).unwrap(), ObjectKind::Matrix);

    assert_eq!(registry.clear(), 5);
    assert!(matches!(
        registry.to_value(&back),
        Err(HandleRegistryError::InvalidHandle { .. })
    ));
}

#[test]
fn test_view_keeps_storage_after_source_release() {
    init_tracing();
    let registry = HandleRegistry::new();
    let frame = registry
        .frame_buffer_to_mat(2, 2, (1..=12).collect())
        .unwrap();
    let right_column = registry
        .sub_region_at(&frame, cvbind_handle_registry::Rect::new(1, 0, 1, 2))
        .unwrap();

    registry.release(&frame).unwrap();

    let buffer = registry
        .read_buffer(&right_column, BufferFormat::U8)
        .unwrap();
    assert_eq!(buffer.channels, 3);
    assert_eq!(
        serde_json::to_value(&buffer.buffer).unwrap(),
        json!([4, 5, 6, 10, 11, 12])
    );
}

#[test]
fn test_vector_values_follow_push_order() {
    let registry = HandleRegistry::new();
    let points = registry
        .create_from_args(ObjectKind::PointVector, &[])
        .unwrap();
    for (x, y) in [(3, 1), (1, 2), (2, 3)] {
        let p = registry
            .create_from_args(ObjectKind::Point, &args(json!([x, y])))
            .unwrap();
        registry.push_element(&points, &p).unwrap();
    }

    let value = registry.to_value(&points).unwrap();
    let ObjectValue::Array { array } = value else {
        panic!("vector should convert to an array");
    };
    let xs: Vec<f64> = array
        .iter()
        .map(|v| match v {
            ObjectValue::Point(p) => p.x,
            other => panic!("unexpected element {other:?}"),
        })
        .collect();
    assert_eq!(xs, vec![3.0, 1.0, 2.0]);
}

#[test]
fn test_shared_registry_across_threads() {
    init_tracing();
    let registry = HandleRegistry::with_config(RegistryConfig {
        max_live_handles: 10_000,
        ..RegistryConfig::default()
    });

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let registry = registry.clone();
            thread::spawn(move || {
                let mut handles = Vec::new();
                for i in 0..100 {
                    let h = registry
                        .create_from_args(ObjectKind::Point, &args(json!([worker, i])))
                        .unwrap();
                    handles.push(h);
                }
                for (i, h) in handles.iter().enumerate() {
                    let value = registry.to_value(h).unwrap().to_json().unwrap();
                    assert_eq!(value, json!({"x": worker as f64, "y": i as f64}));
                }
                for h in &handles[..50] {
                    registry.release(h).unwrap();
                }
                handles
            })
        })
        .collect();

    let mut all = Vec::new();
    for worker in workers {
        all.extend(worker.join().unwrap());
    }

    assert_eq!(registry.live_count(), 8 * 50);
    let mut ids: Vec<_> = all.iter().map(|h| h.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8 * 100);
}
