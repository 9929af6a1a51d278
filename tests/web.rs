//! Browser-side checks of the JavaScript surface.
//!
//! Run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use trellis_layout::{ForceConfig, ForceMode, TrellisWasm, TreemapConfig};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn chain(engine: &mut TrellisWasm, n: usize) -> Vec<u32> {
    let ids: Vec<u32> = (0..n).map(|_| engine.add_node()).collect();
    let pairs: Vec<u32> = ids.windows(2).flat_map(|w| [w[0], w[1]]).collect();
    engine.add_edges_from_pairs(&pairs);
    ids
}

#[wasm_bindgen_test]
fn node_link_tree_fills_position_buffer() {
    let mut engine = TrellisWasm::new();
    let ids = chain(&mut engine, 3);

    assert!(engine.run("node-link-tree", 1.0).unwrap());
    let positions = engine.get_positions().to_vec();
    assert_eq!(positions.len(), ids.len() * 2);
    assert!(positions.iter().all(|v| v.is_finite()));
    // left-to-right: depth grows along x, all on one row
    assert!(positions[0] < positions[2] && positions[2] < positions[4]);
    assert_eq!(positions[1], positions[3]);
}

#[wasm_bindgen_test]
fn bad_names_are_errors() {
    let mut engine = TrellisWasm::new();
    chain(&mut engine, 2);

    assert!(engine.set_orientation("diagonal").is_err());
    assert!(engine.run("sunburst", 1.0).is_err());
    assert!(engine.configure("treemap", JsValue::from_str("wide")).is_err());
}

#[wasm_bindgen_test]
fn configure_rejects_invalid_values() {
    let mut engine = TrellisWasm::new();
    let frame = serde_wasm_bindgen::to_value(&TreemapConfig { frame: -2.0 }).unwrap();
    assert!(engine.configure("treemap", frame).is_err());

    let force = ForceConfig {
        mode: ForceMode::Incremental {
            iterations_per_frame: 0,
        },
        ..ForceConfig::default()
    };
    let force = serde_wasm_bindgen::to_value(&force).unwrap();
    assert!(engine.configure("force-directed", force).is_err());
}

#[wasm_bindgen_test]
fn incremental_force_finishes_on_budget() {
    let mut engine = TrellisWasm::new();
    chain(&mut engine, 4);

    let config = ForceConfig {
        max_iterations: 10,
        jitter_seed: Some(7),
        mode: ForceMode::Incremental {
            iterations_per_frame: 4,
        },
        ..ForceConfig::default()
    };
    engine
        .configure("force-directed", serde_wasm_bindgen::to_value(&config).unwrap())
        .unwrap();

    assert!(!engine.run("force-directed", 0.0).unwrap());
    assert!(!engine.run("force-directed", 0.0).unwrap());
    assert!(engine.run("force-directed", 0.0).unwrap());
}

#[wasm_bindgen_test]
fn treemap_writes_extents() {
    let mut engine = TrellisWasm::new();
    engine.set_viewport(100.0, 50.0);
    let root = engine.add_node();
    for _ in 0..2 {
        let leaf = engine.add_node();
        engine.add_edge(root, leaf, true);
    }

    engine.run("treemap", 1.0).unwrap();
    let extents = engine.get_extents().to_vec();
    assert_eq!(&extents[..2], &[100.0, 50.0]);
    let leaf_area: f64 = extents[2..].chunks(2).map(|e| e[0] * e[1]).sum();
    assert!((leaf_area - 5000.0).abs() < 1e-6);
}
