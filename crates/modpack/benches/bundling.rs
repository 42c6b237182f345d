use std::{fmt::Write as _, fs, hint::black_box, path::Path, time::Duration};

use criterion::{Criterion, criterion_group, criterion_main};
use modpack::{config::Config, orchestrator::BundleOrchestrator};
use tempfile::TempDir;

/// A layered graph: every module in layer `n` imports two modules of layer
/// `n + 1`, and the last layer imports back into the first
fn write_synthetic_graph(root: &Path, layers: usize, width: usize) {
    for layer in 0..layers {
        for index in 0..width {
            let mut source = String::new();
            if layer + 1 < layers {
                for next in [index, (index + 1) % width] {
                    let _ = writeln!(source, "import {{ value as v{next} }} from './m{}_{next}.js';", layer + 1);
                }
            } else {
                let _ = writeln!(source, "const first = require('./m0_{index}.js');");
            }
            let _ = writeln!(source, "export const value = {layer} * {width} + {index};");
            fs::write(root.join(format!("m{layer}_{index}.js")), source)
                .expect("Failed to write module");
        }
    }

    let mut entry = String::new();
    for index in 0..width {
        let _ = writeln!(entry, "require('./m0_{index}.js');");
    }
    fs::write(root.join("entry.js"), entry).expect("Failed to write entry");
}

fn benchmark_bundling(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_synthetic_graph(temp_dir.path(), 8, 32);
    let entry = temp_dir.path().join("entry.js");

    let mut group = c.benchmark_group("synthetic_bundling");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    for threads in [1, 0] {
        let config = Config {
            load_threads: threads,
            ..Config::default()
        };
        let orchestrator = BundleOrchestrator::new(config);
        let name = if threads == 1 { "serial" } else { "parallel" };
        group.bench_function(format!("bundle_{name}"), |b| {
            b.iter(|| {
                let bundle = orchestrator.bundle(black_box(&entry)).expect("Bundling failed");
                black_box(bundle.script.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_bundling);
criterion_main!(benches);
