//! Bundles small module trees and runs the script with `node`, comparing its
//! output with node running the same sources directly. Every test returns
//! early when no `node` binary is on the `PATH`.
#![allow(clippy::disallowed_methods)]

use std::{fs, path::Path, process::Command};

use modpack::{config::Config, orchestrator::BundleOrchestrator};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const BUNDLE: &str = "__bundle.js";

fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, source) in files {
        let path = temp_dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }
    temp_dir
}

fn run_node(dir: &Path, script: &str) -> String {
    let output = Command::new("node")
        .arg(script)
        .current_dir(dir)
        .output()
        .expect("Failed to run node");
    assert!(
        output.status.success(),
        "node {script} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn bundle_and_run(dir: &Path, entry: &str, minify: bool) -> String {
    let config = Config {
        minify,
        ..Config::default()
    };
    BundleOrchestrator::new(config)
        .bundle_to_file(&dir.join(entry), &dir.join(BUNDLE))
        .expect("Bundling failed");
    run_node(dir, BUNDLE)
}

/// The bundle prints what node prints for the unbundled sources, minified or not
fn assert_same_as_node(files: &[(&str, &str)], entry: &str) {
    if !node_available() {
        return;
    }
    let temp_dir = write_tree(files);
    let native = run_node(temp_dir.path(), entry);
    assert!(!native.is_empty());
    for minify in [false, true] {
        assert_eq!(
            bundle_and_run(temp_dir.path(), entry, minify),
            native,
            "minify: {minify}"
        );
    }
}

#[test]
fn test_imports_evaluate_before_importer_body() {
    assert_same_as_node(
        &[
            ("entry.mjs", "console.log('entry');\nimport './b.mjs';\n"),
            ("b.mjs", "console.log('b');\n"),
        ],
        "entry.mjs",
    );
}

#[test]
fn test_all_declarators_are_exported() {
    assert_same_as_node(
        &[
            (
                "entry.mjs",
                "import { a, b, c, e } from './values.mjs';\nconsole.log(a, b, c, e);\n",
            ),
            (
                "values.mjs",
                "export const a = 1, b = 2;\nexport let { c, d: [e] } = { c: 3, d: [4] };\n",
            ),
        ],
        "entry.mjs",
    );
}

#[test]
fn test_diamond_runs_shared_module_once() {
    assert_same_as_node(
        &[
            (
                "entry.mjs",
                "import { left } from './left.mjs';\nimport { right } from './right.mjs';\nconsole.log('entry', left, right);\n",
            ),
            (
                "left.mjs",
                "import { count } from './shared.mjs';\nconsole.log('left');\nexport const left = count;\n",
            ),
            (
                "right.mjs",
                "import { count } from './shared.mjs';\nconsole.log('right');\nexport const right = count;\n",
            ),
            (
                "shared.mjs",
                "globalThis.runs = (globalThis.runs || 0) + 1;\nconsole.log('shared');\nexport const count = globalThis.runs;\n",
            ),
        ],
        "entry.mjs",
    );
}

#[test]
fn test_defaults_and_reexports() {
    assert_same_as_node(
        &[
            (
                "entry.mjs",
                "import { greet, mark, extra, ns } from './lib/index.mjs';\nconsole.log(greet('you') + mark, extra, ns.punct);\n",
            ),
            (
                "lib/index.mjs",
                "export { default as greet, punct as mark } from './greet.mjs';\nexport * from './extra.mjs';\nexport * as ns from './greet.mjs';\n",
            ),
            (
                "lib/greet.mjs",
                "export default function greet(name) {\n  return 'hi ' + name;\n}\nexport const punct = '!';\n",
            ),
            ("lib/extra.mjs", "export const extra = 'x';\n"),
        ],
        "entry.mjs",
    );
}

#[test]
fn test_esm_imports_commonjs() {
    assert_same_as_node(
        &[
            (
                "entry.mjs",
                "import legacy from './legacy.cjs';\nimport { named } from './legacy.cjs';\nconsole.log(legacy.named, named, legacy.other);\n",
            ),
            ("legacy.cjs", "exports.named = 'n';\nexports.other = 'o';\n"),
        ],
        "entry.mjs",
    );
}

#[test]
fn test_hoisted_functions_across_esm_cycle() {
    assert_same_as_node(
        &[
            (
                "a.mjs",
                "import { b } from './b.mjs';\nexport function a() {\n  return 'a';\n}\nconsole.log(b());\n",
            ),
            (
                "b.mjs",
                "import { a } from './a.mjs';\nexport function b() {\n  return 'b sees ' + a();\n}\n",
            ),
        ],
        "a.mjs",
    );
}

#[test]
fn test_commonjs_cycle_and_reassigned_exports() {
    assert_same_as_node(
        &[
            (
                "entry.cjs",
                "require('./a.cjs');\nconst answer = require('./answer.cjs');\nconsole.log('answer', answer());\n",
            ),
            (
                "a.cjs",
                "exports.val = 1;\nconst b = require('./b.cjs');\nconsole.log('a sees', b.seen);\n",
            ),
            (
                "b.cjs",
                "const a = require('./a.cjs');\nexports.seen = a.val;\nconsole.log('b sees', a.val);\n",
            ),
            ("answer.cjs", "module.exports = function () {\n  return 42;\n};\n"),
        ],
        "entry.cjs",
    );
}

#[test]
fn test_export_is_visible_to_circular_require() {
    // ES exports mixed with require() has no native equivalent to compare against
    if !node_available() {
        return;
    }
    let temp_dir = write_tree(&[
        ("entry.js", "require('./a.js');\n"),
        ("a.js", "export const val = 1;\nrequire('./b.js');\n"),
        ("b.js", "console.log(require('./a.js').val);\n"),
    ]);
    for minify in [false, true] {
        assert_eq!(bundle_and_run(temp_dir.path(), "entry.js", minify), "1\n");
    }
}
