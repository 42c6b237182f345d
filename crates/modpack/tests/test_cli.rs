#![allow(clippy::disallowed_methods)]

use std::{fs, path::Path, process::Command};

use serial_test::serial;
use tempfile::TempDir;

fn modpack(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_modpack"))
        .args(args)
        .current_dir(dir)
        .env_remove("MODPACK_EXTENSIONS")
        .env_remove("MODPACK_LOAD_THREADS")
        .env_remove("MODPACK_MINIFY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run modpack")
}

fn fixture() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("lib")).unwrap();
    fs::write(
        root.join("main.js"),
        "import greet from './lib/greet.js';\nconsole.log(greet('world'));\n",
    )
    .unwrap();
    fs::write(
        root.join("lib/greet.js"),
        "const { suffix } = require('./suffix');\nexport default function greet(name) {\n  return 'hello ' + name + suffix;\n}\n",
    )
    .unwrap();
    fs::write(root.join("lib/suffix.js"), "exports.suffix = '!';\n").unwrap();
    temp_dir
}

#[test]
#[serial]
fn test_bundle_to_stdout() {
    let temp_dir = fixture();
    let output = modpack(temp_dir.path(), &["main.js"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let script = String::from_utf8(output.stdout).unwrap();
    assert!(script.contains("// 0: \"main.js\""));
    assert!(script.contains("// 1: \"lib/greet.js\""));
    assert!(script.contains("// 2: \"lib/suffix.js\""));
    assert!(script.contains("{\"./lib/greet.js\": 1}"));
    assert!(script.contains("{\"./suffix\": 2}"));
    assert_eq!(script.matches("request(0);").count(), 1);
}

#[test]
#[serial]
fn test_bundle_to_file_with_manifest() {
    let temp_dir = fixture();
    let output = modpack(
        temp_dir.path(),
        &["main.js", "-o", "dist/bundle.js", "--manifest", "dist/manifest.json", "--threads", "1"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty());

    let script = fs::read_to_string(temp_dir.path().join("dist/bundle.js")).unwrap();
    assert!(script.ends_with("})();\n"));

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp_dir.path().join("dist/manifest.json")).unwrap(),
    )
    .unwrap();
    let modules = manifest["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 3);
    assert_eq!(modules[0]["id"], 0);
    assert_eq!(modules[1]["specifier_map"]["./suffix"], 2);
    assert_eq!(modules[2]["content_hash"].as_str().unwrap().len(), 64);
}

#[test]
#[serial]
fn test_unresolved_import_fails_without_output() {
    let temp_dir = fixture();
    fs::write(
        temp_dir.path().join("lib/suffix.js"),
        "module.exports = require('../missing.js');\n",
    )
    .unwrap();

    let output = modpack(temp_dir.path(), &["main.js", "-o", "bundle.js"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot resolve '../missing.js'"), "{stderr}");
    assert!(
        stderr.contains("main.js -> './lib/greet.js' -> './suffix' -> '../missing.js'"),
        "{stderr}"
    );
    assert!(!temp_dir.path().join("bundle.js").exists());
}

#[test]
#[serial]
fn test_missing_entry_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = modpack(temp_dir.path(), &["nope.js"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("file not found"));
}

#[test]
#[serial]
fn test_project_config_is_honored() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("modpack.toml"), "extensions = [\"jsx\"]\n").unwrap();
    fs::write(root.join("main.js"), "require('./view');\n").unwrap();
    fs::write(root.join("view.jsx"), "exports.view = 1;\n").unwrap();

    let output = modpack(root, &["main.js"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("// 1: \"view.jsx\""));
}
