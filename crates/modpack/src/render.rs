//! Script artifact rendering
//!
//! The bundle is a single self-executing function holding the module table
//! (`id: [function (require, module, exports) {...}, {specifier: id}]`) and a
//! small runtime implementing the same instance-cache protocol as
//! [`crate::runtime::RuntimeLinker`]: the instance is cached before its body
//! runs, reassigned `module.exports` is copied back afterwards, and the entry
//! module is requested exactly once.

use std::{fmt::Write as _, path::Path};

use log::debug;

use crate::{
    emitter::BundleTable,
    front_end::{ESM_MARKER, INTEROP_DEFAULT, INTEROP_STAR, ScriptPayload, js_string},
    types::ModuleId,
};

pub fn render_script(table: &BundleTable<ScriptPayload>) -> String {
    let mut out = String::new();
    render_header(&mut out, table);
    out.push_str("(function () {\n");
    render_table(&mut out, table);
    out.push('\n');
    render_runtime(&mut out);
    let _ = writeln!(out, "request({});", ModuleId::ENTRY);
    out.push_str("})();\n");
    debug!("Rendered bundle script ({} bytes)", out.len());
    out
}

/// One comment line per module, paths relative to the entry's directory
fn render_header(out: &mut String, table: &BundleTable<ScriptPayload>) {
    let base = table
        .get(ModuleId::ENTRY)
        .and_then(|entry| entry.path.parent())
        .unwrap_or_else(|| Path::new(""));
    out.push_str("// Bundled by modpack\n");
    for (id, entry) in table.iter() {
        let path = entry.path.strip_prefix(base).unwrap_or(&entry.path);
        let _ = writeln!(out, "// {id}: {}", js_string(&path.to_string_lossy()));
    }
}

fn render_table(out: &mut String, table: &BundleTable<ScriptPayload>) {
    out.push_str("var modules = {\n");
    let mut first = true;
    for (id, entry) in table.iter() {
        if !first {
            out.push_str(",\n");
        }
        first = false;

        let imports: Vec<String> = entry
            .specifier_map
            .iter()
            .map(|(specifier, target)| format!("{}: {target}", js_string(specifier)))
            .collect();
        let _ = write!(
            out,
            "{id}: [function (require, module, exports) {{\n{}\n}}, {{{}}}]",
            entry.payload.code.trim_end(),
            imports.join(", ")
        );
    }
    out.push_str("\n};");
}

fn render_runtime(out: &mut String) {
    let _ = write!(
        out,
        r#"var cache = {{}};
function {INTEROP_DEFAULT}(m) {{
  return m && m.{ESM_MARKER} ? m["default"] : m;
}}
function {INTEROP_STAR}(target, source) {{
  Object.keys(source).forEach(function (key) {{
    if (key === "default" || key === "{ESM_MARKER}" || Object.prototype.hasOwnProperty.call(target, key)) return;
    Object.defineProperty(target, key, {{ enumerable: true, get: function () {{ return source[key]; }} }});
  }});
  return source;
}}
function request(id) {{
  var cached = cache[id];
  if (cached) return cached.exports;
  var entry = modules[id];
  if (!entry) throw new Error("no module with id " + id + " in the bundle table");
  var instance = cache[id] = {{ exports: {{}}, started: true, loaded: false }};
  var module = {{ exports: instance.exports }};
  var imports = entry[1];
  var localRequire = function (specifier) {{
    if (!Object.prototype.hasOwnProperty.call(imports, specifier)) {{
      throw new Error("module " + id + " requested '" + specifier + "', which it never imported");
    }}
    return request(imports[specifier]);
  }};
  entry[0].call(module.exports, localRequire, module, module.exports);
  instance.exports = module.exports;
  instance.loaded = true;
  return instance.exports;
}}
"#
    );
}
