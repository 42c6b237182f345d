//! ECMAScript front-end
//!
//! Parses each module with `oxc_parser`, collects its static specifiers and
//! rewrites ES module syntax into the `require` / `module` / `exports`
//! calling convention used by the emitted runtime. CommonJS sources pass
//! through untouched apart from specifier collection.
//!
//! The rewrite is a set of span edits over the original text:
//!
//! - every module request (`import`, `export ... from`, `export * from`) is
//!   hoisted into a prologue, in source order, so dependencies run before the
//!   importing body
//! - exported function declarations are assigned before those requests
//! - every other exported binding is assigned right after its declaration
//!
//! Imported bindings are snapshots taken when the request returns.

use std::path::Path;

use cow_utils::CowUtils;
use log::trace;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, Declaration, ExportAllDeclaration, ExportDefaultDeclaration,
    ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression, ImportDeclaration,
    ImportDeclarationSpecifier, Program, Statement,
};
use oxc_ast_visit::{Visit, walk};
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_diagnostics::OxcDiagnostic;
use oxc_ecmascript::BoundNames;
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use super::{FrontEnd, ParseError, ParsedModule};
use crate::types::FxIndexSet;

/// Property set on the exports object of every ES module
pub const ESM_MARKER: &str = "__esModule";
/// Runtime helper giving the default export of an ES or CommonJS module
pub const INTEROP_DEFAULT: &str = "__modpack_default";
/// Runtime helper copying all named exports of one module onto another
pub const INTEROP_STAR: &str = "__modpack_star";

/// A module body ready to be placed in a `function (require, module, exports)` wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPayload {
    pub code: String,
    /// Whether the source used ES module syntax
    pub esm: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptFrontEnd {
    minify: bool,
}

impl ScriptFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress and mangle every payload after the module rewrite
    #[must_use]
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }
}

impl FrontEnd for ScriptFrontEnd {
    type Payload = ScriptPayload;

    fn parse_module(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<ParsedModule<ScriptPayload>, ParseError> {
        let source = source.cow_replace("\r\n", "\n");
        let allocator = Allocator::default();
        let program = parse_program(&allocator, &source)?;

        let mut rewriter = ModuleRewriter::new(&source);
        rewriter.collect(&program);
        trace!(
            "{}: {} specifiers, {} rewrites",
            path.display(),
            rewriter.specifiers.len(),
            rewriter.edits.len()
        );

        let mut parsed = rewriter.finish();
        if self.minify {
            parsed.payload.code = minify(&parsed.payload.code)?;
        }
        Ok(parsed)
    }
}

/// Parse as an ES module, falling back to sloppy script for CommonJS sources
fn parse_program<'a>(allocator: &'a Allocator, source: &'a str) -> Result<Program<'a>, ParseError> {
    let module = Parser::new(allocator, source, SourceType::default().with_module(true)).parse();
    if module.errors.is_empty() && !module.panicked {
        return Ok(module.program);
    }

    let script = Parser::new(allocator, source, SourceType::default().with_module(false)).parse();
    if script.errors.is_empty() && !script.panicked {
        return Ok(script.program);
    }
    Err(diagnostic_error(source, &module.errors))
}

fn diagnostic_error(source: &str, errors: &[OxcDiagnostic]) -> ParseError {
    let Some(first) = errors.first() else {
        return ParseError::new("unrecoverable syntax error", 1);
    };
    let offset = first
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map_or(0, |label| label.offset());
    ParseError::new(first.to_string(), line_of(source, offset))
}

fn line_of(source: &str, offset: usize) -> usize {
    source
        .get(..offset)
        .map_or(0, |before| before.matches('\n').count())
        + 1
}

/// Whitespace removal, compression and local name mangling of a rewritten body
fn minify(code: &str) -> Result<String, ParseError> {
    let allocator = Allocator::default();
    // the body runs inside a function wrapper, so top-level names stay as written
    let parsed = Parser::new(&allocator, code, SourceType::default().with_module(false)).parse();
    if !parsed.errors.is_empty() || parsed.panicked {
        return Err(diagnostic_error(code, &parsed.errors));
    }

    let mut program = parsed.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::default()),
    };
    let minified = Minifier::new(options).build(&allocator, &mut program);
    Ok(Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program)
        .code)
}

/// Replace `src[start..end]` with `text`
#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Binding introduced by an import clause
#[derive(Debug, Default)]
struct ImportClause {
    default: Option<String>,
    namespace: Option<String>,
    /// (imported name, local name)
    named: Vec<(String, String)>,
}

/// Static `require("x")` calls at any depth
struct RequireCollector<'r> {
    found: &'r mut Vec<(u32, String)>,
}

impl<'a> Visit<'a> for RequireCollector<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let (Expression::Identifier(callee), [Argument::StringLiteral(literal)]) =
            (&call.callee, &call.arguments[..])
        {
            if callee.name.as_str() == "require" {
                self.found
                    .push((literal.span.start, literal.value.to_string()));
            }
        }
        walk::walk_call_expression(self, call);
    }
}

struct ModuleRewriter<'s> {
    src: &'s str,
    /// (offset, specifier) in the order they were met
    specifiers: Vec<(u32, String)>,
    edits: Vec<Edit>,
    /// `exports.f = f;` for hoisted function declarations
    hoisted_exports: Vec<String>,
    /// Module requests, in source order
    requests: Vec<String>,
    esm: bool,
    temp_counter: usize,
}

impl<'s> ModuleRewriter<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            specifiers: Vec::new(),
            edits: Vec::new(),
            hoisted_exports: Vec::new(),
            requests: Vec::new(),
            esm: false,
            temp_counter: 0,
        }
    }

    fn collect(&mut self, program: &Program<'_>) {
        // a hashbang is not valid inside the wrapper function
        if let Some(hashbang) = &program.hashbang {
            self.replace(hashbang.span, String::new());
        }

        for statement in &program.body {
            match statement {
                Statement::ImportDeclaration(decl) => self.import(decl),
                Statement::ExportNamedDeclaration(decl) => self.export_named(decl),
                Statement::ExportDefaultDeclaration(decl) => self.export_default(decl),
                Statement::ExportAllDeclaration(decl) => self.export_all(decl),
                _ => {}
            }
        }

        let mut collector = RequireCollector {
            found: &mut self.specifiers,
        };
        collector.visit_program(program);
    }

    fn finish(mut self) -> ParsedModule<ScriptPayload> {
        let mut code = String::with_capacity(self.src.len() + 64);
        if self.esm {
            code.push_str(&format!(
                "Object.defineProperty(exports, \"{ESM_MARKER}\", {{ value: true }});\n"
            ));
        }
        for line in self.hoisted_exports.iter().chain(&self.requests) {
            code.push_str(line);
            code.push('\n');
        }

        self.edits.sort_by_key(|edit| (edit.start, edit.end));
        let mut cursor = 0;
        for edit in &self.edits {
            code.push_str(&self.src[cursor..edit.start]);
            code.push_str(&edit.text);
            cursor = edit.end;
        }
        code.push_str(&self.src[cursor..]);

        self.specifiers.sort_by_key(|(offset, _)| *offset);
        let specifiers: FxIndexSet<String> = self
            .specifiers
            .into_iter()
            .map(|(_, specifier)| specifier)
            .collect();

        ParsedModule {
            specifiers: specifiers.into_iter().collect(),
            payload: ScriptPayload {
                code,
                esm: self.esm,
            },
        }
    }

    /// End of a statement, including a `;` that directly follows its span
    fn statement_end(&self, span: Span) -> usize {
        let end = span.end as usize;
        if self.src[end..].starts_with(';') {
            end + 1
        } else {
            end
        }
    }

    /// Replace a whole statement
    fn replace(&mut self, span: Span, text: String) {
        let end = self.statement_end(span);
        self.edits.push(Edit {
            start: span.start as usize,
            end,
            text,
        });
    }

    /// Drop the source between `start` and the start of the kept declaration
    fn strip(&mut self, start: u32, kept: Span) {
        self.edits.push(Edit {
            start: start as usize,
            end: kept.start as usize,
            text: String::new(),
        });
    }

    /// Insert assignments right after the statement `span`
    fn assign_after(&mut self, span: Span, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        let end = self.statement_end(span);
        let separator = if self.src[..end].ends_with(';') { " " } else { "; " };
        self.edits.push(Edit {
            start: end,
            end,
            text: format!("{separator}{}", lines.join(" ")),
        });
    }

    fn module_request(&mut self, offset: u32, specifier: &str) -> String {
        self.esm = true;
        self.specifiers.push((offset, specifier.to_owned()));
        format!("require({})", js_string(specifier))
    }

    fn temp(&mut self, prefix: &str) -> String {
        self.temp_counter += 1;
        format!("__modpack_{prefix}{}", self.temp_counter)
    }

    fn import(&mut self, decl: &ImportDeclaration<'_>) {
        let request = self.module_request(decl.source.span.start, decl.source.value.as_str());
        self.replace(decl.span, String::new());

        let mut clause = ImportClause::default();
        for specifier in decl.specifiers.iter().flatten() {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => clause
                    .named
                    .push((s.imported.name().to_string(), s.local.name.to_string())),
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    clause.default = Some(s.local.name.to_string());
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    clause.namespace = Some(s.local.name.to_string());
                }
            }
        }
        let text = self.import_bindings(&clause, &request);
        self.requests.push(text);
    }

    fn import_bindings(&mut self, clause: &ImportClause, request: &str) -> String {
        if clause.default.is_none() && clause.named.is_empty() {
            return match &clause.namespace {
                Some(ns) => format!("const {ns} = {request};"),
                None => format!("{request};"),
            };
        }

        let module = self.temp("import");
        let mut out = format!("const {module} = {request};");
        if let Some(default) = &clause.default {
            out.push_str(&format!(" const {default} = {INTEROP_DEFAULT}({module});"));
        }
        if let Some(ns) = &clause.namespace {
            out.push_str(&format!(" const {ns} = {module};"));
        }
        let mut destructured = Vec::new();
        for (imported, local) in &clause.named {
            if imported == "default" {
                out.push_str(&format!(" const {local} = {INTEROP_DEFAULT}({module});"));
            } else if imported == local {
                destructured.push(local.clone());
            } else {
                destructured.push(format!("{}: {local}", js_property_key(imported)));
            }
        }
        if !destructured.is_empty() {
            out.push_str(&format!(" const {{ {} }} = {module};", destructured.join(", ")));
        }
        out
    }

    fn export_named(&mut self, decl: &ExportNamedDeclaration<'_>) {
        self.esm = true;

        if let Some(source) = &decl.source {
            let request = self.module_request(source.span.start, source.value.as_str());
            self.replace(decl.span, String::new());
            let module = self.temp("reexport");
            let mut text = format!("const {module} = {request};");
            for specifier in &decl.specifiers {
                text.push_str(&format!(
                    " Object.defineProperty(exports, {}, {{ enumerable: true, get: function () {{ return {module}[{}]; }} }});",
                    js_string(specifier.exported.name().as_str()),
                    js_string(specifier.local.name().as_str())
                ));
            }
            self.requests.push(text);
            return;
        }

        if let Some(declaration) = &decl.declaration {
            self.strip(decl.span.start, declaration.span());
            let mut names = Vec::new();
            declaration.bound_names(&mut |ident| names.push(ident.name.to_string()));
            let lines: Vec<String> = names
                .iter()
                .map(|name| export_assignment(name, name))
                .collect();
            if matches!(declaration, Declaration::FunctionDeclaration(_)) {
                self.hoisted_exports.extend(lines);
            } else {
                self.assign_after(decl.span, &lines);
            }
            return;
        }

        let text = decl
            .specifiers
            .iter()
            .map(|s| export_assignment(s.exported.name().as_str(), s.local.name().as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        self.replace(decl.span, text);
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        self.esm = true;
        match &decl.declaration {
            // export default function name() {} keeps the binding
            ExportDefaultDeclarationKind::FunctionDeclaration(func) if func.id.is_some() => {
                let name = func.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
                self.strip(decl.span.start, func.span);
                self.hoisted_exports.push(export_assignment("default", &name));
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) if class.id.is_some() => {
                let name = class.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
                self.strip(decl.span.start, class.span);
                self.assign_after(decl.span, &[export_assignment("default", &name)]);
            }
            kind => {
                let value = kind.span();
                self.edits.push(Edit {
                    start: decl.span.start as usize,
                    end: value.start as usize,
                    text: "exports.default = ".to_owned(),
                });
                let end = self.statement_end(decl.span);
                if !self.src[..end].ends_with(';') {
                    self.edits.push(Edit {
                        start: end,
                        end,
                        text: ";".to_owned(),
                    });
                }
            }
        }
    }

    /// `export * from "x"` and `export * as ns from "x"`
    fn export_all(&mut self, decl: &ExportAllDeclaration<'_>) {
        let request = self.module_request(decl.source.span.start, decl.source.value.as_str());
        self.replace(decl.span, String::new());
        let text = match &decl.exported {
            Some(ns) => format!("{} = {request};", export_target(ns.name().as_str())),
            None => format!("{INTEROP_STAR}(exports, {request});"),
        };
        self.requests.push(text);
    }
}

/// A JavaScript string literal for `value`
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c == '$' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}

fn js_property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_owned()
    } else {
        js_string(name)
    }
}

fn export_target(exported: &str) -> String {
    if is_identifier(exported) {
        format!("exports.{exported}")
    } else {
        format!("exports[{}]", js_string(exported))
    }
}

fn export_assignment(exported: &str, local: &str) -> String {
    format!("{} = {local};", export_target(exported))
}
