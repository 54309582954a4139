//! Entry data extraction.
//!
//! Story files are parsed with SWC and only their static export surface is
//! inspected; nothing in the file is executed.

use super::literal::{eval_static, object_property, unwrap_expr};
use super::naming::story_key;
use super::{EntryDataSet, EntryDatum, SourceLoc};
use crate::error::ParseError;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde_json::{Map, Value};
use std::path::Path;
use swc_common::{sync::Lrc, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::{
    AssignOp, AssignTarget, Decl, EsVersion, ExportSpecifier, Expr, MemberProp, Module,
    ModuleDecl, ModuleExportName, ModuleItem, ObjectLit, Pat, SimpleAssignTarget, Stmt,
};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use tracing::debug;

/// Extract story entries from every file in `paths`, in order.
///
/// Relative paths are read from `root`. The first file that cannot be
/// analyzed aborts the whole batch.
pub fn extract(root: &Path, paths: &[String]) -> Result<EntryDataSet, ParseError> {
    let mut set = EntryDataSet::new();
    for path in paths {
        let source = std::fs::read_to_string(root.join(path))
            .map_err(|e| ParseError::new(path, format!("Failed to read file: {e}")))?;
        let entries = extract_file(path, &source)?;
        debug!(file = %path, stories = entries.len(), "Extracted stories");
        set.extend(entries);
    }
    Ok(set)
}

/// Extract story entries from one file's source.
pub fn extract_file(path: &str, source: &str) -> Result<Vec<EntryDatum>, ParseError> {
    let (cm, module) = parse_source(path, source)?;
    let scan = scan_module(path, &module)?;
    scan.into_entries(&cm)
}

/// Parse `source` as an ES module, picking the syntax from the file extension.
pub fn parse_source(path: &str, source: &str) -> Result<(Lrc<SourceMap>, Module), ParseError> {
    let syntax = syntax_for(path)?;
    let cm: Lrc<SourceMap> = Lrc::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(path.to_string())),
        source.to_string(),
    );

    let lexer = Lexer::new(syntax, EsVersion::EsNext, StringInput::from(&*fm), None);
    let mut parser = Parser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| {
        let line = cm.lookup_char_pos(e.span().lo()).line;
        ParseError::new(path, format!("{} (line {line})", e.kind().msg()))
    })?;

    // Recoverable errors still mean the file is malformed.
    if let Some(e) = parser.take_errors().into_iter().next() {
        let line = cm.lookup_char_pos(e.span().lo()).line;
        return Err(ParseError::new(
            path,
            format!("{} (line {line})", e.kind().msg()),
        ));
    }

    Ok((cm, module))
}

fn syntax_for(path: &str) -> Result<Syntax, ParseError> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "ts" | "mts" | "cts" => Ok(Syntax::Typescript(TsSyntax {
            decorators: true,
            ..Default::default()
        })),
        "tsx" => Ok(Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        })),
        // Plain .js story files routinely contain JSX.
        "js" | "jsx" | "mjs" | "cjs" => Ok(Syntax::Es(EsSyntax {
            jsx: true,
            decorators: true,
            ..Default::default()
        })),
        _ => Err(ParseError::new(
            path,
            format!("Unsupported story file extension `.{ext}`"),
        )),
    }
}

#[derive(Debug)]
struct ExportRecord {
    export_name: String,
    local: String,
    span: Span,
}

/// Static export surface of one module.
#[derive(Debug)]
pub struct ModuleScan<'a> {
    path: &'a str,
    /// Top-level declaration spans by binding name.
    bindings: HashMap<String, Span>,
    /// Top-level variable initializers by binding name.
    inits: HashMap<String, &'a Expr>,
    exports: Vec<ExportRecord>,
    default_expr: Option<&'a Expr>,
    /// `export { x as default }`
    default_local: Option<String>,
    story_names: HashMap<String, String>,
    story_meta: HashMap<String, Map<String, Value>>,
}

/// Collect exports, top-level bindings and story assignments of a parsed module.
pub fn scan_module<'a>(path: &'a str, module: &'a Module) -> Result<ModuleScan<'a>, ParseError> {
    let mut scan = ModuleScan {
        path,
        bindings: HashMap::default(),
        inits: HashMap::default(),
        exports: Vec::new(),
        default_expr: None,
        default_local: None,
        story_names: HashMap::default(),
        story_meta: HashMap::default(),
    };

    for item in &module.body {
        match item {
            ModuleItem::ModuleDecl(decl) => scan.visit_module_decl(decl)?,
            ModuleItem::Stmt(Stmt::Decl(decl)) => {
                scan.record_decl(decl, None)?;
            }
            ModuleItem::Stmt(Stmt::Expr(stmt)) => scan.visit_assignment(&stmt.expr)?,
            ModuleItem::Stmt(_) => {}
        }
    }

    Ok(scan)
}

impl<'a> ModuleScan<'a> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.path, message)
    }

    fn visit_module_decl(&mut self, decl: &'a ModuleDecl) -> Result<(), ParseError> {
        match decl {
            ModuleDecl::ExportDecl(export) => {
                for name in self.record_decl(&export.decl, Some(export.span))? {
                    self.exports.push(ExportRecord {
                        export_name: name.clone(),
                        local: name,
                        span: export.span,
                    });
                }
            }
            ModuleDecl::ExportNamed(named) => {
                if named.type_only {
                    return Ok(());
                }
                let source = named.src.as_ref().map(|s| s.value.to_string());
                for specifier in &named.specifiers {
                    match specifier {
                        ExportSpecifier::Named(n) if n.is_type_only => {}
                        ExportSpecifier::Named(n) => {
                            let orig = export_name(&n.orig);
                            let exported = n.exported.as_ref().map_or_else(|| orig.clone(), export_name);
                            if exported == "default" {
                                if source.is_none() {
                                    self.default_local = Some(orig);
                                }
                                continue;
                            }
                            let local = match &source {
                                Some(src) => format!("{src}#{orig}"),
                                None => orig,
                            };
                            self.exports.push(ExportRecord {
                                export_name: exported,
                                local,
                                span: named.span,
                            });
                        }
                        ExportSpecifier::Namespace(_) => {
                            return Err(self.error(
                                "Namespace re-exports (`export * as ns from ...`) are not supported in story files",
                            ));
                        }
                        ExportSpecifier::Default(_) => {
                            return Err(self.error(
                                "Default re-exports (`export x from ...`) are not supported in story files",
                            ));
                        }
                    }
                }
            }
            ModuleDecl::ExportDefaultExpr(export) => {
                self.default_expr = Some(&*export.expr);
            }
            ModuleDecl::ExportAll(_) => {
                return Err(self.error(
                    "`export * from ...` is not supported in story files; export each story explicitly",
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Record a top-level declaration and return the value bindings it introduces.
    fn record_decl(
        &mut self,
        decl: &'a Decl,
        export_span: Option<Span>,
    ) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        match decl {
            Decl::Var(var) if !var.declare => {
                for declarator in &var.decls {
                    let Pat::Ident(binding) = &declarator.name else {
                        if export_span.is_some() {
                            return Err(self.error(
                                "Destructured exports are not supported in story files",
                            ));
                        }
                        continue;
                    };
                    let name = binding.id.sym.to_string();
                    let span = export_span.filter(|_| var.decls.len() == 1).unwrap_or(declarator.span);
                    self.bindings.insert(name.clone(), span);
                    if let Some(init) = &declarator.init {
                        self.inits.insert(name.clone(), &**init);
                    }
                    names.push(name);
                }
            }
            Decl::Fn(f) if !f.declare => {
                let name = f.ident.sym.to_string();
                self.bindings
                    .insert(name.clone(), export_span.unwrap_or(f.function.span));
                names.push(name);
            }
            Decl::Class(c) if !c.declare => {
                let name = c.ident.sym.to_string();
                self.bindings
                    .insert(name.clone(), export_span.unwrap_or(c.class.span));
                names.push(name);
            }
            // Types, interfaces, enums, namespaces and ambient declarations.
            _ => {}
        }
        Ok(names)
    }

    /// `Story.storyName = "..."` and `Story.meta = {...}`.
    fn visit_assignment(&mut self, expr: &Expr) -> Result<(), ParseError> {
        let Expr::Assign(assign) = expr else {
            return Ok(());
        };
        if assign.op != AssignOp::Assign {
            return Ok(());
        }
        let AssignTarget::Simple(SimpleAssignTarget::Member(member)) = &assign.left else {
            return Ok(());
        };
        let Expr::Ident(target) = &*member.obj else {
            return Ok(());
        };
        let MemberProp::Ident(prop) = &member.prop else {
            return Ok(());
        };

        let story = target.sym.to_string();
        match &*prop.sym {
            "storyName" => match eval_static(&assign.right) {
                Ok(Value::String(name)) => {
                    self.story_names.insert(story, name);
                }
                _ => {
                    return Err(
                        self.error(format!("`{story}.storyName` must be a string literal"))
                    );
                }
            },
            "meta" => match eval_static(&assign.right) {
                Ok(Value::Object(meta)) => {
                    self.story_meta.insert(story, meta);
                }
                Ok(_) => {
                    return Err(self.error(format!("`{story}.meta` must be an object")));
                }
                Err(reason) => {
                    return Err(self.error(format!(
                        "`{story}.meta` must be serializable: {reason}"
                    )));
                }
            },
            _ => {}
        }
        Ok(())
    }

    /// Object literal of the default export, following one level of identifier indirection.
    #[must_use]
    pub fn default_object(&self) -> Option<&'a ObjectLit> {
        let expr = match (&self.default_local, self.default_expr) {
            (Some(local), _) => *self.inits.get(local)?,
            (None, Some(expr)) => expr,
            (None, None) => return None,
        };
        match unwrap_expr(expr) {
            Expr::Object(obj) => Some(obj),
            Expr::Ident(ident) => {
                let init: &'a Expr = self.inits.get(&*ident.sym).copied()?;
                match unwrap_expr(init) {
                    Expr::Object(obj) => Some(obj),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// `title` and `meta` of the default export.
    fn default_meta(&self) -> Result<(Option<String>, Map<String, Value>), ParseError> {
        let Some(obj) = self.default_object() else {
            return Ok((None, Map::new()));
        };

        let title = match object_property(obj, "title").map(eval_static) {
            None => None,
            Some(Ok(Value::String(title))) => Some(title),
            Some(_) => {
                return Err(self.error("Default export `title` must be a string literal"));
            }
        };

        let meta = match object_property(obj, "meta").map(eval_static) {
            None => Map::new(),
            Some(Ok(Value::Object(meta))) => meta,
            Some(Ok(_)) => return Err(self.error("Default export `meta` must be an object")),
            Some(Err(reason)) => {
                return Err(self.error(format!(
                    "Default export `meta` must be serializable: {reason}"
                )));
            }
        };

        Ok((title, meta))
    }

    fn loc(cm: &SourceMap, span: Span) -> SourceLoc {
        SourceLoc {
            start: cm.lookup_char_pos(span.lo()).line,
            end: cm.lookup_char_pos(span.hi()).line,
        }
    }

    /// Turn the scan into entries, in declaration order.
    fn into_entries(self, cm: &SourceMap) -> Result<Vec<EntryDatum>, ParseError> {
        let (title, file_meta) = self.default_meta()?;
        let mut seen: HashSet<(String, String)> = HashSet::default();
        let mut entries = Vec::with_capacity(self.exports.len());

        for export in &self.exports {
            let story_name = self
                .story_names
                .get(&export.local)
                .cloned()
                .unwrap_or_else(|| export.export_name.clone());
            let key = story_key(title.as_deref(), &story_name);

            // Aliases of one binding that land on the same key are one story.
            if !seen.insert((export.local.clone(), key.clone())) {
                continue;
            }

            let mut meta = file_meta.clone();
            if let Some(story_meta) = self.story_meta.get(&export.local) {
                for (k, v) in story_meta {
                    meta.insert(k.clone(), v.clone());
                }
            }

            let span = self
                .bindings
                .get(&export.local)
                .copied()
                .unwrap_or(export.span);

            entries.push(EntryDatum {
                file_path: self.path.to_string(),
                export_name: export.export_name.clone(),
                story_name,
                title: title.clone(),
                key,
                local: export.local.clone(),
                meta,
                loc: Self::loc(cm, span),
            });
        }

        Ok(entries)
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_string(),
    }
}
