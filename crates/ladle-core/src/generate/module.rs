use super::codegen::{js_string, js_string_array, js_value, module_specifier, ModuleWriter, ObjectWriter};
use crate::config::Config;
use crate::discover::EntryDataSet;
use crate::error::GenerationError;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Files in the config folder that provide a custom `Provider`, by priority.
pub const PROVIDER_FILES: [&str; 4] = [
    "components.tsx",
    "components.ts",
    "components.jsx",
    "components.js",
];

const PASSTHROUGH_PROVIDER: &str =
    "({ children }) =>\n  /*#__PURE__*/ React.createElement(React.Fragment, null, children)";

/// Source of the `virtual:generated-list` module for a validated set of stories.
///
/// Output depends only on the arguments and on which provider file exists in
/// `config_folder`.
pub fn generate(
    set: &EntryDataSet,
    config_folder: &Path,
    config: &Config,
) -> Result<String, GenerationError> {
    let provider = find_provider(config_folder);
    debug!(
        stories = set.len(),
        provider = provider.as_deref().unwrap_or("<none>"),
        "generating story list"
    );

    let mut stories = ObjectWriter::new();
    let mut sources = ObjectWriter::new();
    for entry in set {
        let specifier = module_specifier(&entry.file_path);
        let component = format!(
            "lazy(() => import({}).then((m) => ({{ default: m[{}] }})))",
            js_string(&specifier),
            js_string(&entry.export_name)
        );
        let title = entry
            .title
            .as_deref()
            .map_or_else(|| "null".to_string(), js_string);

        let mut story = ObjectWriter::new();
        story
            .field("name", js_string(&entry.story_name))
            .field("title", title)
            .field("exportName", js_string(&entry.export_name))
            .field("entry", js_string(&entry.file_path))
            .field("meta", js_value(&Value::Object(entry.meta.clone())))
            .field("locStart", entry.loc.start.to_string())
            .field("locEnd", entry.loc.end.to_string())
            .field("component", component);
        stories.field(&entry.key, story.block(1));

        let mut source = ObjectWriter::new();
        source
            .field("entry", js_string(&entry.file_path))
            .field("locStart", entry.loc.start.to_string())
            .field("locEnd", entry.loc.end.to_string());
        sources.field(&entry.key, source.inline());
    }

    let config = serde_json::to_value(config)?;
    Ok(render(&Rendered {
        provider: provider.as_deref(),
        list: js_string_array(set.keys()),
        config: js_value(&config),
        stories: stories.block(0),
        story_source: sources.block(0),
        error_message: "",
    }))
}

/// The module served when discovery fails during development.
///
/// Same export surface as [`generate`], with everything empty and
/// `errorMessage` carrying `error_message` verbatim.
#[must_use]
pub fn fallback_module(error_message: &str) -> String {
    render(&Rendered {
        provider: None,
        list: "[]".to_string(),
        config: "{}".to_string(),
        stories: "{}".to_string(),
        story_source: "{}".to_string(),
        error_message,
    })
}

/// Path of the custom provider module in `config_folder`, if any.
#[must_use]
pub fn find_provider(config_folder: &Path) -> Option<String> {
    PROVIDER_FILES
        .iter()
        .map(|name| config_folder.join(name))
        .find(|path| path.is_file())
        .map(|path| path.to_string_lossy().replace('\\', "/"))
}

struct Rendered<'a> {
    provider: Option<&'a str>,
    list: String,
    config: String,
    stories: String,
    story_source: String,
    error_message: &'a str,
}

fn render(parts: &Rendered<'_>) -> String {
    let mut module = ModuleWriter::new();
    module
        .import("{ lazy }", "react")
        .import("* as React", "react");
    if let Some(provider) = parts.provider {
        module.import("{ Provider as CustomProvider }", &module_specifier(provider));
    }
    module
        .export_const("list", &parts.list)
        .export_const("config", &parts.config)
        .export_const("stories", &parts.stories)
        .export_const("storySource", &parts.story_source)
        .export_const("errorMessage", &js_string(parts.error_message))
        .export_const(
            "Provider",
            if parts.provider.is_some() {
                "CustomProvider"
            } else {
                PASSTHROUGH_PROVIDER
            },
        );
    module.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::{eval_lenient, parse_source, story_key, EntryDatum, SourceLoc};
    use serde_json::{json, Map};
    use std::collections::BTreeMap;
    use std::fs;
    use swc_ecma_ast::{Decl, ModuleDecl, ModuleItem, Pat};

    /// Statically evaluated `export const` values; `None` for non-literal ones.
    fn exports(code: &str) -> BTreeMap<String, Option<Value>> {
        let (_, module) = parse_source("generated-list.js", code).unwrap();
        let mut out = BTreeMap::new();
        for item in &module.body {
            let ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) = item else {
                continue;
            };
            let Decl::Var(var) = &export.decl else {
                continue;
            };
            for decl in &var.decls {
                if let (Pat::Ident(name), Some(init)) = (&decl.name, &decl.init) {
                    out.insert(name.id.sym.to_string(), eval_lenient(init));
                }
            }
        }
        out
    }

    fn entry(file: &str, export: &str, title: Option<&str>) -> EntryDatum {
        EntryDatum {
            file_path: file.to_string(),
            export_name: export.to_string(),
            story_name: export.to_string(),
            title: title.map(str::to_string),
            key: story_key(title, export),
            local: export.to_string(),
            meta: Map::new(),
            loc: SourceLoc { start: 2, end: 4 },
        }
    }

    fn sample() -> EntryDataSet {
        let mut with_meta = entry("src/button.stories.tsx", "Primary", Some("Button"));
        with_meta.meta.insert("width".to_string(), json!(320));
        EntryDataSet::from(vec![
            with_meta,
            entry("src/button.stories.tsx", "Secondary", Some("Button")),
            entry("src/card.stories.jsx", "Default", None),
        ])
    }

    #[test]
    fn test_generate_shape() {
        let dir = tempfile::tempdir().unwrap();
        let code = generate(&sample(), dir.path(), &Config::default()).unwrap();
        let exports = exports(&code);

        assert_eq!(
            exports.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Provider", "config", "errorMessage", "list", "stories", "storySource"]
        );
        assert_eq!(
            exports["list"],
            Some(json!(["Button/Primary", "Button/Secondary", "Default"]))
        );
        assert_eq!(exports["errorMessage"], Some(json!("")));
        assert_eq!(
            exports["stories"].as_ref().unwrap()["Button/Primary"],
            json!({
                "name": "Primary",
                "title": "Button",
                "exportName": "Primary",
                "entry": "src/button.stories.tsx",
                "meta": { "width": 320 },
                "locStart": 2,
                "locEnd": 4,
            })
        );
        assert_eq!(
            exports["storySource"].as_ref().unwrap()["Default"],
            json!({ "entry": "src/card.stories.jsx", "locStart": 2, "locEnd": 4 })
        );
        assert_eq!(
            exports["config"].as_ref().unwrap()["stories"],
            json!("src/**/*.stories.{js,jsx,ts,tsx}")
        );
        assert!(code.contains(
            r#"lazy(() => import("/src/card.stories.jsx").then((m) => ({ default: m["Default"] })))"#
        ));
        assert!(code.contains("React.createElement(React.Fragment, null, children)"));
        assert!(!code.contains("CustomProvider"));
    }

    #[test]
    fn test_list_stories_and_sources_share_keys() {
        let dir = tempfile::tempdir().unwrap();
        let exports = exports(&generate(&sample(), dir.path(), &Config::default()).unwrap());

        let list: Vec<String> = serde_json::from_value(exports["list"].clone().unwrap()).unwrap();
        let stories: Vec<String> = exports["stories"]
            .as_ref()
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        let sources: Vec<String> = exports["storySource"]
            .as_ref()
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();

        let mut sorted_list = list.clone();
        sorted_list.sort();
        assert_eq!(list.len(), 3);
        assert_eq!(sorted_list, stories);
        assert_eq!(sorted_list, sources);
    }

    #[test]
    fn test_config_export_is_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.port = 7007;
        config
            .extra
            .insert("customKey".to_string(), json!({ "nested": [1, "two"] }));

        let exports = exports(&generate(&sample(), dir.path(), &config).unwrap());
        let exported = exports["config"].clone().unwrap();
        assert_eq!(exported, serde_json::to_value(&config).unwrap());
        assert_eq!(exported["port"], json!(7007));
        assert_eq!(exported["customKey"], json!({ "nested": [1, "two"] }));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config
            .extra
            .insert("zeta".to_string(), json!({ "b": 1, "a": 2 }));
        let first = generate(&sample(), dir.path(), &config).unwrap();
        let second = generate(&sample(), dir.path(), &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let exports = exports(&generate(&EntryDataSet::new(), dir.path(), &Config::default()).unwrap());
        assert_eq!(exports["list"], Some(json!([])));
        assert_eq!(exports["stories"], Some(json!({})));
        assert_eq!(exports["storySource"], Some(json!({})));
        assert_eq!(exports["errorMessage"], Some(json!("")));
    }

    #[test]
    fn test_hostile_names_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let mut hostile = entry("src/x\".stories.tsx", "X", Some("T\"]; alert(1); //\u{2028}"));
        hostile.story_name = "`${process.exit()}`".to_string();
        let code = generate(&EntryDataSet::from(vec![hostile]), dir.path(), &Config::default()).unwrap();
        let exports = exports(&code);

        assert_eq!(
            exports["list"],
            Some(json!(["T\"]; alert(1); //\u{2028}/X"]))
        );
        assert_eq!(
            exports["stories"].as_ref().unwrap()["T\"]; alert(1); //\u{2028}/X"]["name"],
            json!("`${process.exit()}`")
        );
        assert!(!code.contains('\u{2028}'));
    }

    #[test]
    fn test_custom_provider() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("components.jsx"), "export const Provider = () => null;").unwrap();
        fs::write(dir.path().join("components.tsx"), "export const Provider = () => null;").unwrap();

        let code = generate(&EntryDataSet::new(), dir.path(), &Config::default()).unwrap();
        let expected = module_specifier(&dir.path().join("components.tsx").to_string_lossy());
        assert!(code.contains(&format!(
            "import {{ Provider as CustomProvider }} from {};",
            js_string(&expected)
        )));
        assert!(code.contains("export const Provider = CustomProvider;"));
    }

    #[test]
    fn test_fallback_module() {
        let message = "src/bad.stories.tsx: Expected ';', got `{`\nline \"2\"";
        let code = fallback_module(message);
        let exports = exports(&code);

        assert_eq!(exports["list"], Some(json!([])));
        assert_eq!(exports["config"], Some(json!({})));
        assert_eq!(exports["stories"], Some(json!({})));
        assert_eq!(exports["storySource"], Some(json!({})));
        assert_eq!(exports["errorMessage"], Some(json!(message)));
        assert!(exports.contains_key("Provider"));
    }
}
