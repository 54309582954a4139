//! Story keys and their normalized form.
//!
//! A story key is `<title>/<name>` when the file's default export declares a
//! `title`, and just `<name>` otherwise. Duplicate detection compares
//! normalized keys: every `/`-separated level is kebab-cased (camelCase
//! boundaries split, lowercased, non-alphanumeric runs collapsed to `-`) and
//! the levels are joined with `--`.

/// Key under which a story appears in the generated list.
#[must_use]
pub fn story_key(title: Option<&str>, name: &str) -> String {
    match title {
        Some(title) if !title.is_empty() => format!("{title}/{name}"),
        _ => name.to_string(),
    }
}

/// Normalized form of a story key; two stories collide when these are equal.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let levels: Vec<String> = key
        .split('/')
        .map(kebab_level)
        .filter(|level| !level.is_empty())
        .collect();
    if levels.is_empty() {
        return key.to_string();
    }
    levels.join("--")
}

fn kebab_level(level: &str) -> String {
    let chars: Vec<char> = level.chars().collect();
    let mut out = String::with_capacity(level.len() + 4);
    let mut pending_dash = false;

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            pending_dash = true;
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // fooBar, foo2Bar, HTMLButton
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower)
            {
                pending_dash = true;
            }
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.extend(c.to_lowercase());
    }

    out
}
