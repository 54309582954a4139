//! `ladle transform <FILE>`: show a story file after HMR instrumentation.

use super::{print_json, Context};
use ladle_core::BuildMode;
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TransformOutput {
    file: String,
    instrumented: bool,
    code: String,
}

pub fn run(ctx: &Context, file: &Path, json: bool) -> Result<()> {
    let path = ctx.root.join(file);
    let code = std::fs::read_to_string(&path)
        .map_err(|e| miette!("Failed to read {}: {e}", path.display()))?;

    let id = path.to_string_lossy();
    let transformed = ctx
        .container(BuildMode::Development)
        .transform(&code, &id)
        .into_diagnostic()?;

    if json {
        print_json(&TransformOutput {
            file: id.into_owned(),
            instrumented: transformed != code,
            code: transformed,
        })
    } else {
        print!("{transformed}");
        Ok(())
    }
}
