//! `ladle generate`: load `virtual:generated-list` the way the dev server would.

use super::{print_json, Context};
use ladle_core::plugin::VIRTUAL_MODULE_ID;
use ladle_core::BuildMode;
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct GenerateResult<'a> {
    ok: bool,
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(ctx: &Context, mode: BuildMode, outfile: Option<&Path>, json: bool) -> Result<()> {
    let container = ctx.container(mode);
    let loaded = match container.resolve_and_load(VIRTUAL_MODULE_ID, None) {
        Ok(Some(loaded)) => loaded,
        Ok(None) => return Err(miette!("No plugin provides {VIRTUAL_MODULE_ID}")),
        Err(err) => {
            // The failure itself was already logged by the plugin.
            if json {
                print_json(&GenerateResult {
                    ok: false,
                    mode: mode.as_str(),
                    outfile: None,
                    code: None,
                    error: Some(err.message.clone()),
                })?;
            }
            if err.fatal {
                std::process::exit(1);
            }
            return Err(miette!("{err}"));
        }
    };

    if let Some(path) = outfile {
        std::fs::write(path, &loaded.code).into_diagnostic()?;
        info!(path = %path.display(), bytes = loaded.code.len(), "Wrote story list");
    }

    if json {
        print_json(&GenerateResult {
            ok: true,
            mode: mode.as_str(),
            outfile: outfile.map(|p| p.display().to_string()),
            code: outfile.is_none().then_some(loaded.code.as_str()),
            error: None,
        })
    } else {
        if outfile.is_none() {
            print!("{}", loaded.code);
        }
        Ok(())
    }
}
