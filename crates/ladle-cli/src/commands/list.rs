//! `ladle list`: run discovery and print the story keys.

use super::{print_json, Context};
use ladle_core::plugin::failure_lines;
use ladle_core::{BuildMode, EntryDataSet};
use miette::Result;
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ListResult<'a> {
    ok: bool,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stories: Option<&'a EntryDataSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    match ctx.plugin(BuildMode::Production).discover() {
        Ok(set) => {
            if json {
                print_json(&ListResult {
                    ok: true,
                    count: set.len(),
                    stories: Some(&set),
                    error: None,
                })?;
            } else {
                for key in set.keys() {
                    println!("{key}");
                }
            }
            Ok(())
        }
        Err(err) => {
            for line in failure_lines(&err) {
                error!("{line}");
            }
            if json {
                print_json(&ListResult {
                    ok: false,
                    count: 0,
                    stories: None,
                    error: Some(err.to_string()),
                })?;
            }
            std::process::exit(1);
        }
    }
}
