use super::ToolContext;
use crate::types::AsyncTool;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "empty_trash")]
#[schemars(description = "Deletes all of the files in the recycle bin.")]
pub struct EmptyTrash {}

#[async_trait]
impl AsyncTool for EmptyTrash {
    type Context = ToolContext;

    async fn apply(&self, context: Self::Context) -> Result<Value> {
        let settings = &context.config.tools;
        let trash = &settings.trash_dir;

        if settings.confirm_empty_trash {
            let question = format!("Permanently delete everything in {}?", trash.display());
            match context.terminal.confirm(&question).await {
                Ok(true) => {}
                Ok(false) => return Ok(failure("cancelled by the user")),
                Err(err) => return Ok(failure(&format!("failed to read confirmation: {err:#}"))),
            }
        }

        Ok(match sweep(trash) {
            Ok(report) => json!({
                "successful": true,
                "errorMessage": "",
                "removed": report.removed,
                "failed": report.failed,
            }),
            Err(err) => failure(&format!(
                "could not read trash directory {}: {err}",
                trash.display()
            )),
        })
    }
}

fn failure(message: &str) -> Value {
    json!({
        "successful": false,
        "errorMessage": message,
        "removed": 0,
        "failed": [],
    })
}

#[derive(Debug, Default)]
struct SweepReport {
    removed: usize,
    failed: Vec<String>,
}

/// Removes every entry of `dir`, carrying on past entries that cannot be
/// deleted. Only an unreadable `dir` is an error.
fn sweep(dir: &Path) -> io::Result<SweepReport> {
    let mut report = SweepReport::default();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable trash entry: {err}");
                report.failed.push(err.to_string());
                continue;
            }
        };
        let path = entry.path();
        // symlinks are removed, never followed
        let removal = match entry.file_type() {
            Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => fs::remove_file(&path),
            Err(err) => Err(err),
        };
        match removal {
            Ok(()) => report.removed += 1,
            Err(err) => {
                warn!("failed to delete {}: {err}", path.display());
                report.failed.push(path.display().to_string());
            }
        }
    }
    info!(removed = report.removed, failed = report.failed.len(), "emptied trash");
    Ok(report)
}
