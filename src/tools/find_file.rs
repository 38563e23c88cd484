use super::ToolContext;
use crate::types::Tool;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "find_file")]
#[schemars(description = "Executes a fuzzy search to find a file's path")]
pub struct FindFile {
    #[serde(rename = "searchPrompt")]
    #[schemars(description = "The string that will be used in the fuzzy search for the file path.")]
    pub search_prompt: String,
}

impl Tool for FindFile {
    type Context = ToolContext;

    fn apply(&self, context: Self::Context) -> Value {
        let root = &context.config.tools.search_root;
        let path = find_first(root, &self.search_prompt);
        debug!(root = %root.display(), query = %self.search_prompt, ?path, "file search");
        json!({
            "searchPrompt": self.search_prompt,
            "found": path.is_some(),
            "path": path.map(|path| path.display().to_string()),
        })
    }
}

/// First file below `root` whose root-relative path contains `query`,
/// ignoring case. The query is matched as given, surrounding spaces
/// included; a blank query matches nothing. Unreadable entries are skipped.
fn find_first(root: &Path, query: &str) -> Option<PathBuf> {
    if query.trim().is_empty() {
        return None;
    }
    let needle = query.to_lowercase();
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            relative.to_string_lossy().to_lowercase().contains(&needle)
        })
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_context;
    use std::fs;

    fn desktop() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Projects/Taxes")).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("Projects/Taxes/Return-2024.pdf"), "").unwrap();
        fs::write(dir.path().join("Projects/readme.md"), "").unwrap();
        dir
    }

    #[test]
    fn matches_case_insensitively() {
        let dir = desktop();
        let found = find_first(dir.path(), "return-2024").unwrap();
        assert_eq!(found, dir.path().join("Projects/Taxes/Return-2024.pdf"));
    }

    #[test]
    fn matches_directory_components() {
        let dir = desktop();
        let found = find_first(dir.path(), "taxes").unwrap();
        assert!(found.ends_with("Return-2024.pdf"));
    }

    #[test]
    fn directories_themselves_are_not_results() {
        let dir = desktop();
        assert!(find_first(dir.path(), "projects").unwrap().is_file());
    }

    #[test]
    fn spaces_in_the_query_are_significant() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a summer trip.jpg"), "").unwrap();
        fs::write(dir.path().join("summertime.txt"), "").unwrap();
        assert_eq!(
            find_first(dir.path(), " trip"),
            Some(dir.path().join("a summer trip.jpg"))
        );
        assert_eq!(find_first(dir.path(), "summer "), Some(dir.path().join("a summer trip.jpg")));
        assert_eq!(find_first(dir.path(), " summertime"), None);
    }

    #[test]
    fn empty_query_and_missing_root_find_nothing() {
        let dir = desktop();
        assert_eq!(find_first(dir.path(), "  "), None);
        assert_eq!(find_first(&dir.path().join("nope"), "notes"), None);
    }

    #[test]
    fn tool_output_shape() {
        let dir = desktop();
        let root = dir.path().to_path_buf();
        let context = test_context(move |config| config.tools.search_root = root);

        let hit = FindFile {
            search_prompt: "NOTES".to_string(),
        }
        .apply(context.clone());
        assert_eq!(hit["found"], true);
        assert!(hit["path"].as_str().unwrap().ends_with("notes.txt"));

        let miss = FindFile {
            search_prompt: "vacation".to_string(),
        }
        .apply(context);
        assert_eq!(miss["searchPrompt"], "vacation");
        assert_eq!(miss["found"], false);
        assert!(miss["path"].is_null());
    }
}
