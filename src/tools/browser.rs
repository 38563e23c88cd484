use super::ToolContext;
use crate::types::Tool;

use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

const YOUTUBE_MUSIC: &str = "https://music.youtube.com";
const GITHUB: &str = "https://github.com";

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "open_youtube_music")]
#[schemars(description = "Opens YouTube Music in the web browser")]
pub struct OpenYoutubeMusic {}

impl Tool for OpenYoutubeMusic {
    type Context = ToolContext;
    fn apply(&self, context: Self::Context) -> Value {
        open(&context.config.tools.browser_command, YOUTUBE_MUSIC)
    }
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "open_github")]
#[schemars(description = "Opens GitHub in the web browser")]
pub struct OpenGithub {}

impl Tool for OpenGithub {
    type Context = ToolContext;
    fn apply(&self, context: Self::Context) -> Value {
        open(&context.config.tools.browser_command, GITHUB)
    }
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "open_url")]
#[schemars(description = "Opens a web page in the web browser")]
pub struct OpenUrl {
    #[schemars(description = "the http or https address to open")]
    pub url: String,
}

impl Tool for OpenUrl {
    type Context = ToolContext;
    fn apply(&self, context: Self::Context) -> Value {
        match web_url(&self.url) {
            Ok(url) => open(&context.config.tools.browser_command, url.as_str()),
            Err(err) => outcome(Err(err)),
        }
    }
}

fn web_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("'{raw}' is not a valid URL"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => bail!("refusing to open a {scheme}: URL"),
    }
}

fn open(command: &str, url: &str) -> Value {
    outcome(launch(command, url).map(drop))
}

fn outcome(result: Result<()>) -> Value {
    match result {
        Ok(()) => json!({ "successful": true, "errorMessage": "" }),
        Err(err) => {
            warn!("could not open browser: {err:#}");
            json!({ "successful": false, "errorMessage": format!("{err:#}") })
        }
    }
}

/// Spawns the browser without waiting for it to exit. The returned thread
/// reaps the launcher once it does.
fn launch(command: &str, url: &str) -> Result<JoinHandle<Option<ExitStatus>>> {
    let mut words = shell_words::split(command).context("invalid browser command")?;
    if words.is_empty() {
        bail!("no browser command configured");
    }
    let program = words.remove(0);
    info!(%program, %url, "opening browser");
    let mut child = Command::new(&program)
        .args(words)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("could not start {program}"))?;
    Ok(thread::spawn(move || match child.wait() {
        Ok(status) => {
            debug!(%program, %status, "browser launcher exited");
            Some(status)
        }
        Err(err) => {
            warn!(%program, "could not wait for browser launcher: {err}");
            None
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_context;

    #[test]
    fn only_web_urls_are_opened() {
        assert!(web_url("https://example.com/a?b=c").is_ok());
        assert!(web_url("http://localhost:8080").is_ok());
        assert!(web_url("file:///etc/passwd").is_err());
        assert!(web_url("not a url").is_err());
    }

    #[test]
    fn rejected_url_reports_failure() {
        let context = test_context(|config| config.tools.browser_command = "true".to_string());
        let output = OpenUrl {
            url: "javascript:alert(1)".to_string(),
        }
        .apply(context);
        assert_eq!(output["successful"], false);
        assert!(output["errorMessage"].as_str().unwrap().contains("javascript"));
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(launch("", GITHUB).is_err());
        assert!(launch("open 'unterminated", GITHUB).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn configured_command_is_spawned() {
        let context = test_context(|config| config.tools.browser_command = "true".to_string());
        let output = OpenGithub {}.apply(context);
        assert_eq!(output, json!({ "successful": true, "errorMessage": "" }));
    }

    #[cfg(unix)]
    #[test]
    fn launcher_is_reaped() {
        let status = launch("true", GITHUB).unwrap().join().unwrap();
        assert!(status.is_some_and(|status| status.success()));

        let status = launch("sh -c 'exit 3'", GITHUB).unwrap().join().unwrap();
        assert_eq!(status.and_then(|status| status.code()), Some(3));
    }

    #[test]
    fn missing_program_reports_failure() {
        let context = test_context(|config| {
            config.tools.browser_command = "definitely-not-a-browser-7f3a".to_string()
        });
        let output = OpenYoutubeMusic {}.apply(context);
        assert_eq!(output["successful"], false);
    }
}
