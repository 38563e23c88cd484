mod browser;
mod clock;
mod find_file;
mod image;
mod trash;

use crate::client::io::Terminal;
use crate::config::Config;
use crate::types::{AsyncToolSet, SyncToolSet, ToolSetCreationError};

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use std::sync::Arc;

use browser::{OpenGithub, OpenUrl, OpenYoutubeMusic};
use clock::GetCurrentTime;
use find_file::FindFile;
use image::{AnalyzeImage, GenerateImage};
use trash::EmptyTrash;

/// Everything a tool may touch: the API client for the image tools, the
/// terminal for confirmations and the settings for the rest.
#[derive(Clone)]
pub struct ToolContext {
    pub api: Client<OpenAIConfig>,
    pub config: Arc<Config>,
    pub terminal: Terminal,
}

impl ToolContext {
    pub fn new(api: Client<OpenAIConfig>, config: Arc<Config>, terminal: Terminal) -> Self {
        Self {
            api,
            config,
            terminal,
        }
    }
}

pub fn local_toolset() -> Result<AsyncToolSet<ToolContext>, ToolSetCreationError> {
    SyncToolSet::new()
        .add_tool::<GetCurrentTime>()?
        .add_tool::<OpenYoutubeMusic>()?
        .add_tool::<OpenGithub>()?
        .add_tool::<OpenUrl>()?
        .add_tool::<FindFile>()?
        .into_async()
        .add_tool::<EmptyTrash>()?
        .add_tool::<AnalyzeImage>()?
        .add_tool::<GenerateImage>()
}

#[cfg(test)]
pub(crate) fn test_context(configure: impl FnOnce(&mut Config)) -> ToolContext {
    let mut config = Config::default();
    config.tools.confirm_empty_trash = false;
    configure(&mut config);
    let api = Client::with_config(
        OpenAIConfig::new()
            .with_api_base("http://127.0.0.1:9")
            .with_api_key("test"),
    );
    ToolContext::new(api, Arc::new(config), Terminal::from_reader(&b""[..]))
}
