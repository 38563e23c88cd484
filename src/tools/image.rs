use super::ToolContext;
use crate::types::AsyncTool;

use anyhow::{Context, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
    ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequestArgs, CreateImageRequestArgs, Image, ImageModel,
    ImageResponseFormat, ImageUrl,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const ANALYSIS_PROMPT: &str = "Analyze this image in detail. Describe what you see, including objects, colors, composition, and any notable features.";

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "analyze_image")]
#[schemars(
    description = "Analyzes an image from a local file path and returns a detailed description"
)]
pub struct AnalyzeImage {
    #[schemars(description = "The local file path to the image to analyze")]
    pub path: String,
}

#[async_trait]
impl AsyncTool for AnalyzeImage {
    type Context = ToolContext;

    async fn apply(&self, context: Self::Context) -> Result<Value> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("could not read image file {}", self.path))?;
        let data_url = format!(
            "data:{};base64,{}",
            mime_type(Path::new(&self.path)),
            STANDARD.encode(&bytes)
        );

        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Array(vec![
                ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: data_url,
                            detail: None,
                        },
                    },
                ),
                ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                ),
            ]),
            name: None,
        });
        let request = CreateChatCompletionRequestArgs::default()
            .model(context.config.vision_model())
            .messages(vec![message])
            .n(1)
            .build()?;

        debug!(path = %self.path, size = bytes.len(), "analyzing image");
        let response = context
            .api
            .chat()
            .create(request)
            .await
            .context("image analysis request failed")?;
        let analysis = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_else(|| "No analysis returned".to_string());

        Ok(json!({ "path": self.path, "analysis": analysis }))
    }
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "generate_image")]
#[schemars(description = "Generates an image from a text prompt")]
pub struct GenerateImage {
    #[schemars(description = "The text description of the image to generate")]
    pub prompt: String,
}

#[async_trait]
impl AsyncTool for GenerateImage {
    type Context = ToolContext;

    async fn apply(&self, context: Self::Context) -> Result<Value> {
        let model = &context.config.image_model;
        let request = CreateImageRequestArgs::default()
            .prompt(self.prompt.as_str())
            .model(ImageModel::Other(model.clone()))
            .n(1)
            .response_format(ImageResponseFormat::B64Json)
            .build()?;

        debug!(%model, prompt = %self.prompt, "generating image");
        let response = context
            .api
            .images()
            .create(request)
            .await
            .with_context(|| format!("image generation with {model} failed"))?;
        let image = response
            .data
            .first()
            .context("image generation returned no image data")?;

        match image.as_ref() {
            Image::B64Json { b64_json, .. } => {
                let bytes = STANDARD
                    .decode(b64_json.as_bytes())
                    .context("image data is not valid base64")?;
                let path = save_image(&context.config.tools.output_dir, &bytes).await?;
                info!(path = %path.display(), "saved generated image");
                Ok(json!({ "prompt": self.prompt, "filePath": path.display().to_string() }))
            }
            Image::Url { url, .. } => Ok(json!({ "prompt": self.prompt, "url": url.as_str() })),
        }
    }
}

fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// File extension for encoded image bytes, judged by magic number.
fn image_extension(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "png",
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        _ => "png",
    }
}

async fn save_image(dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("could not create output directory {}", dir.display()))?;
    let path = dir.join(format!(
        "generated_{}.{}",
        Utc::now().timestamp(),
        image_extension(bytes)
    ));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("could not save image to {}", path.display()))?;
    Ok(path)
}
