use super::io::{ASSISTANT_PREFIX, Terminal, stdout_stream};
use super::stream::{Reply, StreamPart, ToolCall, parse_stream, response_parts};
use crate::config::Config;
use crate::tools::ToolContext;
use crate::types::AsyncToolSet;

use anyhow::{Context, Result};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    FunctionCall,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends one chat completion request and returns the reply's parts.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, request: CreateChatCompletionRequest) -> Result<Vec<StreamPart>>;
}

/// The chat endpoint itself. Text is echoed to stdout as it arrives, or in
/// one piece when streaming is off.
struct Endpoint {
    api: Client<OpenAIConfig>,
    stream: bool,
}

#[async_trait]
impl Completer for Endpoint {
    async fn complete(&self, request: CreateChatCompletionRequest) -> Result<Vec<StreamPart>> {
        if self.stream {
            let stream = self
                .api
                .chat()
                .create_stream(request)
                .await
                .context("bad request")?;
            return stdout_stream(parse_stream(stream)).await;
        }

        let response = self
            .api
            .chat()
            .create(request)
            .await
            .context("bad request")?;
        let parts = response_parts(response);
        let reply: Reply = parts.iter().cloned().collect();
        if !reply.text.is_empty() {
            println!("{ASSISTANT_PREFIX}{}", reply.text);
        }
        Ok(parts)
    }
}

/// A single conversation with the model.
///
/// The transcript only ever grows by whole turns: a failed `ask` rolls it
/// back to where it was.
pub struct ChatClient {
    completer: Box<dyn Completer>,
    toolset: AsyncToolSet<ToolContext>,
    context: ToolContext,
    messages: Vec<ChatCompletionRequestMessage>,
    system_instruction: Option<String>,
    model: String,
    max_tool_rounds: u32,
}

impl ChatClient {
    pub fn new(
        config: Arc<Config>,
        toolset: AsyncToolSet<ToolContext>,
        terminal: Terminal,
    ) -> ChatClient {
        let api = Client::with_config(
            OpenAIConfig::new()
                .with_api_base(&config.api_base)
                .with_api_key(&config.api_key),
        );
        ChatClient {
            completer: Box::new(Endpoint {
                api: api.clone(),
                stream: config.stream,
            }),
            context: ToolContext::new(api, config.clone(), terminal),
            toolset,
            messages: vec![],
            system_instruction: config.system_prompt.clone(),
            model: config.model.clone(),
            max_tool_rounds: config.max_tool_rounds,
        }
    }

    pub async fn ask(&mut self, prompt: &str) -> Result<String> {
        let checkpoint = self.messages.len();
        self.messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                name: None,
            },
        ));
        let result = self.chat_response().await;
        if result.is_err() {
            self.messages.truncate(checkpoint);
        }
        result
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn set_system_instruction(&mut self, instruction: impl Into<String>) {
        self.system_instruction = Some(instruction.into());
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    pub fn transcript(&self) -> &[ChatCompletionRequestMessage] {
        &self.messages
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.toolset.names()
    }
}

impl ChatClient {
    async fn chat_response(&mut self) -> Result<String> {
        let mut rounds = 0;
        loop {
            let offer_tools = rounds < self.max_tool_rounds;
            let request = self.request(offer_tools)?;
            debug!(
                model = %self.model,
                messages = self.messages.len(),
                offer_tools,
                "chat completion request"
            );
            let reply: Reply = self.completer.complete(request).await?.into_iter().collect();

            if reply.tool_calls.is_empty() || !offer_tools {
                if !reply.tool_calls.is_empty() {
                    warn!("ignoring tool calls after {rounds} tool rounds");
                }
                // an assistant turn with neither text nor calls is rejected by the API
                if reply.text.is_empty() {
                    warn!("model returned an empty reply");
                } else {
                    self.messages.push(assistant_message(reply.text.clone(), vec![]));
                }
                return Ok(reply.text);
            }

            rounds += 1;
            let mut new_messages = self.process_reply(reply).await;
            self.messages.append(&mut new_messages);
        }
    }

    fn request(&self, offer_tools: bool) -> Result<CreateChatCompletionRequest> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(instruction) = &self.system_instruction {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(instruction.clone()),
                    name: None,
                },
            ));
        }
        messages.extend(self.messages.iter().cloned());

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages).n(1);
        if offer_tools && !self.toolset.is_empty() {
            args.tools(self.toolset.chat_completion_tools());
        }
        Ok(args.build()?)
    }

    /// Runs every requested tool and returns the assistant turn that asked
    /// for them followed by one result turn per call.
    async fn process_reply(&self, reply: Reply) -> Vec<ChatCompletionRequestMessage> {
        let mut tool_calls = vec![];
        let mut tool_responses = vec![];
        for call in reply.tool_calls {
            println!("[{}({})]", call.name, call.json);
            let output = self.call_tool(&call).await;
            tool_calls.push(ChatCompletionMessageToolCall {
                id: call.id.clone(),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    arguments: call.json,
                    name: call.name,
                },
            });
            tool_responses.push(ChatCompletionRequestMessage::Tool(
                ChatCompletionRequestToolMessage {
                    content: ChatCompletionRequestToolMessageContent::Text(output.to_string()),
                    tool_call_id: call.id,
                },
            ));
        }
        let mut messages = vec![assistant_message(reply.text, tool_calls)];
        messages.append(&mut tool_responses);
        messages
    }

    async fn call_tool(&self, call: &ToolCall) -> Value {
        debug!(tool = %call.name, arguments = %call.json, "dispatching tool call");
        match self
            .toolset
            .try_tool_call(self.context.clone(), &call.name, &call.json)
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(tool = %call.name, "tool failed: {err:#}");
                json!({ "error": format!("{err:#}") })
            }
            Err(err) => {
                warn!(tool = %call.name, "tool call rejected: {err}");
                json!({ "error": err.to_string() })
            }
        }
    }
}

fn assistant_message(
    text: String,
    tool_calls: Vec<ChatCompletionMessageToolCall>,
) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
        content: if text.is_empty() {
            None
        } else {
            Some(ChatCompletionRequestAssistantMessageContent::Text(text))
        },
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        ..Default::default()
    })
}
