use super::tool_object::{AsyncToolObject, SyncToolObject};
use super::types::*;
use crate::types::{AsyncTool, Tool};
use async_openai::types::ChatCompletionTool;
use schemars::JsonSchema;
use serde::de::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub type SyncToolSet<Context> = ToolSet<SyncToolObject<Context>>;
pub type AsyncToolSet<Context> = ToolSet<AsyncToolObject<Context>>;

/// Models sometimes send an empty string for argumentless calls.
fn arguments(json: &str) -> &str {
    if json.trim().is_empty() { "{}" } else { json }
}

pub struct ToolSet<T> {
    tools: BTreeMap<String, T>,
}

impl<T> Default for ToolSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ToolSet<T> {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn insert(mut self, name: String, tool_object: T) -> Result<Self, ToolSetCreationError> {
        if self.tools.contains_key(&name) {
            Err(ToolSetCreationError::NameConflict(name))
        } else {
            self.tools.insert(name, tool_object);
            Ok(self)
        }
    }
}

impl<C> ToolSet<SyncToolObject<C>> {
    pub fn add_tool<T>(self) -> Result<Self, ToolSetCreationError>
    where
        T: JsonSchema + Tool<Context = C> + for<'de> Deserialize<'de> + 'static + Send + Sync,
    {
        let tool_object =
            SyncToolObject::try_from_tool::<T>().map_err(ToolSetCreationError::Validation)?;
        self.insert(tool_object.name.clone(), tool_object)
    }
}

impl<C> ToolSet<SyncToolObject<C>>
where
    C: Send + Sync + 'static,
{
    pub fn into_async(self) -> AsyncToolSet<C> {
        AsyncToolSet {
            tools: self
                .tools
                .into_iter()
                .map(|(name, obj)| (name, AsyncToolObject::from(obj)))
                .collect(),
        }
    }
}

impl<C> ToolSet<AsyncToolObject<C>> {
    pub fn add_tool<T>(self) -> Result<Self, ToolSetCreationError>
    where
        T: JsonSchema + AsyncTool<Context = C> + for<'de> Deserialize<'de> + 'static,
    {
        let tool_object =
            AsyncToolObject::try_from_tool::<T>().map_err(ToolSetCreationError::Validation)?;
        self.insert(tool_object.name.clone(), tool_object)
    }

    /// The outer error means the call never reached a tool; the inner one
    /// is the tool's own failure.
    pub async fn try_tool_call(
        &self,
        context: C,
        tool_name: &str,
        json: &str,
    ) -> Result<anyhow::Result<Value>, ToolCallError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolCallError::NotFound(tool_name.to_owned()))
            .and_then(|tool| {
                tool.try_deserialize(arguments(json))
                    .map_err(ToolCallError::Deserialization)
            })?;
        Ok(tool.apply(context).await)
    }
}

impl<T> ToolSet<T>
where
    ChatCompletionTool: for<'a> From<&'a T>,
{
    pub fn chat_completion_tools(&self) -> Vec<ChatCompletionTool> {
        self.tools.values().map(ChatCompletionTool::from).collect()
    }
}
