use anyhow::Result;
use async_openai::types::{
    ChatCompletionResponseStream, CreateChatCompletionResponse, FinishReason,
};
use async_stream::stream;
use futures::stream::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::pin::Pin;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub json: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    Content(String),
    ToolCall(ToolCall),
}

pub type PartStream = Pin<Box<dyn Stream<Item = Result<StreamPart>> + Send>>;

/// One model reply: the concatenated text plus any requested tool calls.
#[derive(Debug, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl FromIterator<StreamPart> for Reply {
    fn from_iter<I: IntoIterator<Item = StreamPart>>(parts: I) -> Self {
        let mut reply = Reply::default();
        for part in parts {
            match part {
                StreamPart::Content(text) => reply.text.push_str(&text),
                StreamPart::ToolCall(call) => reply.tool_calls.push(call),
            }
        }
        reply
    }
}

/// Releases the stitched calls. Calls without an id get `call_<n>`, where
/// `n` counts every call released so far in the stream.
fn flush(tool_calls: &mut BTreeMap<u32, ToolCall>, released: &mut usize) -> Vec<ToolCall> {
    std::mem::take(tool_calls)
        .into_values()
        .map(|mut call| {
            if call.id.is_empty() {
                call.id = format!("call_{released}");
            }
            *released += 1;
            call
        })
        .collect()
}

/// Turns raw completion chunks into text deltas and whole tool calls.
///
/// Tool-call fragments are stitched together by index and released, in
/// index order, on a `tool_calls` finish reason or when the stream ends,
/// whichever comes first.
pub fn parse_stream(mut stream: ChatCompletionResponseStream) -> PartStream {
    Box::pin(stream! {
      let mut tool_calls: BTreeMap<u32, ToolCall> = BTreeMap::new();
      let mut released = 0;
      while let Some(part) = stream.next().await {
        let part = match part {
          Ok(part) => part,
          Err(error) => {
            yield Err(anyhow::Error::from(error));
            return;
          }
        };
        let Some(first) = part.choices.first() else {
          continue;
        };
        if let Some(content) = &first.delta.content {
          if !content.is_empty() {
            yield Ok(StreamPart::Content(content.clone()));
          }
        }
        for call in first.delta.tool_calls.iter().flatten() {
          let partial = tool_calls.entry(call.index).or_default();
          if let Some(id) = &call.id {
            partial.id = id.clone();
          }
          if let Some(function) = &call.function {
            if let Some(name) = &function.name {
              partial.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
              partial.json.push_str(arguments);
            }
          }
        }
        if let Some(FinishReason::ToolCalls) = first.finish_reason {
          for call in flush(&mut tool_calls, &mut released) {
            yield Ok(StreamPart::ToolCall(call));
          }
        }
      }
      for call in flush(&mut tool_calls, &mut released) {
        yield Ok(StreamPart::ToolCall(call));
      }
    })
}

/// Non-streaming counterpart of [`parse_stream`].
pub fn response_parts(response: CreateChatCompletionResponse) -> Vec<StreamPart> {
    let Some(choice) = response.choices.into_iter().next() else {
        return vec![];
    };
    let mut parts = vec![];
    if let Some(content) = choice.message.content.filter(|text| !text.is_empty()) {
        parts.push(StreamPart::Content(content));
    }
    for (index, call) in choice.message.tool_calls.into_iter().flatten().enumerate() {
        let id = if call.id.is_empty() {
            format!("call_{index}")
        } else {
            call.id
        };
        parts.push(StreamPart::ToolCall(ToolCall {
            id,
            name: call.function.name,
            json: call.function.arguments,
        }));
    }
    parts
}
