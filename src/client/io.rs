use super::stream::{PartStream, StreamPart};
use anyhow::Result;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

pub const USER_PROMPT: &str = "User: ";
pub const ASSISTANT_PREFIX: &str = "Chap GPT: ";

type Input = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Line input shared by the prompt loop and the tools that ask the user
/// something. There must be only one buffered reader over stdin.
#[derive(Clone)]
pub struct Terminal {
    lines: Arc<Mutex<Input>>,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: Arc::new(Mutex::new(reader.lines())),
        }
    }

    /// `None` once stdin is closed.
    pub async fn read_user_input(&self) -> Result<Option<String>> {
        prompt(USER_PROMPT).await?;
        Ok(self.lines.lock().await.next_line().await?)
    }

    /// Anything but `y` or `Y`, end of input included, is a no.
    pub async fn confirm(&self, question: &str) -> Result<bool> {
        prompt(&format!("{question} [y/N]: ")).await?;
        let answer = self.lines.lock().await.next_line().await?;
        Ok(answer.is_some_and(|line| line.trim().eq_ignore_ascii_case("y")))
    }
}

async fn prompt(text: &str) -> Result<()> {
    let mut output = tokio::io::stdout();
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

pub async fn say(message: &str) -> Result<()> {
    let mut output = tokio::io::stdout();
    output
        .write_all(format!("{ASSISTANT_PREFIX}{message}\n").as_bytes())
        .await?;
    output.flush().await?;
    Ok(())
}

/// Echoes text parts to `output` as they arrive and collects every part.
/// The assistant prefix is written before the first text, and a trailing
/// newline after the last. The first stream error aborts.
pub async fn write_stream<W>(mut stream: PartStream, output: &mut W) -> Result<Vec<StreamPart>>
where
    W: AsyncWrite + Unpin,
{
    let mut parts = Vec::new();
    let mut printed = false;
    let result = async {
        while let Some(chunk) = stream.next().await {
            let part = chunk?;
            if let StreamPart::Content(ref text) = part {
                if !printed {
                    output.write_all(ASSISTANT_PREFIX.as_bytes()).await?;
                    printed = true;
                }
                output.write_all(text.as_bytes()).await?;
                output.flush().await?;
            }
            parts.push(part);
        }
        anyhow::Ok(())
    }
    .await;
    if printed {
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    result.map(|()| parts)
}

pub async fn stdout_stream(stream: PartStream) -> Result<Vec<StreamPart>> {
    write_stream(stream, &mut tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stream::ToolCall;
    use futures::stream;

    fn parts(items: Vec<Result<StreamPart>>) -> PartStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn text_is_prefixed_once() {
        let mut output = Vec::new();
        let collected = write_stream(
            parts(vec![
                Ok(StreamPart::Content("Good ".to_string())),
                Ok(StreamPart::Content("morning".to_string())),
            ]),
            &mut output,
        )
        .await
        .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Chap GPT: Good morning\n");
        assert_eq!(collected.len(), 2);
    }

    #[tokio::test]
    async fn tool_calls_print_nothing() {
        let mut output = Vec::new();
        let collected = write_stream(
            parts(vec![Ok(StreamPart::ToolCall(ToolCall::default()))]),
            &mut output,
        )
        .await
        .unwrap();
        assert!(output.is_empty());
        assert_eq!(collected, [StreamPart::ToolCall(ToolCall::default())]);
    }

    #[tokio::test]
    async fn error_still_terminates_the_line() {
        let mut output = Vec::new();
        let result = write_stream(
            parts(vec![
                Ok(StreamPart::Content("Half".to_string())),
                Err(anyhow::anyhow!("boom")),
            ]),
            &mut output,
        )
        .await;
        assert_eq!(result.unwrap_err().to_string(), "boom");
        assert_eq!(String::from_utf8(output).unwrap(), "Chap GPT: Half\n");
    }

    #[tokio::test]
    async fn confirmation_shares_the_prompt_reader() {
        let terminal = Terminal::from_reader(&b"first\ny\nsecond\nnope\n"[..]);
        let tools_view = terminal.clone();
        assert_eq!(terminal.read_user_input().await.unwrap().as_deref(), Some("first"));
        assert!(tools_view.confirm("empty it?").await.unwrap());
        assert_eq!(terminal.read_user_input().await.unwrap().as_deref(), Some("second"));
        assert!(!tools_view.confirm("empty it?").await.unwrap());
        assert!(!tools_view.confirm("empty it?").await.unwrap());
        assert_eq!(terminal.read_user_input().await.unwrap(), None);
    }
}
