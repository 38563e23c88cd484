use crate::client::ChatClient;
use crate::client::io::{Terminal, say};

use anyhow::Result;
use tracing::error;

const GREETING: &str = "Hello good sir! How can I be of assistance today?";
const FAREWELL: &str = "Goodbye!";
const HELP: &str = "\
commands:
  /clear           forget the conversation so far
  /system          show the system instruction
  /system <text>   replace the system instruction
  /help            show this message
  quit, exit       leave";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Empty,
    Quit,
    Clear,
    Help,
    ShowSystem,
    SetSystem(&'a str),
    Unknown(&'a str),
    Prompt(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            "quit" | "exit" => Command::Quit,
            "/clear" => Command::Clear,
            "/help" => Command::Help,
            "/system" => Command::ShowSystem,
            _ => match line.strip_prefix("/system ") {
                Some(text) => Command::SetSystem(text.trim()),
                None if line.starts_with('/') => Command::Unknown(line),
                None => Command::Prompt(line),
            },
        }
    }
}

pub async fn run(client: &mut ChatClient, terminal: &Terminal) -> Result<()> {
    say(GREETING).await?;

    while let Some(line) = terminal.read_user_input().await? {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Clear => {
                let forgotten = client.transcript().len();
                client.clear();
                println!("forgot {forgotten} messages");
            }
            Command::Help => {
                println!("{HELP}");
                let tools: Vec<_> = client.tool_names().collect();
                println!("tools: {}", tools.join(", "));
            }
            Command::ShowSystem => match client.system_instruction() {
                Some(instruction) => println!("system: {instruction}"),
                None => println!("no system instruction set"),
            },
            Command::SetSystem(text) => {
                client.set_system_instruction(text);
                println!("system instruction updated");
            }
            Command::Unknown(command) => println!("unknown command {command}, try /help"),
            Command::Prompt(prompt) => {
                if let Err(err) = client.ask(prompt).await {
                    error!("turn failed: {err:#}");
                    println!("Error: {err:#}");
                }
            }
        }
    }

    say(FAREWELL).await
}
