mod chat;
pub mod io;
mod stream;

pub use chat::ChatClient;
