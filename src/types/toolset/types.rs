use super::tool_object::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolSetCreationError {
    #[error("error validating schema")]
    Validation(#[source] ValidationError),
    #[error("two or more tools are named `{0}`")]
    NameConflict(String),
}

#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("could not decode arguments (possible hallucination): {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error("no tool named `{0}`")]
    NotFound(String),
}
