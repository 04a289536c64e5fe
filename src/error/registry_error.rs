use thiserror::Error;

/// Node registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Node type already registered: {0}")]
    DuplicateType(String),
    #[error("Unknown node type: {0}")]
    UnknownType(String),
}
