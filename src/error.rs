use thiserror::Error;

/// Failures the core can report for a request. All are client errors:
/// the request was malformed, nothing inside the core broke.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriageError {
    #[error("chat_id must not be empty")]
    MissingChatId,
    #[error("message cannot be empty")]
    EmptyMessage,
}

impl TriageError {
    pub fn is_client_error(&self) -> bool {
        match self {
            TriageError::MissingChatId | TriageError::EmptyMessage => true,
        }
    }
}

pub type TriageResult<T> = Result<T, TriageError>;
