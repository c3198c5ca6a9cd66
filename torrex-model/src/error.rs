use thiserror::Error;

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("media identity requires at least one title")]
    MissingTitle,

    #[error("invalid {field} marker '{value}'")]
    InvalidEpisodeMarker { field: &'static str, value: String },

    #[error("unknown media kind '{0}'")]
    UnknownMediaKind(String),

    #[error("unknown language code '{0}'")]
    UnknownLanguage(String),

    #[error("unknown quality tier '{0}'")]
    UnknownQuality(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
