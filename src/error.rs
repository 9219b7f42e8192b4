use thiserror::Error;

use crate::parse::ParseError;
use crate::types::SettingsError;
use crate::CompileError;

/// Unified error type covering parsing, compilation, settings, and I/O.
///
/// Returned by convenience methods like
/// [`Chatplan::from_dsl()`](crate::Chatplan::from_dsl) and
/// [`Chatplan::from_file()`](crate::Chatplan::from_file).
#[derive(Debug, Error)]
pub enum ChatplanError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
