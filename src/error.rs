use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Command text that matched neither marker, or a get-file marker whose id
/// did not parse.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("command not recognized: {text:?}")]
pub struct DecodeError {
    pub text: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the header announces. More input may complete it.
    #[error("file frame header incomplete: need {needed} bytes, have {available}")]
    Incomplete { needed: usize, available: usize },
    #[error("file name is not valid UTF-8")]
    InvalidName,
    #[error("file name of {0} bytes does not fit a u32 length")]
    NameTooLong(usize),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("cannot load catalog from {path:?}: {source}")]
    CatalogLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("transport: {0}")]
    Transport(#[from] io::Error),
    /// The request was understood but no response bytes could be produced.
    #[error("no response for file {id}: {source}")]
    NoResponse {
        id: i32,
        #[source]
        source: io::Error,
    },
    #[error("invalid input: {0}")]
    InputValidation(String),
    #[error("cannot store received file at {path:?}: {reason}")]
    Output { path: PathBuf, reason: String },
}

pub type Result<T> = core::result::Result<T, Error>;
