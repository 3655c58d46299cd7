use crate::config::{RegistryConfigBuilderError, ServerConfigBuilderError};
use std::string::FromUtf8Error;
use strum_macros::Display;
use thiserror::Error;

/// Status code of a finished call. Values follow the usual RPC status numbering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, FromPrimitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
}

/// Failure result of a single call, returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
#[error("{code}: {message}")]
pub struct Status {
    #[get_copy = "pub"]
    code: Code,
    #[get = "pub"]
    message: String,
}

impl Status {
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        Status {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Status::new(Code::Cancelled, message)
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Status::new(Code::InvalidArgument, message)
    }

    pub fn deadline_exceeded<S: Into<String>>(message: S) -> Self {
        Status::new(Code::DeadlineExceeded, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Status::new(Code::NotFound, message)
    }

    pub fn unimplemented<S: Into<String>>(message: S) -> Self {
        Status::new(Code::Unimplemented, message)
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Status::new(Code::Internal, message)
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Status::new(Code::Unavailable, message)
    }
}

/// Payload serialization error.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Codec error: {0}")]
    Error(String),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    StringDecodingError(#[from] FromUtf8Error),

    #[error(transparent)]
    DecodeError(#[from] prost::DecodeError),

    #[error(transparent)]
    DescriptorError(#[from] prost_reflect::DescriptorError),

    #[error("Invalid schema '{file}': {reason}")]
    SchemaError { file: String, reason: String },
}

/// Wire frame encoding error.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame error: {0}")]
    Error(String),

    /// Represents all cases of `std::io::Error`.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    StringDecodingError(#[from] FromUtf8Error),

    #[error("Unknown frame type {0:#04x}")]
    UnknownType(u8),

    #[error("Frame of {size} bytes exceeds limit of {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Server construction error. Always fatal: a misconfigured server must not start.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Error(String),

    #[error("Unsupported network '{0}'")]
    UnsupportedNetwork(String),

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Server use too many interceptors: {count} exceeds limit of {max}")]
    TooManyInterceptors { count: usize, max: usize },

    #[error("Handler already registered for '{0}'")]
    DuplicateMethod(String),
}

/// Service registry error.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry error: {0}")]
    Error(String),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error("Registry rejected '{id}' with status {status}: {body}")]
    Rejected { id: String, status: u16, body: String },
}

/// Server startup and serving error.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Server error: {0}")]
    Error(String),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error("Failed to bind {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Registration failed: {0}")]
    RegistrationError(#[from] RegistryError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Client side call error.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Rpc error: {0}")]
    Error(String),

    #[error(transparent)]
    Status(#[from] Status),

    #[error(transparent)]
    CodecError(#[from] CodecError),

    #[error(transparent)]
    FrameError(#[from] FrameError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl RpcError {
    /// Status code reported by the server, if the call reached it.
    pub fn code(&self) -> Option<Code> {
        match self {
            RpcError::Status(status) => Some(status.code()),
            _ => None,
        }
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        CodecError::Error(err)
    }
}

impl From<String> for FrameError {
    fn from(err: String) -> Self {
        FrameError::Error(err)
    }
}

impl From<String> for ConfigError {
    fn from(err: String) -> Self {
        ConfigError::Error(err)
    }
}

impl From<String> for ServerError {
    fn from(err: String) -> Self {
        ServerError::Error(err)
    }
}

impl From<String> for RpcError {
    fn from(err: String) -> Self {
        RpcError::Error(err)
    }
}

impl From<ServerConfigBuilderError> for ConfigError {
    fn from(err: ServerConfigBuilderError) -> Self {
        ConfigError::Error(err.to_string())
    }
}

impl From<RegistryConfigBuilderError> for ConfigError {
    fn from(err: RegistryConfigBuilderError) -> Self {
        ConfigError::Error(err.to_string())
    }
}
