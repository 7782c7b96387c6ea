use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic

The request dispatcher needs to pattern match on the failure category to pick a
status code, so the categories live in ErrorKind rather than in strings.
*/

/// Error variants that can occur in chain operations.
#[derive(Debug)]
pub enum ErrorKind {
    /// A hypermedia link is missing its href or is not a link object
    MalformedLink { relation: String, reason: String },

    /// An inbound document could not be read as a JSON object
    MalformedDocument { message: String },

    /// None of the supported media types satisfy the Accept header
    NotAcceptable { accept: String },

    /// The requested entity or route does not exist
    NotFound { resource: String },

    /// A payload failed domain or reference validation
    Validation { message: String },

    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedLink { relation, reason } => {
                write!(f, "Malformed link '{}': {}", relation, reason)
            }
            ErrorKind::MalformedDocument { message } => {
                write!(f, "Malformed document: {}", message)
            }
            ErrorKind::NotAcceptable { accept } => {
                write!(f, "No acceptable representation for Accept: {}", accept)
            }
            ErrorKind::NotFound { resource } => write!(f, "Not found: {}", resource),
            ErrorKind::Validation { message } => write!(f, "Validation failed: {}", message),
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and ChainError?
ErrorKind carries the structural variant, ChainError wraps it with runtime
context strings, an optional cause and the span trace captured at creation.
Callers match on kind() to decide what to do and attach context while
propagating.
*/

/// Error type wrapping an [`ErrorKind`] with context, cause and span trace.
pub struct ChainError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<ChainError>>,
    span_trace: SpanTrace,
}

impl ChainError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a `Message` error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a `MalformedLink` error for the given relation.
    pub fn malformed_link(relation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedLink {
            relation: relation.into(),
            reason: reason.into(),
        })
    }

    /// Creates a `MalformedDocument` error.
    pub fn malformed_document(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedDocument {
            message: message.into(),
        })
    }

    /// Creates a `NotAcceptable` error for the given Accept header value.
    pub fn not_acceptable(accept: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAcceptable {
            accept: accept.into(),
        })
    }

    /// Creates a `NotFound` error naming the missing resource.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            resource: resource.into(),
        })
    }

    /// Creates a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that caused this one.
    pub fn caused_by(mut self, cause: ChainError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context strings in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the error that caused this one, if any.
    pub fn cause(&self) -> Option<&ChainError> {
        self.cause.as_deref()
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        let entries = self.context.len() + usize::from(self.cause.is_some());
        for (index, context) in self.context.iter().enumerate() {
            let branch = if index + 1 == entries { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, context)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "{}└─ cause: ", indent)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for ChainError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for ChainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        if let Some(cause) = &self.cause {
            return Some(cause.as_ref());
        }
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for context in &self.context {
            write!(f, "{}: ", context)?;
        }
        write!(f, "{}", self.kind)
    }
}

/* 📖 # Why a tree-shaped Debug output?
Errors are mostly read in logs and test failures. Printing the kind, each
context entry and the cause chain as a tree, followed by the span trace, reads
far better than the derived struct dump.
*/
impl fmt::Debug for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for chain operations.
pub type ChainResult<T> = std::result::Result<T, Box<ChainError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> ChainResult<T>;

    /// Attaches context using lazy evaluation.
    fn with_context<F>(self, f: F) -> ChainResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for ChainResult<T> {
    fn context(self, context: impl Into<String>) -> ChainResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> ChainResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed `Message` error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::ChainError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed `Message` error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
