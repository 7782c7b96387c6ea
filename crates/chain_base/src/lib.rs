/* 📖 # Why have chain_base as a core library?
chain_base provides the error type, tracing setup and transport-neutral HTTP
types shared by every crate. The engine builds on these without knowing which
server library carries the bytes.
*/

pub mod error;
pub mod http;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ChainError, ChainResult, ErrorKind, ResultExt};
