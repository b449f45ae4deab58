// ReQL term construction
// Turns host values and command invocations into type-checked query trees

#![warn(rust_2018_idioms)]

pub mod config;
pub mod query;
pub mod r;
pub mod reql;

// Re-exports for convenience
pub use config::BuilderConfig;
pub use query::{global, CommandDescriptor, CommandRegistry};
pub use reql::{Datum, Term, TermType, Value};

/// Construction error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum Error {
        /// Arity, type or mutual-exclusion precondition violated.
        #[error("Argument error: {0}")]
        Argument(String),

        /// A command name could not be resolved.
        #[error("Registry error: {0}")]
        Registry(String),

        /// Malformed surface expression.
        #[error("Syntax error at offset {offset}: {message}")]
        Syntax { offset: usize, message: String },

        #[error("Configuration error: {0}")]
        Config(String),
    }

    impl Error {
        pub(crate) fn argument(message: impl Into<String>) -> Self {
            Error::Argument(message.into())
        }

        pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
            Error::Syntax {
                offset,
                message: message.into(),
            }
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
