//! Patch parser — source text → statements → patch groups → document.

pub mod args;
pub mod compile;
pub mod controls;
pub mod error;
pub mod extract;
pub mod hydrate;
pub mod token;
pub mod tokenizer;

pub use compile::Parsed;
pub use error::{Diagnostic, ParseFailure, StatementError, ValueError};

pub use crate::config::DEFAULT_ARRAY_SIZE;
use crate::config::ParseConfig;

/// The patch parser.
///
/// Holds only configuration; every call to [`Parser::parse`] builds its own
/// context, so one parser can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParseConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Parse a whole patch file's text.
    ///
    /// Every problem found is collected; the result is a failure if any of
    /// them is an error.
    pub fn parse(&self, source: &str) -> Result<Parsed, ParseFailure> {
        compile::compile(source, self.config.clone())
    }
}

/// Parse patch text with the default configuration.
pub fn parse(source: &str) -> Result<Parsed, ParseFailure> {
    Parser::new().parse(source)
}
