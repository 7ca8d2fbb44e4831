//! pdgraph — parses Pure Data patch files into a structured document graph.
//!
//! The pipeline is tokenize → extract nested patches → hydrate nodes and
//! arrays. See [`parse()`] for the one-call entry point.

pub mod config;
pub mod document;
pub mod parse;

pub use config::ParseConfig;
pub use document::Document;
pub use parse::{parse, ParseFailure, Parsed, Parser};
