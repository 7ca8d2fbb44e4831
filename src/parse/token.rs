//! Statement types produced by the tokenizer.

/// Family of a statement, from its first token.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// `#N`: canvas and struct declarations.
    Declaration,
    /// `#X`: elements of the current canvas.
    Element,
    /// `#A`: array contents.
    ArrayData,
    /// A closed sub-canvas, collapsed from its `#X restore`. `canvas` is the
    /// index of the statement that opened it.
    Placement { canvas: usize },
    /// Unrecognized first token.
    Unknown(String),
}

impl Chunk {
    pub fn classify(first: &str) -> Self {
        match first {
            "#N" => Chunk::Declaration,
            "#X" => Chunk::Element,
            "#A" => Chunk::ArrayData,
            other => Chunk::Unknown(other.to_string()),
        }
    }
}

/// One semicolon-terminated statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Zero-based line on which the statement starts.
    pub line_index: usize,
    pub chunk: Chunk,
    /// Raw tokens, escapes preserved. Unescaped commas are `","` tokens.
    pub tokens: Vec<String>,
}

impl Statement {
    pub fn new(line_index: usize, tokens: Vec<String>) -> Self {
        let chunk = tokens
            .first()
            .map(|t| Chunk::classify(t))
            .unwrap_or_else(|| Chunk::Unknown(String::new()));
        Self {
            line_index,
            chunk,
            tokens,
        }
    }

    /// Second token, e.g. `canvas`, `obj`, `connect`.
    pub fn keyword(&self) -> Option<&str> {
        self.token(1)
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Splits off a trailing `, f <width>` suffix.
    pub fn body_and_width(&self) -> (&[String], Option<&str>) {
        let n = self.tokens.len();
        if n >= 3 && self.tokens[n - 3] == "," && self.tokens[n - 2] == "f" {
            (&self.tokens[..n - 3], Some(self.tokens[n - 1].as_str()))
        } else {
            (&self.tokens, None)
        }
    }
}
