//! Tokenizer for patch files.
//!
//! Splits source text into [`Statement`]s on unescaped `;`, and each
//! statement into tokens on unescaped whitespace. Escape sequences are kept
//! verbatim; unescaping happens during argument coercion. A sub-canvas's
//! `#X restore` is collapsed into a [`Chunk::Placement`] pointing back at
//! the `#N canvas` statement it closes.

use super::token::{Chunk, Statement};

pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 0,
        }
    }

    pub fn tokenize(&mut self) -> Vec<Statement> {
        let mut statements = self.split_statements();
        pair_canvases(&mut statements);
        statements
    }

    fn split_statements(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        let mut tokens: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut start_line = None;

        while !self.is_at_end() {
            let line = self.line;
            let ch = self.advance();
            match ch {
                '\\' => {
                    start_line.get_or_insert(line);
                    current.push(ch);
                    if !self.is_at_end() {
                        current.push(self.advance());
                    }
                }
                ';' => {
                    flush_token(&mut current, &mut tokens);
                    if let Some(line_index) = start_line.take() {
                        statements.push(Statement::new(line_index, std::mem::take(&mut tokens)));
                    }
                }
                ',' => {
                    start_line.get_or_insert(line);
                    flush_token(&mut current, &mut tokens);
                    tokens.push(",".to_string());
                }
                c if c.is_whitespace() => flush_token(&mut current, &mut tokens),
                c => {
                    start_line.get_or_insert(line);
                    current.push(c);
                }
            }
        }

        // The last statement may lack its `;`.
        flush_token(&mut current, &mut tokens);
        if let Some(line_index) = start_line {
            statements.push(Statement::new(line_index, tokens));
        }

        statements
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

/// Tokenize a whole source text.
pub fn tokenize(source: &str) -> Vec<Statement> {
    Tokenizer::new(source).tokenize()
}

fn flush_token(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Turns each `#X restore` closing an open `#N canvas` into a placement.
/// Unmatched restores are left alone for the extractor to report.
fn pair_canvases(statements: &mut [Statement]) {
    let mut open = Vec::new();
    for (index, statement) in statements.iter_mut().enumerate() {
        let opens = statement.chunk == Chunk::Declaration && statement.keyword() == Some("canvas");
        let closes = statement.chunk == Chunk::Element && statement.keyword() == Some("restore");
        if opens {
            open.push(index);
        } else if closes {
            if let Some(canvas) = open.pop() {
                statement.chunk = Chunk::Placement { canvas };
            }
        }
    }
}
