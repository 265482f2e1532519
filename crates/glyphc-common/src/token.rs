//! The token-stream contract consumed from the tokenizer: the tokenizer
//! itself is out of scope — only the interface it must satisfy lives here.
//!
//! Lives in `glyphc-common` because both the declarative type parser
//! (`glyphc-typedefs`) and the expression/statement analyzer
//! (`glyphc-analyzer`) consume tokens and neither should depend on the
//! other for this shared contract.

use crate::position::SourcePosition;

/// Discriminates what kind of lexeme a `Token` carries.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenType {
    /// An emoji-name identifier, e.g. a keyword or a type/method name.
    Identifier(String),
    /// A non-emoji identifier: a variable or parameter name.
    Variable(String),
    String(String),
    Integer(i64),
    Double(f64),
    Symbol(char),
    BooleanTrue,
    BooleanFalse,
    DocumentationComment(String),
    ArgumentBracketOpen,
    ArgumentBracketClose,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenType,
    pub position: SourcePosition,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenType, position: SourcePosition) -> Self {
        Self { kind, position }
    }

    /// Whether this token's `TokenType` matches the given emoji-identifier
    /// name, without consuming it. Used by `nextTokenIs`.
    #[must_use]
    pub fn is_identifier(&self, emoji: &str) -> bool {
        matches!(&self.kind, TokenType::Identifier(name) if name == emoji)
    }
}

/// Consumption surface the declarative-type parser and the expression
/// analyzer both parse against. Implemented by the (out-of-scope)
/// tokenizer; stream exhaustion during expression parsing is itself a
/// `CompilerError`, surfaced by `peek`/`advance` returning `None`
/// and the caller reporting end-of-stream.
pub trait TokenStream {
    /// The next token without consuming it, or `None` at end of stream.
    fn peek(&self) -> Option<&Token>;
    /// Consume and return the next token, or `None` at end of stream.
    fn advance(&mut self) -> Option<Token>;
    /// The position that would be reported for an error at the current
    /// point in the stream (the position of `peek()`, or the last token's
    /// position at end of stream).
    fn current_position(&self) -> SourcePosition;

    /// `nextTokenIs(emoji)`: true if the upcoming token is the identifier
    /// `emoji`, without consuming it.
    fn next_token_is(&self, emoji: &str) -> bool {
        self.peek().is_some_and(|t| t.is_identifier(emoji))
    }

    /// `consumeTokenIf(emoji)`: consumes and returns true if the upcoming
    /// token is the identifier `emoji`; otherwise leaves the stream
    /// untouched and returns false.
    fn consume_token_if(&mut self, emoji: &str) -> bool {
        if self.next_token_is(emoji) {
            self.advance();
            true
        } else {
            false
        }
    }
}
