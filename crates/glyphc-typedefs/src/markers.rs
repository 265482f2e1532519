//! Reserved single-glyph tokens the declarative type parser recognizes.
//! The tokenizer (out of scope) hands these back as `TokenType::Symbol`;
//! everything else relevant to a type name comes through as `Identifier`.

pub const OPTIONAL_MARKER: char = '🍬';
pub const META_MARKER: char = '🔵';
pub const SELF_MARKER: char = '🐕';
pub const NAMESPACE_SEPARATOR: char = '🔶';
pub const OWN_GENERIC_ARGUMENT_MARKER: char = '🔡';
pub const CALLABLE_OPEN: char = '🍇';
pub const CALLABLE_CLOSE: char = '🍉';
pub const CALLABLE_RETURN_ARROW: char = '➡';
pub const EXPECTATION_MARKER: char = '●';
