//! `RecompilationPoint`: lets a binary operator re-parse its receiver in a
//! simpler storage mode once the operator's own type is known. Captures
//! enough state before a speculative parse to roll everything back and try
//! again under different assumptions.

use glyphc_common::TokenStream;
use glyphc_scopes::{PathAnalyser, ScopeStack};

use crate::writer::Writer;

/// A token stream that can report and rewind to an index, beyond the plain
/// `peek`/`advance` contract `glyphc-common::TokenStream` exposes. The
/// (out-of-scope) tokenizer implements this alongside `TokenStream`.
pub trait RewindableTokenStream: TokenStream {
    fn mark(&self) -> usize;
    fn rewind_to(&mut self, index: usize);
}

/// Everything a speculative re-parse needs restored: the writer truncated
/// back to its pre-attempt length, the token stream rewound to its
/// pre-attempt index, and the scope/path state as it was before the first
/// attempt recorded any declarations or incidents.
///
/// All `Writer` placeholders and insertion points taken after this point was
/// created are invalidated by `restore`.
pub struct RecompilationPoint {
    writer_len: usize,
    stream_index: usize,
    scopes: ScopeStack,
    path: PathAnalyser,
}

impl RecompilationPoint {
    #[must_use]
    pub fn capture(writer: &Writer, stream: &dyn RewindableTokenStream, scopes: &ScopeStack, path: &PathAnalyser) -> Self {
        Self {
            writer_len: writer.len(),
            stream_index: stream.mark(),
            scopes: scopes.clone(),
            path: path.clone(),
        }
    }

    /// Restores `writer`, `stream`, `scopes`, and `path` to the state they
    /// had when this point was captured.
    pub fn restore(
        self,
        writer: &mut Writer,
        stream: &mut dyn RewindableTokenStream,
        scopes: &mut ScopeStack,
        path: &mut PathAnalyser,
    ) {
        writer.truncate(self.writer_len);
        stream.rewind_to(self.stream_index);
        *scopes = self.scopes;
        *path = self.path;
    }
}
