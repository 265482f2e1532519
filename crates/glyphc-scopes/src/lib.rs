//! Lexical scopes, variables, closure captures, and path-sensitive
//! initialization tracking.

pub mod path_analyser;
pub mod scope;
pub mod variable;

pub use path_analyser::{Incident, PathAnalyser};
pub use scope::{Capture, CaptureLookup, CapturingScoper, EnclosingScope, ScopePopReport, ScopeStack};
pub use variable::{CaptureId, InitializationState, Variable, VariableId, VariableOrigin};
