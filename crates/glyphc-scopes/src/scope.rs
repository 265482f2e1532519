//! Scope stacks, the instance-scope fallback, and the capturing scoper used
//! when analyzing a closure body.

use glyphc_common::{CompilerError, Diagnostic, SourcePosition};
use glyphc_types::Type;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::variable::{CaptureId, InitializationState, Variable, VariableId, VariableOrigin};

/// A single frame of the local scope stack. Its `base_next_id` is inherited
/// from whatever scope was current when it was pushed, so a sibling scope
/// pushed later at the same nesting depth starts allocating ids from the
/// same place: ids are reused across siblings because their lifetimes never
/// overlap.
#[derive(Clone, Debug)]
struct Scope {
    variables: FxHashMap<String, Variable>,
    declaration_order: Vec<String>,
    next_id: u32,
}

impl Scope {
    fn new(base_next_id: u32) -> Self {
        Self {
            variables: FxHashMap::default(),
            declaration_order: Vec::new(),
            next_id: base_next_id,
        }
    }

    fn allocate_id(&mut self) -> VariableId {
        let id = VariableId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Diagnostics produced by popping a scope: unused-mutable warnings and
/// possibly-uninitialized errors, one entry per offending variable.
#[derive(Debug, Default)]
pub struct ScopePopReport {
    pub diagnostics: Vec<Diagnostic>,
    pub errors: Vec<CompilerError>,
}

impl ScopePopReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The local scope stack plus the separate instance scope it falls back to.
/// Parent-scope linkage is realized here as a `Vec` acting as a stack: the
/// last element is the current (innermost) scope, and popping returns to
/// whichever scope pushed it.
#[derive(Clone, Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    instance_scope: FxHashMap<String, Variable>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(0)],
            instance_scope: FxHashMap::default(),
        }
    }

    /// Loads a type definition's already-finalized instance variables.
    /// Finalization assigns their ids once; every later analysis of a
    /// method body on that type replays the same ids here.
    pub fn populate_instance_scope(
        &mut self,
        variables: impl IntoIterator<Item = (VariableId, String, Type, SourcePosition)>,
    ) {
        for (id, name, declared_type, declared_at) in variables {
            self.instance_scope
                .insert(name.clone(), Variable::new(id, name, declared_type, declared_at).mutable());
        }
    }

    pub fn push_scope(&mut self) {
        let base = self.current().next_id;
        trace!(base_next_id = base, "pushing local scope");
        self.scopes.push(Scope::new(base));
    }

    /// Pops the current scope, running the unused-variable and
    /// never-read-mutable checks over every variable it declared.
    pub fn pop_scope(&mut self) -> ScopePopReport {
        let scope = self.scopes.pop().expect("pop_scope called with no scope to pop");
        let mut report = ScopePopReport::default();
        for name in &scope.declaration_order {
            let var = &scope.variables[name];
            if var.warrants_unused_mutable_warning() {
                report.diagnostics.push(Diagnostic::warning(
                    var.declared_at.clone(),
                    format!("variable `{}` is declared mutable but never mutated", var.name),
                ));
            }
            if var.warrants_uninitialized_error() {
                report.errors.push(CompilerError::PossiblyUninitialized {
                    position: var.declared_at.clone(),
                    name: var.name.clone(),
                });
            }
        }
        report
    }

    fn current(&self) -> &Scope {
        self.scopes.last().expect("scope stack is never empty")
    }

    fn current_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    pub fn declare(
        &mut self,
        name: impl Into<String>,
        declared_type: Type,
        declared_at: SourcePosition,
        mutable: bool,
    ) -> Result<VariableId, CompilerError> {
        let name = name.into();
        if self.current().variables.contains_key(&name) {
            return Err(CompilerError::DuplicateDeclaration {
                position: declared_at,
                name,
            });
        }
        let scope = self.current_mut();
        let id = scope.allocate_id();
        let mut var = Variable::new(id, name.clone(), declared_type, declared_at);
        if mutable {
            var = var.mutable();
        }
        scope.declaration_order.push(name.clone());
        scope.variables.insert(name, var);
        Ok(id)
    }

    /// Walks the local stack innermost-first, falling back to the instance
    /// scope on a full miss.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(&Variable, VariableOrigin)> {
        for scope in self.scopes.iter().rev() {
            if let Some(var) = scope.variables.get(name) {
                return Some((var, VariableOrigin::Local));
            }
        }
        self.instance_scope
            .get(name)
            .map(|var| (var, VariableOrigin::Instance))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Variable> {
        for scope in self.scopes.iter_mut().rev() {
            if scope.variables.contains_key(name) {
                return scope.variables.get_mut(name);
            }
        }
        self.instance_scope.get_mut(name)
    }

    pub fn mark_initialized(&mut self, name: &str, certainly: bool) {
        if let Some(var) = self.lookup_mut(name) {
            var.initialized = if certainly {
                InitializationState::Certainly
            } else {
                InitializationState::Potentially
            };
        }
    }

    /// The type definition's own instance variables, as loaded by
    /// `populate_instance_scope`. An initializer's end-of-body check walks
    /// these to find any non-optional one the path analyser never saw
    /// certainly initialized.
    pub fn instance_variables(&self) -> impl Iterator<Item = &Variable> {
        self.instance_scope.values()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

/// What a closure-body analyser needs from the scope it was created inside,
/// to service a capture.
pub trait EnclosingScope {
    fn lookup(&self, name: &str) -> Option<(&Variable, VariableOrigin)>;
}

impl EnclosingScope for ScopeStack {
    fn lookup(&self, name: &str) -> Option<(&Variable, VariableOrigin)> {
        ScopeStack::lookup(self, name)
    }
}

/// A single captured variable: the enclosing scope's copy, given a fresh id
/// in the closure's own id space, remembering whether the source was
/// certainly initialized at the point of capture.
#[derive(Clone, Debug)]
pub struct Capture {
    pub id: CaptureId,
    pub name: String,
    pub declared_type: Type,
    pub certainly_initialized: bool,
}

/// Interposes a capture step between a closure body's own local-scope miss
/// and the instance-scope fallback: on local miss, consult the enclosing
/// analyser's scope; if found there, copy it into this scoper under a fresh
/// `CaptureId` and record it.
pub struct CapturingScoper<'enclosing> {
    locals: ScopeStack,
    enclosing: &'enclosing dyn EnclosingScope,
    captures: Vec<Capture>,
    captured_names: FxHashMap<String, CaptureId>,
    next_capture_id: u32,
}

impl<'enclosing> std::fmt::Debug for CapturingScoper<'enclosing> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturingScoper")
            .field("locals", &self.locals)
            .field("captures", &self.captures)
            .field("captured_names", &self.captured_names)
            .field("next_capture_id", &self.next_capture_id)
            .finish_non_exhaustive()
    }
}

impl<'enclosing> CapturingScoper<'enclosing> {
    #[must_use]
    pub fn new(enclosing: &'enclosing dyn EnclosingScope) -> Self {
        Self {
            locals: ScopeStack::new(),
            enclosing,
            captures: Vec::new(),
            captured_names: FxHashMap::default(),
            next_capture_id: 0,
        }
    }

    pub fn push_scope(&mut self) {
        self.locals.push_scope();
    }

    pub fn pop_scope(&mut self) -> ScopePopReport {
        self.locals.pop_scope()
    }

    pub fn declare(
        &mut self,
        name: impl Into<String>,
        declared_type: Type,
        declared_at: SourcePosition,
        mutable: bool,
    ) -> Result<VariableId, CompilerError> {
        self.locals.declare(name, declared_type, declared_at, mutable)
    }

    /// Resolves `name`, capturing it from the enclosing scope on first use
    /// if it isn't local to this closure.
    pub fn resolve(&mut self, name: &str) -> Option<CaptureLookup> {
        if let Some((var, origin)) = self.locals.lookup(name) {
            return Some(CaptureLookup {
                declared_type: var.declared_type.clone(),
                origin,
                capture_id: None,
            });
        }
        if let Some(&capture_id) = self.captured_names.get(name) {
            let capture = self.captures.iter().find(|c| c.id == capture_id).expect("recorded capture exists");
            return Some(CaptureLookup {
                declared_type: capture.declared_type.clone(),
                origin: VariableOrigin::Captured,
                capture_id: Some(capture_id),
            });
        }
        if let Some((var, _origin)) = self.enclosing.lookup(name) {
            let capture_id = CaptureId(self.next_capture_id);
            self.next_capture_id += 1;
            debug!(name, capture_id = capture_id.0, "capturing variable from enclosing scope");
            self.captures.push(Capture {
                id: capture_id,
                name: name.to_string(),
                declared_type: var.declared_type.clone(),
                certainly_initialized: var.is_certainly_initialized(),
            });
            self.captured_names.insert(name.to_string(), capture_id);
            return Some(CaptureLookup {
                declared_type: var.declared_type.clone(),
                origin: VariableOrigin::Captured,
                capture_id: Some(capture_id),
            });
        }
        None
    }

    #[must_use]
    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }
}

/// The result of resolving a name through a `CapturingScoper`: enough to
/// build a reference expression without exposing scope internals.
#[derive(Clone, Debug)]
pub struct CaptureLookup {
    pub declared_type: Type,
    pub origin: VariableOrigin,
    pub capture_id: Option<CaptureId>,
}
