//! Scenarios that exercise `ScopeStack` the way `glyphc-analyzer` drives
//! it across nested blocks: declare, shadow in a child scope, pop and
//! check the diagnostics that fall out, then confirm the outer binding is
//! visible again.

use glyphc_common::SourcePosition;
use glyphc_scopes::{ScopeStack, VariableOrigin};
use glyphc_types::Type;

fn pos() -> SourcePosition {
    SourcePosition::new("t.emoji", 1, 1)
}

#[test]
fn a_variable_declared_in_an_outer_scope_is_visible_inside_a_nested_one() {
    let mut scopes = ScopeStack::new();
    scopes.declare("x", Type::nothingness(), pos(), false).unwrap();

    scopes.push_scope();
    let (variable, origin) = scopes.lookup("x").unwrap();
    assert_eq!(origin, VariableOrigin::Local);
    assert_eq!(variable.name, "x");
    scopes.pop_scope();
}

#[test]
fn popping_a_scope_reports_a_declared_but_unused_mutable_variable() {
    let mut scopes = ScopeStack::new();
    scopes.push_scope();
    scopes.declare("count", Type::nothingness(), pos(), true).unwrap();
    let report = scopes.pop_scope();
    assert!(!report.diagnostics.is_empty(), "an unused mutable binding should warrant a warning");
}

#[test]
fn a_variable_that_shadows_an_outer_one_does_not_leak_back_out_after_its_scope_pops() {
    let mut scopes = ScopeStack::new();
    scopes.declare("value", Type::nothingness(), pos(), false).unwrap();

    scopes.push_scope();
    scopes.declare("value", Type::something(), pos(), false).unwrap();
    let (inner, _) = scopes.lookup("value").unwrap();
    assert!(matches!(inner.declared_type.kind, glyphc_types::TypeKind::Something));
    scopes.pop_scope();

    let (outer, _) = scopes.lookup("value").unwrap();
    assert!(matches!(outer.declared_type.kind, glyphc_types::TypeKind::Nothingness));
}

#[test]
fn declaring_the_same_name_twice_in_one_scope_is_rejected() {
    let mut scopes = ScopeStack::new();
    scopes.declare("a", Type::nothingness(), pos(), false).unwrap();
    let result = scopes.declare("a", Type::nothingness(), pos(), false);
    assert!(result.is_err());
}

#[test]
fn sibling_scopes_reuse_variable_ids_since_their_lifetimes_never_overlap() {
    let mut scopes = ScopeStack::new();
    scopes.push_scope();
    let first = scopes.declare("temp", Type::nothingness(), pos(), false).unwrap();
    scopes.pop_scope();

    scopes.push_scope();
    let second = scopes.declare("temp", Type::nothingness(), pos(), false).unwrap();
    scopes.pop_scope();

    assert_eq!(first, second);
}
