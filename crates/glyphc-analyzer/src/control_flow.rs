//! Control-flow forms: conditional (with optional condition-binding),
//! while, repeat-while, and for-in over a list or a protocol-enumerable
//! type. Each wraps its body in a path-analyser branch and a fresh scope so
//! that a variable declared inside never leaks past the construct, and each
//! emits a count placeholder a backend can use to skip the body without
//! decoding it.

use glyphc_common::{CompilerError, SourcePosition, TokenStream};
use glyphc_scopes::Incident;
use glyphc_types::compatibility::InheritanceLookup;
use glyphc_types::storage::SizeOf;
use glyphc_types::{Type, TypeKind};

use crate::context::AnalyzerContext;
use crate::dispatch::{analyze_expression, DECLARE_CONSTANT, DECLARE_MUTABLE, PrimitiveTypes};
use crate::expectation::TypeExpectation;
use crate::resolution::Resolvers;
use crate::writer::Opcode;

pub const BLOCK_OPEN: &str = "🍇";
pub const BLOCK_CLOSE: &str = "🍉";
pub const IF: &str = "🍊";
pub const ELSE: &str = "🍋";
pub const WHILE: &str = "🔁";
pub const REPEAT_WHILE: &str = "🔂";
pub const FOR_IN: &str = "🔃";

/// The three method slots the for-in protocol dispatches through when
/// iterating a user type rather than a builtin list.
#[derive(Clone, Copy, Debug)]
pub struct IteratorProtocol {
    pub make_iterator: u32,
    pub has_more: u32,
    pub next: u32,
}

fn boolean_type(primitives: PrimitiveTypes) -> Type {
    Type::new(TypeKind::ValueType(primitives.boolean, vec![]), glyphc_types::TypeFlags::empty())
}

/// Consumes a `🍇... 🍉` block, analyzing each contained statement as an
/// expression with no expectation and discarding its type. Declares its own
/// scope frame; callers push/pop the path-analyser branch around this.
fn parse_block(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
) -> Result<(), CompilerError> {
    let position = stream.current_position();
    if !stream.consume_token_if(BLOCK_OPEN) {
        return Err(CompilerError::Internal {
            position,
            message: "expected the start of a block".to_string(),
        });
    }
    ctx.scopes.push_scope();
    while !stream.consume_token_if(BLOCK_CLOSE) {
        if stream.peek().is_none() {
            return Err(CompilerError::Internal {
                position: stream.current_position(),
                message: "unterminated block".to_string(),
            });
        }
        analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    }
    ctx.scopes.pop_scope();
    Ok(())
}

/// `🍊 condition block (🍋 block)?` — a plain boolean condition, or a
/// condition-binding form (`🍮`/`🍦` immediately after `🍊`) that declares a
/// new variable bound to the unwrapped value of an optional expression,
/// visible only inside the true branch.
pub fn analyze_conditional(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
) -> Result<Type, CompilerError> {
    let position = stream.current_position();
    let binding = if stream.next_token_is(DECLARE_MUTABLE) || stream.next_token_is(DECLARE_CONSTANT) {
        let mutable = stream.consume_token_if(DECLARE_MUTABLE);
        if !mutable {
            stream.advance();
        }
        Some(parse_condition_binding(stream, ctx, primitives, lookup, sizes, resolvers, mutable, &position)?)
    } else {
        let condition = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::of(boolean_type(primitives)))?;
        let _ = condition;
        None
    };

    ctx.writer.write_instruction(Opcode::If);
    let skip = ctx.writer.write_instructions_count_placeholder_coin();

    ctx.path.begin_branch();
    ctx.scopes.push_scope();
    if let Some((name, unwrapped, declared_at, mutable)) = binding {
        let id = ctx.scopes.declare(name, unwrapped, declared_at, mutable)?;
        ctx.path.record_incident(Incident::VariableInitialized(id));
    }
    parse_block_body(stream, ctx, primitives, lookup, sizes, resolvers)?;
    ctx.scopes.pop_scope();
    ctx.path.end_branch();
    ctx.writer.patch_count(skip);

    if stream.consume_token_if(ELSE) {
        ctx.path.begin_branch();
        ctx.scopes.push_scope();
        parse_block(stream, ctx, primitives, lookup, sizes, resolvers)?;
        ctx.scopes.pop_scope();
        ctx.path.end_branch();
        ctx.path.end_mutual_exclusive_branches();
    } else {
        ctx.path.end_uncertain_branches();
    }

    Ok(Type::nothingness())
}

/// Like `parse_block` but without its own `push_scope`/`pop_scope` pair,
/// for the true-branch body of a condition-binding `if`, whose scope
/// `analyze_conditional` already opened to hold the bound variable.
fn parse_block_body(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
) -> Result<(), CompilerError> {
    let position = stream.current_position();
    if !stream.consume_token_if(BLOCK_OPEN) {
        return Err(CompilerError::Internal {
            position,
            message: "expected the start of a block".to_string(),
        });
    }
    while !stream.consume_token_if(BLOCK_CLOSE) {
        if stream.peek().is_none() {
            return Err(CompilerError::Internal {
                position: stream.current_position(),
                message: "unterminated block".to_string(),
            });
        }
        analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    }
    Ok(())
}

fn parse_condition_binding(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    mutable: bool,
    position: &SourcePosition,
) -> Result<(String, Type, SourcePosition, bool), CompilerError> {
    let name = match stream.advance() {
        Some(glyphc_common::Token {
            kind: glyphc_common::TokenType::Variable(name),
            ..
        }) => name,
        _ => {
            return Err(CompilerError::Internal {
                position: position.clone(),
                message: "expected a variable name in a condition-binding".to_string(),
            })
        }
    };
    let value = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    if !value.is_optional() {
        return Err(CompilerError::BadCast {
            position: position.clone(),
            from: format!("{value:?}"),
            to: "a condition-binding target (must be optional)".to_string(),
        });
    }
    Ok((name, value.unwrapped(), position.clone(), mutable))
}

/// `🔁 condition block` — evaluates `condition` before every iteration of
/// `block`; never runs the body if the condition starts false.
pub fn analyze_while(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
) -> Result<Type, CompilerError> {
    analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::of(boolean_type(primitives)))?;
    ctx.writer.write_instruction(Opcode::RepeatWhile);
    let skip = ctx.writer.write_instructions_count_placeholder_coin();
    ctx.status.flow_control_depth += 1;
    ctx.path.begin_branch();
    parse_block(stream, ctx, primitives, lookup, sizes, resolvers)?;
    ctx.path.end_branch();
    ctx.path.end_uncertain_branches();
    ctx.status.flow_control_depth -= 1;
    ctx.writer.patch_count(skip);
    Ok(Type::nothingness())
}

/// `🔂 block condition` — runs `block` once unconditionally, then repeats
/// while `condition` holds.
pub fn analyze_repeat_while(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
) -> Result<Type, CompilerError> {
    ctx.writer.write_instruction(Opcode::RepeatWhile);
    let skip = ctx.writer.write_instructions_count_placeholder_coin();
    ctx.status.flow_control_depth += 1;
    ctx.path.begin_branch();
    parse_block(stream, ctx, primitives, lookup, sizes, resolvers)?;
    analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::of(boolean_type(primitives)))?;
    ctx.path.end_branch();
    ctx.path.end_uncertain_branches();
    ctx.status.flow_control_depth -= 1;
    ctx.writer.patch_count(skip);
    Ok(Type::nothingness())
}

/// `🔃 loopVariable iterableExpr block` over a list: declares `loopVariable`
/// bound to the list's element type and emits `ForInList`, which a backend
/// interprets as walking the list directly without a protocol dispatch.
/// `name`/`position` are the loop variable and its declaration site, already
/// parsed by the caller alongside the iterable expression that determined
/// `element_type` — this function never parses the iterable itself, since
/// that parsing is what told the caller which of `analyze_for_in_list` or
/// `analyze_foreach` to call.
pub fn analyze_for_in_list(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    name: String,
    position: SourcePosition,
    element_type: Type,
) -> Result<Type, CompilerError> {
    ctx.writer.write_instruction(Opcode::ForInList);
    let skip = ctx.writer.write_instructions_count_placeholder_coin();
    ctx.status.flow_control_depth += 1;
    ctx.path.begin_branch();
    ctx.scopes.push_scope();
    let id = ctx.scopes.declare(name, element_type, position, false)?;
    ctx.path.record_incident(Incident::VariableInitialized(id));
    parse_block_body(stream, ctx, primitives, lookup, sizes, resolvers)?;
    ctx.scopes.pop_scope();
    ctx.path.end_branch();
    ctx.path.end_uncertain_branches();
    ctx.status.flow_control_depth -= 1;
    ctx.writer.patch_count(skip);
    Ok(Type::nothingness())
}

/// `🔃 loopVariable iterableExpr block` over any protocol-enumerable type:
/// reserves an internal variable for the iterator object, then emits the
/// generic `Foreach` dispatch, which a backend expands into calls against
/// `protocol.make_iterator`/`has_more`/`next` at the given VTIs. `name`/
/// `position` are pre-parsed the same way `analyze_for_in_list`'s are.
pub fn analyze_foreach(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    name: String,
    position: SourcePosition,
    element_type: Type,
    protocol: IteratorProtocol,
) -> Result<Type, CompilerError> {
    let iterator_id = ctx.scopes.declare("🔃iterator", Type::someobject(), position.clone(), false)?;
    ctx.path.record_incident(Incident::VariableInitialized(iterator_id));

    ctx.writer.write_instruction(Opcode::Foreach);
    ctx.writer.write_word(protocol.make_iterator);
    ctx.writer.write_word(protocol.has_more);
    ctx.writer.write_word(protocol.next);
    let skip = ctx.writer.write_instructions_count_placeholder_coin();

    ctx.status.flow_control_depth += 1;
    ctx.path.begin_branch();
    ctx.scopes.push_scope();
    let id = ctx.scopes.declare(name, element_type, position, false)?;
    ctx.path.record_incident(Incident::VariableInitialized(id));
    parse_block_body(stream, ctx, primitives, lookup, sizes, resolvers)?;
    ctx.scopes.pop_scope();
    ctx.path.end_branch();
    ctx.path.end_uncertain_branches();
    ctx.status.flow_control_depth -= 1;
    ctx.writer.patch_count(skip);
    Ok(Type::nothingness())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::{IteratorProtocolLookup, MethodLookup, MethodResolution};
    use glyphc_common::{Token, TokenType};
    use glyphc_types::substitution::ConstraintLookup;
    use glyphc_types::{ClassId, TypeContext, TypeDefRef, ValueTypeId};

    struct NoInheritance;
    impl ConstraintLookup for NoInheritance {
        fn constraint(&self, _owner: TypeDefRef, _index: u32) -> Option<Type> {
            None
        }
    }
    impl InheritanceLookup for NoInheritance {
        fn class_inherits_from(&self, descendant: ClassId, ancestor: ClassId) -> bool {
            descendant == ancestor
        }
        fn adopted_protocols(&self, _class: ClassId, _arguments: &[Type]) -> Vec<Type> {
            vec![]
        }
    }
    struct FixedSize(u32);
    impl SizeOf for FixedSize {
        fn size_in_words(&self, _ty: &Type) -> u32 {
            self.0
        }
    }

    struct NoMethods;
    impl MethodLookup for NoMethods {
        fn resolve(&self, _receiver: &Type, _name: &str) -> Option<MethodResolution> {
            None
        }
    }

    struct NoIterators;
    impl IteratorProtocolLookup for NoIterators {
        fn resolve(&self, _iterable: &Type) -> Option<(Type, IteratorProtocol)> {
            None
        }
    }

    struct NoTypeNames;
    impl glyphc_typedefs::parser::TypeNameLookup for NoTypeNames {
        fn resolve(&self, _namespace: Option<&str>, _name: &str) -> Option<glyphc_typedefs::parser::ResolvedTypeName> {
            None
        }
        fn own_generic_parameter_count(&self, _owner: TypeDefRef) -> u32 {
            0
        }
        fn generic_constraint(&self, _owner: TypeDefRef, _index: u32) -> Option<Type> {
            None
        }
    }

    fn resolvers() -> Resolvers<'static> {
        Resolvers {
            methods: &NoMethods,
            iterators: &NoIterators,
            type_names: &NoTypeNames,
            options: crate::options::AnalyzerOptions::default(),
        }
    }

    fn primitives() -> PrimitiveTypes {
        PrimitiveTypes {
            boolean: ValueTypeId(1),
            integer: ValueTypeId(2),
            double: ValueTypeId(3),
            symbol: ValueTypeId(4),
            string_class: ClassId(0),
            list_class: ClassId(1),
        }
    }

    struct VecStream {
        tokens: Vec<Token>,
        index: usize,
    }
    impl TokenStream for VecStream {
        fn peek(&self) -> Option<&Token> {
            self.tokens.get(self.index)
        }
        fn advance(&mut self) -> Option<Token> {
            let t = self.tokens.get(self.index).cloned();
            if t.is_some() {
                self.index += 1;
            }
            t
        }
        fn current_position(&self) -> SourcePosition {
            SourcePosition::new("t.emoji", 1, 1)
        }
    }

    fn function() -> glyphc_typedefs::Function {
        glyphc_typedefs::Function::new(
            "f",
            glyphc_types::AccessLevel::Public,
            vec![],
            Type::nothingness(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            glyphc_typedefs::FunctionKind::Function,
        )
    }

    fn tok(kind: TokenType) -> Token {
        Token::new(kind, SourcePosition::new("t", 1, 1))
    }

    #[test]
    fn plain_conditional_with_no_else_leaves_facts_only_potential() {
        let mut stream = VecStream {
            tokens: vec![
                tok(TokenType::BooleanTrue),
                tok(TokenType::Identifier(BLOCK_OPEN.to_string())),
                tok(TokenType::Identifier(DECLARE_MUTABLE.to_string())),
                tok(TokenType::Variable("x".to_string())),
                tok(TokenType::BooleanTrue),
                tok(TokenType::Identifier(BLOCK_CLOSE.to_string())),
            ],
            index: 0,
        };
        let f = function();
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        analyze_conditional(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers()).unwrap();
        assert!(ctx.scopes.lookup("x").is_none());
    }

    #[test]
    fn while_loop_wraps_body_in_a_repeat_while_instruction() {
        let mut stream = VecStream {
            tokens: vec![
                tok(TokenType::BooleanTrue),
                tok(TokenType::Identifier(BLOCK_OPEN.to_string())),
                tok(TokenType::BooleanTrue),
                tok(TokenType::Identifier(BLOCK_CLOSE.to_string())),
            ],
            index: 0,
        };
        let f = function();
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        analyze_while(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers()).unwrap();
        assert_eq!(ctx.writer.words()[0], Opcode::RepeatWhile as u32);
    }

    #[test]
    fn for_in_list_declares_the_loop_variable_in_its_own_scope() {
        let mut stream = VecStream {
            tokens: vec![tok(TokenType::Identifier(BLOCK_OPEN.to_string())), tok(TokenType::BooleanTrue), tok(TokenType::Identifier(BLOCK_CLOSE.to_string()))],
            index: 0,
        };
        let f = function();
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        analyze_for_in_list(
            &mut stream,
            &mut ctx,
            primitives(),
            &NoInheritance,
            &FixedSize(1),
            &resolvers(),
            "item".to_string(),
            SourcePosition::new("t.emoji", 1, 1),
            boolean_type(primitives()),
        )
        .unwrap();
        assert!(ctx.scopes.lookup("item").is_none());
    }
}
