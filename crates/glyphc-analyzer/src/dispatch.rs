//! Expression dispatch: the leading token of an expression selects
//! one of a fixed set of forms. Literal forms with their own `TokenType`
//! (booleans, integers, doubles, strings, symbols) are matched directly;
//! everything else is an `Identifier` naming one of the emoji forms below,
//! with any name that isn't one of the reserved keyword forms falling to
//! the default branch: a method call against a parsed receiver.

use glyphc_common::{CompilerError, Token, TokenStream, TokenType};
use glyphc_scopes::{Incident, VariableOrigin};
use glyphc_types::compatibility::{compatible_to, InheritanceLookup};
use glyphc_types::storage::{classify, SizeOf};
use glyphc_types::{ClassId, Type, TypeKind, ValueTypeId};

use crate::boxing_bridge::{bridge, BridgeStep};
use crate::calls::{analyze_call, class_is_subtype, CallSite};
use crate::context::AnalyzerContext;
use crate::control_flow;
use crate::expectation::TypeExpectation;
use crate::resolution::Resolvers;
use crate::writer::Opcode;

pub const DECLARE_MUTABLE: &str = "🍮";
pub const DECLARE_CONSTANT: &str = "🍦";
pub const ASSIGN: &str = "🍪";
pub const IDENTITY_CHECK: &str = "🙌";
pub const FORCE_UNWRAP: &str = "❗";
pub const ERROR_EXTRACT: &str = "🚧";
pub const RETURN: &str = "🍎";

/// Builtin operator names: on a primitive receiver these compile directly
/// to arithmetic/logical instructions rather than going through the
/// general method-call dispatch.
pub const ADD: &str = "➕";
pub const SUBTRACT: &str = "➖";
pub const MULTIPLY: &str = "✖️";
pub const DIVIDE: &str = "➗";
pub const REMAINDER: &str = "🧮";
pub const LOGICAL_AND: &str = "🤝";
pub const LOGICAL_OR: &str = "🔀";
pub const LOGICAL_NOT: &str = "🙅";

/// The value-type identities the standard package bootstraps with fixed
/// box ids; literal forms need these to type themselves without the
/// analyzer depending on `glyphc-typedefs`'s arena directly. `list_class`
/// is the built-in generic list the for-in form recognizes without going
/// through the iterator protocol.
#[derive(Clone, Copy, Debug)]
pub struct PrimitiveTypes {
    pub boolean: ValueTypeId,
    pub integer: ValueTypeId,
    pub double: ValueTypeId,
    pub symbol: ValueTypeId,
    pub string_class: ClassId,
    pub list_class: ClassId,
}

fn boolean_type(primitives: PrimitiveTypes) -> Type {
    Type::new(glyphc_types::TypeKind::ValueType(primitives.boolean, vec![]), glyphc_types::TypeFlags::empty())
}

fn integer_type(primitives: PrimitiveTypes) -> Type {
    Type::new(glyphc_types::TypeKind::ValueType(primitives.integer, vec![]), glyphc_types::TypeFlags::empty())
}

fn double_type(primitives: PrimitiveTypes) -> Type {
    Type::new(glyphc_types::TypeKind::ValueType(primitives.double, vec![]), glyphc_types::TypeFlags::empty())
}

fn symbol_type(primitives: PrimitiveTypes) -> Type {
    Type::new(glyphc_types::TypeKind::ValueType(primitives.symbol, vec![]), glyphc_types::TypeFlags::empty())
}

fn string_type(primitives: PrimitiveTypes) -> Type {
    Type::new(glyphc_types::TypeKind::Class(primitives.string_class, vec![]), glyphc_types::TypeFlags::empty())
}

/// Parses and types one expression, applying the boxing bridge against
/// `expectation` once a raw result type is known. `lookup` backs
/// compatibility checks (assignment, casts); `sizes` backs storage
/// classification for the bridge.
pub fn analyze_expression(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    expectation: &TypeExpectation,
) -> Result<Type, CompilerError> {
    let position = stream.current_position();
    let token = stream.advance().ok_or_else(|| CompilerError::Internal {
        position: position.clone(),
        message: "unexpected end of token stream while parsing an expression".to_string(),
    })?;

    let raw = match &token.kind {
        TokenType::BooleanTrue => {
            ctx.writer.write_instruction(Opcode::GetTrue);
            boolean_type(primitives)
        }
        TokenType::BooleanFalse => {
            ctx.writer.write_instruction(Opcode::GetFalse);
            boolean_type(primitives)
        }
        TokenType::Integer(value) => {
            if i32::try_from(*value).is_ok() {
                ctx.writer.write_instruction(Opcode::Get32Integer);
                ctx.writer.write_word(*value as u32);
            } else {
                ctx.writer.write_instruction(Opcode::Get64Integer);
                ctx.writer.write_word((*value >> 32) as u32);
                ctx.writer.write_word(*value as u32);
            }
            integer_type(primitives)
        }
        TokenType::Double(value) => {
            ctx.writer.write_instruction(Opcode::GetDouble);
            ctx.writer.write_double_coin(*value);
            double_type(primitives)
        }
        TokenType::Symbol(codepoint) => {
            ctx.writer.write_instruction(Opcode::GetSymbol);
            ctx.writer.write_word(*codepoint as u32);
            symbol_type(primitives)
        }
        TokenType::String(text) => {
            let index = ctx.string_pool.pool(text);
            ctx.writer.write_instruction(Opcode::GetStringPool);
            ctx.writer.write_word(index);
            string_type(primitives)
        }
        TokenType::Variable(name) => analyze_variable_reference(ctx, name, &position)?,
        TokenType::Identifier(name) if name == DECLARE_MUTABLE || name == DECLARE_CONSTANT => {
            let mutable = name == DECLARE_MUTABLE;
            analyze_declaration(stream, ctx, primitives, lookup, sizes, resolvers, mutable, &position)?
        }
        TokenType::Identifier(name) if name == ASSIGN => analyze_assignment(stream, ctx, primitives, lookup, sizes, resolvers, &position)?,
        TokenType::Identifier(name) if name == IDENTITY_CHECK => {
            analyze_identity_check(stream, ctx, primitives, lookup, sizes, resolvers, &position)?
        }
        TokenType::Identifier(name) if name == FORCE_UNWRAP => {
            analyze_force_unwrap(stream, ctx, primitives, lookup, sizes, resolvers, &position)?
        }
        TokenType::Identifier(name) if name == ERROR_EXTRACT => {
            analyze_error_extract(stream, ctx, primitives, lookup, sizes, resolvers, &position)?
        }
        TokenType::Identifier(name) if name == RETURN => analyze_return(stream, ctx, primitives, lookup, sizes, resolvers, &position)?,
        TokenType::Identifier(name) if name == control_flow::IF => {
            control_flow::analyze_conditional(stream, ctx, primitives, lookup, sizes, resolvers)?
        }
        TokenType::Identifier(name) if name == control_flow::WHILE => {
            control_flow::analyze_while(stream, ctx, primitives, lookup, sizes, resolvers)?
        }
        TokenType::Identifier(name) if name == control_flow::REPEAT_WHILE => {
            control_flow::analyze_repeat_while(stream, ctx, primitives, lookup, sizes, resolvers)?
        }
        TokenType::Identifier(name) if name == control_flow::FOR_IN => analyze_for_in(stream, ctx, primitives, lookup, sizes, resolvers, &position)?,
        TokenType::Identifier(name) => analyze_method_call(stream, ctx, primitives, lookup, sizes, resolvers, name, &position)?,
        _ => {
            return Err(CompilerError::Internal {
                position,
                message: format!("unrecognized expression form: {token:?}"),
            })
        }
    };

    apply_expectation(ctx, raw, expectation, sizes, &position)
}

/// `🔃 loopVariable iterableExpr block`: parses the loop variable and the
/// iterable once, then picks `analyze_for_in_list` when the iterable is the
/// built-in list or `analyze_foreach` when it resolves an iterator
/// protocol; rejects anything else, matching the "neither list nor
/// protocol-enumerable" boundary case.
fn analyze_for_in(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let loop_name = expect_variable_name(stream, position)?;
    let iterable_position = stream.current_position();
    let iterable = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;

    if let TypeKind::Class(class, arguments) = &iterable.kind {
        if *class == primitives.list_class {
            let element_type = arguments.first().cloned().unwrap_or_else(Type::something);
            return control_flow::analyze_for_in_list(stream, ctx, primitives, lookup, sizes, resolvers, loop_name, position.clone(), element_type);
        }
    }
    if let Some((element_type, protocol)) = resolvers.iterators.resolve(&iterable) {
        return control_flow::analyze_foreach(stream, ctx, primitives, lookup, sizes, resolvers, loop_name, position.clone(), element_type, protocol);
    }
    Err(CompilerError::BadCast {
        position: iterable_position,
        from: format!("{iterable:?}"),
        to: "a for-in iterable (the built-in list or a protocol-enumerable type)".to_string(),
    })
}

/// The method-call default branch: `name` is the method being called,
/// followed by its receiver then its arguments. On a primitive receiver a
/// builtin operator name compiles directly to an arithmetic/logical
/// instruction; otherwise the name is resolved against the receiver's type
/// and run through the general call protocol, rejecting a mutating call on
/// an immutable value-type receiver along the way.
fn analyze_method_call(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    name: &str,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let receiver_is_immutable_binding = match stream.peek() {
        Some(Token {
            kind: TokenType::Variable(receiver_name),
            ..
        }) => ctx.scopes.lookup(receiver_name).is_some_and(|(var, _)| !var.mutable),
        _ => false,
    };
    let receiver = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;

    if let Some(opcode) = builtin_operator_opcode(name, &receiver, primitives) {
        if is_unary_operator(name) {
            ctx.writer.write_instruction(opcode);
            return Ok(receiver);
        }
        let _rhs = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::of(receiver.clone()))?;
        ctx.writer.write_instruction(opcode);
        return Ok(receiver);
    }

    let resolution = resolvers.methods.resolve(&receiver, name).ok_or_else(|| CompilerError::MethodNotFound {
        position: position.clone(),
        receiver: format!("{receiver:?}"),
        name: name.to_string(),
    })?;

    if resolution.function.is_mutating && receiver_is_immutable_binding && matches!(receiver.kind, TypeKind::ValueType(..)) {
        return Err(CompilerError::MutationOfImmutableReceiver { position: position.clone() });
    }

    let site = CallSite {
        callee: &resolution.function,
        callee_id: resolution.callee_id,
        dispatch: resolution.dispatch,
        slot: resolution.slot,
        caller_owner: ctx.function.owner,
        receiver_arguments: resolution.receiver_arguments,
    };
    analyze_call(
        stream,
        ctx,
        primitives,
        lookup,
        sizes,
        resolvers,
        &site,
        class_is_subtype(lookup),
        position,
    )
}

fn is_unary_operator(name: &str) -> bool {
    name == LOGICAL_NOT
}

/// Maps a builtin operator name and its receiver's primitive kind to the
/// instruction it compiles to, or `None` if the receiver isn't a primitive
/// this operator applies to — falling through to the general method call.
fn builtin_operator_opcode(name: &str, receiver: &Type, primitives: PrimitiveTypes) -> Option<Opcode> {
    let TypeKind::ValueType(id, _) = &receiver.kind else {
        return None;
    };
    if *id == primitives.integer || *id == primitives.double {
        return match name {
            ADD => Some(Opcode::IntegerAdd),
            SUBTRACT => Some(Opcode::IntegerSubtract),
            MULTIPLY => Some(Opcode::IntegerMultiply),
            DIVIDE => Some(Opcode::IntegerDivide),
            REMAINDER => Some(Opcode::IntegerRemainder),
            _ => None,
        };
    }
    if *id == primitives.boolean {
        return match name {
            LOGICAL_AND => Some(Opcode::BooleanAnd),
            LOGICAL_OR => Some(Opcode::BooleanOr),
            LOGICAL_NOT => Some(Opcode::BooleanInvert),
            _ => None,
        };
    }
    None
}

fn analyze_variable_reference(ctx: &mut AnalyzerContext, name: &str, position: &glyphc_common::SourcePosition) -> Result<Type, CompilerError> {
    let (declared_type, origin) = {
        let (var, origin) = ctx
            .scopes
            .lookup(name)
            .ok_or_else(|| CompilerError::VariableNotFound {
            position: position.clone(),
            name: name.to_string(),
        })?;
        (var.declared_type.clone(), origin)
    };
    if matches!(origin, VariableOrigin::Instance) {
        ctx.mark_self_used(position)?;
    }
    Ok(declared_type)
}

fn analyze_declaration(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    mutable: bool,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let name = expect_variable_name(stream, position)?;
    let value = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    let id = ctx.scopes.declare(name.clone(), value.clone(), position.clone(), mutable)?;
    ctx.path.record_incident(Incident::VariableInitialized(id));
    Ok(Type::nothingness())
}

fn analyze_assignment(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let name = expect_variable_name(stream, position)?;
    let (declared_type, origin) = {
        let (var, origin) = ctx.scopes.lookup(&name).ok_or_else(|| CompilerError::VariableNotFound {
            position: position.clone(),
            name: name.clone(),
        })?;
        (var.declared_type.clone(), origin)
    };
    // Assigning a value type's own instance variable from one of its
    // methods requires that method to be marked `mutating`; an initializer
    // sets up its instance variables unconditionally, and classes allow
    // mutation from any method.
    if matches!(origin, VariableOrigin::Instance)
        && matches!(ctx.function.owner, Some(glyphc_types::TypeDefRef::ValueType(_)))
        && !ctx.function.is_mutating
        && !ctx.is_initializer()
    {
        return Err(CompilerError::MissingMutatingMarker { position: position.clone() });
    }
    let expectation = TypeExpectation::of(declared_type.clone());
    let value = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &expectation)?;
    if !compatible_to(&value, &declared_type, &ctx.type_context, lookup, None) {
        return Err(CompilerError::IncompatibleAssignment {
            position: position.clone(),
            expected: format!("{declared_type:?}"),
            found: format!("{value:?}"),
        });
    }
    let (is_mutable, id) = {
        let var = ctx.scopes.lookup_mut(&name).expect("looked up above");
        var.mark_mutated();
        (var.mutable, var.id)
    };
    if !is_mutable {
        return Err(CompilerError::MutationOfConstant {
            position: position.clone(),
            name,
        });
    }
    ctx.scopes.mark_initialized(&name, true);
    ctx.path.record_incident(Incident::VariableInitialized(id));
    Ok(Type::nothingness())
}

fn analyze_identity_check(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let lhs = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    let _rhs = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::of(lhs))?;
    ctx.writer.write_instruction(Opcode::EqualPrimitive);
    Ok(boolean_type(primitives))
}

fn analyze_force_unwrap(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let inner = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    if !inner.is_optional() {
        return Err(CompilerError::BadCast {
            position: position.clone(),
            from: format!("{inner:?}"),
            to: "a non-optional force-unwrap".to_string(),
        });
    }
    let storage = classify(&inner, sizes);
    ctx.writer.write_instruction(match storage {
        glyphc_types::StorageType::Box => Opcode::UnwrapBoxOptional,
        _ => Opcode::UnwrapSimpleOptional,
    });
    Ok(inner.unwrapped())
}

fn analyze_error_extract(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let inner = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    if !inner.is_error_type() {
        return Err(CompilerError::BadCast {
            position: position.clone(),
            from: format!("{inner:?}"),
            to: "an error-extract target".to_string(),
        });
    }
    ctx.writer.write_instruction(Opcode::Error);
    Ok(inner.success_type())
}

/// `🍎`: parses the returned expression against the function's declared
/// return type, writes the instruction, and marks path-sensitive state so
/// the compile-time initialization-discipline check can see that
/// this path certainly returned.
fn analyze_return(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let declared_return = ctx.function.return_type.clone();
    let resolved_return = ctx.resolve(&declared_return);
    let expectation = TypeExpectation::of(resolved_return.clone());
    let value = analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &expectation)?;
    if !compatible_to(&value, &resolved_return, &ctx.type_context, lookup, None) {
        return Err(CompilerError::IncompatibleAssignment {
            position: position.clone(),
            expected: format!("{resolved_return:?}"),
            found: format!("{value:?}"),
        });
    }
    ctx.writer.write_instruction(Opcode::Return);
    ctx.mark_returned();
    Ok(Type::nothingness())
}

fn expect_variable_name(stream: &mut dyn TokenStream, position: &glyphc_common::SourcePosition) -> Result<String, CompilerError> {
    match stream.advance() {
        Some(Token {
            kind: TokenType::Variable(name),
            ..
        }) => Ok(name),
        _ => Err(CompilerError::Internal {
            position: position.clone(),
            message: "expected a variable name".to_string(),
        }),
    }
}

/// Applies the boxing bridge between what an expression actually produced
/// and what its caller expects.
fn apply_expectation(
    ctx: &mut AnalyzerContext,
    raw: Type,
    expectation: &TypeExpectation,
    sizes: &dyn SizeOf,
    position: &glyphc_common::SourcePosition,
) -> Result<Type, CompilerError> {
    let Some(desired) = &expectation.desired else {
        return Ok(raw);
    };
    let from = classify(&raw, sizes);
    let to = classify(desired, sizes);
    let size = sizes.size_in_words(&raw);
    let steps = bridge(from, to, raw.flags.is_reference(), expectation.wants_reference, size, position)?;
    for step in steps {
        ctx.writer.write_instruction(match step {
            BridgeStep::Unbox => Opcode::Unbox,
            BridgeStep::Box | BridgeStep::SimpleToBox => Opcode::SimpleOptionalToBox,
            BridgeStep::BoxToSimpleOptional => Opcode::BoxToSimpleOptional,
            BridgeStep::ReferenceTake | BridgeStep::ReferenceCopy => Opcode::CopySingle,
        });
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphc_common::SourcePosition;
    use glyphc_types::substitution::ConstraintLookup;
    use glyphc_types::{TypeContext, TypeDefRef};

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
    impl crate::resolution::MethodLookup for NoMethods {
        fn resolve(&self, _receiver: &Type, _name: &str) -> Option<crate::resolution::MethodResolution> {
            None
        }
    }

    struct NoIterators;
    impl crate::resolution::IteratorProtocolLookup for NoIterators {
        fn resolve(&self, _iterable: &Type) -> Option<(Type, control_flow::IteratorProtocol)> {
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

    #[test]
    fn boolean_literal_types_as_boolean() {
        let mut stream = VecStream {
            tokens: vec![Token::new(TokenType::BooleanTrue, SourcePosition::new("t", 1, 1))],
            index: 0,
        };
        let f = function();
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        let ty = analyze_expression(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers(), &TypeExpectation::none()).unwrap();
        assert_eq!(ty, boolean_type(primitives()));
    }

    #[test]
    fn declaring_then_reading_a_variable_round_trips_its_type() {
        let mut stream = VecStream {
            tokens: vec![
                Token::new(TokenType::Identifier(DECLARE_MUTABLE.to_string()), SourcePosition::new("t", 1, 1)),
                Token::new(TokenType::Variable("x".to_string()), SourcePosition::new("t", 1, 1)),
                Token::new(TokenType::BooleanTrue, SourcePosition::new("t", 1, 1)),
            ],
            index: 0,
        };
        let f = function();
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        let ty = analyze_expression(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers(), &TypeExpectation::none()).unwrap();
        assert_eq!(ty, Type::nothingness());
        assert_eq!(ctx.scopes.lookup("x").unwrap().0.declared_type, boolean_type(primitives()));
    }

    #[test]
    fn force_unwrap_of_a_non_optional_is_a_bad_cast() {
        let mut stream = VecStream {
            tokens: vec![
                Token::new(TokenType::Identifier(FORCE_UNWRAP.to_string()), SourcePosition::new("t", 1, 1)),
                Token::new(TokenType::BooleanTrue, SourcePosition::new("t", 1, 1)),
            ],
            index: 0,
        };
        let f = function();
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        let err = analyze_expression(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers(), &TypeExpectation::none());
        assert!(matches!(err, Err(CompilerError::BadCast { .. })));
    }

    #[test]
    fn returning_a_compatible_value_marks_the_context_as_certainly_returned() {
        let f = glyphc_typedefs::Function::new(
            "f",
            glyphc_types::AccessLevel::Public,
            vec![],
            Type::something(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            glyphc_typedefs::FunctionKind::Function,
        );
        let mut stream = VecStream {
            tokens: vec![
                Token::new(TokenType::Identifier(RETURN.to_string()), SourcePosition::new("t", 1, 1)),
                Token::new(TokenType::BooleanTrue, SourcePosition::new("t", 1, 1)),
            ],
            index: 0,
        };
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        analyze_expression(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers(), &TypeExpectation::none()).unwrap();
        assert!(ctx.status.returned);
        assert_eq!(*ctx.writer.words().last().unwrap(), Opcode::Return as u32);
    }

    #[test]
    fn returning_an_incompatible_value_is_an_incompatible_assignment() {
        let f = function();
        let mut stream = VecStream {
            tokens: vec![
                Token::new(TokenType::Identifier(RETURN.to_string()), SourcePosition::new("t", 1, 1)),
                Token::new(TokenType::BooleanTrue, SourcePosition::new("t", 1, 1)),
            ],
            index: 0,
        };
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        let err = analyze_expression(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers(), &TypeExpectation::none());
        assert!(matches!(err, Err(CompilerError::IncompatibleAssignment { .. })));
    }

    fn value_type_method(is_mutating: bool) -> glyphc_typedefs::Function {
        let mut f = glyphc_typedefs::Function::new(
            "f",
            glyphc_types::AccessLevel::Public,
            vec![],
            Type::nothingness(),
            Some(TypeDefRef::ValueType(glyphc_types::ValueTypeId(9))),
            SourcePosition::new("t.emoji", 1, 1),
            glyphc_typedefs::FunctionKind::ValueTypeMethod,
        );
        f.is_mutating = is_mutating;
        f
    }

    fn assign_v_to_true() -> Vec<Token> {
        vec![
            Token::new(TokenType::Identifier(ASSIGN.to_string()), SourcePosition::new("t", 1, 1)),
            Token::new(TokenType::Variable("v".to_string()), SourcePosition::new("t", 1, 1)),
            Token::new(TokenType::BooleanTrue, SourcePosition::new("t", 1, 1)),
        ]
    }

    #[test]
    fn assigning_an_instance_variable_from_a_non_mutating_value_type_method_is_an_error() {
        let f = value_type_method(false);
        let mut stream = VecStream {
            tokens: assign_v_to_true(),
            index: 0,
        };
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        ctx.scopes
            .populate_instance_scope(vec![(glyphc_scopes::VariableId(0), "v".to_string(), Type::something(), SourcePosition::new("t.emoji", 1, 1))]);
        let err = analyze_expression(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers(), &TypeExpectation::none());
        assert!(matches!(err, Err(CompilerError::MissingMutatingMarker { .. })));
    }

    #[test]
    fn assigning_an_instance_variable_from_a_mutating_value_type_method_is_fine() {
        let f = value_type_method(true);
        let mut stream = VecStream {
            tokens: assign_v_to_true(),
            index: 0,
        };
        let mut reporter = crate::reporter::Reporter::new();
        let mut pool = crate::writer::StringPool::new();
        let mut ctx = AnalyzerContext::new(&f, TypeContext::empty(), &mut reporter, &mut pool);
        ctx.scopes
            .populate_instance_scope(vec![(glyphc_scopes::VariableId(0), "v".to_string(), Type::something(), SourcePosition::new("t.emoji", 1, 1))]);
        analyze_expression(&mut stream, &mut ctx, primitives(), &NoInheritance, &FixedSize(1), &resolvers(), &TypeExpectation::none()).unwrap();
    }
}
