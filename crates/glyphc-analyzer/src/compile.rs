//! The top-level recovery boundary: one function body is analyzed
//! start to finish, and a `CompilerError` raised anywhere inside it is
//! caught here, reported, and treated as "this function compiled to
//! nothing" rather than aborting the whole run — unless the error is
//! `Internal`, which is the one variant fatal to the entire compile.
//!
//! A package's pending-function queue is drained in declaration order,
//! each function wrapped by this same boundary, mirroring "the code
//! generator drains the pending-functions queue in the same thread in
//! which the analyser produced them."

use glyphc_common::{CompilerError, SourcePosition, TokenStream};
use glyphc_scopes::{Incident, VariableId};
use glyphc_types::compatibility::InheritanceLookup;
use glyphc_types::storage::SizeOf;
use glyphc_types::{Type, TypeContext};
use glyphc_typedefs::parser::TypeNameLookup;
use glyphc_typedefs::Function;

use crate::context::AnalyzerContext;
use crate::control_flow::{BLOCK_CLOSE, BLOCK_OPEN};
use crate::dispatch::{analyze_expression, PrimitiveTypes};
use crate::expectation::TypeExpectation;
use crate::options::AnalyzerOptions;
use crate::reporter::Reporter;
use crate::resolution::{IteratorProtocolLookup, MethodLookup, Resolvers};
use crate::writer::{StringPool, Writer};

/// A function still waiting for its body to be analyzed: the signature
/// itself, the type context its body should resolve symbolic types
/// against, and whether it must certainly call its superclass initializer
/// before using `self` (true for any object initializer whose owner has a
/// non-final superclass; the package loader that would know this is out of
/// scope, so callers supply it directly).
pub struct PendingFunction<'a> {
    pub function: &'a Function,
    pub type_context: TypeContext,
    pub requires_super_call: bool,
    /// The owning type definition's instance variables, already finalized
    /// and id-assigned, loaded into the body's instance scope before
    /// parsing starts. Empty for anything that isn't a method or
    /// initializer on a class/value type (e.g. a free function).
    pub instance_variables: Vec<(VariableId, String, Type, SourcePosition)>,
}

/// What compiling one function produced: its instruction stream on
/// success, or `None` if analysis failed partway and was abandoned.
/// Either way, diagnostics accumulate on the shared `Reporter`.
pub struct CompiledFunction {
    pub writer: Option<Writer>,
}

/// Runs the full-body analysis for one function: parses a top-level
/// `🍇... 🍉` block of statements, then checks the initialization
/// discipline appropriate to its kind. Any `CompilerError` raised
/// while parsing the body itself is reported and turns the whole function
/// into `None`; a fatal (`Internal`) error is propagated instead of
/// swallowed, since that one variant means the compiler's own invariants
/// broke, not the user's program.
pub fn compile_function(
    stream: &mut dyn TokenStream,
    pending: &PendingFunction,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    methods: &dyn MethodLookup,
    iterators: &dyn IteratorProtocolLookup,
    type_lookup: &dyn TypeNameLookup,
    options: AnalyzerOptions,
    reporter: &mut Reporter,
    string_pool: &mut StringPool,
) -> Result<CompiledFunction, CompilerError> {
    if let Err(capacity) = glyphc_common::CapacityError::check("parameters", pending.function.parameters.len(), options.max_parameters) {
        return Err(CompilerError::CapacityExceeded {
            position: pending.function.declared_at.clone(),
            what: capacity.what.to_string(),
            count: capacity.count,
            limit: capacity.limit,
        });
    }

    let mut ctx = AnalyzerContext::new(pending.function, pending.type_context.clone(), reporter, string_pool);
    ctx.dynamism = options.top_level_dynamism;
    ctx.requires_super_call = pending.requires_super_call;
    ctx.scopes.populate_instance_scope(pending.instance_variables.iter().cloned());

    let resolvers = Resolvers {
        methods,
        iterators,
        type_names: type_lookup,
        options,
    };

    match analyze_body(stream, &mut ctx, primitives, lookup, sizes, &resolvers) {
        Ok(()) => {
            check_initialization_discipline(&mut ctx, pending.requires_super_call);
            Ok(CompiledFunction { writer: Some(ctx.writer) })
        }
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => {
            ctx.reporter.report(error);
            Ok(CompiledFunction { writer: None })
        }
    }
}

fn analyze_body(
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
            message: "expected a function body".to_string(),
        });
    }
    while !stream.consume_token_if(BLOCK_CLOSE) {
        if stream.peek().is_none() {
            return Err(CompilerError::Internal {
                position: stream.current_position(),
                message: "unterminated function body".to_string(),
            });
        }
        if ctx.status.returned {
            let dead_code_position = stream.current_position();
            if resolvers.options.dead_code_after_return_is_error {
                return Err(CompilerError::DeadCodeAfterReturn { position: dead_code_position });
            }
            ctx.reporter.warning(dead_code_position, "unreachable code after a certain return");
        }
        analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &TypeExpectation::none())?;
    }
    Ok(())
}

/// "Initialization discipline": a non-initializer with a
/// non-nothingness return type must certainly return; an initializer that
/// needs a super call must certainly have made one, and every non-optional
/// instance variable must be certainly initialized on every branch.
fn check_initialization_discipline(ctx: &mut AnalyzerContext, requires_super_call: bool) {
    let position = ctx.function.declared_at.clone();
    if ctx.is_initializer() {
        if requires_super_call && !ctx.path.has_certainly(Incident::SuperInitializerCalled) {
            ctx.reporter.report(CompilerError::MissingSuperInitializerCall { position: position.clone() });
        }
        let uninitialized: Vec<String> = ctx
            .scopes
            .instance_variables()
            .filter(|var| !var.declared_type.is_optional() && !ctx.path.has_certainly(Incident::VariableInitialized(var.id)))
            .map(|var| var.name.clone())
            .collect();
        for name in uninitialized {
            ctx.reporter.report(CompilerError::InstanceVariableNotInitialized {
                position: position.clone(),
                name,
            });
        }
    } else if !matches!(ctx.function.return_type.kind, glyphc_types::TypeKind::Nothingness) && !ctx.status.returned {
        ctx.reporter.report(CompilerError::MissingExplicitReturn { position });
    }
}

/// Drains `pending` in order, compiling each function through
/// `compile_function` and continuing past any non-fatal failure — one
/// malformed function never aborts the whole compile. `streams`
/// supplies one token stream per pending function, indexed the same way.
pub fn drain_pending_functions<'a>(
    pending: &[PendingFunction<'a>],
    streams: &mut [&mut dyn TokenStream],
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    methods: &dyn MethodLookup,
    iterators: &dyn IteratorProtocolLookup,
    type_lookup: &dyn TypeNameLookup,
    options: AnalyzerOptions,
    reporter: &mut Reporter,
    string_pool: &mut StringPool,
) -> Result<Vec<CompiledFunction>, CompilerError> {
    let mut compiled = Vec::with_capacity(pending.len());
    for (function, stream) in pending.iter().zip(streams.iter_mut()) {
        compiled.push(compile_function(
            *stream, function, primitives, lookup, sizes, methods, iterators, type_lookup, options, reporter, string_pool,
        )?);
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphc_common::{SourcePosition, Token, TokenType};
    use glyphc_types::substitution::ConstraintLookup;
    use glyphc_types::{AccessLevel, ClassId, TypeDefRef, ValueTypeId};
    use glyphc_typedefs::FunctionKind;

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
        fn resolve(&self, _iterable: &Type) -> Option<(Type, crate::control_flow::IteratorProtocol)> {
            None
        }
    }

    struct NoTypeNames;
    impl TypeNameLookup for NoTypeNames {
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

    fn tok(kind: TokenType) -> Token {
        Token::new(kind, SourcePosition::new("t", 1, 1))
    }

    #[test]
    fn a_nothingness_function_with_no_return_compiles_clean() {
        let f = Function::new(
            "f",
            AccessLevel::Public,
            vec![],
            Type::nothingness(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            FunctionKind::Function,
        );
        let pending = PendingFunction {
            function: &f,
            type_context: TypeContext::empty(),
            requires_super_call: false,
            instance_variables: vec![],
        };
        let mut stream = VecStream {
            tokens: vec![
                tok(TokenType::Identifier(BLOCK_OPEN.to_string())),
                tok(TokenType::BooleanTrue),
                tok(TokenType::Identifier(BLOCK_CLOSE.to_string())),
            ],
            index: 0,
        };
        let mut reporter = Reporter::new();
        let mut pool = StringPool::new();
        let result = compile_function(&mut stream, &pending, primitives(), &NoInheritance, &FixedSize(1), &NoMethods, &NoIterators, &NoTypeNames, AnalyzerOptions::default(), &mut reporter, &mut pool).unwrap();
        assert!(result.writer.is_some());
        assert!(!reporter.had_error());
    }

    #[test]
    fn a_non_nothingness_function_that_never_returns_is_reported() {
        let f = Function::new(
            "f",
            AccessLevel::Public,
            vec![],
            Type::something(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            FunctionKind::Function,
        );
        let pending = PendingFunction {
            function: &f,
            type_context: TypeContext::empty(),
            requires_super_call: false,
            instance_variables: vec![],
        };
        let mut stream = VecStream {
            tokens: vec![
                tok(TokenType::Identifier(BLOCK_OPEN.to_string())),
                tok(TokenType::Identifier(BLOCK_CLOSE.to_string())),
            ],
            index: 0,
        };
        let mut reporter = Reporter::new();
        let mut pool = StringPool::new();
        compile_function(&mut stream, &pending, primitives(), &NoInheritance, &FixedSize(1), &NoMethods, &NoIterators, &NoTypeNames, AnalyzerOptions::default(), &mut reporter, &mut pool).unwrap();
        assert!(reporter.had_error());
    }

    #[test]
    fn a_malformed_function_body_is_recovered_from_rather_than_aborting() {
        let f = Function::new(
            "f",
            AccessLevel::Public,
            vec![],
            Type::nothingness(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            FunctionKind::Function,
        );
        let pending = PendingFunction {
            function: &f,
            type_context: TypeContext::empty(),
            requires_super_call: false,
            instance_variables: vec![],
        };
        // Missing the opening block marker entirely.
        let mut stream = VecStream { tokens: vec![], index: 0 };
        let mut reporter = Reporter::new();
        let mut pool = StringPool::new();
        let result = compile_function(&mut stream, &pending, primitives(), &NoInheritance, &FixedSize(1), &NoMethods, &NoIterators, &NoTypeNames, AnalyzerOptions::default(), &mut reporter, &mut pool);
        assert!(result.is_err(), "missing-body is an Internal error, propagated rather than swallowed");
    }

    #[test]
    fn a_function_declaring_too_many_parameters_is_rejected_before_its_body_is_touched() {
        let parameters = (0..3)
            .map(|i| glyphc_typedefs::Argument {
            name: format!("p{i}"),
            declared_type: Type::something(),
        })
            .collect();
        let f = Function::new(
            "f",
            AccessLevel::Public,
            parameters,
            Type::nothingness(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            FunctionKind::Function,
        );
        let pending = PendingFunction {
            function: &f,
            type_context: TypeContext::empty(),
            requires_super_call: false,
            instance_variables: vec![],
        };
        let mut stream = VecStream { tokens: vec![], index: 0 };
        let mut reporter = Reporter::new();
        let mut pool = StringPool::new();
        let options = AnalyzerOptions {
            max_parameters: 2,
            ..AnalyzerOptions::default()
        };
        let result = compile_function(&mut stream, &pending, primitives(), &NoInheritance, &FixedSize(1), &NoMethods, &NoIterators, &NoTypeNames, options, &mut reporter, &mut pool);
        assert!(matches!(result, Err(CompilerError::CapacityExceeded { .. })));
    }

    #[test]
    fn dead_code_after_return_is_only_a_warning_when_options_say_so() {
        let f = Function::new(
            "f",
            AccessLevel::Public,
            vec![],
            Type::something(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            FunctionKind::Function,
        );
        let pending = PendingFunction {
            function: &f,
            type_context: TypeContext::empty(),
            requires_super_call: false,
            instance_variables: vec![],
        };
        let mut stream = VecStream {
            tokens: vec![
                tok(TokenType::Identifier(BLOCK_OPEN.to_string())),
                tok(TokenType::Identifier(crate::dispatch::RETURN.to_string())),
                tok(TokenType::BooleanTrue),
                tok(TokenType::BooleanTrue),
                tok(TokenType::Identifier(BLOCK_CLOSE.to_string())),
            ],
            index: 0,
        };
        let mut reporter = Reporter::new();
        let mut pool = StringPool::new();
        let options = AnalyzerOptions {
            dead_code_after_return_is_error: false,
            ..AnalyzerOptions::default()
        };
        let result = compile_function(&mut stream, &pending, primitives(), &NoInheritance, &FixedSize(1), &NoMethods, &NoIterators, &NoTypeNames, options, &mut reporter, &mut pool).unwrap();
        assert!(result.writer.is_some());
        assert_eq!(reporter.warnings().count(), 1);
    }

    fn initializer_with_one_instance_variable() -> Function {
        Function::new(
            "🆕",
            AccessLevel::Public,
            vec![],
            Type::nothingness(),
            None,
            SourcePosition::new("t.emoji", 1, 1),
            FunctionKind::ObjectInitializer,
        )
    }

    #[test]
    fn an_initializer_that_never_assigns_a_non_optional_instance_variable_is_reported() {
        let f = initializer_with_one_instance_variable();
        let pending = PendingFunction {
            function: &f,
            type_context: TypeContext::empty(),
            requires_super_call: false,
            instance_variables: vec![(glyphc_scopes::VariableId(0), "v".to_string(), Type::something(), SourcePosition::new("t.emoji", 1, 1))],
        };
        let mut stream = VecStream {
            tokens: vec![
                tok(TokenType::Identifier(BLOCK_OPEN.to_string())),
                tok(TokenType::Identifier(BLOCK_CLOSE.to_string())),
            ],
            index: 0,
        };
        let mut reporter = Reporter::new();
        let mut pool = StringPool::new();
        let result = compile_function(&mut stream, &pending, primitives(), &NoInheritance, &FixedSize(1), &NoMethods, &NoIterators, &NoTypeNames, AnalyzerOptions::default(), &mut reporter, &mut pool).unwrap();
        assert!(result.writer.is_some());
        assert!(reporter.errors().any(|e| matches!(e, CompilerError::InstanceVariableNotInitialized { name, .. } if name == "v")));
    }

    #[test]
    fn an_initializer_that_assigns_every_instance_variable_compiles_clean() {
        let f = initializer_with_one_instance_variable();
        let pending = PendingFunction {
            function: &f,
            type_context: TypeContext::empty(),
            requires_super_call: false,
            instance_variables: vec![(glyphc_scopes::VariableId(0), "v".to_string(), Type::something(), SourcePosition::new("t.emoji", 1, 1))],
        };
        let mut stream = VecStream {
            tokens: vec![
                tok(TokenType::Identifier(BLOCK_OPEN.to_string())),
                tok(TokenType::Identifier(crate::dispatch::ASSIGN.to_string())),
                Token::new(TokenType::Variable("v".to_string()), SourcePosition::new("t", 1, 1)),
                tok(TokenType::BooleanTrue),
                tok(TokenType::Identifier(BLOCK_CLOSE.to_string())),
            ],
            index: 0,
        };
        let mut reporter = Reporter::new();
        let mut pool = StringPool::new();
        let result = compile_function(&mut stream, &pending, primitives(), &NoInheritance, &FixedSize(1), &NoMethods, &NoIterators, &NoTypeNames, AnalyzerOptions::default(), &mut reporter, &mut pool).unwrap();
        assert!(result.writer.is_some());
        assert!(!reporter.had_error());
    }
}
