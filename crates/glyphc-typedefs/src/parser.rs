//! The declarative type parser: turns a run of tokens into a
//! `Type`, consulting the active `TypeDynamism` to decide whether generic
//! variables or `Self` are currently legal.

use bitflags::bitflags;
use glyphc_common::{CompilerError, SourcePosition, Token, TokenStream, TokenType};
use glyphc_types::{ClassId, EnumId, FunctionId, ProtocolId, Type, TypeDefRef, TypeFlags, TypeKind, ValueTypeId};

use crate::markers::{
    CALLABLE_CLOSE, CALLABLE_OPEN, CALLABLE_RETURN_ARROW, EXPECTATION_MARKER, META_MARKER, NAMESPACE_SEPARATOR,
    OPTIONAL_MARKER, OWN_GENERIC_ARGUMENT_MARKER, SELF_MARKER,
};

bitflags! {
    /// Which symbolic forms a type name may legally take at the current
    /// parse position: a type definition's own signatures may reference its
    /// own generic parameters and `Self`; a fully concrete context (e.g. a
    /// free function's parameter list) permits neither.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TypeDynamism: u8 {
        const GENERIC_VARIABLES = 1 << 0;
        const SELF = 1 << 1;
    }
}

/// What a type name resolves to, as looked up by bare (and optionally
/// namespaced) identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedTypeName {
    Class(ClassId),
    ValueType(ValueTypeId),
    Enum(EnumId),
    Protocol(ProtocolId),
}

impl ResolvedTypeName {
    fn into_kind(self, arguments: Vec<Type>) -> TypeKind {
        match self {
            Self::Class(id) => TypeKind::Class(id, arguments),
            Self::ValueType(id) => TypeKind::ValueType(id, arguments),
            Self::Enum(id) => TypeKind::Enum(id),
            Self::Protocol(id) => TypeKind::Protocol(id, arguments),
        }
    }

    fn def_ref(self) -> Option<TypeDefRef> {
        match self {
            Self::Class(id) => Some(TypeDefRef::Class(id)),
            Self::ValueType(id) => Some(TypeDefRef::ValueType(id)),
            Self::Protocol(id) => Some(TypeDefRef::Protocol(id)),
            Self::Enum(_) => None,
        }
    }
}

/// What the parser needs from the type-definition arena: name resolution
/// and generic-constraint bounds-checking. `TypeDefinitionArena` implements
/// this against its own tables.
pub trait TypeNameLookup {
    fn resolve(&self, namespace: Option<&str>, name: &str) -> Option<ResolvedTypeName>;
    fn own_generic_parameter_count(&self, owner: TypeDefRef) -> u32;
    fn generic_constraint(&self, owner: TypeDefRef, index: u32) -> Option<Type>;
}

/// Which generic-parameter owner and which function, if any, `Self` and
/// bare generic-variable references resolve against at the current parse
/// position.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseContext {
    pub owner: Option<TypeDefRef>,
    pub function: Option<FunctionId>,
}

/// Parses one type form starting at the current token. `expectation` backs
/// the "●" inference marker; passing `None` makes that marker an error.
pub fn parse_type(
    stream: &mut dyn TokenStream,
    lookup: &dyn TypeNameLookup,
    dynamism: TypeDynamism,
    ctx: ParseContext,
    expectation: Option<&Type>,
) -> Result<Type, CompilerError> {
    let position = stream.current_position();

    let optional = consume_symbol(stream, OPTIONAL_MARKER);

    let mut ty = parse_type_base(stream, lookup, dynamism, ctx, expectation, &position)?;

    if consume_symbol(stream, META_MARKER) {
        ty.flags.insert(TypeFlags::META);
    }
    if optional {
        ty.flags = ty.flags.with_optional(true);
    }
    Ok(ty)
}

fn parse_type_base(
    stream: &mut dyn TokenStream,
    lookup: &dyn TypeNameLookup,
    dynamism: TypeDynamism,
    ctx: ParseContext,
    expectation: Option<&Type>,
    position: &SourcePosition,
) -> Result<Type, CompilerError> {
    if consume_symbol(stream, EXPECTATION_MARKER) {
        return expectation.cloned().ok_or_else(|| CompilerError::Internal {
            position: position.clone(),
            message: "type-expectation marker used with no expectation supplied".to_string(),
        });
    }

    if consume_symbol(stream, SELF_MARKER) {
        if !dynamism.contains(TypeDynamism::SELF) {
            return Err(CompilerError::AccessViolation {
                position: position.clone(),
                name: "self-type".to_string(),
            });
        }
        return Ok(Type::new(TypeKind::SelfType, TypeFlags::empty()));
    }

    if consume_symbol(stream, OWN_GENERIC_ARGUMENT_MARKER) {
        if !dynamism.contains(TypeDynamism::GENERIC_VARIABLES) {
            return Err(CompilerError::AccessViolation {
                position: position.clone(),
                name: "generic variable".to_string(),
            });
        }
        let index = expect_integer(stream, position)?;
        let owner = ctx.owner.ok_or_else(|| CompilerError::Internal {
            position: position.clone(),
            message: "own generic-argument reference parsed outside any type definition".to_string(),
        })?;
        return Ok(Type::new(
            TypeKind::GenericVariable { index, owner },
            TypeFlags::empty(),
        ));
    }

    if consume_symbol(stream, CALLABLE_OPEN) {
        return parse_callable(stream, lookup, dynamism, ctx, position);
    }

    parse_named_type(stream, lookup, dynamism, ctx, expectation, position)
}

fn parse_named_type(
    stream: &mut dyn TokenStream,
    lookup: &dyn TypeNameLookup,
    dynamism: TypeDynamism,
    ctx: ParseContext,
    expectation: Option<&Type>,
    position: &SourcePosition,
) -> Result<Type, CompilerError> {
    let first = expect_identifier(stream, position)?;

    let (namespace, name) = if consume_symbol(stream, NAMESPACE_SEPARATOR) {
        let name = expect_identifier(stream, position)?;
        (Some(first), name)
    } else {
        (None, first)
    };

    let resolved = lookup.resolve(namespace.as_deref(), &name).ok_or_else(|| CompilerError::UnknownType {
        position: position.clone(),
        name: namespace.map_or_else(|| name.clone(), |ns| format!("{ns}🔶{name}")),
    })?;

    let mut arguments = Vec::new();
    if stream.peek().is_some_and(|t| t.kind == TokenType::ArgumentBracketOpen) {
        stream.advance();
        loop {
            if stream.peek().is_some_and(|t| t.kind == TokenType::ArgumentBracketClose) {
                stream.advance();
                break;
            }
            arguments.push(parse_type(stream, lookup, dynamism, ctx, expectation)?);
        }
    }

    if let Some(owner) = resolved.def_ref() {
        let max = lookup.own_generic_parameter_count(owner);
        if arguments.len() as u32 > max {
            return Err(CompilerError::CapacityExceeded {
                position: position.clone(),
                what: "generic arguments".to_string(),
                count: arguments.len(),
                limit: max as usize,
            });
        }
        for (index, argument) in arguments.iter().enumerate() {
            if let Some(constraint) = lookup.generic_constraint(owner, index as u32) {
                if !structurally_fits(argument, &constraint) {
                    return Err(CompilerError::GenericConstraintViolation {
                        position: position.clone(),
                        index,
                    });
                }
            }
        }
    }

    Ok(Type::new(resolved.into_kind(arguments), TypeFlags::empty()))
}

/// A conservative pre-check that a generic argument could satisfy its
/// constraint; full compatibility (which needs the arena's inheritance
/// data) is re-checked by `glyphc-analyzer` once the argument list is
/// complete enough to build a `TypeContext`. Here we only reject the
/// trivially-wrong case of an optional argument against a non-optional
/// constraint.
fn structurally_fits(argument: &Type, constraint: &Type) -> bool {
    !argument.is_optional() || constraint.is_optional()
}

fn parse_callable(
    stream: &mut dyn TokenStream,
    lookup: &dyn TypeNameLookup,
    dynamism: TypeDynamism,
    ctx: ParseContext,
    position: &SourcePosition,
) -> Result<Type, CompilerError> {
    let mut argument_types = Vec::new();
    while !consume_symbol(stream, CALLABLE_CLOSE) {
        if consume_symbol(stream, CALLABLE_RETURN_ARROW) {
            let return_type = parse_type(stream, lookup, dynamism, ctx, None)?;
            expect_symbol(stream, CALLABLE_CLOSE, position)?;
            return Ok(Type::new(
                TypeKind::Callable {
                    return_type: Box::new(return_type),
                    argument_types,
                },
                TypeFlags::empty(),
            ));
        }
        argument_types.push(parse_type(stream, lookup, dynamism, ctx, None)?);
    }
    Ok(Type::new(
        TypeKind::Callable {
            return_type: Box::new(Type::nothingness()),
            argument_types,
        },
        TypeFlags::empty(),
    ))
}

fn consume_symbol(stream: &mut dyn TokenStream, symbol: char) -> bool {
    if stream.peek().is_some_and(|t| t.kind == TokenType::Symbol(symbol)) {
        stream.advance();
        true
    } else {
        false
    }
}

fn expect_symbol(stream: &mut dyn TokenStream, symbol: char, position: &SourcePosition) -> Result<(), CompilerError> {
    if consume_symbol(stream, symbol) {
        Ok(())
    } else {
        Err(CompilerError::Internal {
            position: position.clone(),
            message: format!("expected symbol '{symbol}'"),
        })
    }
}

fn expect_identifier(stream: &mut dyn TokenStream, position: &SourcePosition) -> Result<String, CompilerError> {
    match stream.advance() {
        Some(Token {
            kind: TokenType::Identifier(name),
            ..
        }) => Ok(name),
        _ => Err(CompilerError::UnknownType {
            position: position.clone(),
            name: "<missing type name>".to_string(),
        }),
    }
}

fn expect_integer(stream: &mut dyn TokenStream, position: &SourcePosition) -> Result<u32, CompilerError> {
    match stream.advance() {
        Some(Token {
            kind: TokenType::Integer(n),
            ..
        }) if n >= 0 => Ok(n as u32),
        _ => Err(CompilerError::Internal {
            position: position.clone(),
            message: "expected a non-negative generic-argument index".to_string(),
        }),
    }
}
