//! The type-definition arena: owns every class, value type, enum,
//! protocol, function, and package for one compile, and answers the
//! lookup questions `glyphc-types` and the declarative parser need.

use glyphc_common::SourcePosition;
use glyphc_scopes::VariableId;
use glyphc_types::compatibility::{ConstraintLookup, InheritanceLookup};
use glyphc_types::storage::SizeOf;
use glyphc_types::{ClassId, EnumId, FunctionId, ProtocolId, Type, TypeDefRef, TypeKind, ValueTypeId};
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

use crate::function::Function;
use crate::parser::{ResolvedTypeName, TypeNameLookup};
use crate::vti::ClassVtiProvider;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PackageId(pub u32);

#[derive(Clone, Debug)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub version: (u32, u32, u32),
    pub requires_binary: bool,
}

#[derive(Clone, Debug)]
pub struct ClassDefinition {
    pub package: PackageId,
    pub name: String,
    pub documentation: Option<String>,
    pub declared_at: SourcePosition,
    pub superclass: Option<ClassId>,
    pub super_generic_arguments: Vec<Type>,
    pub own_generic_parameter_count: u32,
    pub generic_argument_count: u32,
    pub own_generic_constraints: Vec<Type>,
    pub adopted_protocols: Vec<Type>,
    pub methods: Vec<FunctionId>,
    pub class_methods: Vec<FunctionId>,
    pub initializers: Vec<FunctionId>,
    pub instance_variables: Vec<(VariableId, String, Type, SourcePosition)>,
    pub required_initializers: FxHashSet<String>,
    pub inherits_constructors: bool,
    pub is_final: bool,
    pub vti_provider: ClassVtiProvider,
    pub finalized: bool,
}

#[derive(Clone, Debug)]
pub struct ValueTypeDefinition {
    pub package: PackageId,
    pub name: String,
    pub documentation: Option<String>,
    pub declared_at: SourcePosition,
    pub own_generic_parameter_count: u32,
    pub own_generic_constraints: Vec<Type>,
    pub adopted_protocols: Vec<Type>,
    pub methods: Vec<FunctionId>,
    pub initializers: Vec<FunctionId>,
    pub instance_variables: Vec<(VariableId, String, Type, SourcePosition)>,
    pub size_in_words: u32,
    pub is_primitive: bool,
    pub finalized: bool,
}

#[derive(Clone, Debug)]
pub struct ProtocolDefinition {
    pub package: PackageId,
    pub name: String,
    pub documentation: Option<String>,
    pub declared_at: SourcePosition,
    pub own_generic_parameter_count: u32,
    pub own_generic_constraints: Vec<Type>,
    pub methods: Vec<FunctionId>,
    /// Assigned when the protocol is registered; used to canonicalize
    /// `MultiProtocol` member order.
    pub declaration_index: u32,
}

#[derive(Clone, Debug)]
pub struct EnumDefinition {
    pub package: PackageId,
    pub name: String,
    pub documentation: Option<String>,
    pub declared_at: SourcePosition,
    pub cases: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TypeDefinitionArena {
    pub packages: Vec<Package>,
    pub classes: Vec<ClassDefinition>,
    pub value_types: Vec<ValueTypeDefinition>,
    pub protocols: Vec<ProtocolDefinition>,
    pub enums: Vec<EnumDefinition>,
    pub functions: Vec<Function>,
    names: FxHashMap<(Option<String>, String), ResolvedTypeName>,
}

impl TypeDefinitionArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_package(&mut self, name: impl Into<String>, version: (u32, u32, u32), requires_binary: bool) -> PackageId {
        let id = PackageId(self.packages.len() as u32);
        self.packages.push(Package {
            id,
            name: name.into(),
            version,
            requires_binary,
        });
        id
    }

    pub fn register_class(&mut self, namespace: Option<&str>, def: ClassDefinition) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.names
            .insert((namespace.map(str::to_string), def.name.clone()), ResolvedTypeName::Class(id));
        self.classes.push(def);
        id
    }

    pub fn register_value_type(&mut self, namespace: Option<&str>, def: ValueTypeDefinition) -> ValueTypeId {
        let id = ValueTypeId(self.value_types.len() as u32);
        self.names
            .insert((namespace.map(str::to_string), def.name.clone()), ResolvedTypeName::ValueType(id));
        self.value_types.push(def);
        id
    }

    pub fn register_protocol(&mut self, namespace: Option<&str>, mut def: ProtocolDefinition) -> ProtocolId {
        let id = ProtocolId(self.protocols.len() as u32);
        def.declaration_index = id.0;
        self.names
            .insert((namespace.map(str::to_string), def.name.clone()), ResolvedTypeName::Protocol(id));
        self.protocols.push(def);
        id
    }

    pub fn register_enum(&mut self, namespace: Option<&str>, def: EnumDefinition) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.names
            .insert((namespace.map(str::to_string), def.name.clone()), ResolvedTypeName::Enum(id));
        self.enums.push(def);
        id
    }

    pub fn register_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    #[must_use]
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    #[must_use]
    pub fn class(&self, id: ClassId) -> &ClassDefinition {
        &self.classes[id.0 as usize]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDefinition {
        &mut self.classes[id.0 as usize]
    }

    #[must_use]
    pub fn value_type(&self, id: ValueTypeId) -> &ValueTypeDefinition {
        &self.value_types[id.0 as usize]
    }

    pub fn value_type_mut(&mut self, id: ValueTypeId) -> &mut ValueTypeDefinition {
        &mut self.value_types[id.0 as usize]
    }

    #[must_use]
    pub fn protocol(&self, id: ProtocolId) -> &ProtocolDefinition {
        &self.protocols[id.0 as usize]
    }

    fn constraint_of(&self, owner: TypeDefRef, index: u32) -> Option<Type> {
        match owner {
            TypeDefRef::Class(id) => self.classes[id.0 as usize].own_generic_constraints.get(index as usize).cloned(),
            TypeDefRef::ValueType(id) => self.value_types[id.0 as usize]
                .own_generic_constraints
                .get(index as usize)
                .cloned(),
            TypeDefRef::Protocol(id) => self.protocols[id.0 as usize]
                .own_generic_constraints
                .get(index as usize)
                .cloned(),
        }
    }
}

impl ConstraintLookup for TypeDefinitionArena {
    fn constraint(&self, owner: TypeDefRef, index: u32) -> Option<Type> {
        self.constraint_of(owner, index)
    }
}

impl InheritanceLookup for TypeDefinitionArena {
    fn class_inherits_from(&self, descendant: ClassId, ancestor: ClassId) -> bool {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.classes[id.0 as usize].superclass;
        }
        false
    }

    fn adopted_protocols(&self, class: ClassId, arguments: &[Type]) -> Vec<Type> {
        let owner = TypeDefRef::Class(class);
        let ctx = glyphc_types::TypeContext::for_owner(owner, arguments.to_vec());
        self.classes[class.0 as usize]
            .adopted_protocols
            .iter()
            .map(|protocol| glyphc_types::substitution::resolve_on(protocol, &ctx, false))
            .collect()
    }
}

impl SizeOf for TypeDefinitionArena {
    fn size_in_words(&self, ty: &Type) -> u32 {
        match &ty.kind {
            TypeKind::ValueType(id, _) => self.value_types[id.0 as usize].size_in_words,
            TypeKind::Class(..) | TypeKind::Enum(_) => 1,
            _ => 1,
        }
    }
}

impl TypeNameLookup for TypeDefinitionArena {
    fn resolve(&self, namespace: Option<&str>, name: &str) -> Option<ResolvedTypeName> {
        self.names.get(&(namespace.map(str::to_string), name.to_string())).copied()
    }

    fn own_generic_parameter_count(&self, owner: TypeDefRef) -> u32 {
        match owner {
            TypeDefRef::Class(id) => self.classes[id.0 as usize].own_generic_parameter_count,
            TypeDefRef::ValueType(id) => self.value_types[id.0 as usize].own_generic_parameter_count,
            TypeDefRef::Protocol(id) => self.protocols[id.0 as usize].own_generic_parameter_count,
        }
    }

    fn generic_constraint(&self, owner: TypeDefRef, index: u32) -> Option<Type> {
        self.constraint_of(owner, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SourcePosition {
        SourcePosition::new("t.emoji", 1, 1)
    }

    fn class_def(name: &str, superclass: Option<ClassId>) -> ClassDefinition {
        ClassDefinition {
            package: PackageId(0),
            name: name.to_string(),
            documentation: None,
            declared_at: pos(),
            superclass,
            super_generic_arguments: vec![],
            own_generic_parameter_count: 0,
            generic_argument_count: 0,
            own_generic_constraints: vec![],
            adopted_protocols: vec![],
            methods: vec![],
            class_methods: vec![],
            initializers: vec![],
            instance_variables: vec![],
            required_initializers: FxHashSet::default(),
            inherits_constructors: false,
            is_final: false,
            vti_provider: ClassVtiProvider::root(),
            finalized: false,
        }
    }

    #[test]
    fn resolve_finds_registered_class_by_bare_name() {
        let mut arena = TypeDefinitionArena::new();
        let id = arena.register_class(None, class_def("Animal", None));
        assert_eq!(arena.resolve(None, "Animal"), Some(ResolvedTypeName::Class(id)));
    }

    #[test]
    fn class_inherits_from_walks_superclass_chain() {
        let mut arena = TypeDefinitionArena::new();
        let base = arena.register_class(None, class_def("Animal", None));
        let mid = arena.register_class(None, class_def("Mammal", Some(base)));
        let leaf = arena.register_class(None, class_def("Dog", Some(mid)));
        assert!(arena.class_inherits_from(leaf, base));
        assert!(!arena.class_inherits_from(base, leaf));
    }

    #[test]
    fn namespaced_and_bare_names_do_not_collide() {
        let mut arena = TypeDefinitionArena::new();
        let bare = arena.register_class(None, class_def("Animal", None));
        let namespaced = arena.register_class(Some("zoo"), class_def("Animal", None));
        assert_ne!(bare, namespaced);
        assert_eq!(arena.resolve(Some("zoo"), "Animal"), Some(ResolvedTypeName::Class(namespaced)));
    }
}
