//! Access levels: public, private to the declaring type definition, or
//! open to the declaring type definition and its subclasses.

use crate::ids::TypeDefRef;

/// Unrestricted, same-type-definition-only, or same-or-subclass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    Public,
    Private,
    Protected,
}

impl AccessLevel {
    /// Whether a member declared with this access level on `owner` may be
    /// referenced from code whose own enclosing type definition is
    /// `caller` (`None` for top-level/free-function call sites).
    #[must_use]
    pub fn permits(self, owner: TypeDefRef, caller: Option<TypeDefRef>, is_subtype: impl FnOnce(TypeDefRef, TypeDefRef) -> bool) -> bool {
        match self {
            Self::Public => true,
            Self::Private => caller == Some(owner),
            Self::Protected => match caller {
                Some(caller) => caller == owner || is_subtype(caller, owner),
                None => false,
            },
        }
    }
}
