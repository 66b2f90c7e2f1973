use crate::FieldId;

/// Error raised while constructing a descriptor or a type environment.
///
/// These are always detected eagerly, at the constructor or `define` call,
/// never deferred to first encode/decode use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// Two fields or variant alternatives hash to the same id.
    DuplicateFieldId { id: FieldId },
    /// Two service or interface methods share a name.
    DuplicateMethod { name: String },
    /// A `Type::Ref` points at a slot that does not exist or was reserved
    /// but never defined.
    UnboundReference { index: u32 },
    /// A definition chain consists only of references and loops back on
    /// itself, so it would expand forever.
    IllFormedRecursion { index: u32 },
    /// `define` was called twice for the same slot.
    SlotAlreadyDefined { index: u32 },
    /// `define` was handed a type that is not a `Type::Ref` slot.
    NotAReference,
}

impl std::fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructionError::DuplicateFieldId { id } => {
                write!(f, "duplicate field id: {}", id)
            }
            ConstructionError::DuplicateMethod { name } => {
                write!(f, "duplicate method name: {:?}", name)
            }
            ConstructionError::UnboundReference { index } => {
                write!(f, "reference to unbound type slot {}", index)
            }
            ConstructionError::IllFormedRecursion { index } => {
                write!(f, "type slot {} expands into itself without a constructor", index)
            }
            ConstructionError::SlotAlreadyDefined { index } => {
                write!(f, "type slot {} is already defined", index)
            }
            ConstructionError::NotAReference => {
                write!(f, "define expects the slot returned by reserve")
            }
        }
    }
}

impl std::error::Error for ConstructionError {}
