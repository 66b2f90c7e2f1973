use std::fmt;

use weft_hash::idl_hash;

use crate::{ConstructionError, FuncType, ServiceType};

/// A 32-bit record field or variant tag id.
///
/// Derived from the field's name via [`idl_hash`], or taken literally when
/// the name is a numeric literal. Ids order fields canonically on the wire;
/// names themselves are never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct FieldId(pub u32);

impl FieldId {
    /// Id for a named field or variant alternative.
    pub fn named(name: &str) -> Self {
        FieldId(idl_hash(name))
    }

    /// Get the raw u32 value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for FieldId {
    fn from(id: u32) -> Self {
        FieldId(id)
    }
}

impl From<FieldId> for u32 {
    fn from(id: FieldId) -> Self {
        id.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One field of a record, or one alternative of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub id: FieldId,
    pub ty: Type,
}

/// A type descriptor.
///
/// The set of shapes is closed; encode, decode, and the compatibility
/// relation match exhaustively over it. Record and variant fields are held
/// in ascending-id order, so the derived equality is the set-keyed
/// structural equality and declaration order never leaks into comparisons
/// or onto the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Bool,
    /// Unbounded natural number.
    Nat,
    /// Unbounded signed integer.
    Int,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// UTF-8 text.
    Text,
    Option(Box<Type>),
    Vector(Box<Type>),
    Record(Vec<Field>),
    Variant(Vec<Field>),
    Func(FuncType),
    Service(ServiceType),
    /// Back-edge into the enclosing [`TypeEnv`](crate::TypeEnv) or wire
    /// table, for recursive and mutually recursive shapes.
    Ref(u32),
}

impl Type {
    /// `opt inner`.
    pub fn option(inner: Type) -> Type {
        Type::Option(Box::new(inner))
    }

    /// `vec elem`.
    pub fn vector(elem: Type) -> Type {
        Type::Vector(Box::new(elem))
    }

    /// A record from `(name, type)` pairs. Names are hashed to ids and the
    /// fields stored in ascending-id order; an id collision is an error.
    pub fn record<'a, I>(fields: I) -> Result<Type, ConstructionError>
    where
        I: IntoIterator<Item = (&'a str, Type)>,
    {
        Type::record_from(named_fields(fields))
    }

    /// A record from pre-built fields (explicit ids).
    pub fn record_from(fields: Vec<Field>) -> Result<Type, ConstructionError> {
        Ok(Type::Record(sorted_fields(fields)?))
    }

    /// A variant from `(name, type)` pairs, canonicalized like [`record`](Type::record).
    pub fn variant<'a, I>(alternatives: I) -> Result<Type, ConstructionError>
    where
        I: IntoIterator<Item = (&'a str, Type)>,
    {
        Type::variant_from(named_fields(alternatives))
    }

    /// A variant from pre-built alternatives (explicit ids).
    pub fn variant_from(alternatives: Vec<Field>) -> Result<Type, ConstructionError> {
        Ok(Type::Variant(sorted_fields(alternatives)?))
    }

    /// A function descriptor type.
    pub fn func(func: FuncType) -> Type {
        Type::Func(func)
    }

    /// A service descriptor type from `(name, signature)` pairs.
    pub fn service<I, S>(methods: I) -> Result<Type, ConstructionError>
    where
        I: IntoIterator<Item = (S, FuncType)>,
        S: Into<String>,
    {
        Ok(Type::Service(ServiceType::new(methods)?))
    }

    /// Whether this type encodes as a bare opcode, with no type-table entry.
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Type::Option(_)
                | Type::Vector(_)
                | Type::Record(_)
                | Type::Variant(_)
                | Type::Func(_)
                | Type::Service(_)
                | Type::Ref(_)
        )
    }
}

fn named_fields<'a, I>(fields: I) -> Vec<Field>
where
    I: IntoIterator<Item = (&'a str, Type)>,
{
    fields
        .into_iter()
        .map(|(name, ty)| Field {
            id: FieldId::named(name),
            ty,
        })
        .collect()
}

fn sorted_fields(mut fields: Vec<Field>) -> Result<Vec<Field>, ConstructionError> {
    fields.sort_by_key(|f| f.id);
    for pair in fields.windows(2) {
        if pair[0].id == pair[1].id {
            return Err(ConstructionError::DuplicateFieldId { id: pair[0].id });
        }
    }
    Ok(fields)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Nat => write!(f, "nat"),
            Type::Int => write!(f, "int"),
            Type::Nat8 => write!(f, "nat8"),
            Type::Nat16 => write!(f, "nat16"),
            Type::Nat32 => write!(f, "nat32"),
            Type::Nat64 => write!(f, "nat64"),
            Type::Int8 => write!(f, "int8"),
            Type::Int16 => write!(f, "int16"),
            Type::Int32 => write!(f, "int32"),
            Type::Int64 => write!(f, "int64"),
            Type::Float32 => write!(f, "float32"),
            Type::Float64 => write!(f, "float64"),
            Type::Text => write!(f, "text"),
            Type::Option(inner) => write!(f, "opt {}", inner),
            Type::Vector(elem) => write!(f, "vec {}", elem),
            Type::Record(fields) => write_fields(f, "record", fields),
            Type::Variant(alts) => write_fields(f, "variant", alts),
            Type::Func(func) => write!(f, "{}", func),
            Type::Service(service) => write!(f, "{}", service),
            Type::Ref(index) => write!(f, "ref {}", index),
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, kind: &str, fields: &[Field]) -> fmt::Result {
    write!(f, "{} {{", kind)?;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ";")?;
        }
        write!(f, " {}: {}", field.id, field.ty)?;
    }
    write!(f, " }}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fields_sort_by_id() {
        // idl_hash("value") < idl_hash("next"); declare them backwards.
        let a = Type::record([("next", Type::Null), ("value", Type::Nat)]).unwrap();
        let b = Type::record([("value", Type::Nat), ("next", Type::Null)]).unwrap();
        assert_eq!(a, b);
        if let Type::Record(fields) = &a {
            assert_eq!(fields[0].id, FieldId::named("value"));
            assert_eq!(fields[1].id, FieldId::named("next"));
        } else {
            unreachable!();
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        // "foo" hashes to 5097222, so the literal name collides with it.
        let err = Type::record([("foo", Type::Nat), ("5097222", Type::Text)]).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::DuplicateFieldId {
                id: FieldId::named("foo")
            }
        );
    }

    #[test]
    fn structural_equality_is_recursive() {
        let a = Type::vector(Type::option(Type::Text));
        let b = Type::vector(Type::option(Type::Text));
        assert_eq!(a, b);
        assert_ne!(a, Type::vector(Type::option(Type::Nat)));
    }

    #[test]
    fn display_is_compact() {
        let ty = Type::record([("foo", Type::option(Type::vector(Type::Nat)))]).unwrap();
        assert_eq!(ty.to_string(), "record { 5097222: opt vec nat }");
    }
}
