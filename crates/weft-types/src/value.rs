use num_bigint::{BigInt, BigUint};

use crate::FieldId;

/// A runtime value, tagged with the shape it carries.
///
/// Mirrors the descriptor kinds one for one, so encode and decode can match
/// a value against its [`Type`](crate::Type) exhaustively. Decode always
/// produces a `Value`; encode validates a `Value` against the declared
/// descriptor before emitting a single byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Nat(BigUint),
    Int(BigInt),
    Nat8(u8),
    Nat16(u16),
    Nat32(u32),
    Nat64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Option(Option<Box<Value>>),
    Vector(Vec<Value>),
    /// Field values in ascending-id order.
    Record(Vec<(FieldId, Value)>),
    Variant { id: FieldId, value: Box<Value> },
}

impl Value {
    /// An unbounded natural.
    pub fn nat(n: impl Into<BigUint>) -> Value {
        Value::Nat(n.into())
    }

    /// An unbounded integer.
    pub fn int(n: impl Into<BigInt>) -> Value {
        Value::Int(n.into())
    }

    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    /// A present optional.
    pub fn some(value: Value) -> Value {
        Value::Option(Some(Box::new(value)))
    }

    /// An absent optional.
    pub fn none() -> Value {
        Value::Option(None)
    }

    /// A record value from `(name, value)` pairs; names hash to ids and the
    /// entries are stored in ascending-id order.
    pub fn record<'a, I>(fields: I) -> Value
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut entries: Vec<(FieldId, Value)> = fields
            .into_iter()
            .map(|(name, value)| (FieldId::named(name), value))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        Value::Record(entries)
    }

    /// A variant value carrying one named alternative.
    pub fn variant(name: &str, value: Value) -> Value {
        Value::Variant {
            id: FieldId::named(name),
            value: Box::new(value),
        }
    }

    /// Field lookup on a record value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let id = FieldId::named(name);
        match self {
            Value::Record(entries) => entries
                .binary_search_by_key(&id, |(id, _)| *id)
                .ok()
                .map(|i| &entries[i].1),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Value {
        Value::Nat8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Value {
        Value::Nat16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Value {
        Value::Nat32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Value {
        Value::Nat64(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Value {
        Value::Int8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Value {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Text(v)
    }
}

impl From<BigUint> for Value {
    fn from(v: BigUint) -> Value {
        Value::Nat(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Value {
        Value::Int(v)
    }
}

/// A [`Value`] carried a different shape than the conversion expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueConvertError {
    pub expected: &'static str,
}

impl std::fmt::Display for ValueConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value is not a {}", self.expected)
    }
}

impl std::error::Error for ValueConvertError {}

macro_rules! try_from_value {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl TryFrom<Value> for $ty {
            type Error = ValueConvertError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(v) => Ok(v),
                    _ => Err(ValueConvertError {
                        expected: $expected,
                    }),
                }
            }
        }
    };
}

try_from_value!(bool, Bool, "bool");
try_from_value!(u8, Nat8, "nat8");
try_from_value!(u16, Nat16, "nat16");
try_from_value!(u32, Nat32, "nat32");
try_from_value!(u64, Nat64, "nat64");
try_from_value!(i8, Int8, "int8");
try_from_value!(i16, Int16, "int16");
try_from_value!(i32, Int32, "int32");
try_from_value!(i64, Int64, "int64");
try_from_value!(f32, Float32, "float32");
try_from_value!(f64, Float64, "float64");
try_from_value!(String, Text, "text");
try_from_value!(BigUint, Nat, "nat");
try_from_value!(BigInt, Int, "int");
