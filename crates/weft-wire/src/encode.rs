//! Value encoding.
//!
//! Every value is validated against its declared descriptor as it is
//! walked; the first disagreement aborts the encode and the partially
//! written buffer never escapes.

use weft_types::{Type, TypeEnv, Value};

use crate::table::build_header;
use crate::varint::{write_int, write_nat, write_u64};
use crate::{limits, WireError};

/// Encode `values` against the declared argument `types` into a complete
/// self-describing message.
pub fn encode_args(
    env: &TypeEnv,
    types: &[Type],
    values: &[Value],
) -> Result<Vec<u8>, WireError> {
    if types.len() != values.len() {
        return Err(WireError::TypeMismatch {
            context: format!(
                "{} values supplied for {} declared argument types",
                values.len(),
                types.len()
            ),
        });
    }
    let mut out = build_header(env, types)?;
    encode_values_into(env, types, values, &mut out)?;
    Ok(out)
}

pub(crate) fn encode_values_into(
    env: &TypeEnv,
    types: &[Type],
    values: &[Value],
    out: &mut Vec<u8>,
) -> Result<(), WireError> {
    for (ty, value) in types.iter().zip(values) {
        encode_value(env, ty, value, out, 0)?;
    }
    Ok(())
}

fn encode_value(
    env: &TypeEnv,
    ty: &Type,
    value: &Value,
    out: &mut Vec<u8>,
    depth: usize,
) -> Result<(), WireError> {
    if depth > limits::MAX_VALUE_DEPTH {
        return Err(WireError::TypeMismatch {
            context: "value nesting exceeds the depth limit".into(),
        });
    }
    let ty = env.resolve(ty)?;
    match (ty, value) {
        (Type::Null, Value::Null) => Ok(()),
        (Type::Bool, Value::Bool(v)) => {
            out.push(*v as u8);
            Ok(())
        }
        (Type::Nat, Value::Nat(v)) => {
            write_nat(v, out);
            Ok(())
        }
        (Type::Int, Value::Int(v)) => {
            write_int(v, out);
            Ok(())
        }
        (Type::Nat8, Value::Nat8(v)) => {
            out.push(*v);
            Ok(())
        }
        (Type::Nat16, Value::Nat16(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Nat32, Value::Nat32(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Nat64, Value::Nat64(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Int8, Value::Int8(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Int16, Value::Int16(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Int32, Value::Int32(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Int64, Value::Int64(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Float32, Value::Float32(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Float64, Value::Float64(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Type::Text, Value::Text(s)) => {
            write_u64(s.len() as u64, out);
            out.extend_from_slice(s.as_bytes());
            Ok(())
        }
        (Type::Option(inner), Value::Option(opt)) => match opt {
            None => {
                out.push(0);
                Ok(())
            }
            Some(v) => {
                out.push(1);
                encode_value(env, inner, v, out, depth + 1)
            }
        },
        (Type::Vector(elem), Value::Vector(items)) => {
            write_u64(items.len() as u64, out);
            for item in items {
                encode_value(env, elem, item, out, depth + 1)?;
            }
            Ok(())
        }
        (Type::Record(fields), Value::Record(entries)) => {
            let mut matched = 0usize;
            for field in fields {
                let found = entries
                    .binary_search_by_key(&field.id, |(id, _)| *id)
                    .ok()
                    .map(|i| &entries[i].1);
                let Some(v) = found else {
                    return Err(WireError::TypeMismatch {
                        context: format!("record value is missing field {}", field.id),
                    });
                };
                encode_value(env, &field.ty, v, out, depth + 1)?;
                matched += 1;
            }
            if matched != entries.len() {
                return Err(WireError::TypeMismatch {
                    context: format!(
                        "record value carries {} fields, type declares {}",
                        entries.len(),
                        fields.len()
                    ),
                });
            }
            Ok(())
        }
        (Type::Variant(alts), Value::Variant { id, value }) => {
            let Ok(index) = alts.binary_search_by_key(id, |alt| alt.id) else {
                return Err(WireError::TypeMismatch {
                    context: format!("variant tag {} is not declared by {}", id, ty),
                });
            };
            write_u64(index as u64, out);
            encode_value(env, &alts[index].ty, value, out, depth + 1)
        }
        (Type::Func(_) | Type::Service(_), _) => Err(WireError::TypeMismatch {
            context: "function and service values have no wire representation".into(),
        }),
        (ty, value) => Err(WireError::TypeMismatch {
            context: format!("{} value does not match declared type {}", kind_name(value), ty),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Nat(_) => "nat",
        Value::Int(_) => "int",
        Value::Nat8(_) => "nat8",
        Value::Nat16(_) => "nat16",
        Value::Nat32(_) => "nat32",
        Value::Nat64(_) => "nat64",
        Value::Int8(_) => "int8",
        Value::Int16(_) => "int16",
        Value::Int32(_) => "int32",
        Value::Int64(_) => "int64",
        Value::Float32(_) => "float32",
        Value::Float64(_) => "float64",
        Value::Text(_) => "text",
        Value::Option(_) => "opt",
        Value::Vector(_) => "vec",
        Value::Record(_) => "record",
        Value::Variant { .. } => "variant",
    }
}
