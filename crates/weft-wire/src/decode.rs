//! Value decoding with structural compatibility.
//!
//! A message is decoded in three strictly ordered stages: the embedded type
//! table is parsed and validated in full, each expected argument's wire type
//! is checked compatible with the caller's expected descriptor, and only
//! then are value bytes interpreted. Compatibility is the protocol-evolution
//! relation: receivers may ignore record fields they do not know, treat
//! absent optional fields and absent trailing optional arguments as none,
//! and accept a variant whose tag set is a subset of their own.
//!
//! Decoding is pure over the input slice; on any failure only the error is
//! returned.

use std::collections::HashSet;

use weft_types::{Field, FuncType, Type, TypeEnv, Value};

use crate::table::parse_header;
use crate::varint::Reader;
use crate::{limits, WireError};

/// Decode a message against the receiver's expected argument descriptors.
pub fn decode_args(
    bytes: &[u8],
    env: &TypeEnv,
    expected: &[Type],
) -> Result<Vec<Value>, WireError> {
    env.check()?;
    let mut r = Reader::new(bytes);
    let (wire_env, wire_args) = parse_header(&mut r)?;

    let mut values = Vec::with_capacity(expected.len());
    for (position, exp) in expected.iter().enumerate() {
        match wire_args.get(position) {
            Some(wire_ty) => {
                let mut seen = HashSet::new();
                check_compatible(&wire_env, wire_ty, env, exp, &mut seen)?;
                values.push(decode_value(&mut r, &wire_env, wire_ty, env, Some(exp), 0)?);
            }
            None => {
                // Graceful truncation: a trailing expected argument the
                // sender never declared decodes to an absent optional.
                if matches!(env.resolve(exp)?, Type::Option(_)) {
                    values.push(Value::Option(None));
                } else {
                    return Err(WireError::ArityMismatch {
                        expected: expected.len(),
                        found: wire_args.len(),
                    });
                }
            }
        }
    }

    // Arguments beyond the expected list are still parsed, so corruption in
    // them (and trailing garbage) never passes silently.
    for wire_ty in wire_args.iter().skip(expected.len()) {
        decode_value(&mut r, &wire_env, wire_ty, env, None, 0)?;
    }
    if r.remaining() != 0 {
        return Err(WireError::ValueDecode {
            offset: r.pos(),
            context: "trailing bytes after the last argument".into(),
        });
    }

    tracing::trace!(args = values.len(), "decoded arguments");
    Ok(values)
}

/// Check that a value shaped by `wire_ty` can be decoded as `expected`.
///
/// The visited set is keyed by resolved descriptor address pairs, so
/// recursive and mutually recursive shapes terminate: a pair already under
/// consideration is assumed compatible, and any genuine mismatch inside the
/// cycle is found on the first pass.
fn check_compatible(
    wire_env: &TypeEnv,
    wire_ty: &Type,
    env: &TypeEnv,
    expected: &Type,
    seen: &mut HashSet<(usize, usize)>,
) -> Result<(), WireError> {
    let w = wire_env.resolve(wire_ty)?;
    let e = env.resolve(expected)?;
    if !seen.insert((w as *const Type as usize, e as *const Type as usize)) {
        return Ok(());
    }

    let compatible = match (w, e) {
        (Type::Option(wi), Type::Option(ei)) => {
            return check_compatible(wire_env, wi, env, ei, seen);
        }
        (Type::Null, Type::Option(_)) => true,
        // A bare value where an optional is expected decodes as present.
        (_, Type::Option(ei)) if !matches!(w, Type::Option(_)) => {
            return check_compatible(wire_env, w, env, ei, seen);
        }
        (Type::Vector(wi), Type::Vector(ei)) => {
            return check_compatible(wire_env, wi, env, ei, seen);
        }
        (Type::Record(wfs), Type::Record(efs)) => {
            for ef in efs {
                match find_field(wfs, ef) {
                    Some(wf) => check_compatible(wire_env, &wf.ty, env, &ef.ty, seen)?,
                    // Known-absent field: must be tolerable as none.
                    None => {
                        if !matches!(env.resolve(&ef.ty)?, Type::Option(_)) {
                            return Err(mismatch(w, e));
                        }
                    }
                }
            }
            true
        }
        (Type::Variant(wfs), Type::Variant(efs)) => {
            // The sent tag set must be a subset of the expected tag set.
            for wf in wfs {
                match find_field(efs, wf) {
                    Some(ef) => check_compatible(wire_env, &wf.ty, env, &ef.ty, seen)?,
                    None => return Err(mismatch(w, e)),
                }
            }
            true
        }
        (Type::Func(wf), Type::Func(ef)) => {
            check_func_compatible(wire_env, wf, env, ef, seen)?;
            true
        }
        (Type::Service(ws), Type::Service(es)) => {
            if ws.methods().len() != es.methods().len() {
                return Err(mismatch(w, e));
            }
            for ((wn, wf), (en, ef)) in ws.methods().iter().zip(es.methods()) {
                if wn != en {
                    return Err(mismatch(w, e));
                }
                check_func_compatible(wire_env, wf, env, ef, seen)?;
            }
            true
        }
        // Primitive kinds must match exactly; there is no numeric widening.
        (w, e) => w == e,
    };

    if compatible {
        Ok(())
    } else {
        Err(mismatch(w, e))
    }
}

fn check_func_compatible(
    wire_env: &TypeEnv,
    wire: &FuncType,
    env: &TypeEnv,
    expected: &FuncType,
    seen: &mut HashSet<(usize, usize)>,
) -> Result<(), WireError> {
    if wire.args.len() != expected.args.len()
        || wire.rets.len() != expected.rets.len()
        || wire.modes != expected.modes
    {
        return Err(WireError::TypeMismatch {
            context: format!("cannot decode {} as {}", wire, expected),
        });
    }
    for (a, b) in wire.args.iter().zip(&expected.args) {
        check_compatible(wire_env, a, env, b, seen)?;
    }
    for (a, b) in wire.rets.iter().zip(&expected.rets) {
        check_compatible(wire_env, a, env, b, seen)?;
    }
    Ok(())
}

fn find_field<'a>(fields: &'a [Field], key: &Field) -> Option<&'a Field> {
    fields
        .binary_search_by_key(&key.id, |f| f.id)
        .ok()
        .map(|i| &fields[i])
}

fn mismatch(wire: &Type, expected: &Type) -> WireError {
    WireError::TypeMismatch {
        context: format!("cannot decode {} as {}", wire, expected),
    }
}

fn value_err(r: &Reader<'_>, context: impl Into<String>) -> WireError {
    WireError::ValueDecode {
        offset: r.pos(),
        context: context.into(),
    }
}

/// Decode one value shaped by `wire_ty`, coercing it toward `expected`.
///
/// With `expected == None` the value is parsed purely by its wire type and
/// the result is discarded by the caller; this path consumes skipped record
/// fields and surplus trailing arguments.
fn decode_value(
    r: &mut Reader<'_>,
    wire_env: &TypeEnv,
    wire_ty: &Type,
    env: &TypeEnv,
    expected: Option<&Type>,
    depth: usize,
) -> Result<Value, WireError> {
    if depth > limits::MAX_VALUE_DEPTH {
        return Err(value_err(r, "value nesting exceeds the depth limit"));
    }
    let w = wire_env.resolve(wire_ty)?;
    let e = match expected {
        Some(ty) => Some(env.resolve(ty)?),
        None => None,
    };

    // An expected optional absorbs three wire shapes: null (absent), an
    // optional (decoded below), and a bare compatible value (wrapped).
    if let Some(Type::Option(inner)) = e {
        match w {
            Type::Null => return Ok(Value::Option(None)),
            Type::Option(_) => {}
            _ => {
                let value = decode_value(r, wire_env, w, env, Some(inner.as_ref()), depth + 1)?;
                return Ok(Value::some(value));
            }
        }
    }

    match w {
        Type::Null => Ok(Value::Null),
        Type::Bool => match r.byte()? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            _ => Err(value_err(r, "invalid bool byte")),
        },
        Type::Nat => Ok(Value::Nat(r.read_nat()?)),
        Type::Int => Ok(Value::Int(r.read_int()?)),
        Type::Nat8 => Ok(Value::Nat8(r.byte()?)),
        Type::Nat16 => Ok(Value::Nat16(u16::from_le_bytes(fixed(r.take(2)?)))),
        Type::Nat32 => Ok(Value::Nat32(u32::from_le_bytes(fixed(r.take(4)?)))),
        Type::Nat64 => Ok(Value::Nat64(u64::from_le_bytes(fixed(r.take(8)?)))),
        Type::Int8 => Ok(Value::Int8(r.byte()? as i8)),
        Type::Int16 => Ok(Value::Int16(i16::from_le_bytes(fixed(r.take(2)?)))),
        Type::Int32 => Ok(Value::Int32(i32::from_le_bytes(fixed(r.take(4)?)))),
        Type::Int64 => Ok(Value::Int64(i64::from_le_bytes(fixed(r.take(8)?)))),
        Type::Float32 => Ok(Value::Float32(f32::from_le_bytes(fixed(r.take(4)?)))),
        Type::Float64 => Ok(Value::Float64(f64::from_le_bytes(fixed(r.take(8)?)))),
        Type::Text => {
            let len = r.read_u64()?;
            if len > r.remaining() as u64 {
                return Err(value_err(r, "text length overruns input"));
            }
            let bytes = r.take(len as usize)?;
            match std::str::from_utf8(bytes) {
                Ok(s) => Ok(Value::Text(s.to_string())),
                Err(_) => Err(value_err(r, "text is not valid UTF-8")),
            }
        }
        Type::Option(wi) => {
            let ei = match e {
                Some(Type::Option(inner)) => Some(inner.as_ref()),
                _ => None,
            };
            match r.byte()? {
                0 => Ok(Value::Option(None)),
                1 => {
                    let value = decode_value(r, wire_env, wi, env, ei, depth + 1)?;
                    Ok(Value::some(value))
                }
                _ => Err(value_err(r, "invalid option flag")),
            }
        }
        Type::Vector(wi) => {
            let count = r.read_u64()?;
            let cap = if zero_size(wire_env, wi, &mut HashSet::new()) {
                limits::MAX_ZERO_SIZE_ELEMENTS
            } else {
                r.remaining() as u64
            };
            if count > cap {
                return Err(value_err(r, "vector length overruns input"));
            }
            let ei = match e {
                Some(Type::Vector(inner)) => Some(inner.as_ref()),
                _ => None,
            };
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(decode_value(r, wire_env, wi, env, ei, depth + 1)?);
            }
            Ok(Value::Vector(items))
        }
        Type::Record(wfs) => {
            let efs: &[Field] = match e {
                Some(Type::Record(fields)) => fields,
                _ => &[],
            };
            let mut entries = Vec::new();
            let mut ei = 0usize;
            for wf in wfs {
                while ei < efs.len() && efs[ei].id < wf.id {
                    // Compatibility guaranteed these are optional.
                    entries.push((efs[ei].id, Value::Option(None)));
                    ei += 1;
                }
                if ei < efs.len() && efs[ei].id == wf.id {
                    let value =
                        decode_value(r, wire_env, &wf.ty, env, Some(&efs[ei].ty), depth + 1)?;
                    entries.push((wf.id, value));
                    ei += 1;
                } else {
                    // Field the receiver does not know: parse and skip.
                    let skipped = decode_value(r, wire_env, &wf.ty, env, None, depth + 1)?;
                    if e.is_none() {
                        entries.push((wf.id, skipped));
                    }
                }
            }
            while ei < efs.len() {
                entries.push((efs[ei].id, Value::Option(None)));
                ei += 1;
            }
            Ok(Value::Record(entries))
        }
        Type::Variant(wfs) => {
            let index = r.read_u64()?;
            let Some(alt) = wfs.get(index as usize) else {
                return Err(value_err(r, "variant tag index out of range"));
            };
            let ety = match e {
                Some(Type::Variant(efs)) => {
                    find_field(efs, alt).map(|ef| &ef.ty)
                }
                _ => None,
            };
            let value = decode_value(r, wire_env, &alt.ty, env, ety, depth + 1)?;
            Ok(Value::Variant {
                id: alt.id,
                value: Box::new(value),
            })
        }
        Type::Func(_) | Type::Service(_) => {
            Err(value_err(r, "function and service values are not supported"))
        }
        Type::Ref(_) => Err(value_err(r, "unresolved type reference")),
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// Whether a value of this type occupies zero bytes on the wire.
fn zero_size(env: &TypeEnv, ty: &Type, visited: &mut HashSet<u32>) -> bool {
    let ty = match ty {
        Type::Ref(index) => {
            if !visited.insert(*index) {
                return false;
            }
            match env.get(*index) {
                Ok(def) => def,
                Err(_) => return false,
            }
        }
        _ => ty,
    };
    match ty {
        Type::Null => true,
        Type::Record(fields) => fields.iter().all(|f| zero_size(env, &f.ty, visited)),
        _ => false,
    }
}
