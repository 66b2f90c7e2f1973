//! The self-describing type table.
//!
//! Composite descriptors are hoisted into an index-addressed table so that
//! recursive shapes become back-edges instead of ownership cycles, and so
//! identical descriptors collapse to one entry. Primitives never enter the
//! table; they encode inline as negative opcodes. Non-negative values in
//! type position are table indices.
//!
//! The builder assigns indices first-seen, depth-first from the argument
//! list, which makes the table region deterministic byte-for-byte for a
//! given signature.

use std::collections::HashMap;

use weft_types::{ConstructionError, Field, FuncMode, FuncType, ServiceType, Type, TypeEnv};

use crate::varint::{write_i64, write_u64, Reader};
use crate::{limits, WireError, MAGIC};

/// Wire opcodes, SLEB128-encoded in type position.
pub(crate) mod op {
    pub const NULL: i64 = -1;
    pub const BOOL: i64 = -2;
    pub const NAT: i64 = -3;
    pub const INT: i64 = -4;
    pub const NAT8: i64 = -5;
    pub const NAT16: i64 = -6;
    pub const NAT32: i64 = -7;
    pub const NAT64: i64 = -8;
    pub const INT8: i64 = -9;
    pub const INT16: i64 = -10;
    pub const INT32: i64 = -11;
    pub const INT64: i64 = -12;
    pub const FLOAT32: i64 = -13;
    pub const FLOAT64: i64 = -14;
    pub const TEXT: i64 = -15;
    pub const OPT: i64 = -18;
    pub const VEC: i64 = -19;
    pub const RECORD: i64 = -20;
    pub const VARIANT: i64 = -21;
    pub const FUNC: i64 = -22;
    pub const SERVICE: i64 = -23;
}

pub(crate) fn prim_opcode(ty: &Type) -> Option<i64> {
    match ty {
        Type::Null => Some(op::NULL),
        Type::Bool => Some(op::BOOL),
        Type::Nat => Some(op::NAT),
        Type::Int => Some(op::INT),
        Type::Nat8 => Some(op::NAT8),
        Type::Nat16 => Some(op::NAT16),
        Type::Nat32 => Some(op::NAT32),
        Type::Nat64 => Some(op::NAT64),
        Type::Int8 => Some(op::INT8),
        Type::Int16 => Some(op::INT16),
        Type::Int32 => Some(op::INT32),
        Type::Int64 => Some(op::INT64),
        Type::Float32 => Some(op::FLOAT32),
        Type::Float64 => Some(op::FLOAT64),
        Type::Text => Some(op::TEXT),
        _ => None,
    }
}

fn prim_from_opcode(opcode: i64) -> Option<Type> {
    match opcode {
        op::NULL => Some(Type::Null),
        op::BOOL => Some(Type::Bool),
        op::NAT => Some(Type::Nat),
        op::INT => Some(Type::Int),
        op::NAT8 => Some(Type::Nat8),
        op::NAT16 => Some(Type::Nat16),
        op::NAT32 => Some(Type::Nat32),
        op::NAT64 => Some(Type::Nat64),
        op::INT8 => Some(Type::Int8),
        op::INT16 => Some(Type::Int16),
        op::INT32 => Some(Type::Int32),
        op::INT64 => Some(Type::Int64),
        op::FLOAT32 => Some(Type::Float32),
        op::FLOAT64 => Some(Type::Float64),
        op::TEXT => Some(Type::Text),
        _ => None,
    }
}

/// How a type is written in type position: inline opcode or table index.
#[derive(Debug, Clone, Copy)]
enum TypeRef {
    Prim(i64),
    Index(u32),
}

/// Serialize the message header (magic, type table, argument index list)
/// for `args` against `env`.
pub(crate) fn build_header(env: &TypeEnv, args: &[Type]) -> Result<Vec<u8>, WireError> {
    env.check()?;
    let mut builder = TableBuilder {
        env,
        entries: Vec::new(),
        by_struct: HashMap::new(),
        by_env: HashMap::new(),
    };
    for ty in args {
        builder.add(ty)?;
    }

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    write_u64(builder.entries.len() as u64, &mut out);
    for entry in &builder.entries {
        out.extend_from_slice(entry);
    }
    write_u64(args.len() as u64, &mut out);
    for ty in args {
        builder.write_type_ref(ty, &mut out)?;
    }
    Ok(out)
}

struct TableBuilder<'e> {
    env: &'e TypeEnv,
    entries: Vec<Vec<u8>>,
    /// Structural memo: one entry per distinct composite descriptor term.
    by_struct: HashMap<Type, u32>,
    /// Env slot → wire representation, for `Type::Ref` back-edges.
    by_env: HashMap<u32, TypeRef>,
}

impl<'e> TableBuilder<'e> {
    fn add(&mut self, ty: &Type) -> Result<(), WireError> {
        if prim_opcode(ty).is_some() {
            return Ok(());
        }
        if let Type::Ref(index) = ty {
            return self.add_ref(*index);
        }
        if self.by_struct.contains_key(ty) {
            return Ok(());
        }
        let index = self.claim_entry(ty.clone());
        self.add_children(ty)?;
        self.entries[index as usize] = self.serialize_entry(ty)?;
        Ok(())
    }

    fn add_ref(&mut self, index: u32) -> Result<(), WireError> {
        let (index, def) = resolve_index(self.env, index)?;
        if self.by_env.contains_key(&index) {
            return Ok(());
        }
        if let Some(opcode) = prim_opcode(def) {
            self.by_env.insert(index, TypeRef::Prim(opcode));
            return Ok(());
        }
        if let Some(&entry) = self.by_struct.get(def) {
            self.by_env.insert(index, TypeRef::Index(entry));
            return Ok(());
        }
        let def = def.clone();
        let entry = self.claim_entry(def.clone());
        // Map the env slot before descending so a back-edge to this
        // definition lands on the in-progress entry.
        self.by_env.insert(index, TypeRef::Index(entry));
        self.add_children(&def)?;
        self.entries[entry as usize] = self.serialize_entry(&def)?;
        Ok(())
    }

    fn claim_entry(&mut self, key: Type) -> u32 {
        let index = self.entries.len() as u32;
        self.entries.push(Vec::new());
        self.by_struct.insert(key, index);
        index
    }

    fn add_children(&mut self, ty: &Type) -> Result<(), WireError> {
        match ty {
            Type::Option(inner) | Type::Vector(inner) => self.add(inner),
            Type::Record(fields) | Type::Variant(fields) => {
                for field in fields {
                    self.add(&field.ty)?;
                }
                Ok(())
            }
            Type::Func(func) => self.add_func_children(func),
            Type::Service(service) => {
                for (_, func) in service.methods() {
                    self.add(&Type::Func(func.clone()))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn add_func_children(&mut self, func: &FuncType) -> Result<(), WireError> {
        for ty in func.args.iter().chain(func.rets.iter()) {
            self.add(ty)?;
        }
        Ok(())
    }

    fn serialize_entry(&self, ty: &Type) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::new();
        match ty {
            Type::Option(inner) => {
                write_i64(op::OPT, &mut buf);
                self.write_type_ref(inner, &mut buf)?;
            }
            Type::Vector(elem) => {
                write_i64(op::VEC, &mut buf);
                self.write_type_ref(elem, &mut buf)?;
            }
            Type::Record(fields) => {
                write_i64(op::RECORD, &mut buf);
                self.write_fields(fields, &mut buf)?;
            }
            Type::Variant(alts) => {
                write_i64(op::VARIANT, &mut buf);
                self.write_fields(alts, &mut buf)?;
            }
            Type::Func(func) => {
                write_i64(op::FUNC, &mut buf);
                write_u64(func.args.len() as u64, &mut buf);
                for ty in &func.args {
                    self.write_type_ref(ty, &mut buf)?;
                }
                write_u64(func.rets.len() as u64, &mut buf);
                for ty in &func.rets {
                    self.write_type_ref(ty, &mut buf)?;
                }
                write_u64(func.modes.len() as u64, &mut buf);
                for mode in &func.modes {
                    buf.push(mode.wire_byte());
                }
            }
            Type::Service(service) => {
                write_i64(op::SERVICE, &mut buf);
                write_u64(service.methods().len() as u64, &mut buf);
                for (name, func) in service.methods() {
                    write_u64(name.len() as u64, &mut buf);
                    buf.extend_from_slice(name.as_bytes());
                    self.write_type_ref(&Type::Func(func.clone()), &mut buf)?;
                }
            }
            _ => {
                return Err(WireError::TypeMismatch {
                    context: format!("{} cannot form a type table entry", ty),
                });
            }
        }
        Ok(buf)
    }

    fn write_fields(&self, fields: &[Field], buf: &mut Vec<u8>) -> Result<(), WireError> {
        write_u64(fields.len() as u64, buf);
        for field in fields {
            write_u64(field.id.raw() as u64, buf);
            self.write_type_ref(&field.ty, buf)?;
        }
        Ok(())
    }

    fn write_type_ref(&self, ty: &Type, buf: &mut Vec<u8>) -> Result<(), WireError> {
        let r = self.type_ref(ty)?;
        match r {
            TypeRef::Prim(opcode) => write_i64(opcode, buf),
            TypeRef::Index(index) => write_i64(index as i64, buf),
        }
        Ok(())
    }

    fn type_ref(&self, ty: &Type) -> Result<TypeRef, WireError> {
        if let Some(opcode) = prim_opcode(ty) {
            return Ok(TypeRef::Prim(opcode));
        }
        if let Type::Ref(index) = ty {
            let (index, _) = resolve_index(self.env, *index)?;
            return self
                .by_env
                .get(&index)
                .copied()
                .ok_or(WireError::Construction(
                    ConstructionError::UnboundReference { index },
                ));
        }
        match self.by_struct.get(ty) {
            Some(&index) => Ok(TypeRef::Index(index)),
            None => Err(WireError::TypeMismatch {
                context: format!("{} was not registered in the type table", ty),
            }),
        }
    }
}

/// Follow bare `Ref` chains to the slot whose definition is a constructor
/// (or primitive), returning that slot's index and definition.
fn resolve_index(env: &TypeEnv, mut index: u32) -> Result<(u32, &Type), WireError> {
    let mut hops = 0usize;
    loop {
        let def = env.get(index)?;
        match def {
            Type::Ref(next) => {
                if hops > env.len() {
                    return Err(WireError::Construction(
                        ConstructionError::IllFormedRecursion { index },
                    ));
                }
                hops += 1;
                index = *next;
            }
            _ => return Ok((index, def)),
        }
    }
}

fn table_err(offset: usize, context: impl Into<String>) -> WireError {
    WireError::MalformedTable {
        offset,
        context: context.into(),
    }
}

/// Parse the message header: magic, type table, argument index list.
///
/// The table is fully parsed and validated before any value byte is
/// interpreted. The result's `TypeEnv` uses wire table indices as its slot
/// indices, so `Type::Ref` back-edges resolve directly.
pub(crate) fn parse_header(r: &mut Reader<'_>) -> Result<(TypeEnv, Vec<Type>), WireError> {
    if r.remaining() < MAGIC.len() {
        let rest = r.take(r.remaining()).unwrap_or(&[]);
        return Err(WireError::UnsupportedVersion {
            found: rest.to_vec(),
        });
    }
    let prefix = r.take(MAGIC.len())?;
    if prefix != MAGIC {
        return Err(WireError::UnsupportedVersion {
            found: prefix.to_vec(),
        });
    }

    let count = r.read_u64()?;
    if count > limits::MAX_TABLE_ENTRIES {
        return Err(table_err(r.pos(), "type table too large"));
    }
    let mut defs = Vec::with_capacity(count as usize);
    // Service entries reference their methods' function types by table
    // index, possibly forward; they are resolved in a second pass once every
    // entry is parsed.
    let mut services = Vec::new();
    for index in 0..count {
        defs.push(parse_entry(r, count, index as usize, &mut services)?);
    }
    resolve_service_entries(&mut defs, services)?;

    let env = TypeEnv::from_defs(defs);
    env.check()
        .map_err(|err| table_err(r.pos(), err.to_string()))?;

    let argc = r.read_u64()?;
    if argc > limits::MAX_FIELDS_PER_NODE {
        return Err(table_err(r.pos(), "argument list too long"));
    }
    let mut args = Vec::with_capacity(argc as usize);
    for _ in 0..argc {
        args.push(read_type_ref(r, count)?);
    }

    tracing::trace!(entries = env.len(), args = args.len(), "parsed type table");
    Ok((env, args))
}

fn parse_entry(
    r: &mut Reader<'_>,
    count: u64,
    index: usize,
    services: &mut Vec<(usize, Vec<(String, Type)>)>,
) -> Result<Type, WireError> {
    let at = r.pos();
    let opcode = r.read_i64()?;
    match opcode {
        op::OPT => Ok(Type::Option(Box::new(read_type_ref(r, count)?))),
        op::VEC => Ok(Type::Vector(Box::new(read_type_ref(r, count)?))),
        op::RECORD => Ok(Type::Record(parse_field_list(r, count)?)),
        op::VARIANT => Ok(Type::Variant(parse_field_list(r, count)?)),
        op::FUNC => parse_func_entry(r, count).map(Type::Func),
        op::SERVICE => {
            services.push((index, parse_service_entry(r, count)?));
            Ok(Type::Service(ServiceType::default()))
        }
        _ => Err(table_err(
            at,
            format!("opcode {} is not a composite constructor", opcode),
        )),
    }
}

/// Replace each service placeholder with a `ServiceType` whose method
/// signatures are inlined from the function entries they reference.
fn resolve_service_entries(
    defs: &mut [Type],
    services: Vec<(usize, Vec<(String, Type)>)>,
) -> Result<(), WireError> {
    for (index, methods) in services {
        let mut resolved = Vec::with_capacity(methods.len());
        for (name, ty) in methods {
            let func = match &ty {
                Type::Ref(target) => match defs.get(*target as usize) {
                    Some(Type::Func(func)) => func.clone(),
                    _ => {
                        return Err(WireError::MalformedTable {
                            offset: 0,
                            context: format!(
                                "method {:?} does not reference a function entry",
                                name
                            ),
                        });
                    }
                },
                _ => {
                    return Err(WireError::MalformedTable {
                        offset: 0,
                        context: format!("method {:?} has a non-function type", name),
                    });
                }
            };
            resolved.push((name, func));
        }
        defs[index] = Type::Service(ServiceType::new(resolved)?);
    }
    Ok(())
}

fn parse_field_list(r: &mut Reader<'_>, count: u64) -> Result<Vec<Field>, WireError> {
    let n = r.read_u64()?;
    if n > limits::MAX_FIELDS_PER_NODE {
        return Err(table_err(r.pos(), "too many fields"));
    }
    let mut fields = Vec::with_capacity(n as usize);
    let mut prev: Option<u64> = None;
    for _ in 0..n {
        let at = r.pos();
        let id = r.read_u64()?;
        if id > u32::MAX as u64 {
            return Err(table_err(at, "field id exceeds 32 bits"));
        }
        if prev.is_some_and(|p| p >= id) {
            return Err(table_err(at, "field ids must be unique and ascending"));
        }
        prev = Some(id);
        let ty = read_type_ref(r, count)?;
        fields.push(Field {
            id: (id as u32).into(),
            ty,
        });
    }
    Ok(fields)
}

fn parse_func_entry(r: &mut Reader<'_>, count: u64) -> Result<FuncType, WireError> {
    let args = parse_type_list(r, count)?;
    let rets = parse_type_list(r, count)?;
    let n = r.read_u64()?;
    if n > limits::MAX_FIELDS_PER_NODE {
        return Err(table_err(r.pos(), "too many annotations"));
    }
    let mut modes = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let at = r.pos();
        let byte = r.byte().map_err(|_| table_err(at, "truncated type table"))?;
        let mode = FuncMode::from_wire_byte(byte)
            .ok_or_else(|| table_err(at, format!("unknown annotation {}", byte)))?;
        modes.push(mode);
    }
    let mut func = FuncType::new(args, rets);
    func.modes = modes;
    Ok(func)
}

fn parse_type_list(r: &mut Reader<'_>, count: u64) -> Result<Vec<Type>, WireError> {
    let n = r.read_u64()?;
    if n > limits::MAX_FIELDS_PER_NODE {
        return Err(table_err(r.pos(), "type list too long"));
    }
    let mut types = Vec::with_capacity(n as usize);
    for _ in 0..n {
        types.push(read_type_ref(r, count)?);
    }
    Ok(types)
}

fn parse_service_entry(
    r: &mut Reader<'_>,
    count: u64,
) -> Result<Vec<(String, Type)>, WireError> {
    let n = r.read_u64()?;
    if n > limits::MAX_FIELDS_PER_NODE {
        return Err(table_err(r.pos(), "too many methods"));
    }
    let mut methods = Vec::with_capacity(n as usize);
    let mut prev: Option<String> = None;
    for _ in 0..n {
        let at = r.pos();
        let len = r.read_u64()?;
        if len > r.remaining() as u64 {
            return Err(table_err(at, "method name overruns input"));
        }
        let bytes = r
            .take(len as usize)
            .map_err(|_| table_err(at, "truncated type table"))?;
        let name = String::from_utf8(bytes.to_vec())
            .map_err(|_| table_err(at, "method name is not UTF-8"))?;
        if prev.as_deref().is_some_and(|p| p >= name.as_str()) {
            return Err(table_err(at, "method names must be unique and ascending"));
        }
        prev = Some(name.clone());
        let ty = read_type_ref(r, count)?;
        methods.push((name, ty));
    }
    Ok(methods)
}

fn read_type_ref(r: &mut Reader<'_>, count: u64) -> Result<Type, WireError> {
    let at = r.pos();
    let value = r.read_i64()?;
    if value >= 0 {
        if (value as u64) >= count {
            return Err(table_err(at, format!("dangling type index {}", value)));
        }
        return Ok(Type::Ref(value as u32));
    }
    prim_from_opcode(value).ok_or_else(|| table_err(at, format!("unknown opcode {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_args_need_no_table() {
        let header = build_header(&TypeEnv::new(), &[Type::Nat]).unwrap();
        assert_eq!(header, b"DIDL\x00\x01\x7d");
        let header = build_header(&TypeEnv::new(), &[Type::Text, Type::Bool]).unwrap();
        assert_eq!(header, b"DIDL\x00\x02\x71\x7e");
    }

    #[test]
    fn identical_composites_share_an_entry() {
        let ty = Type::vector(Type::Nat);
        let header = build_header(&TypeEnv::new(), &[ty.clone(), ty]).unwrap();
        // One table entry (vec nat), referenced by both arguments.
        assert_eq!(header, b"DIDL\x01\x6d\x7d\x02\x00\x00");
    }

    #[test]
    fn header_is_deterministic() {
        let mut env = TypeEnv::new();
        let node = env.reserve();
        env.define(
            &node,
            Type::record([("value", Type::Nat), ("next", Type::option(node.clone()))]).unwrap(),
        )
        .unwrap();
        let a = build_header(&env, &[node.clone()]).unwrap();
        let b = build_header(&env, &[node]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn recursive_header_parses_back() {
        let mut env = TypeEnv::new();
        let node = env.reserve();
        env.define(
            &node,
            Type::record([("value", Type::Nat), ("next", Type::option(node.clone()))]).unwrap(),
        )
        .unwrap();
        let header = build_header(&env, &[node]).unwrap();

        let mut r = Reader::new(&header);
        let (wire_env, args) = parse_header(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(args.len(), 1);

        let root = wire_env.resolve(&args[0]).unwrap();
        let Type::Record(fields) = root else {
            panic!("expected a record, got {}", root);
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].ty, Type::Nat);
        // The second field loops back to the root entry.
        let Type::Option(inner) = &wire_env.resolve(&fields[1].ty).unwrap() else {
            panic!("expected opt");
        };
        assert_eq!(wire_env.resolve(inner).unwrap(), root);
    }

    #[test]
    fn service_methods_inline_their_signatures() {
        let func = FuncType::new(vec![Type::Text], vec![Type::Text]).query();
        let service = Type::service([("greet", func.clone())]).unwrap();
        let header = build_header(&TypeEnv::new(), &[service]).unwrap();

        let mut r = Reader::new(&header);
        let (wire_env, args) = parse_header(&mut r).unwrap();
        let Type::Service(parsed) = wire_env.resolve(&args[0]).unwrap() else {
            panic!("expected a service");
        };
        assert_eq!(parsed.methods().len(), 1);
        assert_eq!(parsed.methods()[0].0, "greet");
        assert_eq!(parsed.methods()[0].1, func);
    }

    #[test]
    fn dangling_index_is_rejected() {
        // One-entry table whose opt points past the end.
        let mut bytes = b"DIDL".to_vec();
        write_u64(1, &mut bytes);
        write_i64(op::OPT, &mut bytes);
        write_i64(3, &mut bytes);
        write_u64(0, &mut bytes);
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            parse_header(&mut r),
            Err(WireError::MalformedTable { .. })
        ));
    }

    #[test]
    fn non_ascending_field_ids_are_rejected() {
        let mut bytes = b"DIDL".to_vec();
        write_u64(1, &mut bytes);
        write_i64(op::RECORD, &mut bytes);
        write_u64(2, &mut bytes);
        write_u64(7, &mut bytes);
        write_i64(op::NAT, &mut bytes);
        write_u64(7, &mut bytes);
        write_i64(op::NAT, &mut bytes);
        write_u64(0, &mut bytes);
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            parse_header(&mut r),
            Err(WireError::MalformedTable { .. })
        ));
    }

    #[test]
    fn bad_magic_is_unsupported() {
        let mut r = Reader::new(b"DADL\x00\x00");
        assert_eq!(
            parse_header(&mut r),
            Err(WireError::UnsupportedVersion {
                found: b"DADL".to_vec()
            })
        );
        let mut r = Reader::new(b"DI");
        assert!(matches!(
            parse_header(&mut r),
            Err(WireError::UnsupportedVersion { .. })
        ));
    }
}
