#![deny(unsafe_code)]

//! weft - self-describing IDL codec for actor RPC
//!
//! This crate provides a unified API for the weft data format. Users should
//! depend on this crate rather than the individual component crates.
//!
//! A message is encoded against declared [`Type`] descriptors and carries
//! its own type table, so the receiving side can validate and decode with
//! nothing but its own expected descriptors:
//!
//! ```
//! use weft::prelude::*;
//!
//! let env = TypeEnv::new();
//! let bytes = encode_args(&env, &[Type::Nat], &[Value::nat(42u32)]).unwrap();
//! let values = decode_args(&bytes, &env, &[Type::Nat]).unwrap();
//! assert_eq!(values, vec![Value::nat(42u32)]);
//! ```

// Re-export the descriptor and value models.
pub use weft_types::{
    ActorInterface, ConstructionError, Field, FieldId, FuncMode, FuncType, ServiceType, Type,
    TypeEnv, Value, ValueConvertError,
};

// Re-export the codec surface.
pub use weft_wire::{
    decode_args, encode_args, limits, CallPlan, SignatureCodec, ValueCodec, WireError, MAGIC,
};

// Re-export the name hasher; its constants are part of the wire contract.
pub use weft_hash::idl_hash;

// Component crates for callers that want the narrow surfaces.
pub use weft_hash as hash;
pub use weft_types as types;
pub use weft_wire as wire;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use weft::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        decode_args, encode_args, ActorInterface, FuncType, SignatureCodec, Type, TypeEnv, Value,
        ValueCodec,
    };
}
