#![deny(unsafe_code)]

//! Self-describing binary wire codec for the weft IDL.
//!
//! A message carries its own type table, so a receiver can decode without
//! out-of-band schema agreement. Layout, in order: the magic prefix, the
//! type table (entry count, then each composite entry), the top-level
//! argument index list, and the concatenated value encodings.
//!
//! Encode and decode are pure, synchronous functions over immutable inputs;
//! they hold no locks, consult no global state, and may run concurrently on
//! independent inputs.

mod decode;
mod encode;
mod error;
pub mod limits;
mod plan;
mod table;
mod varint;

pub use decode::decode_args;
pub use encode::encode_args;
pub use error::WireError;
pub use plan::CallPlan;
pub use varint::{
    write_i64, write_int, write_nat, write_u64, Reader, MAX_VARINT_BYTES,
};

use weft_types::{FuncType, Type, TypeEnv, Value};

/// Message magic/version prefix.
pub const MAGIC: &[u8; 4] = b"DIDL";

/// Single-value convenience codec on a descriptor.
///
/// Equivalent to a one-argument message against an empty environment; types
/// with [`Type::Ref`] back-edges need the environment-aware
/// [`encode_args`]/[`decode_args`] path.
pub trait ValueCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, WireError>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, WireError>;
}

impl ValueCodec for Type {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, WireError> {
        encode_args(
            &TypeEnv::new(),
            std::slice::from_ref(self),
            std::slice::from_ref(value),
        )
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, WireError> {
        let mut values = decode_args(bytes, &TypeEnv::new(), std::slice::from_ref(self))?;
        values.pop().ok_or(WireError::ArityMismatch {
            expected: 1,
            found: 0,
        })
    }
}

/// Message codec on a function signature: arguments one way, returns the
/// other.
pub trait SignatureCodec {
    fn encode_call(&self, env: &TypeEnv, values: &[Value]) -> Result<Vec<u8>, WireError>;
    fn decode_call(&self, env: &TypeEnv, bytes: &[u8]) -> Result<Vec<Value>, WireError>;
    fn encode_reply(&self, env: &TypeEnv, values: &[Value]) -> Result<Vec<u8>, WireError>;
    fn decode_reply(&self, env: &TypeEnv, bytes: &[u8]) -> Result<Vec<Value>, WireError>;
}

impl SignatureCodec for FuncType {
    fn encode_call(&self, env: &TypeEnv, values: &[Value]) -> Result<Vec<u8>, WireError> {
        encode_args(env, &self.args, values)
    }

    fn decode_call(&self, env: &TypeEnv, bytes: &[u8]) -> Result<Vec<Value>, WireError> {
        decode_args(bytes, env, &self.args)
    }

    fn encode_reply(&self, env: &TypeEnv, values: &[Value]) -> Result<Vec<u8>, WireError> {
        encode_args(env, &self.rets, values)
    }

    fn decode_reply(&self, env: &TypeEnv, bytes: &[u8]) -> Result<Vec<Value>, WireError> {
        decode_args(bytes, env, &self.rets)
    }
}
