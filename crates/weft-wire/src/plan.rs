use weft_types::{FuncType, Type, TypeEnv, Value};

use crate::encode::encode_values_into;
use crate::table::build_header;
use crate::{decode_args, WireError};

/// Precomputed encode/decode plan for one declared signature.
///
/// The message header (magic, type table, argument index list) depends only
/// on the declared types, so for a signature invoked repeatedly it is built
/// once here and reused per call. A plan is immutable and safe to share
/// across threads; callers typically hold one per method in a `LazyLock`.
/// The bytes produced are identical to calling
/// [`encode_args`](crate::encode_args) fresh each time.
#[derive(Debug, Clone)]
pub struct CallPlan {
    header: Vec<u8>,
    env: TypeEnv,
    types: Vec<Type>,
}

impl CallPlan {
    /// Build a plan for a type list (arguments or returns).
    pub fn new(env: &TypeEnv, types: &[Type]) -> Result<Self, WireError> {
        let header = build_header(env, types)?;
        Ok(CallPlan {
            header,
            env: env.clone(),
            types: types.to_vec(),
        })
    }

    /// Plan for a signature's argument list.
    pub fn for_args(env: &TypeEnv, func: &FuncType) -> Result<Self, WireError> {
        CallPlan::new(env, &func.args)
    }

    /// Plan for a signature's return list.
    pub fn for_rets(env: &TypeEnv, func: &FuncType) -> Result<Self, WireError> {
        CallPlan::new(env, &func.rets)
    }

    /// The declared types this plan encodes and decodes.
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    pub fn encode(&self, values: &[Value]) -> Result<Vec<u8>, WireError> {
        if self.types.len() != values.len() {
            return Err(WireError::TypeMismatch {
                context: format!(
                    "{} values supplied for {} declared argument types",
                    values.len(),
                    self.types.len()
                ),
            });
        }
        let mut out = self.header.clone();
        encode_values_into(&self.env, &self.types, values, &mut out)?;
        Ok(out)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, WireError> {
        decode_args(bytes, &self.env, &self.types)
    }
}
