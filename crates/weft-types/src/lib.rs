#![deny(unsafe_code)]

//! Type descriptors and runtime values for the weft IDL.
//!
//! A [`Type`] describes the shape of a value; a [`Value`] is a decoded (or
//! to-be-encoded) runtime value tagged with its shape. Recursive and mutually
//! recursive shapes are expressed through a [`TypeEnv`] arena: a
//! [`Type::Ref`] is an index into the environment rather than an owned child,
//! which is also how the wire format's type table represents back-edges.
//!
//! Descriptors are immutable once constructed. All construction-time
//! validation (duplicate field ids, ill-formed recursion) happens eagerly,
//! before any encode or decode attempt.

mod actor;
mod env;
mod error;
mod func;
mod ty;
mod value;

pub use actor::ActorInterface;
pub use env::TypeEnv;
pub use error::ConstructionError;
pub use func::{FuncMode, FuncType, ServiceType};
pub use ty::{Field, FieldId, Type};
pub use value::{Value, ValueConvertError};
