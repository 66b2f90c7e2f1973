use weft_types::ConstructionError;

/// Error raised by encode, decode, or table construction.
///
/// Every failure is reported synchronously to the caller; no variant is
/// retried internally and no partial output survives an error.
#[derive(Debug, Clone, PartialEq)]
pub enum WireError {
    /// A variable-length integer never terminated within its byte bound, or
    /// the input ended mid-sequence.
    MalformedVarint { offset: usize },
    /// The embedded type table is structurally invalid: truncated, an
    /// unknown opcode, a dangling index, or non-canonical field ids.
    MalformedTable { offset: usize, context: String },
    /// A value's runtime shape disagrees with its declared descriptor, or a
    /// received type cannot be decoded as the expected type.
    TypeMismatch { context: String },
    /// Argument count disagreement not resolvable by truncating trailing
    /// optional arguments.
    ArityMismatch { expected: usize, found: usize },
    /// Byte-level corruption while parsing the value region.
    ValueDecode { offset: usize, context: String },
    /// The message does not start with the supported magic/version prefix.
    UnsupportedVersion { found: Vec<u8> },
    /// An eager construction-time failure surfaced through a wire entry
    /// point.
    Construction(ConstructionError),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::MalformedVarint { offset } => {
                write!(f, "malformed varint at offset {}", offset)
            }
            WireError::MalformedTable { offset, context } => {
                write!(f, "malformed type table at offset {}: {}", offset, context)
            }
            WireError::TypeMismatch { context } => write!(f, "type mismatch: {}", context),
            WireError::ArityMismatch { expected, found } => {
                write!(f, "expected {} arguments, message carries {}", expected, found)
            }
            WireError::ValueDecode { offset, context } => {
                write!(f, "value decode failed at offset {}: {}", offset, context)
            }
            WireError::UnsupportedVersion { found } => {
                write!(f, "unsupported message prefix {:?}", found)
            }
            WireError::Construction(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Construction(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConstructionError> for WireError {
    fn from(err: ConstructionError) -> Self {
        WireError::Construction(err)
    }
}
