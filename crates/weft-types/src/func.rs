use std::fmt;

use crate::{ConstructionError, Type};

/// Annotation flag on a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncMode {
    /// Read-only call; the callee promises not to mutate state.
    Query,
    /// Fire-and-forget: the caller does not wait for a reply.
    Oneway,
}

impl FuncMode {
    pub const fn wire_byte(self) -> u8 {
        match self {
            FuncMode::Query => 1,
            FuncMode::Oneway => 2,
        }
    }

    pub fn from_wire_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(FuncMode::Query),
            2 => Some(FuncMode::Oneway),
            _ => None,
        }
    }
}

/// A remote-callable function signature: ordered argument types, ordered
/// return types, annotation flags.
///
/// Doubles as the payload of [`Type::Func`] and as the standalone signature
/// object an RPC boundary validates calls against. Immutable once built;
/// construct one per declared method and share it freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    pub args: Vec<Type>,
    pub rets: Vec<Type>,
    pub modes: Vec<FuncMode>,
}

impl FuncType {
    pub fn new(args: Vec<Type>, rets: Vec<Type>) -> Self {
        FuncType {
            args,
            rets,
            modes: Vec::new(),
        }
    }

    /// Mark the signature as a query.
    pub fn query(mut self) -> Self {
        self.modes.push(FuncMode::Query);
        self
    }

    /// Mark the signature as one-way (no reply).
    pub fn oneway(mut self) -> Self {
        self.modes.push(FuncMode::Oneway);
        self
    }

    pub fn is_oneway(&self) -> bool {
        self.modes.contains(&FuncMode::Oneway)
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func (")?;
        write_types(f, &self.args)?;
        write!(f, ") -> (")?;
        write_types(f, &self.rets)?;
        write!(f, ")")?;
        for mode in &self.modes {
            match mode {
                FuncMode::Query => write!(f, " query")?,
                FuncMode::Oneway => write!(f, " oneway")?,
            }
        }
        Ok(())
    }
}

fn write_types(f: &mut fmt::Formatter<'_>, types: &[Type]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

/// A service shape: method names mapped to function signatures, held in
/// ascending name order (the wire's canonical order).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ServiceType {
    methods: Vec<(String, FuncType)>,
}

impl ServiceType {
    pub fn new<I, S>(methods: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = (S, FuncType)>,
        S: Into<String>,
    {
        let mut methods: Vec<(String, FuncType)> = methods
            .into_iter()
            .map(|(name, func)| (name.into(), func))
            .collect();
        methods.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in methods.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(ConstructionError::DuplicateMethod {
                    name: pair[0].0.clone(),
                });
            }
        }
        Ok(ServiceType { methods })
    }

    /// Methods in ascending name order.
    pub fn methods(&self) -> &[(String, FuncType)] {
        &self.methods
    }

    pub(crate) fn from_sorted(methods: Vec<(String, FuncType)>) -> Self {
        ServiceType { methods }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service {{")?;
        for (i, (name, func)) in self.methods.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, " {}: {}", name, func)?;
        }
        write!(f, " }}")
    }
}
