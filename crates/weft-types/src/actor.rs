use std::collections::BTreeMap;

use crate::{ConstructionError, FuncType, ServiceType, Type};

/// An actor's callable surface: method names mapped to signatures.
///
/// Captured once from a configuration iterator and immutable afterwards.
/// This is a schema for validating individual calls, not a dispatcher —
/// routing a decoded call to a handler belongs to the runtime that owns the
/// actor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActorInterface {
    methods: BTreeMap<String, FuncType>,
}

impl ActorInterface {
    pub fn new<I, S>(methods: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = (S, FuncType)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, func) in methods {
            let name = name.into();
            if map.contains_key(&name) {
                return Err(ConstructionError::DuplicateMethod { name });
            }
            map.insert(name, func);
        }
        Ok(ActorInterface { methods: map })
    }

    /// Signature of one method, if declared.
    pub fn method(&self, name: &str) -> Option<&FuncType> {
        self.methods.get(name)
    }

    /// Methods in ascending name order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &FuncType)> {
        self.methods.iter().map(|(name, func)| (name.as_str(), func))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// The corresponding `service` descriptor, for embedding the interface
    /// shape in a message.
    pub fn to_type(&self) -> Type {
        let methods = self
            .methods
            .iter()
            .map(|(name, func)| (name.clone(), func.clone()))
            .collect();
        // BTreeMap iteration is already ascending and duplicate-free.
        Type::Service(ServiceType::from_sorted(methods))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_iteration() {
        let iface = ActorInterface::new([
            ("greet", FuncType::new(vec![Type::Text], vec![Type::Text])),
            ("poke", FuncType::new(vec![], vec![]).oneway()),
        ])
        .unwrap();
        assert_eq!(iface.len(), 2);
        assert!(iface.method("greet").is_some());
        assert!(iface.method("greet").unwrap().args == vec![Type::Text]);
        assert!(iface.method("missing").is_none());
        let names: Vec<_> = iface.methods().map(|(n, _)| n).collect();
        assert_eq!(names, ["greet", "poke"]);
    }

    #[test]
    fn duplicate_method_is_rejected() {
        let err = ActorInterface::new([
            ("ping", FuncType::default()),
            ("ping", FuncType::default()),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::DuplicateMethod {
                name: "ping".into()
            }
        );
    }

    #[test]
    fn to_type_matches_service_constructor() {
        let iface = ActorInterface::new([("a", FuncType::default()), ("b", FuncType::default())])
            .unwrap();
        let direct = Type::service([("a", FuncType::default()), ("b", FuncType::default())])
            .unwrap();
        assert_eq!(iface.to_type(), direct);
    }
}
