use std::collections::HashSet;

use crate::{ConstructionError, FuncType, Type};

/// Arena of type definitions that [`Type::Ref`] indices resolve against.
///
/// Recursive shapes are declared in two phases so the knot can be tied
/// without mutation-after-construction:
///
/// ```
/// use weft_types::{Type, TypeEnv};
///
/// let mut env = TypeEnv::new();
/// let node = env.reserve();
/// env.define(
///     &node,
///     Type::record([
///         ("value", Type::Nat),
///         ("next", Type::option(node.clone())),
///     ])
///     .unwrap(),
/// )
/// .unwrap();
/// ```
///
/// A decoded message's type table is materialized as a `TypeEnv` whose `Ref`
/// indices are the wire table indices. Environments are cheap to build, are
/// never shared mutably, and are read-only during encode and decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEnv {
    defs: Vec<Option<Type>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv::default()
    }

    /// Build an environment where every slot is already defined, e.g. from a
    /// parsed wire table.
    pub fn from_defs(defs: Vec<Type>) -> Self {
        TypeEnv {
            defs: defs.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Reserve a slot and return the `Type::Ref` that points at it.
    pub fn reserve(&mut self) -> Type {
        let index = self.defs.len() as u32;
        self.defs.push(None);
        Type::Ref(index)
    }

    /// Add a definition immediately, returning the `Type::Ref` that points
    /// at it.
    pub fn add(&mut self, ty: Type) -> Type {
        let index = self.defs.len() as u32;
        self.defs.push(Some(ty));
        Type::Ref(index)
    }

    /// Fill a slot previously returned by [`reserve`](TypeEnv::reserve).
    ///
    /// Rejects double definition, and rejects the definition that closes a
    /// cycle made only of bare references (such a chain names no constructor
    /// and would expand forever).
    pub fn define(&mut self, slot: &Type, ty: Type) -> Result<(), ConstructionError> {
        let Type::Ref(index) = slot else {
            return Err(ConstructionError::NotAReference);
        };
        let index = *index;
        match self.defs.get(index as usize) {
            None => return Err(ConstructionError::UnboundReference { index }),
            Some(Some(_)) => return Err(ConstructionError::SlotAlreadyDefined { index }),
            Some(None) => {}
        }
        self.check_productive(index, &ty)?;
        self.defs[index as usize] = Some(ty);
        Ok(())
    }

    fn check_productive(&self, slot: u32, ty: &Type) -> Result<(), ConstructionError> {
        let mut cur = ty;
        let mut hops = 0usize;
        while let Type::Ref(next) = cur {
            if *next == slot || hops > self.defs.len() {
                return Err(ConstructionError::IllFormedRecursion { index: slot });
            }
            hops += 1;
            match self.defs.get(*next as usize) {
                // Chains may run through reserved-but-undefined slots; the
                // define that closes a bad cycle is the one that errors.
                None | Some(None) => return Ok(()),
                Some(Some(def)) => cur = def,
            }
        }
        Ok(())
    }

    /// Look up a definition by slot index.
    pub fn get(&self, index: u32) -> Result<&Type, ConstructionError> {
        match self.defs.get(index as usize) {
            Some(Some(ty)) => Ok(ty),
            _ => Err(ConstructionError::UnboundReference { index }),
        }
    }

    /// Follow `Ref` chains until a constructor (or primitive) is reached.
    pub fn resolve<'a>(&'a self, ty: &'a Type) -> Result<&'a Type, ConstructionError> {
        let mut cur = ty;
        let mut hops = 0usize;
        while let Type::Ref(index) = cur {
            if hops > self.defs.len() {
                return Err(ConstructionError::IllFormedRecursion { index: *index });
            }
            hops += 1;
            cur = self.get(*index)?;
        }
        Ok(cur)
    }

    /// Validate every definition in the environment.
    ///
    /// Confirms that all reserved slots were defined and that every
    /// reference reachable from any definition is bound. The walk carries a
    /// visited set keyed by slot index, so recursive and mutually recursive
    /// definitions terminate.
    pub fn check(&self) -> Result<(), ConstructionError> {
        for (index, def) in self.defs.iter().enumerate() {
            if def.is_none() {
                return Err(ConstructionError::UnboundReference {
                    index: index as u32,
                });
            }
        }
        let mut visited = HashSet::new();
        for index in 0..self.defs.len() as u32 {
            self.walk_idx(index, &mut visited)?;
        }
        Ok(())
    }

    /// Validate the definition graph reachable from one slot.
    pub fn check_idx(&self, index: u32) -> Result<(), ConstructionError> {
        let mut visited = HashSet::new();
        self.walk_idx(index, &mut visited)
    }

    fn walk_idx(&self, index: u32, visited: &mut HashSet<u32>) -> Result<(), ConstructionError> {
        if !visited.insert(index) {
            return Ok(());
        }
        let def = self.get(index)?;
        self.walk(def, visited)
    }

    fn walk(&self, ty: &Type, visited: &mut HashSet<u32>) -> Result<(), ConstructionError> {
        match ty {
            Type::Option(inner) | Type::Vector(inner) => self.walk(inner, visited),
            Type::Record(fields) | Type::Variant(fields) => {
                for field in fields {
                    self.walk(&field.ty, visited)?;
                }
                Ok(())
            }
            Type::Func(func) => self.walk_func(func, visited),
            Type::Service(service) => {
                for (_, func) in service.methods() {
                    self.walk_func(func, visited)?;
                }
                Ok(())
            }
            Type::Ref(index) => self.walk_idx(*index, visited),
            _ => Ok(()),
        }
    }

    fn walk_func(
        &self,
        func: &FuncType,
        visited: &mut HashSet<u32>,
    ) -> Result<(), ConstructionError> {
        for ty in func.args.iter().chain(func.rets.iter()) {
            self.walk(ty, visited)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConstructionError;

    #[test]
    fn reserve_define_resolve() {
        let mut env = TypeEnv::new();
        let node = env.reserve();
        let body = Type::record([("value", Type::Nat), ("next", Type::option(node.clone()))])
            .unwrap();
        env.define(&node, body.clone()).unwrap();
        assert_eq!(env.resolve(&node).unwrap(), &body);
        env.check().unwrap();
    }

    #[test]
    fn mutual_recursion_checks_out() {
        let mut env = TypeEnv::new();
        let parent = env.reserve();
        let child = env.reserve();
        env.define(
            &parent,
            Type::record([("children", Type::vector(child.clone()))]).unwrap(),
        )
        .unwrap();
        env.define(
            &child,
            Type::record([("parent", Type::option(parent.clone()))]).unwrap(),
        )
        .unwrap();
        env.check().unwrap();
    }

    #[test]
    fn bare_reference_cycle_is_rejected() {
        let mut env = TypeEnv::new();
        let a = env.reserve();
        let b = env.reserve();
        env.define(&a, b.clone()).unwrap();
        let err = env.define(&b, a.clone()).unwrap_err();
        assert_eq!(err, ConstructionError::IllFormedRecursion { index: 1 });
    }

    #[test]
    fn self_reference_without_constructor_is_rejected() {
        let mut env = TypeEnv::new();
        let a = env.reserve();
        let err = env.define(&a, a.clone()).unwrap_err();
        assert_eq!(err, ConstructionError::IllFormedRecursion { index: 0 });
    }

    #[test]
    fn undefined_slot_fails_check() {
        let mut env = TypeEnv::new();
        let _never_defined = env.reserve();
        assert_eq!(
            env.check().unwrap_err(),
            ConstructionError::UnboundReference { index: 0 }
        );
    }

    #[test]
    fn double_define_is_rejected() {
        let mut env = TypeEnv::new();
        let slot = env.reserve();
        env.define(&slot, Type::Nat).unwrap();
        assert_eq!(
            env.define(&slot, Type::Text).unwrap_err(),
            ConstructionError::SlotAlreadyDefined { index: 0 }
        );
    }

    #[test]
    fn dangling_reference_fails_check() {
        let mut env = TypeEnv::new();
        env.add(Type::option(Type::Ref(7)));
        assert_eq!(
            env.check().unwrap_err(),
            ConstructionError::UnboundReference { index: 7 }
        );
    }
}
