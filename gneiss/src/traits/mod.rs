//! Physical traits of plan nodes.
//!
//! A trait is an independently-assignable physical property of a plan node,
//! such as the execution backend it targets ([`Convention`]), its sort order
//! ([`Collation`]) or its data distribution ([`DistributionSpec`]). Trait
//! dimensions are declared by [`TraitDef`]s registered in a
//! [`TraitRegistry`]; a [`TraitSet`] holds exactly one value per registered
//! dimension.
//!
//! Satisfaction between trait sets is asymmetric and checked per dimension:
//! a convention matches by equality, while a collation sorted by `(a, b)`
//! satisfies a requirement for "sorted by `a`". This is what lets the engine
//! reuse a plan computed for a stronger guarantee wherever a weaker one is
//! required.

mod convention;
pub use convention::*;
mod collation;
pub use collation::*;
mod distribution;
pub use distribution::*;

use std::fmt::{Debug, Display, Formatter};

use smallvec::SmallVec;

use crate::error::{OptError, OptResult};

/// Names one trait dimension.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TraitDef {
    Convention,
    Collation,
    Distribution,
}

impl TraitDef {
    /// The value a node carries in this dimension when nothing has been
    /// derived or required.
    pub fn default_trait(&self) -> RelTrait {
        match self {
            TraitDef::Convention => RelTrait::Convention(Convention::NONE),
            TraitDef::Collation => RelTrait::Collation(Collation::default()),
            TraitDef::Distribution => RelTrait::Distribution(DistributionSpec::default()),
        }
    }
}

/// One trait value, tagged with the dimension it belongs to.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum RelTrait {
    Convention(Convention),
    Collation(Collation),
    Distribution(DistributionSpec),
}

impl RelTrait {
    pub fn def(&self) -> TraitDef {
        match self {
            RelTrait::Convention(_) => TraitDef::Convention,
            RelTrait::Collation(_) => TraitDef::Collation,
            RelTrait::Distribution(_) => TraitDef::Distribution,
        }
    }

    fn satisfies(&self, required: &RelTrait) -> bool {
        match (self, required) {
            (RelTrait::Convention(provided), RelTrait::Convention(required)) => {
                provided == required
            }
            (RelTrait::Collation(provided), RelTrait::Collation(required)) => {
                provided.satisfies(required)
            }
            (RelTrait::Distribution(provided), RelTrait::Distribution(required)) => {
                provided.satisfies(required)
            }
            _ => false,
        }
    }
}

impl Display for RelTrait {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RelTrait::Convention(convention) => write!(f, "{}", convention),
            RelTrait::Collation(collation) => write!(f, "{}", collation),
            RelTrait::Distribution(dist) => write!(f, "{}", dist),
        }
    }
}

/// The ordered set of trait dimensions active in a planning session.
///
/// Dimensions must be registered before any node referencing them is
/// constructed; every [`TraitSet`] of a session is laid out in registration
/// order.
#[derive(Clone, Debug)]
pub struct TraitRegistry {
    defs: Vec<TraitDef>,
}

impl Default for TraitRegistry {
    fn default() -> Self {
        Self {
            defs: vec![TraitDef::Convention, TraitDef::Collation],
        }
    }
}

impl TraitRegistry {
    pub fn register(&mut self, def: TraitDef) {
        if !self.defs.contains(&def) {
            self.defs.push(def);
        }
    }

    pub fn defs(&self) -> &[TraitDef] {
        &self.defs
    }

    /// Trait set with the default value in every registered dimension, i.e.
    /// an abstract node with no guarantees.
    pub fn default_set(&self) -> TraitSet {
        TraitSet {
            traits: self.defs.iter().map(|def| def.default_trait()).collect(),
        }
    }

    /// Checks that `traits` holds exactly one value per registered dimension,
    /// in registration order.
    pub fn validate(&self, traits: &TraitSet) -> OptResult<()> {
        let dims: Vec<TraitDef> = traits.traits.iter().map(|t| t.def()).collect();
        if dims != self.defs {
            return Err(OptError::internal(format!(
                "trait set {:?} does not match registered trait defs {:?}",
                dims, self.defs
            )));
        }
        Ok(())
    }
}

/// An immutable, ordered collection holding one trait value per registered
/// dimension.
///
/// Deriving a new trait set is always a copy with one dimension replaced,
/// see [`TraitSet::with_convention`] and friends.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct TraitSet {
    traits: SmallVec<[RelTrait; 2]>,
}

impl TraitSet {
    pub fn convention(&self) -> Convention {
        for t in &self.traits {
            if let RelTrait::Convention(convention) = t {
                return *convention;
            }
        }
        Convention::NONE
    }

    pub fn collation(&self) -> Collation {
        for t in &self.traits {
            if let RelTrait::Collation(collation) = t {
                return collation.clone();
            }
        }
        Collation::default()
    }

    pub fn distribution(&self) -> DistributionSpec {
        for t in &self.traits {
            if let RelTrait::Distribution(dist) = t {
                return dist.clone();
            }
        }
        DistributionSpec::default()
    }

    pub fn with_convention(&self, convention: Convention) -> TraitSet {
        self.replace(RelTrait::Convention(convention))
    }

    pub fn with_collation(&self, collation: Collation) -> TraitSet {
        self.replace(RelTrait::Collation(collation))
    }

    pub fn with_distribution(&self, dist: DistributionSpec) -> TraitSet {
        self.replace(RelTrait::Distribution(dist))
    }

    /// Copy of this set with the value in `new_trait`'s dimension replaced.
    pub fn replace(&self, new_trait: RelTrait) -> TraitSet {
        let mut traits = self.traits.clone();
        for t in traits.iter_mut() {
            if t.def() == new_trait.def() {
                *t = new_trait;
                return TraitSet { traits };
            }
        }
        // Dimension not registered in this set; ignore the replacement. The
        // registry validation at memo insertion reports the misuse.
        TraitSet { traits }
    }

    /// Tests whether every requirement in `required` is satisfied by the
    /// corresponding trait of this set.
    pub fn satisfies(&self, required: &TraitSet) -> bool {
        required.traits.iter().all(|req| {
            self.traits
                .iter()
                .find(|t| t.def() == req.def())
                .map(|t| t.satisfies(req))
                .unwrap_or(false)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelTrait> {
        self.traits.iter()
    }
}

impl Display for TraitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, t) in self.traits.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", t)?;
        }
        Ok(())
    }
}

impl Debug for TraitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use crate::traits::{
        Collation, ColumnOrder, Convention, DistributionSpec, TraitDef, TraitRegistry,
    };

    #[test]
    fn test_default_set() {
        let registry = TraitRegistry::default();
        let traits = registry.default_set();

        assert!(traits.convention().is_none());
        assert!(traits.collation().is_empty());
        registry.validate(&traits).unwrap();
    }

    #[test]
    fn test_copy_with_replacement() {
        let registry = TraitRegistry::default();
        let none = registry.default_set();
        let row = none.with_convention(Convention::new("ROW"));

        assert!(none.convention().is_none());
        assert_eq!(Convention::new("ROW"), row.convention());
        assert_ne!(none, row);
    }

    #[test]
    fn test_satisfaction_is_asymmetric() {
        let registry = TraitRegistry::default();
        let row = registry.default_set().with_convention(Convention::new("ROW"));
        let sorted = row.with_collation(Collation::new(vec![
            ColumnOrder::asc("a"),
            ColumnOrder::asc("b"),
        ]));
        let required = row.with_collation(Collation::new(vec![ColumnOrder::asc("a")]));

        assert!(sorted.satisfies(&required));
        assert!(!required.satisfies(&sorted));
        // Convention matches by exact equality.
        assert!(!registry.default_set().satisfies(&row));
    }

    #[test]
    fn test_registered_distribution_dimension() {
        let mut registry = TraitRegistry::default();
        registry.register(TraitDef::Distribution);

        let traits = registry.default_set();
        registry.validate(&traits).unwrap();

        let hashed = traits
            .with_distribution(DistributionSpec::Hashed(vec!["c1".to_string()]));
        assert!(hashed.satisfies(&traits));

        // A set from another registry fails validation.
        registry
            .validate(&TraitRegistry::default().default_set())
            .unwrap_err();
    }
}
