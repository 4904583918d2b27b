use std::fmt::{Display, Formatter};

/// Data distribution trait of a plan node.
#[derive(Hash, Debug, Clone, Eq, PartialEq, Default)]
pub enum DistributionSpec {
    /// No requirement on partitioning.
    #[default]
    Any,
    /// The data set is not partitioned and has only one partition.
    Singleton,
    /// The data set is partitioned according to hash values of columns.
    Hashed(Vec<String>),
    /// The data set has several partitions, but the partitioning doesn't
    /// follow any rule.
    Random,
}

impl DistributionSpec {
    pub fn satisfies(&self, required: &DistributionSpec) -> bool {
        match (self, required) {
            (_, DistributionSpec::Any) => true,
            // A single partition trivially satisfies any partitioning scheme.
            (DistributionSpec::Singleton, _) => true,
            (provided, required) => provided == required,
        }
    }
}

impl Display for DistributionSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionSpec::Any => write!(f, "any"),
            DistributionSpec::Singleton => write!(f, "singleton"),
            DistributionSpec::Hashed(columns) => write!(f, "hashed{:?}", columns),
            DistributionSpec::Random => write!(f, "random"),
        }
    }
}
