//! Typed identifiers for the compliance engine.
//!
//! Each entity gets its own newtype over [`Uuid`] so that department and
//! position identifiers cannot be mixed up in targeting sets, and rule,
//! employee, and assignment identifiers stay distinct at the type level.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identifier of a compliance rule.
    RuleId
);
id_type!(
    /// Identifier of an employee in the directory.
    EmployeeId
);
id_type!(
    /// Surrogate identifier of a compliance assignment.
    AssignmentId
);
id_type!(
    /// Identifier of a department.
    DepartmentId
);
id_type!(
    /// Identifier of a position.
    PositionId
);
id_type!(
    /// Identifier of a company scope.
    CompanyId
);
id_type!(
    /// External reference to a training course.
    CourseId
);
