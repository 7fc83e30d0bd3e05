use serde::{Deserialize, Serialize};

use crate::domain::employee::JobId;

/// Identifier for a category of approvable workflow, e.g. `leave-request`.
///
/// The identity is immutable; the role assignments attached to a path may
/// change over time without invalidating records created under it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatoryPath(pub String);

impl SignatoryPath {
    pub fn normalized(&self) -> String {
        normalize_key(&self.0)
    }
}

/// One configuration row binding a path to a required signatory.
///
/// Assignments sharing an `order_number` form a parallel step. When
/// `applies_to_all` is set, every eligible holder of `job_id` must sign;
/// otherwise any single holder suffices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub path: SignatoryPath,
    pub order_number: u32,
    pub job_id: JobId,
    pub role: String,
    pub applies_to_all: bool,
}

pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::SignatoryPath;

    #[test]
    fn path_normalization_trims_and_lowercases() {
        assert_eq!(SignatoryPath("  Leave-Request ".to_owned()).normalized(), "leave-request");
    }
}
