//! Entity identifiers.
//!
//! Ids are opaque string tokens (UUID v4 underneath) rather than process-local
//! counters: jobs are persisted and looked up across process boundaries, so an
//! id must survive restarts and be safe to hand to external callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id with the given string value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Creates a fresh random id.
            pub fn fresh() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the string value of this id.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

entity_id! {
    /// Unique identifier for a generation job.
    JobId
}

entity_id! {
    /// Identifier shared verbatim by all jobs created from one batch request.
    BatchId
}

entity_id! {
    /// Unique identifier for a rendered poster artifact.
    PosterId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_fresh_is_unique() {
        let id1 = JobId::fresh();
        let id2 = JobId::fresh();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_job_id_display_roundtrip() {
        let id = JobId::new("abc-123");
        assert_eq!(format!("{}", id), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_job_id_from_str() {
        let id: JobId = "from-str".into();
        assert_eq!(id.as_str(), "from-str");
    }

    #[test]
    fn test_batch_id_equality() {
        let a = BatchId::new("batch-1");
        let b = BatchId::new("batch-1");
        assert_eq!(a, b);
    }
}
