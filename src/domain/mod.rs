//! Domain primitives shared by persistence, the pipeline and the API.
//!
//! Identifiers follow the Newtype pattern so a sequence id can never be passed
//! where a user id is expected.

mod activity;
mod status;

pub use activity::{ActionType, ResultKind};
pub use status::{SequenceStatus, StatusParseError};

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a registered user.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use genevision::domain::UserId;
    ///
    /// let id = UserId::new(7);
    /// assert_eq!(id.value(), 7);
    /// assert_eq!(id.to_string(), "7");
    /// ```
    UserId
);

id_newtype!(
    /// Unique identifier for a submitted sequence. Doubles as the run id that
    /// keys every artifact the pipeline writes for that sequence.
    SequenceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_conversions() {
        let id = SequenceId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(SequenceId::from(42), id);
    }

    #[test]
    fn id_serialization_is_transparent() {
        let id = UserId::new(3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "3");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
