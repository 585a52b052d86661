//! Identifier types for pipeline runs and catalog records.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Unique identifier assigned to a single pipeline run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a random run identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::random()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RunId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s).map_err(Error::from)?;
        Ok(Self::from_uuid(uuid))
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw numeric identifier.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw numeric value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the identifier that follows this one.
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|err| Error::InvalidRecordId {
                        kind: $label,
                        value: s.to_owned(),
                        reason: err.to_string(),
                    })
            }
        }
    };
}

numeric_id!(
    /// Stable identifier of a catalog event.
    EventId,
    "event"
);

numeric_id!(
    /// Monotonically assigned identifier of a registered attendee.
    AttendeeId,
    "attendee"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_parses_its_display_form() {
        let id = RunId::random();
        let parsed = id.to_string().parse::<RunId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn attendee_ids_advance_by_one() {
        let id = AttendeeId::new(2);
        assert_eq!(id.next(), AttendeeId::new(3));
        assert!(id < id.next());
    }

    #[test]
    fn event_id_rejects_garbage() {
        let err = "abc".parse::<EventId>().expect_err("not numeric");
        assert!(matches!(err, Error::InvalidRecordId { kind: "event", .. }));
        assert_eq!(" 7 ".parse::<EventId>().unwrap(), EventId::new(7));
    }

    #[test]
    fn numeric_ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&EventId::new(1)).unwrap();
        assert_eq!(json, "1");
    }
}
