//! The persisted "current user" record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Email, UserId};

/// The record stored under the `user` key by the login flow.
///
/// Only `id` matters to the session stores; everything else the login flow
/// wrote (names, university, ...) is carried through untouched in `profile`.
/// An `email` that does not parse stays in `profile` as written instead of
/// failing the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredUserRecord")]
pub struct UserRecord {
    /// Account identifier used to key per-user data.
    pub id: UserId,
    /// Account email, when the login flow provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// Remaining profile fields, preserved verbatim.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[derive(Deserialize)]
struct StoredUserRecord {
    id: UserId,
    #[serde(flatten)]
    profile: Map<String, Value>,
}

impl From<StoredUserRecord> for UserRecord {
    fn from(stored: StoredUserRecord) -> Self {
        let mut profile = stored.profile;
        let email = match profile.get("email") {
            Some(Value::String(raw)) => Email::parse(raw).ok(),
            _ => None,
        };
        if email.is_some() {
            profile.remove("email");
        }
        Self {
            id: stored.id,
            email,
            profile,
        }
    }
}

impl UserRecord {
    /// A record with just an id.
    #[must_use]
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            profile: Map::new(),
        }
    }

    /// Attach an email address.
    #[must_use]
    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }
}
