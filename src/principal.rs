use crate::errors::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A user or group identity known to Rancher.
///
/// Rancher returns principals in slightly different shapes depending on the
/// endpoint; the `id` is the only attribute that is stable across all of
/// them, so equality and hashing consider the `id` alone.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub principal_type: String,
    pub name: String,
}

impl Principal {
    /// Build a principal out of a deserialized Rancher response object.
    /// `url` is only used to report where an unusable object came from.
    pub fn from_value(url: &str, value: &Value) -> Result<Self> {
        let id = value.get("id").and_then(Value::as_str);
        let principal_type = value.get("principalType").and_then(Value::as_str);
        let name = value.get("name").and_then(Value::as_str);

        match (id, principal_type, name) {
            (Some(id), Some(principal_type), Some(name)) => Ok(Principal {
                id: id.to_string(),
                principal_type: principal_type.to_string(),
                name: name.to_string(),
            }),
            _ => Err(Error::Shape {
                url: url.to_string(),
                body: value.to_string(),
            }),
        }
    }

    pub fn is_group(&self) -> bool {
        self.principal_type == "group"
    }

    /// The role binding field this principal is referenced by.
    pub fn id_key(&self) -> &'static str {
        if self.is_group() {
            "groupPrincipalId"
        } else {
            "userPrincipalId"
        }
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.principal_type, self.name, self.id)
    }
}
