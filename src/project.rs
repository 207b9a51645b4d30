use crate::errors::{Error, Result};
use serde_json::Value;

/// A Rancher project, as returned by the `/projects` endpoints.
///
/// Only the attributes the reconciliation needs are kept. Note that project
/// names are not unique within Rancher; the `id` is the only reliable handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub cluster_id: String,
}

impl Project {
    pub fn from_value(url: &str, value: &Value) -> Result<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingKey {
                url: url.to_string(),
                field: "id",
            })?;

        Ok(Project {
            id: id.to_string(),
            name: string_or_default(value, "name"),
            cluster_id: string_or_default(value, "clusterId"),
        })
    }
}

/// An association of one principal with one role on one project
/// (`/projectroletemplatebindings`). Exactly one of the two principal
/// references is set; Rancher returns the other as `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleBinding {
    pub id: String,
    pub project_id: String,
    pub role_template_id: String,
    pub user_principal_id: Option<String>,
    pub group_principal_id: Option<String>,
}

impl RoleBinding {
    pub fn from_value(url: &str, value: &Value) -> Result<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingKey {
                url: url.to_string(),
                field: "id",
            })?;

        Ok(RoleBinding {
            id: id.to_string(),
            project_id: string_or_default(value, "projectId"),
            role_template_id: string_or_default(value, "roleTemplateId"),
            user_principal_id: string_field(value, "userPrincipalId"),
            group_principal_id: string_field(value, "groupPrincipalId"),
        })
    }

    /// The id of the bound principal. Group bindings win over user bindings,
    /// a binding carrying neither is unusable.
    pub fn principal_id(&self) -> Option<&str> {
        self.group_principal_id
            .as_deref()
            .or(self.user_principal_id.as_deref())
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn string_or_default(value: &Value, field: &str) -> String {
    string_field(value, field).unwrap_or_default()
}
