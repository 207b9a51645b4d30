use crate::errors::Result;
use crate::namespace::NamespaceAnnotator;
use crate::principal::Principal;
use crate::rancher::ProjectDirectory;

use k8s_openapi::api::core::v1::Namespace;
use kube::api::ResourceExt;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Role template granted to the principals named by the owners annotation.
pub const PROJECT_OWNER_ROLE: &str = "project-owner";

/// One role the controller manages on referenced projects, driven by one
/// namespace annotation.
#[derive(Debug, Clone)]
pub struct ManagedRole {
    /// Annotation carrying the comma-separated principal names.
    pub annotation: String,
    /// Rancher role template granted to those principals.
    pub role_template_id: String,
}

/// Annotation keys and defaults driving the reconciliation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_name_annotation: String,
    pub project_id_annotation: String,
    pub cluster_name_annotation: String,
    pub default_cluster: String,
    pub managed_roles: Vec<ManagedRole>,
}

/// Converges a single namespace towards the state its annotations declare:
/// the named project exists, the configured role bindings match the declared
/// membership, and the namespace carries the project-id annotation.
///
/// The engine keeps no state between calls; every pass re-reads the world
/// and applies only the missing mutations, so replayed or duplicated events
/// are harmless.
pub struct ReconcileEngine<D, A> {
    directory: D,
    annotator: A,
    settings: Settings,
}

impl<D, A> ReconcileEngine<D, A>
where
    D: ProjectDirectory + Send + Sync,
    A: NamespaceAnnotator + Send + Sync,
{
    pub fn new(directory: D, annotator: A, settings: Settings) -> Self {
        ReconcileEngine {
            directory,
            annotator,
            settings,
        }
    }

    /// Run one reconciliation pass for `namespace`.
    ///
    /// Namespaces without the project-name annotation are skipped entirely.
    /// The project-id annotation is written last, only when every preceding
    /// step succeeded and only when its value actually has to change.
    pub async fn reconcile(&self, namespace: &Namespace) -> Result<()> {
        let annotations = namespace.annotations();
        let project_name = match annotations.get(&self.settings.project_name_annotation) {
            None => return Ok(()),
            Some(name) => name,
        };
        let name = namespace.name_any();
        debug!(namespace = %name, project = %project_name, "inspecting namespace");

        let project = match self.directory.get_project(project_name).await? {
            Some(project) => project,
            None => {
                let cluster = annotations
                    .get(&self.settings.cluster_name_annotation)
                    .map(String::as_str)
                    .unwrap_or(&self.settings.default_cluster);
                info!(
                    namespace = %name,
                    project = %project_name,
                    cluster,
                    "Requested project doesn't exist, creating now"
                );
                self.directory.create_project(project_name, cluster).await?
            }
        };

        for role in &self.settings.managed_roles {
            if let Some(declared) = annotations.get(&role.annotation) {
                self.reconcile_role(&project.id, role, declared).await?;
            }
            // no annotation, no opinion: existing members of this role are
            // left untouched
        }

        if annotations.get(&self.settings.project_id_annotation) == Some(&project.id) {
            return Ok(());
        }

        info!(
            namespace = %name,
            project = %project_name,
            project_id = %project.id,
            "Annotating namespace with its project id"
        );
        self.annotator
            .set_annotation(&name, &self.settings.project_id_annotation, &project.id)
            .await
    }

    /// Bring the members of one role on one project in line with the
    /// annotation value declared on the namespace.
    async fn reconcile_role(
        &self,
        project_id: &str,
        role: &ManagedRole,
        declared: &str,
    ) -> Result<()> {
        // Tokens are split on bare commas; surrounding whitespace is not
        // stripped and makes a token unsearchable.
        let mut desired: HashSet<Principal> = HashSet::new();
        for token in declared.split(',') {
            match self.directory.search_principal(token).await? {
                Some(principal) => {
                    desired.insert(principal);
                }
                None => warn!(
                    token,
                    role = %role.role_template_id,
                    "No principal found by that name, skipping"
                ),
            }
        }

        let current: HashSet<Principal> = self
            .directory
            .get_project_members(project_id, &role.role_template_id)
            .await?
            .into_iter()
            .collect();

        for principal in desired.difference(&current) {
            info!(
                project_id,
                role = %role.role_template_id,
                principal = %principal,
                "Granting role to principal"
            );
            self.directory
                .add_project_member(project_id, &role.role_template_id, principal)
                .await?;
        }
        for principal in current.difference(&desired) {
            info!(
                project_id,
                role = %role.role_template_id,
                principal = %principal,
                "Revoking role from principal"
            );
            self.directory
                .remove_project_member(project_id, &role.role_template_id, principal)
                .await?;
        }

        Ok(())
    }
}
