//! In-memory stand-ins for the controller's collaborators, used by the
//! engine and controller tests. They record every call they receive so tests
//! can assert on exactly which mutations a reconciliation performed.

use crate::errors::{Error, Result};
use crate::namespace::NamespaceAnnotator;
use crate::principal::Principal;
use crate::project::Project;
use crate::rancher::ProjectDirectory;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::core::ObjectMeta;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One call received by a [`FakeDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    GetProject(String),
    CreateProject {
        name: String,
        cluster: String,
    },
    SearchPrincipal(String),
    GetMembers {
        project_id: String,
        role: String,
    },
    AddMember {
        project_id: String,
        role: String,
        principal: String,
    },
    RemoveMember {
        project_id: String,
        role: String,
        principal: String,
    },
}

#[derive(Default)]
struct DirectoryState {
    projects: Vec<Project>,
    clusters: Vec<String>,
    principals: HashMap<String, Principal>,
    members: HashMap<(String, String), Vec<Principal>>,
    calls: Vec<DirectoryCall>,
    next_id: u32,
    failing_projects: HashSet<String>,
    failing_members: HashSet<String>,
}

/// A [`ProjectDirectory`] living entirely in memory.
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<DirectoryState>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        FakeDirectory::default()
    }

    pub fn with_project(self, project: Project) -> Self {
        self.state.lock().unwrap().projects.push(project);
        self
    }

    pub fn with_cluster(self, name: &str) -> Self {
        self.state.lock().unwrap().clusters.push(name.to_string());
        self
    }

    pub fn with_principal(self, token: &str, principal: Principal) -> Self {
        self.state
            .lock()
            .unwrap()
            .principals
            .insert(token.to_string(), principal);
        self
    }

    pub fn with_members(self, project_id: &str, role: &str, members: Vec<Principal>) -> Self {
        self.state
            .lock()
            .unwrap()
            .members
            .insert((project_id.to_string(), role.to_string()), members);
        self
    }

    /// Make every project lookup for `name` fail with a shape error.
    pub fn failing_project(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_projects
            .insert(name.to_string());
        self
    }

    /// Make every member listing for `project_id` fail with a shape error.
    pub fn failing_members(self, project_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_members
            .insert(project_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn members(&self, project_id: &str, role: &str) -> Vec<Principal> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&(project_id.to_string(), role.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn shape_error(url: String) -> Error {
        Error::Shape {
            url,
            body: "{}".to_string(),
        }
    }
}

#[async_trait]
impl ProjectDirectory for FakeDirectory {
    async fn get_project(&self, name: &str) -> Result<Option<Project>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DirectoryCall::GetProject(name.to_string()));
        if state.failing_projects.contains(name) {
            return Err(Self::shape_error(format!("/projects?name={name}")));
        }
        Ok(state.projects.iter().find(|p| p.name == name).cloned())
    }

    async fn create_project(&self, name: &str, cluster: &str) -> Result<Project> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DirectoryCall::CreateProject {
            name: name.to_string(),
            cluster: cluster.to_string(),
        });
        if !state.clusters.iter().any(|c| c == cluster) {
            return Err(Error::ClusterNotFound(cluster.to_string()));
        }
        state.next_id += 1;
        let project = Project {
            id: format!("p-{}", state.next_id),
            name: name.to_string(),
            cluster_id: format!("c-{cluster}"),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn search_principal(&self, token: &str) -> Result<Option<Principal>> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(DirectoryCall::SearchPrincipal(token.to_string()));
        Ok(state.principals.get(token).cloned())
    }

    async fn get_project_members(
        &self,
        project_id: &str,
        role_template_id: &str,
    ) -> Result<Vec<Principal>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DirectoryCall::GetMembers {
            project_id: project_id.to_string(),
            role: role_template_id.to_string(),
        });
        if state.failing_members.contains(project_id) {
            return Err(Self::shape_error(format!(
                "/projectroletemplatebindings?projectId={project_id}"
            )));
        }
        Ok(state
            .members
            .get(&(project_id.to_string(), role_template_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_project_member(
        &self,
        project_id: &str,
        role_template_id: &str,
        principal: &Principal,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DirectoryCall::AddMember {
            project_id: project_id.to_string(),
            role: role_template_id.to_string(),
            principal: principal.id.clone(),
        });
        let members = state
            .members
            .entry((project_id.to_string(), role_template_id.to_string()))
            .or_default();
        if !members.contains(principal) {
            members.push(principal.clone());
        }
        Ok(())
    }

    async fn remove_project_member(
        &self,
        project_id: &str,
        role_template_id: &str,
        principal: &Principal,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DirectoryCall::RemoveMember {
            project_id: project_id.to_string(),
            role: role_template_id.to_string(),
            principal: principal.id.clone(),
        });
        if let Some(members) = state
            .members
            .get_mut(&(project_id.to_string(), role_template_id.to_string()))
        {
            members.retain(|member| member != principal);
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectDirectory for Arc<FakeDirectory> {
    async fn get_project(&self, name: &str) -> Result<Option<Project>> {
        self.as_ref().get_project(name).await
    }

    async fn create_project(&self, name: &str, cluster: &str) -> Result<Project> {
        self.as_ref().create_project(name, cluster).await
    }

    async fn search_principal(&self, token: &str) -> Result<Option<Principal>> {
        self.as_ref().search_principal(token).await
    }

    async fn get_project_members(
        &self,
        project_id: &str,
        role_template_id: &str,
    ) -> Result<Vec<Principal>> {
        self.as_ref()
            .get_project_members(project_id, role_template_id)
            .await
    }

    async fn add_project_member(
        &self,
        project_id: &str,
        role_template_id: &str,
        principal: &Principal,
    ) -> Result<()> {
        self.as_ref()
            .add_project_member(project_id, role_template_id, principal)
            .await
    }

    async fn remove_project_member(
        &self,
        project_id: &str,
        role_template_id: &str,
        principal: &Principal,
    ) -> Result<()> {
        self.as_ref()
            .remove_project_member(project_id, role_template_id, principal)
            .await
    }
}

/// A [`NamespaceAnnotator`] recording the patches it was asked to apply.
#[derive(Default)]
pub struct FakeAnnotator {
    patches: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl FakeAnnotator {
    pub fn new() -> Self {
        FakeAnnotator::default()
    }

    /// An annotator whose patches fail the way a misbehaving API server
    /// would: with an error the controller must treat as fatal.
    pub fn failing() -> Self {
        FakeAnnotator {
            patches: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn patches(&self) -> Vec<(String, String, String)> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl NamespaceAnnotator for FakeAnnotator {
    async fn set_annotation(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".to_string(),
                message: "the server is misbehaving".to_string(),
                reason: "InternalError".to_string(),
                code: 500,
            })));
        }
        self.patches.lock().unwrap().push((
            namespace.to_string(),
            key.to_string(),
            value.to_string(),
        ));
        Ok(())
    }
}

#[async_trait]
impl NamespaceAnnotator for Arc<FakeAnnotator> {
    async fn set_annotation(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.as_ref().set_annotation(namespace, key, value).await
    }
}

/// A namespace carrying the given annotations.
pub fn namespace(name: &str, annotations: &[(&str, &str)]) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            ),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    }
}

/// A user principal.
pub fn user(id: &str, name: &str) -> Principal {
    Principal {
        id: id.to_string(),
        principal_type: "user".to_string(),
        name: name.to_string(),
    }
}

/// The settings every engine and controller test runs with.
pub fn test_settings() -> crate::engine::Settings {
    crate::engine::Settings {
        project_name_annotation: "project-name-annotation".to_string(),
        project_id_annotation: "project-id-annotation".to_string(),
        cluster_name_annotation: "cluster-name-annotation".to_string(),
        default_cluster: "default-cluster".to_string(),
        managed_roles: vec![crate::engine::ManagedRole {
            annotation: "owners-annotation".to_string(),
            role_template_id: "project-owner".to_string(),
        }],
    }
}
