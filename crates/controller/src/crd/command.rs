use std::borrow::Cow;
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::NamespaceResourceScope;
use kube::api::TypeMeta;
use kube::{Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Job;

/// Lifecycle action requested against a job.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum JobAction {
    AbortJob,
    RestartJob,
    RestartTask,
    TerminateJob,
    CompleteJob,
    ResumeJob,
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobAction::AbortJob => write!(f, "AbortJob"),
            JobAction::RestartJob => write!(f, "RestartJob"),
            JobAction::RestartTask => write!(f, "RestartTask"),
            JobAction::TerminateJob => write!(f, "TerminateJob"),
            JobAction::CompleteJob => write!(f, "CompleteJob"),
            JobAction::ResumeJob => write!(f, "ResumeJob"),
        }
    }
}

/// A request for the job controller to run an action on a job. The command
/// is owned by its target job and consumed once executed.
///
/// The bus API keeps its fields at the top level of the object instead of
/// under `spec`, so the resource is declared by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    #[serde(flatten)]
    pub types: TypeMeta,

    pub metadata: ObjectMeta,

    /// Action to perform
    pub action: JobAction,

    /// Object the action applies to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<OwnerReference>,

    /// Short, machine-readable reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Resource for Command {
    type DynamicType = ();
    type Scope = NamespaceResourceScope;

    fn kind(_dt: &()) -> Cow<'_, str> {
        "Command".into()
    }

    fn group(_dt: &()) -> Cow<'_, str> {
        "bus.volcano.sh".into()
    }

    fn version(_dt: &()) -> Cow<'_, str> {
        "v1alpha1".into()
    }

    fn plural(_dt: &()) -> Cow<'_, str> {
        "commands".into()
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Command {
    /// Builds a command targeting `job`, owned by it and named after it.
    pub fn for_job(job: &Job, action: JobAction) -> Self {
        let owner = job.controller_owner_ref(&());
        Command {
            types: TypeMeta {
                api_version: Self::api_version(&()).into_owned(),
                kind: Self::kind(&()).into_owned(),
            },
            metadata: ObjectMeta {
                generate_name: Some(format!(
                    "{}-{}-",
                    job.name_any(),
                    action.to_string().to_lowercase()
                )),
                namespace: job.namespace(),
                owner_references: owner.clone().map(|r| vec![r]),
                ..Default::default()
            },
            action,
            target: owner,
            reason: None,
            message: None,
        }
    }
}
