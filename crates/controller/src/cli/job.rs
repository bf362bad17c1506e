use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use clap::{Args, Subcommand};
use kube::{
    api::{Api, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client,
};
use tracing::info;

use crate::{
    crd::{Command, Job, JobAction},
    Error, Result,
};

/// Connection flags shared by every job command.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonFlags {
    /// Address of the Kubernetes API server, overrides the kubeconfig
    #[arg(short = 's', long, default_value = "")]
    pub master: String,

    /// Path to the kubeconfig file
    #[arg(short = 'k', long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ActionFlags {
    #[command(flatten)]
    pub common: CommonFlags,

    /// The namespace of job
    #[arg(short = 'N', long, default_value = "default")]
    pub namespace: String,

    /// The name of job
    #[arg(short = 'n', long, default_value = "")]
    pub name: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum JobCommand {
    /// Resume a suspended job
    Resume(ActionFlags),
    /// Suspend a job, keeping it resumable
    Suspend(ActionFlags),
    /// Abort a job for good
    Abort(ActionFlags),
}

impl JobCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            JobCommand::Resume(_) => "resume",
            JobCommand::Suspend(_) => "suspend",
            JobCommand::Abort(_) => "abort",
        }
    }

    pub fn action(&self) -> JobAction {
        match self {
            JobCommand::Resume(_) => JobAction::ResumeJob,
            JobCommand::Suspend(_) => JobAction::AbortJob,
            JobCommand::Abort(_) => JobAction::TerminateJob,
        }
    }

    pub fn flags(&self) -> &ActionFlags {
        match self {
            JobCommand::Resume(flags) | JobCommand::Suspend(flags) | JobCommand::Abort(flags) => {
                flags
            }
        }
    }
}

/// Submits lifecycle actions to the cluster.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionClient: Send + Sync {
    async fn submit(&self, namespace: &str, job_name: &str, action: JobAction) -> Result<()>;
}

/// Creates a `Command` resource owned by the target job.
pub struct KubeActionClient {
    client: Client,
}

impl KubeActionClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionClient for KubeActionClient {
    async fn submit(&self, namespace: &str, job_name: &str, action: JobAction) -> Result<()> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let job = jobs
            .get(job_name)
            .await
            .map_err(|e| Error::Kubernetes(e.to_string()))?;

        let command = Command::for_job(&job, action);

        let commands: Api<Command> = Api::namespaced(self.client.clone(), namespace);
        commands
            .create(&PostParams::default(), &command)
            .await
            .map_err(|e| Error::Kubernetes(e.to_string()))?;

        Ok(())
    }
}

pub fn validate_job_name(name: &str, verb: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation(format!(
            "job name is mandatory to {} a particular job",
            verb
        )));
    }
    Ok(())
}

/// Validates the flags and submits the command's action through `client`.
pub async fn submit_action(client: &dyn ActionClient, command: &JobCommand) -> Result<()> {
    let flags = command.flags();
    validate_job_name(&flags.name, command.verb())?;

    client
        .submit(&flags.namespace, &flags.name, command.action())
        .await?;

    info!(
        "Submitted {} for job {}/{}",
        command.action(),
        flags.namespace,
        flags.name
    );
    Ok(())
}

/// Runs a job command against the cluster selected by its flags. Input is
/// validated before any connection is made.
pub async fn execute(command: &JobCommand) -> Result<()> {
    let flags = command.flags();
    validate_job_name(&flags.name, command.verb())?;

    let config = build_config(&flags.common.master, flags.common.kubeconfig.as_deref()).await?;
    let client = Client::try_from(config).map_err(|e| Error::Kubernetes(e.to_string()))?;

    submit_action(&KubeActionClient::new(client), command).await
}

/// Loads the kubeconfig at `kubeconfig` (or infers one from the environment)
/// and points it at `master` when given.
pub async fn build_config(master: &str, kubeconfig: Option<&Path>) -> Result<kube::Config> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig =
                Kubeconfig::read_from(path).map_err(|e| Error::Config(e.to_string()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::Config(e.to_string()))?
        }
        None => kube::Config::infer()
            .await
            .map_err(|e| Error::Config(e.to_string()))?,
    };

    if !master.is_empty() {
        config.cluster_url = parse_master(master)?;
    }
    Ok(config)
}

fn parse_master<T>(master: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    master
        .parse::<T>()
        .map_err(|e| Error::Config(format!("invalid master address {}: {}", master, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: JobCommand,
    }

    fn flags(name: &str) -> ActionFlags {
        ActionFlags {
            namespace: "default".to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_job_name_is_rejected_before_submission() {
        let mut client = MockActionClient::new();
        client.expect_submit().times(0);

        let err = submit_action(&client, &JobCommand::Resume(flags("")))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(err
            .to_string()
            .contains("job name is mandatory to resume a particular job"));
    }

    #[tokio::test]
    async fn message_names_the_action() {
        let client = MockActionClient::new();
        let err = submit_action(&client, &JobCommand::Suspend(flags("")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mandatory to suspend"));
    }

    #[tokio::test]
    async fn execute_validates_before_connecting() {
        let err = execute(&JobCommand::Abort(flags(""))).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn submits_mapped_action() {
        let mut client = MockActionClient::new();
        client
            .expect_submit()
            .withf(|namespace, name, action| {
                namespace == "ml" && name == "tf-job" && *action == JobAction::ResumeJob
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut resume = flags("tf-job");
        resume.namespace = "ml".to_string();
        submit_action(&client, &JobCommand::Resume(resume)).await.unwrap();
    }

    #[tokio::test]
    async fn submission_errors_propagate() {
        let mut client = MockActionClient::new();
        client
            .expect_submit()
            .returning(|_, _, _| Err(Error::Kubernetes("jobs.batch.volcano.sh \"x\" not found".to_string())));

        let err = submit_action(&client, &JobCommand::Abort(flags("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Kubernetes(_)));
    }

    #[test]
    fn actions_follow_the_job_action_taxonomy() {
        assert_eq!(JobCommand::Resume(flags("a")).action(), JobAction::ResumeJob);
        assert_eq!(JobCommand::Suspend(flags("a")).action(), JobAction::AbortJob);
        assert_eq!(JobCommand::Abort(flags("a")).action(), JobAction::TerminateJob);
    }

    #[test]
    fn parses_flags() {
        let cli = TestCli::try_parse_from(["batchctl", "resume", "-N", "ml", "-n", "tf-job"]).unwrap();
        let flags = cli.command.flags();
        assert_eq!(flags.namespace, "ml");
        assert_eq!(flags.name, "tf-job");
        assert_eq!(cli.command.verb(), "resume");

        let cli = TestCli::try_parse_from(["batchctl", "suspend"]).unwrap();
        assert_eq!(cli.command.flags().namespace, "default");
        assert!(cli.command.flags().name.is_empty());
    }
}
