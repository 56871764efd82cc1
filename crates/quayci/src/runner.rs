use std::path::PathBuf;
use std::sync::Arc;

use eyre::Result;

use quayci_lib::github::github_api::GithubApi;
use quayci_lib::job::types::{CheckRunOutput, Job, JobReceiver};
use quayci_lib::log;
use quayci_lib::trust::{CollaboratorCheck, TrustCache};

use crate::{config, job_processor, publish};

/// How a completed run is reported. Injectable so the worker loop can be
/// exercised without live GitHub calls.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, job: &Job, output: &CheckRunOutput) -> Result<()>;
}

/// The real thing: gist upload plus commit status.
pub struct GistStatusPublisher;

#[async_trait::async_trait]
impl Publisher for GistStatusPublisher {
    async fn publish(&self, job: &Job, output: &CheckRunOutput) -> Result<()> {
        let config = config::get();
        publish::publish(job, output, &config.checks, &config.name).await
    }
}

/// State owned by the single worker: the trust cache, the collaborator
/// probe behind it, the blocking check-run entry point, and the publisher.
pub struct JobContext {
    pub trust: TrustCache,
    pub api: Box<dyn CollaboratorCheck>,
    pub run: Box<dyn Fn(&Job) -> CheckRunOutput + Send + Sync>,
    pub publisher: Box<dyn Publisher>,
}

impl JobContext {
    pub fn new(workdir: PathBuf) -> Self {
        Self {
            trust: TrustCache::new(),
            api: Box::new(GithubApi),
            run: Box::new(move |job| {
                let config = config::get();
                job_processor::run_checks(job, &config.checks, config.use_ssh, &workdir)
            }),
            publisher: Box::new(GistStatusPublisher),
        }
    }
}

/// The run serializer. One worker drains one bounded queue, so at most one
/// authorization lookup or check run is in flight process-wide; jobs are
/// handled in arrival order with no cancellation of superseded runs.
pub async fn handle_jobs(job_receiver: JobReceiver, ctx: Arc<JobContext>) {
    while let Ok(job) = job_receiver.recv_async().await {
        job_handler(job, &ctx).await;
    }
}

async fn job_handler(job: Job, ctx: &Arc<JobContext>) {
    if !ctx
        .trust
        .is_trusted(&*ctx.api, &job.owner, &job.repo, &job.actor)
        .await
    {
        log::info!("- ignoring actor {:?} for {}", job.actor, job.full_name());
        return;
    }

    log::info!("- Running checks for {} at {}", job.full_name(), job.sha);

    let blocking_ctx = Arc::clone(ctx);
    let blocking_job = job.clone();
    let output =
        actix_web::rt::task::spawn_blocking(move || (blocking_ctx.run)(&blocking_job)).await;

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            log::error!("Join Handle error: {err}");
            return;
        }
    };

    log::info!(
        "- Finished {} at {}: success={}",
        job.full_name(),
        job.sha,
        output.success
    );

    if let Err(err) = ctx.publisher.publish(&job, &output).await {
        log::error!("- publishing result failed: {err:?}");
    }
}
