use quayci_lib::github::github_api::GithubEvent;
use quayci_lib::github::github_types::WebhookEvent;
use quayci_lib::job::types::{Job, JobSender};
use quayci_lib::log;
use quayci_lib::verify::verify_signature;

use crate::config;

pub type DataJobSender = actix_web::web::Data<JobSender>;

/// Applies the filtering rules to a parsed event. `None` means the event
/// is logged and dropped without scheduling a run.
pub fn job_from_event(event: WebhookEvent) -> Option<Job> {
    match event {
        WebhookEvent::PullRequest(payload) => {
            log::info!(
                "- PR {} #{} {} {}",
                payload.repository.full_name,
                payload.pull_request.number,
                payload.sender.login,
                payload.action
            );
            if payload.action != "opened" && payload.action != "synchronize" {
                log::info!(
                    "- ignoring action {:?} for PR from {:?}",
                    payload.action,
                    payload.sender.login
                );
                return None;
            }
            let (owner, repo) = payload.repository.name_tuple();
            Some(Job {
                owner,
                repo,
                sha: payload.pull_request.head.sha,
                actor: payload.sender.login,
            })
        }
        WebhookEvent::Push(payload) => {
            let Some(head) = payload.head_commit else {
                log::info!(
                    "- Push {} {} <deleted>",
                    payload.repository.full_name,
                    payload.git_ref
                );
                return None;
            };
            log::info!(
                "- Push {} {} {}",
                payload.repository.full_name,
                payload.git_ref,
                head.id
            );
            if !payload.git_ref.starts_with("refs/heads/") {
                log::info!("- ignoring ref {:?} for push", payload.git_ref);
                return None;
            }
            let (owner, repo) = payload.repository.name_tuple();
            Some(Job {
                owner,
                repo,
                sha: head.id,
                actor: payload.sender.login,
            })
        }
        WebhookEvent::Other(name) => {
            log::info!("- ignoring hook type {name}");
            None
        }
    }
}

#[actix_web::post("/")]
pub async fn process_github_payload(
    event: GithubEvent,
    payload: String,
    job_sender: DataJobSender,
) -> actix_web::Result<&'static str> {
    let config = config::get();

    verify_signature(&config.webhook_secret, event.1.as_deref(), &payload)?;

    if event.0 == "ping" {
        return Ok("{}");
    }

    let parsed = WebhookEvent::parse(&event.0, &payload).map_err(|err| {
        log::info!("- invalid payload: {err}");
        actix_web::error::ErrorBadRequest("Invalid payload")
    })?;

    // Hand off to the queue so the hook responds immediately; the sender
    // waits if the backlog is full.
    let sender = job_sender.get_ref().clone();
    actix_web::rt::spawn(async move {
        if let Some(job) = job_from_event(parsed) {
            if sender.send_async(job).await.is_err() {
                log::error!("Job queue is gone, dropping job");
            }
        }
    });

    Ok("{}")
}
