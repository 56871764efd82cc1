use eyre::{Context, Result};
use indexmap::IndexMap;

use quayci_lib::github::github_api::{create_commit_status, create_gist};
use quayci_lib::github::github_types::{CreateGist, CreateStatus, GistFile, StatusState};
use quayci_lib::job::types::{CheckRunOutput, Job};
use quayci_lib::log;

/// Substituted for empty blobs so no gist section renders blank.
const MISSING: &str = "<missing>";

fn gist_files(output: &CheckRunOutput) -> IndexMap<String, GistFile> {
    output
        .steps
        .iter()
        .map(|(name, blob)| {
            let content = if blob.is_empty() {
                MISSING.to_owned()
            } else {
                blob.clone()
            };
            (name.clone(), GistFile { content })
        })
        .collect()
}

fn describe_checks(checks: &[Vec<String>]) -> String {
    let mut desc = "Ran:\n".to_owned();
    for (i, cmd) in checks.iter().enumerate() {
        if i != 0 {
            desc.push('\n');
        }
        desc.push_str("  ");
        desc.push_str(&cmd.join(" "));
    }
    desc
}

pub fn status_state(output: &CheckRunOutput) -> StatusState {
    if output.success {
        StatusState::Success
    } else {
        StatusState::Failure
    }
}

/// Uploads the captured output as an unlisted gist, then posts the commit
/// status pointing at it. If the gist cannot be created nothing is posted
/// at all; the error bubbles up to be logged by the worker.
pub async fn publish(
    job: &Job,
    output: &CheckRunOutput,
    checks: &[Vec<String>],
    context_name: &str,
) -> Result<()> {
    let gist = create_gist(&CreateGist {
        description: format!(
            "Output for https://github.com/{}/commit/{}",
            job.full_name(),
            job.sha
        ),
        public: false,
        files: gist_files(output),
    })
    .await
    .wrap_err("Uploading check output")?;

    log::info!("- Gist at {}", gist.html_url);

    create_commit_status(
        &job.owner,
        &job.repo,
        &job.sha,
        &CreateStatus {
            state: status_state(output),
            target_url: gist.html_url,
            description: describe_checks(checks),
            context: context_name.to_owned(),
        },
    )
    .await
}
