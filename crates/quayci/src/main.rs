mod config;
mod github_processor;
mod job_processor;
mod publish;
mod runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use quayci_lib::github::github_api;
use quayci_lib::job::types::Job;
use quayci_lib::{log, logger};

/// Backlog bound for qualifying events; senders wait when it is full.
const QUEUE_DEPTH: usize = 32;

const CONFIG_FILE: &str = "quayci.toml";

#[derive(Parser)]
#[command(
    name = "quayci",
    about = "A small webhook CI: runs the configured checks on PRs and pushes from collaborators"
)]
struct Args {
    /// Run a local simulation against this repository ("owner/name")
    /// instead of serving webhooks.
    #[arg(long)]
    test: Option<String>,

    /// Commit to check; any value other than HEAD also publishes the result.
    #[arg(long, default_value = "HEAD")]
    commit: String,
}

#[actix_web::main]
async fn main() -> eyre::Result<()> {
    simple_eyre::install().expect("Eyre handler installation failed!");

    let args = Args::parse();
    let config = config::init(Path::new(CONFIG_FILE))?;
    logger::init_logger(&config.logging)?;
    github_api::initialise(&config.access_token)?;

    let workdir = std::env::current_dir()?;
    log::info!("Running in: {}", workdir.display());

    if let Some(repo) = args.test {
        return simulate(&repo, &args.commit, workdir).await;
    }

    let (job_sender, job_receiver) = flume::bounded(QUEUE_DEPTH);
    let ctx = Arc::new(runner::JobContext::new(workdir));

    actix_web::rt::spawn(runner::handle_jobs(job_receiver, ctx));

    let job_sender = actix_web::web::Data::new(job_sender);

    log::info!("Listening on port {}", config.port);

    actix_web::HttpServer::new(move || {
        actix_web::App::new()
            .app_data(job_sender.clone())
            .service(github_processor::process_github_payload)
            .default_service(
                actix_web::web::route().to(actix_web::HttpResponse::MethodNotAllowed),
            )
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}

/// Manual testing path: runs the check runner directly, skipping the
/// gateway and trust cache. With the HEAD sentinel the result is only
/// printed; a concrete commit is additionally published like a webhook
/// run would be.
async fn simulate(repo: &str, commit: &str, workdir: PathBuf) -> eyre::Result<()> {
    let Some((owner, name)) = repo.split_once('/') else {
        eyre::bail!("--test expects owner/repository, got {repo:?}");
    };

    let config = config::get();
    let job = Job {
        owner: owner.to_owned(),
        repo: name.to_owned(),
        sha: commit.to_owned(),
        actor: "local".to_owned(),
    };

    let blocking_job = job.clone();
    let output = actix_web::rt::task::spawn_blocking(move || {
        job_processor::run_checks(&blocking_job, &config.checks, config.use_ssh, &workdir)
    })
    .await
    .map_err(|err| eyre::eyre!("check runner panicked: {err}"))?;

    if commit == "HEAD" {
        // Only run locally.
        for (name, blob) in &output.steps {
            println!("--- {name}\n{blob}");
        }
        println!("\nSuccess: {}", output.success);
        return Ok(());
    }

    publish::publish(&job, &output, &config.checks, &config.name).await
}
