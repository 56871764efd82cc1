use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use indexmap::IndexMap;

use quayci_lib::job::types::{CheckRunOutput, Job};
use quayci_lib::log;

/// Runs one command from `cwd`, capturing stdout and stderr into a single
/// blob. Returns the blob and whether the command exited zero.
fn run_cmd(cwd: &Path, cmd: &[String]) -> (String, bool) {
    let Some((program, args)) = cmd.split_first() else {
        return ("<empty command>".to_owned(), false);
    };

    let pretty = cmd.join(" ");
    log::info!("- cwd={} : {}", cwd.display(), pretty);

    let start = Instant::now();
    match Command::new(program).args(args).current_dir(cwd).output() {
        Ok(output) => {
            let mut blob = format!("$ {pretty}  (in {:.2?})\n", start.elapsed());
            blob.push_str(&String::from_utf8_lossy(&output.stdout));
            blob.push_str(&String::from_utf8_lossy(&output.stderr));
            (blob, output.status.success())
        }
        Err(err) => (format!("$ {pretty}\nfailed to spawn: {err}"), false),
    }
}

fn clone_url(full_name: &str, use_ssh: bool) -> String {
    if use_ssh {
        format!("git@github.com:{full_name}")
    } else {
        format!("https://github.com/{full_name}")
    }
}

fn toolchain_version() -> String {
    Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_owned())
        .unwrap_or_else(|| "unknown".to_owned())
}

fn metadata(commit: &str, workdir: &Path, repos: &Path) -> String {
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    format!(
        "Commit: {}\nToolchain: {}\nWorkdir: {}\nRepos: {}\nCPUs: {}",
        commit,
        toolchain_version(),
        workdir.display(),
        repos.display(),
        cpus,
    )
}

/// Appends one setup stage's output to the `setup` blob; a non-zero exit
/// here ends the run.
fn run_setup_stage(steps: &mut IndexMap<String, String>, cwd: &Path, cmd: &[&str]) -> bool {
    let cmd: Vec<String> = cmd.iter().map(|s| (*s).to_owned()).collect();
    let (blob, ok) = run_cmd(cwd, &cmd);
    steps
        .entry("setup".to_owned())
        .or_default()
        .push_str(&blob);
    ok
}

/// Runs every configured check command from the repository root, in order.
/// Unlike the setup stages a failing check does not stop the later ones, so
/// one report can show every failure from a single push.
fn run_check_commands(
    steps: &mut IndexMap<String, String>,
    cwd: &Path,
    checks: &[Vec<String>],
) -> bool {
    let mut ok = true;
    for (i, cmd) in checks.iter().enumerate() {
        let (blob, cmd_ok) = run_cmd(cwd, cmd);
        steps.insert(format!("cmd{}", i + 1), blob);
        ok &= cmd_ok;
    }
    ok
}

fn repo_dir(repos: &Path, job: &Job) -> PathBuf {
    repos.join(&job.owner).join(&job.repo)
}

/// Syncs the workspace, materialises dependencies, precompiles, then runs
/// the checks: a linear stage sequence where any setup failure jumps
/// straight to a failed verdict with whatever output was captured so far.
pub fn run_checks(job: &Job, checks: &[Vec<String>], use_ssh: bool, workdir: &Path) -> CheckRunOutput {
    let repos = workdir.join("repos");
    let base = repo_dir(&repos, job);

    let mut steps = IndexMap::new();
    steps.insert("metadata".to_owned(), metadata(&job.sha, workdir, &repos));
    steps.insert("setup".to_owned(), String::new());

    // Sync: clone a fresh workspace or fetch into the existing one.
    let synced = if base.exists() {
        run_setup_stage(&mut steps, &base, &["git", "fetch", "--prune", "--quiet"])
    } else {
        let up = base.parent().expect("repo dir always has a parent");
        if let Err(err) = std::fs::create_dir_all(up) {
            log::error!("- {err}");
        }
        let url = clone_url(&job.full_name(), use_ssh);
        run_setup_stage(&mut steps, up, &["git", "clone", "--quiet", &url])
    };
    if !synced {
        return CheckRunOutput { steps, success: false };
    }

    if !run_setup_stage(&mut steps, &base, &["git", "checkout", "--quiet", &job.sha]) {
        return CheckRunOutput { steps, success: false };
    }

    // Materialise dependencies before the checks run.
    if !run_setup_stage(&mut steps, &base, &["cargo", "fetch"]) {
        return CheckRunOutput { steps, success: false };
    }

    // Precompilation is only an optimization, but a tree that doesn't build
    // its dependencies isn't going to pass checks either.
    if !run_setup_stage(&mut steps, &base, &["cargo", "build", "--all-targets"]) {
        return CheckRunOutput { steps, success: false };
    }

    let success = run_check_commands(&mut steps, &base, checks);
    CheckRunOutput { steps, success }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn run_cmd_captures_output_and_exit() {
        let cwd = std::env::temp_dir();
        let (blob, ok) = run_cmd(&cwd, &cmd(&["echo", "hello"]));
        assert!(ok);
        assert!(blob.starts_with("$ echo hello"));
        assert!(blob.contains("hello"));

        let (_, ok) = run_cmd(&cwd, &cmd(&["false"]));
        assert!(!ok);
    }

    #[test]
    fn run_cmd_rejects_empty_and_unspawnable_commands() {
        let cwd = std::env::temp_dir();
        assert!(!run_cmd(&cwd, &[]).1);
        assert!(!run_cmd(&cwd, &cmd(&["/definitely/not/a/binary"])).1);
    }

    #[test]
    fn failing_check_does_not_stop_later_checks() {
        let mut steps = IndexMap::new();
        let checks = vec![cmd(&["false"]), cmd(&["echo", "still ran"])];

        let ok = run_check_commands(&mut steps, &std::env::temp_dir(), &checks);

        assert!(!ok);
        assert!(steps.contains_key("cmd1"));
        assert!(steps["cmd2"].contains("still ran"));
    }

    #[test]
    fn all_passing_checks_succeed() {
        let mut steps = IndexMap::new();
        let checks = vec![cmd(&["true"]), cmd(&["true"])];
        assert!(run_check_commands(&mut steps, &std::env::temp_dir(), &checks));
    }

    #[test]
    fn clone_url_honours_transport() {
        assert_eq!(clone_url("o/r", false), "https://github.com/o/r");
        assert_eq!(clone_url("o/r", true), "git@github.com:o/r");
    }

    #[test]
    fn failed_sync_still_yields_metadata_and_setup() {
        let job = Job {
            owner: "nobody".to_owned(),
            repo: "nothing".to_owned(),
            sha: "abc123".to_owned(),
            actor: "tester".to_owned(),
        };
        // A workdir that cannot be created makes the clone fail fast
        // without touching the network.
        let workdir = Path::new("/dev/null");

        let output = run_checks(&job, &[], false, workdir);

        assert!(!output.success);
        assert_eq!(
            output.steps.keys().collect::<Vec<_>>(),
            vec!["metadata", "setup"]
        );
        assert!(output.steps["metadata"].contains("Commit: abc123"));
    }
}
