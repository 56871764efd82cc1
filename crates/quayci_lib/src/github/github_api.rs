use std::{future::Future, pin::Pin};

use eyre::{Context, Result};
use octocrab::OctocrabBuilder;

use crate::github::github_types::{CreateGist, CreateStatus, Empty, Gist};
use crate::trust::CollaboratorCheck;

/// The `X-Github-Event` header plus the optional `X-Hub-Signature-256`
/// header, pulled off the request before the body is touched.
pub struct GithubEvent(pub String, pub Option<String>);

impl actix_web::FromRequest for GithubEvent {
    type Error = std::io::Error;

    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let event_header = match req.headers().get("X-Github-Event") {
                Some(event) => event
                    .to_str()
                    .map_err(|_| {
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "Corrupt X-Github-Event header, failed to convert to string",
                        )
                    })?
                    .to_owned(),
                None => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "Missing X-Github-Event header",
                    ))
                }
            };
            let hmac_header = match req.headers().get("X-Hub-Signature-256") {
                Some(event) => Some(
                    event
                        .to_str()
                        .map_err(|_| {
                            std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                "Corrupt X-Hub-Signature-256 header, failed to convert to string",
                            )
                        })?
                        .to_owned(),
                ),
                _ => None,
            };
            Ok(GithubEvent(event_header, hmac_header))
        })
    }
}

/// Installs the process-wide octocrab instance, authenticated with the
/// configured personal access token.
pub fn initialise(access_token: &str) -> Result<()> {
    octocrab::initialise(
        OctocrabBuilder::new()
            .personal_token(access_token.to_owned())
            .build()
            .context("Building octocrab client")?,
    );
    Ok(())
}

/// The live GitHub collaborator probe. 204 means collaborator, 404 means
/// not; anything else is an upstream error.
pub struct GithubApi;

#[async_trait::async_trait]
impl CollaboratorCheck for GithubApi {
    async fn is_collaborator(&self, owner: &str, repo: &str, user: &str) -> Result<bool> {
        let response = octocrab::instance()
            ._get(format!("/repos/{owner}/{repo}/collaborators/{user}"))
            .await
            .context("Querying collaborator status")?;

        Ok(response.status().as_u16() == 204)
    }
}

pub async fn create_gist(gist: &CreateGist) -> Result<Gist> {
    octocrab::instance()
        .post("/gists", Some(gist))
        .await
        .context("Creating gist")
}

pub async fn create_commit_status(
    owner: &str,
    repo: &str,
    sha: &str,
    status: &CreateStatus,
) -> Result<()> {
    let _: Empty = octocrab::instance()
        .post(format!("/repos/{owner}/{repo}/statuses/{sha}"), Some(status))
        .await
        .context("Creating commit status")?;

    Ok(())
}
