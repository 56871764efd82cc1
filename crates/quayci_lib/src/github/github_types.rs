use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub login: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: User,
}

impl Repository {
    pub fn name_tuple(&self) -> (String, String) {
        (self.owner.login.clone(), self.name.clone())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Branch {
    pub sha: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub head: Branch,
}

#[derive(Deserialize, Debug)]
pub struct PullRequestEventPayload {
    pub action: String,
    pub repository: Repository,
    pub pull_request: PullRequest,
    pub sender: User,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HeadCommit {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct PushEventPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub head_commit: Option<HeadCommit>,
    pub repository: Repository,
    pub sender: User,
}

/// The closed set of webhook events the bot understands. Unknown event
/// types are representable so the gateway can log them before dropping.
#[derive(Debug)]
pub enum WebhookEvent {
    PullRequest(PullRequestEventPayload),
    Push(PushEventPayload),
    Other(String),
}

impl WebhookEvent {
    pub fn parse(event_type: &str, payload: &str) -> serde_json::Result<Self> {
        match event_type {
            "pull_request" => Ok(Self::PullRequest(serde_json::from_str(payload)?)),
            "push" => Ok(Self::Push(serde_json::from_str(payload)?)),
            other => Ok(Self::Other(other.to_owned())),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct GistFile {
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct CreateGist {
    pub description: String,
    pub public: bool,
    /// Keyed by step name; insertion order is kept so the files serialize
    /// in execution order.
    pub files: IndexMap<String, GistFile>,
}

#[derive(Deserialize, Debug)]
pub struct Gist {
    pub html_url: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Failure,
}

#[derive(Serialize, Debug)]
pub struct CreateStatus {
    pub state: StatusState,
    pub target_url: String,
    pub description: String,
    pub context: String,
}

#[derive(Serialize, Deserialize, Clone, Copy)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_push_payload() {
        let payload = r#"{
            "ref": "refs/heads/main",
            "head_commit": { "id": "abc123" },
            "repository": {
                "name": "r",
                "full_name": "o/r",
                "owner": { "login": "o" }
            },
            "sender": { "login": "someone" }
        }"#;
        let event = WebhookEvent::parse("push", payload).unwrap();
        match event {
            WebhookEvent::Push(push) => {
                assert_eq!(push.git_ref, "refs/heads/main");
                assert_eq!(push.head_commit.unwrap().id, "abc123");
                assert_eq!(push.repository.name_tuple(), ("o".to_owned(), "r".to_owned()));
            }
            other => panic!("expected push, got {other:?}"),
        }
    }

    #[test]
    fn deleted_branch_has_no_head_commit() {
        let payload = r#"{
            "ref": "refs/heads/gone",
            "head_commit": null,
            "repository": {
                "name": "r",
                "full_name": "o/r",
                "owner": { "login": "o" }
            },
            "sender": { "login": "someone" }
        }"#;
        match WebhookEvent::parse("push", payload).unwrap() {
            WebhookEvent::Push(push) => assert!(push.head_commit.is_none()),
            other => panic!("expected push, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_type_is_other() {
        match WebhookEvent::parse("gollum", "{}").unwrap() {
            WebhookEvent::Other(name) => assert_eq!(name, "gollum"),
            other => panic!("expected other, got {other:?}"),
        }
    }

    #[test]
    fn status_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StatusState::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&StatusState::Failure).unwrap(),
            "\"failure\""
        );
    }
}
