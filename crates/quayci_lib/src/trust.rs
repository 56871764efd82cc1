use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use eyre::Result;

/// The upstream collaborator probe, injectable so the pipeline can be
/// exercised without live network calls.
#[async_trait::async_trait]
pub trait CollaboratorCheck: Send + Sync {
    async fn is_collaborator(&self, owner: &str, repo: &str, user: &str) -> Result<bool>;
}

/// Per-repository memo of trusted actors.
///
/// Only positive answers are stored: a `false` from upstream (or an
/// upstream error) is treated as untrusted for that call but re-queried
/// next time, so granting someone access never requires a restart.
#[derive(Default)]
pub struct TrustCache {
    collabs: Mutex<HashMap<String, HashSet<String>>>,
}

impl TrustCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_trusted(
        &self,
        api: &dyn CollaboratorCheck,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> bool {
        let key = format!("{owner}/{repo}");

        if let Some(actors) = self.collabs.lock().unwrap().get(&key) {
            if actors.contains(user) {
                return true;
            }
        }

        let trusted = match api.is_collaborator(owner, repo, user).await {
            Ok(trusted) => trusted,
            Err(err) => {
                log::warn!("- collaborator check for {key} failed: {err:?}");
                false
            }
        };

        if trusted {
            self.collabs
                .lock()
                .unwrap()
                .entry(key.clone())
                .or_default()
                .insert(user.to_owned());
        }

        log::info!("- {}: {} access: {}", key, user, trusted);
        trusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedAnswer {
        answer: Result<bool, ()>,
        calls: AtomicUsize,
    }

    impl FixedAnswer {
        fn new(answer: Result<bool, ()>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CollaboratorCheck for FixedAnswer {
        async fn is_collaborator(&self, _: &str, _: &str, _: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.map_err(|_| eyre::eyre!("upstream down"))
        }
    }

    #[test]
    fn negative_answers_are_never_cached() {
        futures_lite::future::block_on(async {
            let api = FixedAnswer::new(Ok(false));
            let cache = TrustCache::new();

            assert!(!cache.is_trusted(&api, "o", "r", "mallory").await);
            assert!(!cache.is_trusted(&api, "o", "r", "mallory").await);
            assert_eq!(api.calls(), 2);
        });
    }

    #[test]
    fn positive_answer_short_circuits_later_lookups() {
        futures_lite::future::block_on(async {
            let api = FixedAnswer::new(Ok(true));
            let cache = TrustCache::new();

            assert!(cache.is_trusted(&api, "o", "r", "alice").await);
            assert!(cache.is_trusted(&api, "o", "r", "alice").await);
            assert!(cache.is_trusted(&api, "o", "r", "alice").await);
            assert_eq!(api.calls(), 1);
        });
    }

    #[test]
    fn upstream_errors_count_as_untrusted_and_uncached() {
        futures_lite::future::block_on(async {
            let api = FixedAnswer::new(Err(()));
            let cache = TrustCache::new();

            assert!(!cache.is_trusted(&api, "o", "r", "alice").await);
            assert!(!cache.is_trusted(&api, "o", "r", "alice").await);
            assert_eq!(api.calls(), 2);
        });
    }

    #[test]
    fn cache_is_keyed_per_repository() {
        futures_lite::future::block_on(async {
            let api = FixedAnswer::new(Ok(true));
            let cache = TrustCache::new();

            assert!(cache.is_trusted(&api, "o", "r", "alice").await);
            assert!(cache.is_trusted(&api, "o", "other", "alice").await);
            assert_eq!(api.calls(), 2);
        });
    }
}
