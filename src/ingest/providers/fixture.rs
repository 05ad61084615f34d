// src/ingest/providers/fixture.rs
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;
use crate::ingest::types::{Source, SourceFetcher};

#[derive(Default)]
struct Script {
    replies: VecDeque<(Result<String, FetchError>, Option<Duration>)>,
    delay: Option<Duration>,
    calls: usize,
}

/// In-memory fetcher with scripted replies per source id.
///
/// Replies are consumed in order; the last one keeps being served. A source
/// without a script answers with a network failure.
#[derive(Default)]
pub struct FixtureFetcher {
    scripts: Mutex<HashMap<String, Script>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<R>(&self, id: &str, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut g = match self.scripts.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        f(g.entry(id.to_string()).or_default())
    }

    pub fn push_body(&self, id: &str, body: impl Into<String>) -> &Self {
        let body = body.into();
        self.with_script(id, |s| s.replies.push_back((Ok(body), None)));
        self
    }

    /// Like `push_body`, but this one reply is held back for `delay`.
    pub fn push_body_after(&self, id: &str, body: impl Into<String>, delay: Duration) -> &Self {
        let body = body.into();
        self.with_script(id, |s| s.replies.push_back((Ok(body), Some(delay))));
        self
    }

    pub fn push_failure(&self, id: &str, err: FetchError) -> &Self {
        self.with_script(id, |s| s.replies.push_back((Err(err), None)));
        self
    }

    /// Delay every reply for `id` that has no delay of its own.
    pub fn set_delay(&self, id: &str, delay: Duration) -> &Self {
        self.with_script(id, |s| s.delay = Some(delay));
        self
    }

    pub fn calls(&self, id: &str) -> usize {
        self.with_script(id, |s| s.calls)
    }
}

#[async_trait]
impl SourceFetcher for FixtureFetcher {
    async fn fetch_csv(&self, source: &Source) -> Result<String, FetchError> {
        let (reply, delay) = self.with_script(&source.id, |s| {
            s.calls += 1;
            let reply = if s.replies.len() > 1 {
                s.replies.pop_front()
            } else {
                s.replies.front().cloned()
            };
            match reply {
                Some((reply, own_delay)) => (Some(reply), own_delay.or(s.delay)),
                None => (None, s.delay),
            }
        });
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        reply.unwrap_or_else(|| {
            Err(FetchError::NetworkFailure(format!(
                "no fixture for '{}'",
                source.id
            )))
        })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_reply_sticks() {
        let f = FixtureFetcher::new();
        f.push_body("a", "one").push_body("a", "two");
        let src = Source::new("a", "A", "https://example.com/a");
        assert_eq!(f.fetch_csv(&src).await.unwrap(), "one");
        assert_eq!(f.fetch_csv(&src).await.unwrap(), "two");
        assert_eq!(f.fetch_csv(&src).await.unwrap(), "two");
        assert_eq!(f.calls("a"), 3);
    }

    #[tokio::test]
    async fn unscripted_source_fails() {
        let f = FixtureFetcher::new();
        let src = Source::new("x", "X", "https://example.com/x");
        assert!(matches!(
            f.fetch_csv(&src).await,
            Err(FetchError::NetworkFailure(_))
        ));
    }
}
