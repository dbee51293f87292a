use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::info;

use super::{PostingClient, PostingError, PostingResult, Submission, SuggestedSort};

/// Posting backend that records every operation in memory.
///
/// Serves two purposes: the assertion surface for tests, and the binary's
/// dry-run mode where passes log what they would post without touching the
/// platform.
#[derive(Debug, Default)]
pub struct DryRunPostingClient {
    next_id: AtomicU64,
    posts: DashMap<String, Submission>,
    sorts: DashMap<String, SuggestedSort>,
    flairs: DashMap<String, String>,
}

impl DryRunPostingClient {
    /// An empty recording client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of submissions created so far.
    pub fn submission_count(&self) -> usize {
        self.posts.len()
    }

    /// Look up a recorded submission by id.
    pub fn submission(&self, post_id: &str) -> Option<Submission> {
        self.posts.get(post_id).map(|entry| entry.value().clone())
    }

    /// All recorded submissions, in id order.
    pub fn submissions(&self) -> Vec<Submission> {
        let mut all: Vec<Submission> = self.posts.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// The suggested sort applied to a submission, if any.
    pub fn suggested_sort(&self, post_id: &str) -> Option<SuggestedSort> {
        self.sorts.get(post_id).map(|entry| *entry.value())
    }

    /// The flair template applied to a submission, if any.
    pub fn flair(&self, post_id: &str) -> Option<String> {
        self.flairs.get(post_id).map(|entry| entry.value().clone())
    }
}

impl PostingClient for DryRunPostingClient {
    fn submit(
        &self,
        account: &str,
        subreddit: &str,
        title: &str,
        body: &str,
    ) -> BoxFuture<'static, PostingResult<Submission>> {
        let id = format!("post{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let submission = Submission {
            id: id.clone(),
            title: title.to_owned(),
            body: body.to_owned(),
            stickied: false,
        };
        self.posts.insert(id, submission.clone());

        info!(account, subreddit, title, "dry-run submit");
        Box::pin(async move { Ok(submission) })
    }

    fn edit(
        &self,
        _account: &str,
        post_id: &str,
        body: &str,
    ) -> BoxFuture<'static, PostingResult<()>> {
        let result = match self.posts.get_mut(post_id) {
            Some(mut entry) => {
                entry.body = body.to_owned();
                Ok(())
            }
            None => Err(PostingError::NotFound {
                post_id: post_id.to_owned(),
            }),
        };
        Box::pin(async move { result })
    }

    fn fetch(&self, _account: &str, post_id: &str) -> BoxFuture<'static, PostingResult<Submission>> {
        let result = self
            .posts
            .get(post_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PostingError::NotFound {
                post_id: post_id.to_owned(),
            });
        Box::pin(async move { result })
    }

    fn set_sticky(
        &self,
        _account: &str,
        post_id: &str,
        sticky: bool,
    ) -> BoxFuture<'static, PostingResult<()>> {
        let result = match self.posts.get_mut(post_id) {
            Some(mut entry) => {
                entry.stickied = sticky;
                Ok(())
            }
            None => Err(PostingError::NotFound {
                post_id: post_id.to_owned(),
            }),
        };
        Box::pin(async move { result })
    }

    fn set_suggested_sort(
        &self,
        _account: &str,
        post_id: &str,
        sort: SuggestedSort,
    ) -> BoxFuture<'static, PostingResult<()>> {
        self.sorts.insert(post_id.to_owned(), sort);
        Box::pin(async move { Ok(()) })
    }

    fn set_flair(
        &self,
        _account: &str,
        post_id: &str,
        flair_template: &str,
    ) -> BoxFuture<'static, PostingResult<()>> {
        self.flairs.insert(post_id.to_owned(), flair_template.to_owned());
        Box::pin(async move { Ok(()) })
    }
}
