//! Ordered fallback chains for page loads.
//!
//! The backend offers several ways to get the same page: a batched endpoint
//! that also returns refs and working-tree changes, individual resource
//! endpoints, a server-rendered listing and a plain JSON listing. A
//! [`FetchPlan`] lists the strategies to try for one ticket, in order; the
//! first success wins and only exhausting the whole chain is an error.

use std::fmt;

use crate::api::{GitApi, Transport};
use crate::error::{BackendError, FetchError};
use crate::feed::{BrowseMode, LoadKind, PageData, PageTicket};
use crate::types::RefLists;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStrategy {
    /// `/api/all`: commits, refs, stashes and working-tree changes at once.
    Batched,
    /// Commits, working-tree changes and each ref list fetched separately.
    PerResource,
    /// Server-rendered commit listing, scraped back into records.
    Markup,
    /// Plain JSON commit listing.
    Json,
}

impl fmt::Display for PageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Batched => "batched",
            Self::PerResource => "per-resource",
            Self::Markup => "markup",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    strategies: Vec<PageStrategy>,
}

impl FetchPlan {
    pub fn new(strategies: Vec<PageStrategy>) -> Self {
        Self { strategies }
    }

    /// The chain for `ticket`.
    ///
    /// Only the first Normal page needs refs and working-tree changes, so only
    /// it starts from the batched endpoint. Later pages and tag pages prefer
    /// the rendered listing when `prefer_markup` is set.
    pub fn for_ticket(ticket: &PageTicket, prefer_markup: bool) -> Self {
        let listing = if prefer_markup {
            vec![PageStrategy::Markup, PageStrategy::Json]
        } else {
            vec![PageStrategy::Json]
        };
        match (&ticket.mode, ticket.kind) {
            (BrowseMode::Normal, LoadKind::Initial) => {
                Self::new(vec![PageStrategy::Batched, PageStrategy::PerResource])
            }
            _ => Self::new(listing),
        }
    }

    pub fn strategies(&self) -> &[PageStrategy] {
        &self.strategies
    }
}

/// Tries each strategy of `plan` in order until one succeeds.
///
/// # Errors
///
/// Returns every attempt's error when the chain is exhausted.
pub fn run_plan<T, F>(plan: &FetchPlan, mut attempt: F) -> Result<T, FetchError>
where
    F: FnMut(PageStrategy) -> Result<T, BackendError>,
{
    let mut attempts = Vec::new();
    for &strategy in plan.strategies() {
        match attempt(strategy) {
            Ok(value) => {
                if !attempts.is_empty() {
                    tracing::info!(%strategy, failed = attempts.len(), "fell back");
                }
                return Ok(value);
            }
            Err(err) => {
                tracing::warn!(%strategy, error = %err, "fetch strategy failed");
                attempts.push((strategy, err));
            }
        }
    }
    Err(FetchError { attempts })
}

/// Fetches the page described by `ticket`, walking `plan`.
///
/// # Errors
///
/// Returns a [`FetchError`] if every strategy failed.
pub fn fetch_page<T: Transport>(
    api: &GitApi<T>,
    ticket: &PageTicket,
    plan: &FetchPlan,
) -> Result<PageData, FetchError> {
    let tag = match &ticket.mode {
        BrowseMode::Normal => None,
        BrowseMode::Tag(tag) => Some(tag.as_str()),
    };
    run_plan(plan, |strategy| match strategy {
        PageStrategy::Batched => {
            let snapshot = api.snapshot(ticket.limit)?;
            Ok(PageData {
                commits: snapshot.commits,
                uncommitted: Some(snapshot.uncommitted_changes),
                refs: Some(RefLists {
                    branches: snapshot.branches,
                    tags: snapshot.tags,
                    stashes: snapshot.stashes,
                }),
            })
        }
        PageStrategy::PerResource => {
            let commits = match tag {
                Some(tag) => api.tag_commits(tag, ticket.limit, ticket.offset)?,
                None => api.commits(ticket.limit, ticket.offset)?,
            };
            Ok(PageData {
                commits,
                uncommitted: Some(api.uncommitted()?),
                refs: Some(RefLists {
                    branches: api.branches()?,
                    tags: api.tags()?,
                    stashes: api.stashes()?,
                }),
            })
        }
        PageStrategy::Markup => Ok(PageData {
            commits: api.commits_markup(tag, ticket.limit, ticket.offset)?,
            ..PageData::default()
        }),
        PageStrategy::Json => {
            let commits = match tag {
                Some(tag) => api.tag_commits(tag, ticket.limit, ticket.offset)?,
                None => api.commits(ticket.limit, ticket.offset)?,
            };
            Ok(PageData { commits, ..PageData::default() })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(kind: LoadKind, mode: BrowseMode) -> PageTicket {
        PageTicket { generation: 1, kind, mode, offset: 0, limit: 50 }
    }

    #[test]
    fn initial_normal_page_starts_batched() {
        let plan = FetchPlan::for_ticket(&ticket(LoadKind::Initial, BrowseMode::Normal), true);
        assert_eq!(plan.strategies(), [PageStrategy::Batched, PageStrategy::PerResource]);
    }

    #[test]
    fn later_and_tag_pages_use_listings() {
        let more = FetchPlan::for_ticket(&ticket(LoadKind::More, BrowseMode::Normal), true);
        assert_eq!(more.strategies(), [PageStrategy::Markup, PageStrategy::Json]);
        let tag = FetchPlan::for_ticket(&ticket(LoadKind::Initial, BrowseMode::Tag("v1".into())), false);
        assert_eq!(tag.strategies(), [PageStrategy::Json]);
    }

    #[test]
    fn run_plan_returns_first_success() {
        let plan = FetchPlan::new(vec![PageStrategy::Batched, PageStrategy::PerResource, PageStrategy::Json]);
        let mut tried = Vec::new();
        let result = run_plan(&plan, |s| {
            tried.push(s);
            if s == PageStrategy::PerResource {
                Ok(7)
            } else {
                Err(BackendError::Transport("down".into()))
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(tried, [PageStrategy::Batched, PageStrategy::PerResource]);
    }

    #[test]
    fn run_plan_collects_every_failure() {
        let plan = FetchPlan::new(vec![PageStrategy::Markup, PageStrategy::Json]);
        let err = run_plan::<(), _>(&plan, |_| Err(BackendError::Transport("down".into())))
            .unwrap_err();
        assert_eq!(err.attempts.len(), 2);
        assert_eq!(err.attempts[1].0, PageStrategy::Json);
    }
}
