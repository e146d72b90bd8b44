//! Turns the paginated notification feed into a hydrated [`ViewModel`].

use chrono::{DateTime, Local, SecondsFormat, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    domain::{CommentCard, NotifCard, RawNotification, RepoFilter, ViewModel, split_full_name},
    github::{FetchError, NotificationSource},
    markdown::MarkdownRenderer,
};

pub const PAGE_SIZE: u32 = 50;

const HOUR_MS: i64 = 3_600_000;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("listing notifications failed: {0}")]
    List(#[source] FetchError),
    #[error("repository name {0:?} is not of the form owner/name")]
    MalformedRepository(String),
    #[error("subject URL {0:?} does not end in an issue number")]
    MalformedSubjectUrl(String),
    #[error("fetching issue #{number} failed: {source}")]
    Issue {
        number: u64,
        #[source]
        source: FetchError,
    },
    #[error("fetching comments of issue #{number} failed: {source}")]
    Comments {
        number: u64,
        #[source]
        source: FetchError,
    },
}

/// Builds the dashboard view for one request.
///
/// Only a failure to list notifications aborts the whole view. A notification
/// whose identifiers cannot be parsed, or whose issue cannot be fetched, is
/// logged, reported in [`ViewModel::skipped`] and still counted. A failed
/// comment fetch is reported the same way but keeps the card, without comments.
pub fn aggregate(
    source: &dyn NotificationSource,
    renderer: &MarkdownRenderer,
    filter: &RepoFilter,
    now: DateTime<Utc>,
) -> Result<ViewModel, PipelineError> {
    let notifications = collect_matching(source, filter)?;

    let mut cards = Vec::new();
    let mut skipped = Vec::new();
    for notification in &notifications {
        match build_card(source, renderer, notification, now, &mut skipped) {
            Ok(Some(card)) => cards.push(card),
            Ok(None) => debug!(id = %notification.id, "issue body is empty, no card"),
            Err(err) => {
                warn!(id = %notification.id, "skipping notification: {err}");
                skipped.push(format!("{} ({}): {err}", notification.id, notification.repo));
            }
        }
    }

    info!(
        matching = notifications.len(),
        cards = cards.len(),
        skipped = skipped.len(),
        "dashboard aggregated"
    );

    Ok(ViewModel {
        cards,
        refreshed_at: now.with_timezone(&Local).format("%H:%M").to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        count: notifications.len(),
        skipped,
    })
}

/// Walks every page of the feed, then keeps the entries for the target repo.
fn collect_matching(
    source: &dyn NotificationSource,
    filter: &RepoFilter,
) -> Result<Vec<RawNotification>, PipelineError> {
    let mut matching = Vec::new();
    let mut page = 1;
    loop {
        let batch = source
            .list_notifications(page, PAGE_SIZE)
            .map_err(PipelineError::List)?;
        for notification in batch.notifications {
            if filter.matches(&notification.repo) {
                debug!(
                    id = %notification.id,
                    updated_at = %notification.updated_at,
                    "notification matches"
                );
                matching.push(notification);
            }
        }

        match batch.next_page {
            Some(next) if next > page => page = next,
            Some(next) => {
                warn!(page, next, "feed pointed backwards, stopping pagination");
                break;
            }
            None => break,
        }
    }
    Ok(matching)
}

fn build_card(
    source: &dyn NotificationSource,
    renderer: &MarkdownRenderer,
    notification: &RawNotification,
    now: DateTime<Utc>,
    skipped: &mut Vec<String>,
) -> Result<Option<NotifCard>, PipelineError> {
    let (owner, repo) = split_full_name(&notification.repo)
        .ok_or_else(|| PipelineError::MalformedRepository(notification.repo.clone()))?;
    let number = issue_number(notification.subject_url.as_deref())?;

    let issue = source
        .get_issue(owner, repo, number)
        .map_err(|source| PipelineError::Issue { number, source })?;
    if issue.body.is_empty() {
        return Ok(None);
    }

    let comments = if issue.comments == 0 {
        Vec::new()
    } else {
        match source.list_comments(owner, repo, number) {
            Ok(comments) => comments
                .into_iter()
                .filter(|comment| !comment.body.is_empty())
                .map(|comment| CommentCard {
                    title: comment.author,
                    body_html: renderer.render(&comment.body),
                    url: comment.html_url,
                    age: format_age(now - comment.created_at),
                })
                .collect(),
            Err(source) => {
                let err = PipelineError::Comments { number, source };
                warn!(id = %notification.id, "showing card without comments: {err}");
                skipped.push(format!("{} ({}): {err}", notification.id, notification.repo));
                Vec::new()
            }
        }
    };

    Ok(Some(NotifCard {
        notification_id: notification.id.clone(),
        body_html: renderer.render(&issue.body),
        closed: issue.is_closed(),
        title: issue.title,
        url: issue.html_url,
        labels: issue.labels,
        comments,
    }))
}

fn issue_number(subject_url: Option<&str>) -> Result<u64, PipelineError> {
    let url = subject_url.unwrap_or_default();
    url.rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| PipelineError::MalformedSubjectUrl(url.to_owned()))
}

/// Rounds to the nearest hour (halves away from zero) and prints it the way
/// durations are written on the dashboard: `3h0m0s`, `0s`, `-1h0m0s`.
pub fn format_age(age: TimeDelta) -> String {
    let millis = age.num_milliseconds();
    let hours = (millis.abs() + HOUR_MS / 2) / HOUR_MS;
    match hours {
        0 => "0s".to_owned(),
        _ if millis < 0 => format!("-{hours}h0m0s"),
        _ => format!("{hours}h0m0s"),
    }
}
