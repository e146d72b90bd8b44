use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    StatusCode,
    header::{ACCEPT, LINK},
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::domain::{CommentDetail, IssueDetail, Label, RawNotification};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT_HEADER: &str = "escalation-board/0.1";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const COMMENTS_PER_PAGE: &str = "100";

/// One page of the notification feed.
#[derive(Debug, Default)]
pub struct NotificationPage {
    pub notifications: Vec<RawNotification>,
    pub next_page: Option<u32>,
}

/// Everything the dashboard asks of the issue tracker.
pub trait NotificationSource: Send + Sync {
    fn list_notifications(&self, page: u32, per_page: u32)
    -> Result<NotificationPage, FetchError>;

    fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<IssueDetail, FetchError>;

    /// Comments on an issue, newest first.
    fn list_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommentDetail>, FetchError>;

    /// Marks every notification in `owner/repo` updated at or before
    /// `last_read_at` as read and returns the upstream status code.
    fn mark_repository_read(
        &self,
        owner: &str,
        repo: &str,
        last_read_at: DateTime<Utc>,
    ) -> Result<u16, FetchError>;
}

pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(USER_AGENT_HEADER)
        .timeout(timeout)
        .build()
        .map_err(FetchError::Http)
}

/// Authenticated GitHub REST client. Holds no mutable state, so one instance
/// is shared by every request.
pub struct GitHubClient {
    http: Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: &str, api_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        if token.is_empty() {
            return Err(FetchError::MissingToken);
        }

        Ok(Self {
            http: build_client(timeout)?,
            token: token.to_owned(),
            api_url: api_url.trim_end_matches('/').to_owned(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .bearer_auth(&self.token)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.get(format!("{}{path}", self.api_url)))
    }
}

impl NotificationSource for GitHubClient {
    fn list_notifications(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<NotificationPage, FetchError> {
        let response = self
            .get("/notifications")
            .query(&[("page", page), ("per_page", per_page)])
            .send()?
            .error_for_status()?;

        let next_page = next_page_from_link(&response);
        let payload: Vec<NotificationResponse> = response.json()?;

        Ok(NotificationPage {
            notifications: payload.into_iter().map(RawNotification::from).collect(),
            next_page,
        })
    }

    fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<IssueDetail, FetchError> {
        let response = self
            .get(&format!("/repos/{owner}/{repo}/issues/{number}"))
            .send()?;
        // Deleted or transferred issues still show up in the feed.
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(format!("issue {owner}/{repo}#{number}")));
        }
        let issue: IssueResponse = response.error_for_status()?.json()?;

        Ok(issue.into())
    }

    fn list_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommentDetail>, FetchError> {
        let comments: Vec<CommentResponse> = self
            .get(&format!("/repos/{owner}/{repo}/issues/{number}/comments"))
            .query(&[
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", COMMENTS_PER_PAGE),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        Ok(comments.into_iter().map(CommentDetail::from).collect())
    }

    fn mark_repository_read(
        &self,
        owner: &str,
        repo: &str,
        last_read_at: DateTime<Utc>,
    ) -> Result<u16, FetchError> {
        let url = format!("{}/repos/{owner}/{repo}/notifications", self.api_url);
        let body = json!({
            "last_read_at": last_read_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        let response = self.authorized(self.http.put(url)).json(&body).send()?;
        Ok(response.status().as_u16())
    }
}

fn next_page_from_link(response: &Response) -> Option<u32> {
    response
        .headers()
        .get(LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_next_page)
}

/// Extracts the `page` query parameter of the `rel="next"` entry of a GitHub
/// `Link` header.
fn parse_next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim().strip_prefix('<')?.strip_suffix('>')?;
        if !parts.any(|param| param.trim() == r#"rel="next""#) {
            return None;
        }
        Url::parse(target)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Access token is missing")]
    MissingToken,
    #[error("{0} not found")]
    NotFound(String),
}

// Response payloads ---------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NotificationResponse {
    id: String,
    updated_at: DateTime<Utc>,
    subject: NotificationSubject,
    repository: NotificationRepository,
}

#[derive(Debug, Deserialize)]
struct NotificationSubject {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotificationRepository {
    full_name: String,
}

impl From<NotificationResponse> for RawNotification {
    fn from(item: NotificationResponse) -> Self {
        RawNotification {
            id: item.id,
            subject_url: item.subject.url,
            repo: item.repository.full_name,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    title: String,
    body: Option<String>,
    html_url: String,
    state: String,
    #[serde(default)]
    labels: Vec<LabelResponse>,
    #[serde(default)]
    comments: u32,
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    name: String,
    color: Option<String>,
}

impl From<IssueResponse> for IssueDetail {
    fn from(issue: IssueResponse) -> Self {
        IssueDetail {
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            html_url: issue.html_url,
            state: issue.state,
            labels: issue
                .labels
                .into_iter()
                .map(|label| Label {
                    name: label.name,
                    color: label.color.unwrap_or_default(),
                })
                .collect(),
            comments: issue.comments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    body: Option<String>,
    html_url: String,
    created_at: DateTime<Utc>,
    user: Option<GitHubUser>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

impl From<CommentResponse> for CommentDetail {
    fn from(comment: CommentResponse) -> Self {
        CommentDetail {
            // Deleted accounts come back as `null`; GitHub shows them as "ghost".
            author: comment
                .user
                .map(|user| user.login)
                .unwrap_or_else(|| "ghost".to_owned()),
            body: comment.body.unwrap_or_default(),
            html_url: comment.html_url,
            created_at: comment.created_at,
        }
    }
}

// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------
