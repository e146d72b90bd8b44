use chrono::{DateTime, Utc};

// Domain data structures shared across modules.

/// One entry of the notification feed, reduced to what the dashboard needs.
#[derive(Clone, Debug)]
pub struct RawNotification {
    pub id: String,
    pub subject_url: Option<String>,
    pub repo: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug)]
pub struct IssueDetail {
    pub title: String,
    pub body: String,
    pub html_url: String,
    pub state: String,
    pub labels: Vec<Label>,
    pub comments: u32,
}

impl IssueDetail {
    pub fn is_closed(&self) -> bool {
        self.state == "closed"
    }
}

#[derive(Clone, Debug)]
pub struct CommentDetail {
    pub author: String,
    pub body: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CommentCard {
    pub title: String,
    pub body_html: String,
    pub url: String,
    pub age: String,
}

/// Renderable unit for one issue with a non-empty body.
#[derive(Clone, Debug)]
pub struct NotifCard {
    pub notification_id: String,
    pub title: String,
    pub url: String,
    pub body_html: String,
    pub labels: Vec<Label>,
    pub comments: Vec<CommentCard>,
    pub closed: bool,
}

#[derive(Clone, Debug)]
pub struct ViewModel {
    pub cards: Vec<NotifCard>,
    pub refreshed_at: String,
    pub timestamp: String,
    /// Notifications that passed the repository filter, including those
    /// without a card.
    pub count: usize,
    pub skipped: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum MatchMode {
    Substring,
    Exact,
}

/// Target repository plus the rule deciding which notifications belong to it.
#[derive(Clone, Debug)]
pub struct RepoFilter {
    pub owner: String,
    pub name: String,
    pub mode: MatchMode,
}

impl RepoFilter {
    /// Splits `owner/name`; anything but two non-empty segments is rejected.
    pub fn parse(full_name: &str, mode: MatchMode) -> Option<Self> {
        let (owner, name) = split_full_name(full_name)?;
        Some(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
            mode,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn matches(&self, repo: &str) -> bool {
        match self.mode {
            MatchMode::Substring => repo.contains(&self.name),
            MatchMode::Exact => repo == self.full_name(),
        }
    }
}

pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let mut parts = full_name.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Some((owner, name))
        }
        _ => None,
    }
}
