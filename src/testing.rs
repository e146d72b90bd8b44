//! In-memory notification source shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{CommentDetail, IssueDetail, RawNotification},
    github::{FetchError, NotificationPage, NotificationSource},
};

pub const REPO: &str = "grafana/support-escalations";

#[derive(Default)]
pub struct StubSource {
    pub pages: Vec<Vec<RawNotification>>,
    pub issues: HashMap<u64, IssueDetail>,
    pub comments: HashMap<u64, Vec<CommentDetail>>,
    pub mark_read_status: u16,
    pub fail_listing: bool,
    pub fail_comments: bool,
    pub fail_mark_read: bool,
    pub list_calls: AtomicUsize,
    pub comment_calls: AtomicUsize,
    pub cursors: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl StubSource {
    pub fn with_pages(pages: Vec<Vec<RawNotification>>) -> Self {
        Self {
            pages,
            mark_read_status: 205,
            ..Self::default()
        }
    }

    pub fn issue(mut self, number: u64, issue: IssueDetail) -> Self {
        self.issues.insert(number, issue);
        self
    }

    pub fn comments(mut self, number: u64, comments: Vec<CommentDetail>) -> Self {
        self.comments.insert(number, comments);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn is_read(&self, notification: &RawNotification) -> bool {
        self.cursors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&notification.repo)
            .is_some_and(|cursor| notification.updated_at <= *cursor)
    }
}

impl NotificationSource for StubSource {
    fn list_notifications(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<NotificationPage, FetchError> {
        assert_eq!(per_page, 50);
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(FetchError::NotFound(format!("notifications page {page}")));
        }

        let index = page as usize - 1;
        let notifications = self
            .pages
            .get(index)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| !self.is_read(item))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let next_page = (index + 1 < self.pages.len()).then_some(page + 1);

        Ok(NotificationPage {
            notifications,
            next_page,
        })
    }

    fn get_issue(&self, _owner: &str, _repo: &str, number: u64) -> Result<IssueDetail, FetchError> {
        self.issues
            .get(&number)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("issue #{number}")))
    }

    fn list_comments(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<Vec<CommentDetail>, FetchError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_comments {
            return Err(FetchError::NotFound(format!("comments of issue #{number}")));
        }
        Ok(self.comments.get(&number).cloned().unwrap_or_default())
    }

    fn mark_repository_read(
        &self,
        owner: &str,
        repo: &str,
        last_read_at: DateTime<Utc>,
    ) -> Result<u16, FetchError> {
        if self.fail_mark_read {
            return Err(FetchError::NotFound(format!("{owner}/{repo}")));
        }
        self.cursors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(format!("{owner}/{repo}"), last_read_at);
        Ok(self.mark_read_status)
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub fn notification(id: &str, repo: &str, number: u64) -> RawNotification {
    RawNotification {
        id: id.to_owned(),
        subject_url: Some(format!("https://api.github.com/repos/{repo}/issues/{number}")),
        repo: repo.to_owned(),
        updated_at: at(9, 0),
    }
}

pub fn issue(body: &str, state: &str, comments: u32) -> IssueDetail {
    IssueDetail {
        title: format!("Issue in state {state}"),
        body: body.to_owned(),
        html_url: "https://github.com/grafana/support-escalations/issues/1".to_owned(),
        state: state.to_owned(),
        labels: Vec::new(),
        comments,
    }
}

pub fn comment(author: &str, body: &str, created_at: DateTime<Utc>) -> CommentDetail {
    CommentDetail {
        author: author.to_owned(),
        body: body.to_owned(),
        html_url: format!("https://github.com/{REPO}/issues/1#issuecomment-{author}"),
        created_at,
    }
}
