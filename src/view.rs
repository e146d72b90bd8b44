//! HTML rendering of the dashboard.

use std::path::Path;

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use url::form_urlencoded;

use crate::domain::{CommentCard, Label, NotifCard, ViewModel};

const DEFAULT_STYLESHEET: &str = include_str!("../assets/dashboard.css");

/// Page chrome shared by every response. The stylesheet is resolved once at
/// startup.
pub struct PageTemplate {
    stylesheet: String,
}

impl PageTemplate {
    pub fn embedded() -> Self {
        Self {
            stylesheet: DEFAULT_STYLESHEET.to_owned(),
        }
    }

    /// Loads the stylesheet from `path`, or uses the built-in one.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::embedded());
        };
        let stylesheet = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stylesheet {}", path.display()))?;
        Ok(Self { stylesheet })
    }

    fn page(&self, title: &str, body: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (title) }
                    style { (PreEscaped(&self.stylesheet)) }
                }
                body {
                    div class="container" {
                        (body)
                    }
                }
            }
        }
    }

    pub fn dashboard(&self, view: &ViewModel) -> Markup {
        let read_href = format!(
            "/read/?time={}",
            form_urlencoded::byte_serialize(view.timestamp.as_bytes()).collect::<String>()
        );

        self.page(
            &format!("({}) Escalations", view.count),
            html! {
                header class="board-header" {
                    h1 { "Escalations" }
                    div class="board-meta" {
                        span class="count" { (view.count) " notifications" }
                        span class="refreshed" { "Refreshed " (view.refreshed_at) }
                        a class="mark-read" href=(read_href) { "Mark all read" }
                    }
                }
                main {
                    @if view.cards.is_empty() {
                        p class="empty-state" { "Nothing to show" }
                    }
                    @for card in &view.cards {
                        (notif_card(card))
                    }
                }
                @if !view.skipped.is_empty() {
                    footer class="skipped" {
                        p { (view.skipped.len()) " notifications could not be fully loaded:" }
                        ul {
                            @for entry in &view.skipped {
                                li { (entry) }
                            }
                        }
                    }
                }
            },
        )
    }

    pub fn error(&self, status: u16, message: &str) -> Markup {
        self.page(
            &format!("Error {status}"),
            html! {
                main class="error" {
                    h1 { "Error " (status) }
                    p { (message) }
                    a href="/" { "Back to dashboard" }
                }
            },
        )
    }
}

fn notif_card(card: &NotifCard) -> Markup {
    html! {
        article class=(if card.closed { "card closed" } else { "card" }) id=(card.notification_id) {
            div class="card-header" {
                a class="card-title" href=(card.url) { (card.title) }
                @if card.closed {
                    span class="badge-closed" { "closed" }
                }
            }
            @if !card.labels.is_empty() {
                div class="labels" {
                    @for label in &card.labels {
                        (label_chip(label))
                    }
                }
            }
            div class="card-body" { (PreEscaped(&card.body_html)) }
            @if !card.comments.is_empty() {
                details class="comments" {
                    summary { (card.comments.len()) " comments" }
                    @for comment in &card.comments {
                        (comment_block(comment))
                    }
                }
            }
        }
    }
}

fn label_chip(label: &Label) -> Markup {
    let is_hex = label.color.len() == 6 && label.color.chars().all(|c| c.is_ascii_hexdigit());
    html! {
        @if is_hex {
            span class="label" style=(format!("border-color: #{}", label.color)) { (label.name) }
        } @else {
            span class="label" { (label.name) }
        }
    }
}

fn comment_block(comment: &CommentCard) -> Markup {
    html! {
        div class="comment" {
            div class="comment-header" {
                a href=(comment.url) { (comment.title) }
                span class="age" { (comment.age) " ago" }
            }
            div class="comment-body" { (PreEscaped(&comment.body_html)) }
        }
    }
}
