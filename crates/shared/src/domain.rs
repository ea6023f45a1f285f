use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque key of a stored post object. Unique within the store and used to
/// join list results with get/delete calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(pub String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-indexed page cursor into the object listing. Never goes below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page(u32);

impl Page {
    pub const FIRST: Page = Page(1);

    pub fn new(number: u32) -> Self {
        Self(number.max(1))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_first(self) -> bool {
        self.0 == 1
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Saturates at the first page.
    pub fn prev(self) -> Self {
        Self(self.0.saturating_sub(1).max(1))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A post as submitted to the upload endpoint. All four fields must be
/// non-empty for a valid create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub date: String,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' must not be empty")]
pub struct PostValidationError {
    pub field: &'static str,
}

impl Post {
    /// Reports the first empty field by name.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("date", &self.date),
            ("author", &self.author),
            ("content", &self.content),
        ] {
            if value.trim().is_empty() {
                return Err(PostValidationError { field });
            }
        }
        Ok(())
    }
}

/// Segment index of the Markdown body within the decoded object text, per
/// the backend's front-matter layout.
const BODY_SEGMENT_INDEX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("object body has {segments} '---' segment(s), expected at least {expected}")]
pub struct ObjectBodyError {
    pub segments: usize,
    pub expected: usize,
}

/// Decoded `get` payload: UTF-8 text carrying `---`-delimited front-matter
/// segments followed by the Markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    segments: Vec<String>,
}

impl StoredObject {
    pub fn from_text(text: &str) -> Result<Self, ObjectBodyError> {
        let segments: Vec<String> = text.split("---").map(str::to_string).collect();
        if segments.len() <= BODY_SEGMENT_INDEX {
            return Err(ObjectBodyError {
                segments: segments.len(),
                expected: BODY_SEGMENT_INDEX + 1,
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The Markdown body segment. Interpreting the front-matter segments is
    /// left to callers that care about them.
    pub fn markdown_body(&self) -> &str {
        &self.segments[BODY_SEGMENT_INDEX]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_constructor_clamps_zero_to_first() {
        assert_eq!(Page::new(0), Page::FIRST);
        assert_eq!(Page::new(3).get(), 3);
    }

    #[test]
    fn page_prev_saturates_at_first() {
        assert_eq!(Page::FIRST.prev(), Page::FIRST);
        assert_eq!(Page::new(5).prev(), Page::new(4));
    }

    #[test]
    fn page_next_then_prev_round_trips() {
        let page = Page::new(7);
        assert_eq!(page.next().prev(), page);
    }

    #[test]
    fn post_validation_names_first_empty_field() {
        let post = Post {
            title: "A title".into(),
            date: "2024-05-01".into(),
            author: "  ".into(),
            content: "body".into(),
        };
        let err = post.validate().expect_err("author is empty");
        assert_eq!(err.field, "author");
    }

    #[test]
    fn post_validation_accepts_complete_post() {
        let post = Post {
            title: "A title".into(),
            date: "2024-05-01".into(),
            author: "alice".into(),
            content: "# Hello".into(),
        };
        assert!(post.validate().is_ok());
    }

    #[test]
    fn stored_object_exposes_third_segment_as_body() {
        let object = StoredObject::from_text("front\n---\nmeta\n---\n# Hello").expect("parse");
        assert_eq!(object.markdown_body(), "\n# Hello");
        assert_eq!(object.segments().len(), 3);
    }

    #[test]
    fn stored_object_rejects_missing_body_segment() {
        let err = StoredObject::from_text("front\n---\nmeta").expect_err("two segments");
        assert_eq!(err.segments, 2);
    }
}
