use super::id::{PicId, TagId};
use crate::comment::Comment;
use crate::error::{PixurError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mime tag the server uses for pictures that render as video.
pub const VIDEO_MIME: &str = "WEBM";

/// A picture as returned by the index and lookup endpoints.
///
/// Apart from `id` and `mime` the fields are display metadata the client
/// passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pic {
    pub id: PicId,
    #[serde(rename = "type", default)]
    pub mime: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default, with = "crate::wire::int64")]
    pub version: i64,
    #[serde(default)]
    pub relative_url: String,
    #[serde(default)]
    pub thumbnail_relative_url: String,
    #[serde(default)]
    pub pending_deletion: bool,
    #[serde(default, with = "crate::wire::int64")]
    pub view_count: i64,
    /// Animation length in the API's duration notation (e.g. `"1.5s"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default)]
    pub score_lo: f64,
    #[serde(default)]
    pub score_hi: f64,
}

impl Pic {
    /// Creates a pic with only the fields the client reasons about.
    pub fn new(id: PicId, mime: impl Into<String>) -> Self {
        Self {
            id,
            mime: mime.into(),
            width: 0,
            height: 0,
            version: 0,
            relative_url: String::new(),
            thumbnail_relative_url: String::new(),
            pending_deletion: false,
            view_count: 0,
            duration: None,
            score_lo: 0.0,
            score_hi: 0.0,
        }
    }

    pub fn kind(&self) -> PicKind {
        if self.mime.eq_ignore_ascii_case(VIDEO_MIME) {
            PicKind::Video
        } else {
            PicKind::Image
        }
    }
}

/// How a picture is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicKind {
    Image,
    Video,
}

/// A tag attached to a picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicTag {
    pub pic_id: PicId,
    pub tag_id: TagId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::wire::int64")]
    pub version: i64,
}

/// Flat, post-order comment list as the lookup endpoint returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PicCommentList {
    #[serde(default, rename = "comment")]
    pub comments: Vec<Comment>,
}

/// Everything the single-picture view needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicDetails {
    pub pic: Pic,
    #[serde(default, rename = "picTag")]
    pub tags: Vec<PicTag>,
    #[serde(default, rename = "picCommentTree")]
    pub comment_tree: PicCommentList,
}

/// Scroll direction of an index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Older pictures, starting at the anchor.
    Forward,
    /// Newer pictures, starting at the anchor.
    Backward,
}

/// Page cache key. Forward and backward pages of one anchor are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub anchor: PicId,
    pub direction: Direction,
}

/// One batch of pictures for an anchor and direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Zero for the home page.
    pub anchor: PicId,
    pub direction: Direction,
    pub pics: Vec<Pic>,
}

impl Page {
    pub fn new(anchor: PicId, direction: Direction, pics: Vec<Pic>) -> Self {
        Self {
            anchor,
            direction,
            pics,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pics.is_empty()
    }

    /// Anchor of the page after this one in the same direction.
    ///
    /// Pages continue from their last picture. Backward pages echo the
    /// anchor first, so fewer than two pictures means the newest edge has
    /// been reached; a page whose last picture is its own anchor has reached
    /// the edge in either direction.
    pub fn continuation(&self) -> Option<PicId> {
        let min_len = match self.direction {
            Direction::Forward => 1,
            Direction::Backward => 2,
        };
        if self.pics.len() < min_len {
            return None;
        }
        self.pics
            .last()
            .map(|pic| pic.id)
            .filter(|id| *id != self.anchor)
    }
}

/// Vote value accepted by the vote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
    Neutral,
}

impl VoteDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "UP",
            VoteDirection::Down => "DOWN",
            VoteDirection::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = PixurError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UP" => Ok(VoteDirection::Up),
            "DOWN" => Ok(VoteDirection::Down),
            "NEUTRAL" => Ok(VoteDirection::Neutral),
            other => Err(PixurError::invalid_argument(format!(
                "unknown vote direction '{}'",
                other
            ))),
        }
    }
}

/// Why a picture is being deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletionReason {
    #[default]
    None,
    RuleViolation,
}

impl DeletionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DeletionReason::None => "NONE",
            DeletionReason::RuleViolation => "RULE_VIOLATION",
        }
    }
}

/// Parameters of a soft delete.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftDeleteRequest {
    pub pic_id: PicId,
    pub details: Option<String>,
    pub reason: DeletionReason,
}

impl SoftDeleteRequest {
    pub fn new(pic_id: PicId) -> Self {
        Self {
            pic_id,
            details: None,
            reason: DeletionReason::None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_reason(mut self, reason: DeletionReason) -> Self {
        self.reason = reason;
        self
    }
}

/// Raw file content for an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A picture to create, from raw content, a remote URL, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPic {
    pub file: Option<UploadFile>,
    pub url: Option<String>,
}

impl NewPic {
    pub fn from_file(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file: Some(UploadFile {
                name: name.into(),
                bytes,
            }),
            url: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            file: None,
            url: Some(url.into()),
        }
    }

    /// Rejects uploads that carry neither a file nor a non-empty URL.
    pub fn validate(&self) -> Result<()> {
        let has_url = self.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        if self.file.is_none() && !has_url {
            return Err(PixurError::invalid_argument(
                "either a file or a url is required",
            ));
        }
        Ok(())
    }
}
