use crate::pic::{CommentId, PicId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single comment as the API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub pic_id: PicId,
    pub comment_id: CommentId,
    /// [`CommentId::ZERO`] for top-level comments.
    #[serde(default)]
    pub comment_parent_id: CommentId,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::wire::int64")]
    pub version: i64,
}

impl Comment {
    pub fn new(id: CommentId, parent: CommentId, text: impl Into<String>) -> Self {
        Self {
            pic_id: PicId::ZERO,
            comment_id: id,
            comment_parent_id: parent,
            text: text.into(),
            created_time: None,
            modified_time: None,
            version: 0,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.comment_parent_id.is_zero()
    }
}

/// A comment together with its replies.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> CommentId {
        self.comment.comment_id
    }

    /// Number of comments in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(CommentNode::subtree_len).sum::<usize>()
    }
}
