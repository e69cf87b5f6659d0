//! Comment threads: posting comments and assembling the reply tree.

use crate::auth_service::AuthService;
use crate::pics_service::PicsService;
use pixur_core::api::PixurApi;
use pixur_core::comment::{Comment, CommentNode, build_comment_tree};
use pixur_core::pic::{CommentId, PicDetails, PicId};
use pixur_core::{PixurError, Result};
use std::sync::Arc;
use tracing::info;

/// Comment threads of a picture.
pub struct CommentsService {
    api: Arc<dyn PixurApi>,
    auth: Arc<AuthService>,
    pics: Arc<PicsService>,
}

impl CommentsService {
    pub fn new(api: Arc<dyn PixurApi>, auth: Arc<AuthService>, pics: Arc<PicsService>) -> Self {
        Self { api, auth, pics }
    }

    /// Posts a comment. `parent_id` is [`CommentId::ZERO`] for a top-level
    /// comment.
    pub async fn add_comment(&self, pic_id: PicId, parent_id: CommentId, text: &str) -> Result<Comment> {
        if pic_id.is_zero() {
            return Err(PixurError::invalid_argument("pic id is required"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(PixurError::invalid_argument("comment text is required"));
        }

        let credentials = self.auth.authorized_credentials().await?;
        let comment = self.api.add_pic_comment(&credentials, pic_id, parent_id, text).await?;
        info!(%pic_id, comment_id = %comment.comment_id, "Added comment");
        Ok(comment)
    }

    /// Loads a picture's comments as a tree.
    pub async fn comment_tree(&self, pic_id: PicId) -> Result<Vec<CommentNode>> {
        let details = self.pics.get_details(pic_id).await?;
        Self::tree_of(&details)
    }

    /// Builds the tree from details already in hand.
    pub fn tree_of(details: &PicDetails) -> Result<Vec<CommentNode>> {
        Ok(build_comment_tree(details.comment_tree.comments.clone())?)
    }
}
