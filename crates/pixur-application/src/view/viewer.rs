//! Single-picture view.

use super::sequence::{LoadOutcome, LoadSequence};
use crate::comments_service::CommentsService;
use crate::pics_service::PicsService;
use pixur_core::comment::{Comment, CommentNode};
use pixur_core::pic::{
    CommentId, DeletionReason, PicDetails, PicId, SoftDeleteRequest, VoteDirection,
};
use pixur_core::{PixurError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// A picture as the viewer shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPic {
    pub details: PicDetails,
    pub comments: Vec<CommentNode>,
}

impl OpenPic {
    pub fn id(&self) -> PicId {
        self.details.pic.id
    }
}

pub struct PicViewer {
    pics: Arc<PicsService>,
    comments: Arc<CommentsService>,
    sequence: LoadSequence,
    current: Mutex<Option<OpenPic>>,
}

impl PicViewer {
    pub fn new(pics: Arc<PicsService>, comments: Arc<CommentsService>) -> Self {
        Self {
            pics,
            comments,
            sequence: LoadSequence::default(),
            current: Mutex::new(None),
        }
    }

    /// Shows a picture and counts the view.
    ///
    /// The view count is only bumped once the picture is actually shown, and
    /// a failure to bump it never fails the open.
    pub async fn open(&self, pic_id: PicId) -> Result<LoadOutcome<OpenPic>> {
        let outcome = self.load(pic_id).await?;
        if let LoadOutcome::Applied(open) = &outcome {
            self.pics.increment_view_count(open.id()).await;
        }
        Ok(outcome)
    }

    pub async fn current(&self) -> Option<OpenPic> {
        self.current.lock().await.clone()
    }

    pub async fn close(&self) {
        // Invalidate loads still in flight so they cannot reopen the view.
        self.sequence.begin();
        *self.current.lock().await = None;
    }

    pub async fn vote(&self, vote: VoteDirection) -> Result<()> {
        let pic_id = self.open_id().await?;
        self.pics.vote(pic_id, vote).await
    }

    /// Soft deletes the open picture and closes the view.
    pub async fn delete(&self, details: Option<String>, reason: DeletionReason) -> Result<()> {
        let pic_id = self.open_id().await?;
        let mut request = SoftDeleteRequest::new(pic_id).with_reason(reason);
        request.details = details;
        self.pics.soft_delete(&request).await?;
        self.close().await;
        Ok(())
    }

    /// Adds a comment to the open picture and reloads its thread.
    pub async fn reply(&self, parent_id: CommentId, text: &str) -> Result<Comment> {
        let pic_id = self.open_id().await?;
        let comment = self.comments.add_comment(pic_id, parent_id, text).await?;
        if self.load(pic_id).await?.is_stale() {
            debug!(%pic_id, "Reload after reply was superseded");
        }
        Ok(comment)
    }

    async fn open_id(&self) -> Result<PicId> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(OpenPic::id)
            .ok_or_else(|| PixurError::invalid_argument("no picture is open"))
    }

    async fn load(&self, pic_id: PicId) -> Result<LoadOutcome<OpenPic>> {
        let ticket = self.sequence.begin();
        let result = self.pics.get_details(pic_id).await.and_then(|details| {
            let comments = CommentsService::tree_of(&details)?;
            Ok(OpenPic { details, comments })
        });

        let mut current = self.current.lock().await;
        if !self.sequence.is_latest(ticket) {
            debug!(%pic_id, ticket, "Discarding stale picture load");
            return Ok(LoadOutcome::Stale);
        }
        let open = result?;
        *current = Some(open.clone());
        Ok(LoadOutcome::Applied(open))
    }
}
