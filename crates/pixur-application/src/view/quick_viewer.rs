use super::sequence::{LoadOutcome, LoadSequence};
use crate::pics_service::PicsService;
use pixur_core::pic::{Pic, PicId, SoftDeleteRequest};
use pixur_core::{PixurError, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Deletion details recorded when a picture is rejected from the queue.
pub const REJECT_DETAILS: &str = "downvote";

#[derive(Debug, Default)]
struct Queue {
    current: Option<Pic>,
    pending: VecDeque<Pic>,
    /// Anchor of the next page, `None` once the oldest picture was queued.
    next_anchor: Option<PicId>,
}

/// Steps through the index one picture at a time, oldest last.
///
/// Pages are fetched lazily when the queue runs dry. Each forward page
/// repeats its anchor, which was already shown, so it is skipped. As with
/// [`IndexPager`](super::IndexPager), only the most recently issued start or
/// advance may change the queue; earlier ones report [`LoadOutcome::Stale`].
pub struct QuickViewer {
    pics: Arc<PicsService>,
    sequence: LoadSequence,
    queue: Mutex<Queue>,
}

impl QuickViewer {
    pub fn new(pics: Arc<PicsService>) -> Self {
        Self {
            pics,
            sequence: LoadSequence::default(),
            queue: Mutex::new(Queue::default()),
        }
    }

    /// Starts the queue at `anchor` (the newest picture for `None`) and
    /// returns the first picture, or [`LoadOutcome::End`] for an empty index.
    pub async fn start(&self, anchor: Option<PicId>) -> Result<LoadOutcome<Pic>> {
        let ticket = self.sequence.begin();
        let result = self.pics.list_forward(anchor).await;

        let mut queue = self.queue.lock().await;
        if !self.sequence.is_latest(ticket) {
            debug!(?anchor, ticket, "Discarding stale quick view start");
            return Ok(LoadOutcome::Stale);
        }
        let page = result?;
        queue.next_anchor = page.continuation();
        queue.pending = page.pics.into();
        queue.current = queue.pending.pop_front();
        debug!(count = queue.pending.len(), next = ?queue.next_anchor, "Started quick view");
        Ok(shown(queue.current.clone()))
    }

    pub async fn current(&self) -> Option<Pic> {
        self.queue.lock().await.current.clone()
    }

    /// Moves to the next picture. Returns [`LoadOutcome::End`] past the
    /// oldest one.
    ///
    /// If fetching the next page fails the current picture stays put.
    pub async fn advance(&self) -> Result<LoadOutcome<Pic>> {
        let ticket = self.sequence.begin();
        let mut queue = self.queue.lock().await;
        while queue.pending.is_empty() {
            let Some(anchor) = queue.next_anchor else {
                break;
            };
            let result = self.pics.list_forward(Some(anchor)).await;
            if !self.sequence.is_latest(ticket) {
                debug!(%anchor, ticket, "Discarding stale quick view page");
                return Ok(LoadOutcome::Stale);
            }
            let page = result?;
            queue.next_anchor = page.continuation();
            queue.pending = page.pics.into_iter().filter(|pic| pic.id != anchor).collect();
        }
        if !self.sequence.is_latest(ticket) {
            return Ok(LoadOutcome::Stale);
        }
        queue.current = queue.pending.pop_front();
        Ok(shown(queue.current.clone()))
    }

    /// Soft deletes the current picture, then advances.
    ///
    /// # Errors
    ///
    /// A failed delete is returned without advancing, so the picture can be
    /// rejected again.
    pub async fn reject(&self) -> Result<LoadOutcome<Pic>> {
        let pic_id = self
            .current()
            .await
            .map(|pic| pic.id)
            .ok_or_else(|| PixurError::invalid_argument("nothing to reject"))?;
        let request = SoftDeleteRequest::new(pic_id).with_details(REJECT_DETAILS);
        self.pics.soft_delete(&request).await?;
        info!(%pic_id, "Rejected pic");
        self.advance().await
    }
}

fn shown(pic: Option<Pic>) -> LoadOutcome<Pic> {
    match pic {
        Some(pic) => LoadOutcome::Applied(pic),
        None => LoadOutcome::End,
    }
}
