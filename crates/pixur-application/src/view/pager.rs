//! Index grid state.

use super::sequence::{LoadOutcome, LoadSequence};
use crate::pics_service::PicsService;
use pixur_core::Result;
use pixur_core::pic::{Direction, Page, PicId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Holds the page the index grid currently shows.
///
/// Loads may overlap (a user paging quickly); whichever was issued last
/// wins and earlier results are reported as [`LoadOutcome::Stale`].
pub struct IndexPager {
    pics: Arc<PicsService>,
    sequence: LoadSequence,
    current: Mutex<Option<Page>>,
}

impl IndexPager {
    pub fn new(pics: Arc<PicsService>) -> Self {
        Self {
            pics,
            sequence: LoadSequence::default(),
            current: Mutex::new(None),
        }
    }

    /// Loads the page starting at `anchor` (home page for `None`), older
    /// pictures first.
    pub async fn load(&self, anchor: Option<PicId>) -> Result<LoadOutcome<Page>> {
        self.load_page(anchor.unwrap_or(PicId::ZERO), Direction::Forward).await
    }

    /// Loads the page of older pictures.
    pub async fn load_next(&self) -> Result<LoadOutcome<Page>> {
        let Some(page) = self.snapshot().await else {
            return self.load(None).await;
        };
        let anchor = match page.direction {
            Direction::Forward => page.continuation(),
            Direction::Backward => page.pics.first().map(|pic| pic.id),
        };
        match anchor {
            Some(anchor) => self.load_page(anchor, Direction::Forward).await,
            None => Ok(LoadOutcome::End),
        }
    }

    /// Loads the page of newer pictures.
    pub async fn load_previous(&self) -> Result<LoadOutcome<Page>> {
        let Some(page) = self.snapshot().await else {
            return Ok(LoadOutcome::End);
        };
        let anchor = match page.direction {
            Direction::Forward => page.pics.first().map(|pic| pic.id),
            Direction::Backward => page.continuation(),
        };
        match anchor {
            Some(anchor) => self.load_page(anchor, Direction::Backward).await,
            None => Ok(LoadOutcome::End),
        }
    }

    pub async fn snapshot(&self) -> Option<Page> {
        self.current.lock().await.clone()
    }

    async fn load_page(&self, anchor: PicId, direction: Direction) -> Result<LoadOutcome<Page>> {
        let ticket = self.sequence.begin();
        let result = match direction {
            Direction::Forward => self.pics.list_forward(Some(anchor)).await,
            Direction::Backward => self.pics.list_backward(anchor).await,
        };

        let mut current = self.current.lock().await;
        if !self.sequence.is_latest(ticket) {
            debug!(%anchor, ?direction, ticket, "Discarding stale page load");
            return Ok(LoadOutcome::Stale);
        }
        let page = result?;
        *current = Some(page.clone());
        Ok(LoadOutcome::Applied(page))
    }
}
