//! Picture listing, lookup and mutation with client-side caching.

use crate::auth_service::AuthService;
use pixur_core::api::PixurApi;
use pixur_core::cache::{CacheStats, CappedCache};
use pixur_core::config::ClientConfig;
use pixur_core::pic::{
    Direction, NewPic, Page, PageKey, Pic, PicDetails, PicId, SoftDeleteRequest, VoteDirection,
};
use pixur_core::{PixurError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Snapshot of both caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSummary {
    pub pages: CacheStats,
    pub pics: CacheStats,
}

/// Wraps the picture endpoints.
///
/// Two caches sit in front of the API:
/// - pages by `(anchor, direction)`, skipped entirely for the home page
/// - pics by id, filled by every listing and lookup
///
/// A soft delete clears both. Votes and uploads leave them alone.
pub struct PicsService {
    api: Arc<dyn PixurApi>,
    auth: Arc<AuthService>,
    pages: Mutex<CappedCache<PageKey, Page>>,
    pics: Mutex<CappedCache<PicId, Pic>>,
}

impl PicsService {
    /// # Errors
    ///
    /// Returns `PixurError::Config` if either capacity is zero.
    pub fn new(
        api: Arc<dyn PixurApi>,
        auth: Arc<AuthService>,
        page_capacity: usize,
        pic_capacity: usize,
    ) -> Result<Self> {
        Ok(Self {
            api,
            auth,
            pages: Mutex::new(CappedCache::new(page_capacity)?),
            pics: Mutex::new(CappedCache::new(pic_capacity)?),
        })
    }

    pub fn from_config(api: Arc<dyn PixurApi>, auth: Arc<AuthService>, config: &ClientConfig) -> Result<Self> {
        Self::new(api, auth, config.page_cache_capacity, config.pic_cache_capacity)
    }

    /// Lists the anchor and older pictures. `None` or zero loads the home
    /// page, which is never cached.
    pub async fn list_forward(&self, anchor: Option<PicId>) -> Result<Page> {
        self.list(anchor.unwrap_or(PicId::ZERO), Direction::Forward).await
    }

    /// Lists the anchor and newer pictures.
    pub async fn list_backward(&self, anchor: PicId) -> Result<Page> {
        self.list(anchor, Direction::Backward).await
    }

    async fn list(&self, anchor: PicId, direction: Direction) -> Result<Page> {
        let key = PageKey { anchor, direction };
        let cacheable = !anchor.is_zero();

        if cacheable && let Some(page) = self.pages.lock().await.get(&key) {
            debug!(%anchor, ?direction, "Page cache hit");
            return Ok(page);
        }

        let credentials = self.auth.read_credentials().await?;
        let pics = self
            .api
            .find_index_pics(&credentials, cacheable.then_some(anchor), direction)
            .await?;
        debug!(%anchor, ?direction, count = pics.len(), "Fetched page");

        {
            let mut cache = self.pics.lock().await;
            for pic in &pics {
                cache.put(pic.id, pic.clone());
            }
        }

        let page = Page::new(anchor, direction, pics);
        if cacheable {
            self.pages.lock().await.put(key, page.clone());
        }
        Ok(page)
    }

    /// Returns one picture, from the pic cache when possible.
    pub async fn get_single(&self, pic_id: PicId) -> Result<Pic> {
        if let Some(pic) = self.pics.lock().await.get(&pic_id) {
            debug!(%pic_id, "Pic cache hit");
            return Ok(pic);
        }
        Ok(self.get_details(pic_id).await?.pic)
    }

    /// Looks up a picture with its tags and comments. Always hits the
    /// network and refreshes the pic cache entry.
    pub async fn get_details(&self, pic_id: PicId) -> Result<PicDetails> {
        if pic_id.is_zero() {
            return Err(PixurError::invalid_argument("pic id is required"));
        }
        let credentials = self.auth.read_credentials().await?;
        let details = self.api.lookup_pic_details(&credentials, pic_id).await?;
        self.pics.lock().await.put(details.pic.id, details.pic.clone());
        Ok(details)
    }

    /// Uploads a picture from a file, a URL, or both.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` before any request if neither is given.
    pub async fn create(&self, new_pic: &NewPic) -> Result<Pic> {
        new_pic.validate()?;
        let credentials = self.auth.authorized_credentials().await?;
        let pic = self.api.upsert_pic(&credentials, new_pic).await?;
        info!(pic_id = %pic.id, "Created pic");
        Ok(pic)
    }

    pub async fn vote(&self, pic_id: PicId, vote: VoteDirection) -> Result<()> {
        let credentials = self.auth.authorized_credentials().await?;
        self.api.upsert_pic_vote(&credentials, pic_id, vote).await?;
        debug!(%pic_id, %vote, "Voted");
        Ok(())
    }

    /// Marks a picture for deletion and drops every cached page and pic.
    pub async fn soft_delete(&self, request: &SoftDeleteRequest) -> Result<()> {
        let credentials = self.auth.authorized_credentials().await?;
        self.api.soft_delete_pic(&credentials, request).await?;
        self.clear_caches().await;
        info!(pic_id = %request.pic_id, reason = request.reason.as_str(), "Soft deleted pic");
        Ok(())
    }

    /// Counts a view. Failures are logged and otherwise ignored.
    pub async fn increment_view_count(&self, pic_id: PicId) {
        let result = match self.auth.read_credentials().await {
            Ok(credentials) => self.api.increment_pic_view_count(&credentials, pic_id).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!(%pic_id, error = %err, "Failed to increment view count");
        }
    }

    pub async fn clear_caches(&self) {
        self.pages.lock().await.clear();
        self.pics.lock().await.clear();
    }

    pub async fn cache_summary(&self) -> CacheSummary {
        CacheSummary {
            pages: self.pages.lock().await.stats(),
            pics: self.pics.lock().await.stats(),
        }
    }
}
