//! The REST API seam.
//!
//! Services talk to the server only through [`PixurApi`]. The HTTP adapter
//! lives in the infrastructure crate; tests substitute in-memory fakes.

use crate::auth::PwtPayload;
use crate::comment::Comment;
use crate::error::Result;
use crate::pic::{CommentId, Direction, NewPic, Pic, PicDetails, PicId, SoftDeleteRequest, VoteDirection};
use serde::{Deserialize, Serialize};

/// Credentials attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub xsrf_token: Option<String>,
    pub auth_token: Option<String>,
}

/// How a token pair is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    /// Fresh login.
    Password { ident: String, secret: String },
    /// Exchange of a stored refresh token.
    Refresh { refresh_token: String },
}

/// Response of `getRefreshToken`.
///
/// Token strings may arrive either in the body or only as cookies; the
/// adapter fills them in from whichever is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub pix_token: String,
    /// Absent when the server issues auth tokens without a refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_payload: Option<PwtPayload>,
    pub auth_payload: PwtPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pix_payload: Option<PwtPayload>,
}

/// Operations of the picture API used by the client.
#[async_trait::async_trait]
pub trait PixurApi: Send + Sync {
    /// `findNextIndexPics` / `findPreviousIndexPics`. `None` asks for the
    /// home page.
    async fn find_index_pics(
        &self,
        credentials: &Credentials,
        anchor: Option<PicId>,
        direction: Direction,
    ) -> Result<Vec<Pic>>;

    /// `lookupPicDetails`.
    async fn lookup_pic_details(&self, credentials: &Credentials, pic_id: PicId) -> Result<PicDetails>;

    /// `upsertPic`.
    async fn upsert_pic(&self, credentials: &Credentials, new_pic: &NewPic) -> Result<Pic>;

    /// `softDeletePic`.
    async fn soft_delete_pic(&self, credentials: &Credentials, request: &SoftDeleteRequest) -> Result<()>;

    /// `upsertPicVote`.
    async fn upsert_pic_vote(
        &self,
        credentials: &Credentials,
        pic_id: PicId,
        vote: VoteDirection,
    ) -> Result<()>;

    /// `incrementPicViewCount`.
    async fn increment_pic_view_count(&self, credentials: &Credentials, pic_id: PicId) -> Result<()>;

    /// `addPicComment`.
    async fn add_pic_comment(
        &self,
        credentials: &Credentials,
        pic_id: PicId,
        parent_id: CommentId,
        text: &str,
    ) -> Result<Comment>;

    /// `getXsrfToken`.
    async fn get_xsrf_token(&self) -> Result<String>;

    /// `getRefreshToken`.
    async fn get_refresh_token(&self, credentials: &Credentials, grant: &TokenGrant) -> Result<TokenResponse>;

    /// `createUser`.
    async fn create_user(&self, credentials: &Credentials, ident: &str, secret: &str) -> Result<()>;

    /// `deleteToken`.
    async fn delete_token(&self, credentials: &Credentials) -> Result<()>;
}
