//! In-memory `PixurApi` for service tests.

use chrono::{Duration, Utc};
use pixur_core::api::{Credentials, PixurApi, TokenGrant, TokenResponse};
use pixur_core::auth::{AuthToken, PwtPayload, SessionData, TokenType};
use pixur_core::comment::Comment;
use pixur_core::pic::{
    CommentId, Direction, NewPic, Pic, PicCommentList, PicDetails, PicId, SoftDeleteRequest,
    VoteDirection,
};
use pixur_core::{PixurError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

pub const PAGE_SIZE: usize = 3;

/// Serves pics `1..=n` and counts every call by endpoint name.
///
/// Forward pages list the anchor and older pics, newest first; backward
/// pages list the anchor and newer pics, oldest first.
#[derive(Default)]
pub struct FakeApi {
    pics: Mutex<BTreeMap<u64, Pic>>,
    comments: Mutex<HashMap<u64, Vec<Comment>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, PixurError>>,
    gates: Mutex<HashMap<u64, std::sync::Arc<Notify>>>,
    last_credentials: Mutex<Option<Credentials>>,
    last_grant: Mutex<Option<TokenGrant>>,
    votes: Mutex<Vec<(PicId, VoteDirection)>>,
    deletes: Mutex<Vec<SoftDeleteRequest>>,
    next_comment_id: AtomicU64,
}

impl FakeApi {
    pub fn with_pics(n: u64) -> Self {
        let api = Self::default();
        {
            let mut pics = api.pics.lock().unwrap();
            for id in 1..=n {
                let mime = if id % 5 == 0 { "WEBM" } else { "JPEG" };
                pics.insert(id, Pic::new(PicId::new(id), mime));
            }
        }
        api.next_comment_id.store(100, Ordering::SeqCst);
        api
    }

    pub fn set_comments(&self, pic_id: u64, comments: Vec<Comment>) {
        self.comments.lock().unwrap().insert(pic_id, comments);
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Makes the next call to `name` fail with `err`.
    pub fn fail_next(&self, name: &'static str, err: PixurError) {
        self.failures.lock().unwrap().insert(name, err);
    }

    /// Holds index requests anchored at `id`, and lookups of pic `id`,
    /// until the returned handle is notified.
    pub fn gate(&self, id: u64) -> std::sync::Arc<Notify> {
        let gate = std::sync::Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(id, gate.clone());
        gate
    }

    async fn pass_gate(&self, id: u64) {
        let gate = self.gates.lock().unwrap().get(&id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub fn last_credentials(&self) -> Option<Credentials> {
        self.last_credentials.lock().unwrap().clone()
    }

    pub fn last_grant(&self) -> Option<TokenGrant> {
        self.last_grant.lock().unwrap().clone()
    }

    pub fn votes(&self) -> Vec<(PicId, VoteDirection)> {
        self.votes.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<SoftDeleteRequest> {
        self.deletes.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str, credentials: Option<&Credentials>) -> Result<()> {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
        if let Some(credentials) = credentials {
            *self.last_credentials.lock().unwrap() = Some(credentials.clone());
        }
        match self.failures.lock().unwrap().remove(name) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn payload(token_type: TokenType, valid_for: Duration) -> PwtPayload {
    PwtPayload {
        subject: "1".to_string(),
        not_before: None,
        not_after: Utc::now() + valid_for,
        soft_not_after: None,
        token_id: 1,
        token_parent_id: 0,
        token_type,
    }
}

/// A logged-in session whose auth token expires after `auth_valid_for`.
pub fn logged_in_session(auth_valid_for: Duration) -> SessionData {
    SessionData {
        ident: Some(pixur_core::auth::Identity {
            subject: "1".to_string(),
            ident: Some("alice".to_string()),
        }),
        refresh: Some(AuthToken::new(
            "refresh-0",
            payload(TokenType::Refresh, Duration::days(30)),
        )),
        auth: Some(AuthToken::new("auth-0", payload(TokenType::Auth, auth_valid_for))),
        xsrf: Some("xsrf-0".to_string()),
    }
}

#[async_trait::async_trait]
impl PixurApi for FakeApi {
    async fn find_index_pics(
        &self,
        credentials: &Credentials,
        anchor: Option<PicId>,
        direction: Direction,
    ) -> Result<Vec<Pic>> {
        let name = match direction {
            Direction::Forward => "findNextIndexPics",
            Direction::Backward => "findPreviousIndexPics",
        };
        self.record(name, Some(credentials))?;

        let anchor_value = anchor.map(PicId::value).unwrap_or(0);
        self.pass_gate(anchor_value).await;

        let pics = self.pics.lock().unwrap();
        let page: Vec<Pic> = match direction {
            Direction::Forward if anchor_value == 0 => {
                pics.values().rev().take(PAGE_SIZE).cloned().collect()
            }
            Direction::Forward => pics
                .range(..=anchor_value)
                .rev()
                .take(PAGE_SIZE)
                .map(|(_, pic)| pic.clone())
                .collect(),
            Direction::Backward => pics
                .range(anchor_value..)
                .take(PAGE_SIZE)
                .map(|(_, pic)| pic.clone())
                .collect(),
        };
        Ok(page)
    }

    async fn lookup_pic_details(&self, credentials: &Credentials, pic_id: PicId) -> Result<PicDetails> {
        self.record("lookupPicDetails", Some(credentials))?;
        self.pass_gate(pic_id.value()).await;
        let pic = self
            .pics
            .lock()
            .unwrap()
            .get(&pic_id.value())
            .cloned()
            .ok_or_else(|| PixurError::api(404, "can't find pic"))?;
        let comments = self
            .comments
            .lock()
            .unwrap()
            .get(&pic_id.value())
            .cloned()
            .unwrap_or_default();
        Ok(PicDetails {
            pic,
            tags: Vec::new(),
            comment_tree: PicCommentList { comments },
        })
    }

    async fn upsert_pic(&self, credentials: &Credentials, _new_pic: &NewPic) -> Result<Pic> {
        self.record("upsertPic", Some(credentials))?;
        let mut pics = self.pics.lock().unwrap();
        let id = pics.keys().next_back().copied().unwrap_or(0) + 1;
        let pic = Pic::new(PicId::new(id), "PNG");
        pics.insert(id, pic.clone());
        Ok(pic)
    }

    async fn soft_delete_pic(&self, credentials: &Credentials, request: &SoftDeleteRequest) -> Result<()> {
        self.record("softDeletePic", Some(credentials))?;
        self.deletes.lock().unwrap().push(request.clone());
        self.pics.lock().unwrap().remove(&request.pic_id.value());
        Ok(())
    }

    async fn upsert_pic_vote(
        &self,
        credentials: &Credentials,
        pic_id: PicId,
        vote: VoteDirection,
    ) -> Result<()> {
        self.record("upsertPicVote", Some(credentials))?;
        self.votes.lock().unwrap().push((pic_id, vote));
        Ok(())
    }

    async fn increment_pic_view_count(&self, credentials: &Credentials, _pic_id: PicId) -> Result<()> {
        self.record("incrementPicViewCount", Some(credentials))
    }

    async fn add_pic_comment(
        &self,
        credentials: &Credentials,
        pic_id: PicId,
        parent_id: CommentId,
        text: &str,
    ) -> Result<Comment> {
        self.record("addPicComment", Some(credentials))?;
        let id = self.next_comment_id.fetch_add(1, Ordering::SeqCst);
        let mut comment = Comment::new(CommentId::new(id), parent_id, text);
        comment.pic_id = pic_id;
        // The lookup endpoint lists replies before their parents.
        self.comments
            .lock()
            .unwrap()
            .entry(pic_id.value())
            .or_default()
            .insert(0, comment.clone());
        Ok(comment)
    }

    async fn get_xsrf_token(&self) -> Result<String> {
        // Yield first so concurrent callers can join before this resolves.
        tokio::task::yield_now().await;
        self.record("getXsrfToken", None)?;
        Ok("xsrf-fresh".to_string())
    }

    async fn get_refresh_token(&self, credentials: &Credentials, grant: &TokenGrant) -> Result<TokenResponse> {
        tokio::task::yield_now().await;
        self.record("getRefreshToken", Some(credentials))?;
        *self.last_grant.lock().unwrap() = Some(grant.clone());

        let n = self.calls("getRefreshToken");
        Ok(TokenResponse {
            refresh_token: format!("refresh-{}", n),
            auth_token: format!("auth-{}", n),
            pix_token: String::new(),
            refresh_payload: Some(payload(TokenType::Refresh, Duration::days(30))),
            auth_payload: payload(TokenType::Auth, Duration::hours(1)),
            pix_payload: None,
        })
    }

    async fn create_user(&self, credentials: &Credentials, _ident: &str, _secret: &str) -> Result<()> {
        self.record("createUser", Some(credentials))
    }

    async fn delete_token(&self, credentials: &Credentials) -> Result<()> {
        self.record("deleteToken", Some(credentials))
    }
}

/// A session that can no longer be refreshed: both tokens have expired.
pub fn dead_session() -> SessionData {
    let mut session = logged_in_session(-Duration::minutes(1));
    session.refresh = Some(AuthToken::new(
        "refresh-0",
        payload(TokenType::Refresh, -Duration::days(1)),
    ));
    session
}
