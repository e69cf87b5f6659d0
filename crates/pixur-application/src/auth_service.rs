//! Credential lifecycle: XSRF token, login, refresh, logout.

use chrono::Utc;
use pixur_core::api::{Credentials, PixurApi, TokenGrant, TokenResponse};
use pixur_core::auth::{AuthState, AuthToken, Identity, SessionData, SessionStore};
use pixur_core::flight::Coalesced;
use pixur_core::{PixurError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns the session and every call that changes it.
///
/// The persisted [`SessionData`] is the single source of truth; the
/// service only adds coalescing on top. Concurrent callers of
/// [`ensure_xsrf_token`](Self::ensure_xsrf_token) share one `getXsrfToken`
/// request, and concurrent callers that find the auth token expired share
/// one `getRefreshToken` request.
pub struct AuthService {
    api: Arc<dyn PixurApi>,
    store: Arc<dyn SessionStore>,
    /// Serializes read-modify-write cycles on the store.
    write_lock: Arc<Mutex<()>>,
    xsrf: Coalesced<String>,
    refresh: Coalesced<AuthToken>,
    logins_in_flight: AtomicUsize,
}

impl AuthService {
    pub fn new(api: Arc<dyn PixurApi>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            store,
            write_lock: Arc::new(Mutex::new(())),
            xsrf: Coalesced::new("getXsrfToken"),
            refresh: Coalesced::new("getRefreshToken"),
            logins_in_flight: AtomicUsize::new(0),
        }
    }

    /// Returns the anti-forgery token, fetching it once if the store has none.
    ///
    /// # Errors
    ///
    /// Returns the shared error of the fetch; the next call retries.
    pub async fn ensure_xsrf_token(&self) -> Result<String> {
        if let Some(token) = self.store.load().await?.xsrf {
            return Ok(token);
        }

        let api = self.api.clone();
        let store = self.store.clone();
        let write_lock = self.write_lock.clone();
        self.xsrf
            .run(move || async move {
                // A flight that finished between our load and this start
                // already stored a token.
                if let Some(token) = store.load().await?.xsrf {
                    return Ok(token);
                }
                let token = api.get_xsrf_token().await?;
                update_session(store.as_ref(), &write_lock, |session| {
                    session.xsrf = Some(token.clone());
                })
                .await?;
                debug!("Stored new XSRF token");
                Ok(token)
            })
            .await
    }

    /// Logs in with an identifier and secret.
    ///
    /// On success the identity and both tokens are persisted.
    ///
    /// # Returns
    ///
    /// The identity now logged in.
    pub async fn login(&self, ident: &str, secret: &str) -> Result<Identity> {
        if ident.trim().is_empty() {
            return Err(PixurError::invalid_argument("ident is required"));
        }

        self.logins_in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlightGuard(&self.logins_in_flight);

        let xsrf = self.ensure_xsrf_token().await?;
        let credentials = Credentials {
            xsrf_token: Some(xsrf),
            auth_token: None,
        };
        let grant = TokenGrant::Password {
            ident: ident.to_string(),
            secret: secret.to_string(),
        };
        let tokens = self.api.get_refresh_token(&credentials, &grant).await?;

        let identity = update_session(self.store.as_ref(), &self.write_lock, |session| {
            apply_tokens(session, tokens, Some(ident))
        })
        .await?;
        self.refresh.forget().await;

        info!(ident, subject = %identity.subject, "Logged in");
        Ok(identity)
    }

    /// Creates an account and logs into it.
    pub async fn create_account(&self, ident: &str, secret: &str) -> Result<Identity> {
        if ident.trim().is_empty() {
            return Err(PixurError::invalid_argument("ident is required"));
        }
        let xsrf = self.ensure_xsrf_token().await?;
        let credentials = Credentials {
            xsrf_token: Some(xsrf),
            auth_token: None,
        };
        self.api.create_user(&credentials, ident, secret).await?;
        info!(ident, "Created account");

        self.login(ident, secret).await
    }

    /// Returns an unexpired auth token, refreshing it if needed.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(token))`: a token valid right now
    /// - `Ok(None)`: no session at all (anonymous)
    ///
    /// # Errors
    ///
    /// `Unauthenticated` if the auth token expired and there is no usable
    /// refresh token, or the server rejected the refresh.
    pub async fn ensure_fresh_auth(&self) -> Result<Option<AuthToken>> {
        let session = self.store.load().await?;
        let now = Utc::now();
        if let Some(auth) = session.fresh_auth(now) {
            return Ok(Some(auth.clone()));
        }

        match (&session.refresh, &session.auth) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(PixurError::unauthenticated(
                "auth token expired and no refresh token is stored; log in again",
            )),
            (Some(refresh), _) if refresh.is_expired_at(now) => Err(PixurError::unauthenticated(
                "refresh token expired; log in again",
            )),
            (Some(_), _) => self.run_refresh(false).await.map(Some),
        }
    }

    /// Exchanges the refresh token for a new auth token, even if the
    /// current one is still valid.
    pub async fn refresh(&self) -> Result<AuthToken> {
        self.run_refresh(true).await
    }

    async fn run_refresh(&self, force: bool) -> Result<AuthToken> {
        let xsrf = self.ensure_xsrf_token().await?;

        let api = self.api.clone();
        let store = self.store.clone();
        let write_lock = self.write_lock.clone();
        self.refresh
            .run(move || async move {
                let session = store.load().await?;
                if !force && let Some(auth) = session.fresh_auth(Utc::now()) {
                    return Ok(auth.clone());
                }
                let refresh_token = session
                    .refresh
                    .map(|refresh| refresh.token)
                    .ok_or_else(|| PixurError::unauthenticated("no refresh token is stored"))?;

                let credentials = Credentials {
                    xsrf_token: Some(xsrf),
                    auth_token: None,
                };
                let grant = TokenGrant::Refresh { refresh_token };
                let tokens = api
                    .get_refresh_token(&credentials, &grant)
                    .await
                    .map_err(|err| match err {
                        err if err.is_unauthenticated() => {
                            PixurError::unauthenticated(format!("refresh rejected: {}", err))
                        }
                        other => other,
                    })?;

                let auth = AuthToken::new(tokens.auth_token.clone(), tokens.auth_payload.clone());
                update_session(store.as_ref(), &write_lock, |session| {
                    apply_tokens(session, tokens, None);
                })
                .await?;
                debug!(not_after = %auth.payload.not_after, "Refreshed auth token");
                Ok(auth)
            })
            .await
    }

    /// Credentials for an API call: the XSRF token always, the auth token
    /// when there is a session.
    pub async fn authorized_credentials(&self) -> Result<Credentials> {
        let xsrf = self.ensure_xsrf_token().await?;
        let auth = self.ensure_fresh_auth().await?;
        Ok(Credentials {
            xsrf_token: Some(xsrf),
            auth_token: auth.map(|auth| auth.token),
        })
    }

    /// Credentials for a read. Like
    /// [`authorized_credentials`](Self::authorized_credentials), except a
    /// session that can no longer be refreshed is dropped and the read goes
    /// out anonymously.
    pub async fn read_credentials(&self) -> Result<Credentials> {
        let xsrf = self.ensure_xsrf_token().await?;
        let auth = match self.ensure_fresh_auth().await {
            Ok(auth) => auth,
            Err(err) if err.is_unauthenticated() => {
                warn!(error = %err, "Session is no longer usable; continuing anonymously");
                self.clear().await?;
                None
            }
            Err(err) => return Err(err),
        };
        Ok(Credentials {
            xsrf_token: Some(xsrf),
            auth_token: auth.map(|auth| auth.token),
        })
    }

    /// Revokes the session server-side, then forgets it locally.
    ///
    /// The stored auth token is sent as is; logout never refreshes. A
    /// session whose refresh token is gone or expired is cleared without a
    /// request, and so is one the server answers with 401. Any other
    /// failure keeps the session. The XSRF token is kept. Logging out
    /// without a session is a no-op.
    pub async fn logout(&self) -> Result<()> {
        let session = self.store.load().await?;
        if !session.has_credentials() {
            debug!("Logout without a session");
            return Ok(());
        }

        let now = Utc::now();
        let refreshable = session
            .refresh
            .as_ref()
            .is_some_and(|refresh| !refresh.is_expired_at(now));
        if session.fresh_auth(now).is_none() && !refreshable {
            self.clear().await?;
            info!("Logged out locally; the session had already expired");
            return Ok(());
        }

        let credentials = Credentials {
            xsrf_token: Some(self.ensure_xsrf_token().await?),
            auth_token: session.auth.map(|auth| auth.token),
        };
        match self.api.delete_token(&credentials).await {
            Ok(()) => info!("Logged out"),
            Err(err) if err.is_unauthenticated() => {
                info!(error = %err, "Server no longer knows the session; logged out locally");
            }
            Err(err) => return Err(err),
        }
        self.clear().await
    }

    /// Drops identity and tokens locally without contacting the server.
    pub async fn clear(&self) -> Result<()> {
        update_session(self.store.as_ref(), &self.write_lock, SessionData::clear_credentials).await?;
        self.refresh.forget().await;
        Ok(())
    }

    /// The stored auth token, expired or not.
    pub async fn current_auth(&self) -> Result<Option<AuthToken>> {
        Ok(self.store.load().await?.auth)
    }

    pub async fn identity(&self) -> Result<Option<Identity>> {
        Ok(self.store.load().await?.ident)
    }

    pub async fn state(&self) -> Result<AuthState> {
        if self.logins_in_flight.load(Ordering::SeqCst) > 0 {
            return Ok(AuthState::TokenRequested);
        }
        if self.refresh.is_pending().await {
            return Ok(AuthState::Refreshing);
        }

        let session = self.store.load().await?;
        let state = if session.fresh_auth(Utc::now()).is_some() {
            AuthState::Authenticated
        } else if session.auth.is_some() || session.refresh.is_some() {
            AuthState::Expired
        } else {
            AuthState::Unauthenticated
        };
        Ok(state)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn update_session<F, R>(store: &dyn SessionStore, write_lock: &Mutex<()>, f: F) -> Result<R>
where
    F: FnOnce(&mut SessionData) -> R,
{
    let _guard = write_lock.lock().await;
    let mut session = store.load().await?;
    let result = f(&mut session);
    store.save(&session).await?;
    Ok(result)
}

/// Writes a token response into the session.
///
/// A login (`ident` given) replaces everything; a refresh keeps the stored
/// refresh token when the server did not rotate it.
fn apply_tokens(session: &mut SessionData, tokens: TokenResponse, ident: Option<&str>) -> Identity {
    let login = ident.is_some();
    let subject = tokens.auth_payload.subject.clone();

    match tokens.refresh_payload {
        Some(payload) if !tokens.refresh_token.is_empty() => {
            session.refresh = Some(AuthToken::new(tokens.refresh_token, payload));
        }
        _ if login => session.refresh = None,
        _ => {}
    }
    session.auth = Some(AuthToken::new(tokens.auth_token, tokens.auth_payload));

    let known_ident = ident
        .map(str::to_string)
        .or_else(|| session.ident.as_ref().and_then(|i| i.ident.clone()));
    let identity = Identity {
        subject,
        ident: known_ident,
    };
    session.ident = Some(identity.clone());
    identity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, dead_session, logged_in_session};
    use chrono::Duration;
    use futures::future::join_all;
    use pixur_core::auth::MemorySessionStore;

    fn service(api: &Arc<FakeApi>, session: SessionData) -> (AuthService, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::with_session(session));
        let service = AuthService::new(api.clone(), store.clone());
        (service, store)
    }

    #[tokio::test]
    async fn test_stored_xsrf_token_needs_no_request() {
        let api = Arc::new(FakeApi::with_pics(0));
        let session = SessionData {
            xsrf: Some("kept".to_string()),
            ..SessionData::default()
        };
        let (auth, _) = service(&api, session);

        assert_eq!(auth.ensure_xsrf_token().await.unwrap(), "kept");
        assert_eq!(api.calls("getXsrfToken"), 0);
    }

    #[tokio::test]
    async fn test_concurrent_xsrf_requests_are_coalesced() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, store) = service(&api, SessionData::default());

        let results = join_all((0..8).map(|_| auth.ensure_xsrf_token())).await;

        assert_eq!(api.calls("getXsrfToken"), 1);
        assert!(results.iter().all(|r| r.as_deref() == Ok("xsrf-fresh")));
        assert_eq!(store.load().await.unwrap().xsrf.as_deref(), Some("xsrf-fresh"));

        // Later callers read the store.
        auth.ensure_xsrf_token().await.unwrap();
        assert_eq!(api.calls("getXsrfToken"), 1);
    }

    #[tokio::test]
    async fn test_failed_xsrf_fetch_is_shared_then_retried() {
        let api = Arc::new(FakeApi::with_pics(0));
        api.fail_next("getXsrfToken", PixurError::transport("offline"));
        let (auth, _) = service(&api, SessionData::default());

        let results = join_all((0..3).map(|_| auth.ensure_xsrf_token())).await;
        assert!(results.iter().all(|r| r == &Err(PixurError::transport("offline"))));
        assert_eq!(api.calls("getXsrfToken"), 1);

        assert_eq!(auth.ensure_xsrf_token().await.unwrap(), "xsrf-fresh");
        assert_eq!(api.calls("getXsrfToken"), 2);
    }

    #[tokio::test]
    async fn test_login_persists_identity_and_tokens() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, store) = service(&api, SessionData::default());

        let identity = auth.login("alice", "secret").await.unwrap();

        assert_eq!(identity.ident.as_deref(), Some("alice"));
        let session = store.load().await.unwrap();
        assert_eq!(session.ident, Some(identity));
        assert_eq!(session.refresh.unwrap().token, "refresh-1");
        assert_eq!(session.auth.unwrap().token, "auth-1");
        assert_eq!(
            api.last_grant(),
            Some(TokenGrant::Password {
                ident: "alice".to_string(),
                secret: "secret".to_string()
            })
        );
        assert_eq!(api.last_credentials().unwrap().xsrf_token.as_deref(), Some("xsrf-fresh"));
        assert_eq!(auth.state().await.unwrap(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_untouched() {
        let api = Arc::new(FakeApi::with_pics(0));
        api.fail_next("getRefreshToken", PixurError::api(401, "bad secret"));
        let (auth, store) = service(&api, SessionData::default());

        let err = auth.login("alice", "wrong").await.unwrap_err();

        assert!(err.is_unauthenticated());
        assert!(!store.load().await.unwrap().has_credentials());
        assert_eq!(auth.state().await.unwrap(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_create_account_then_logs_in() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, _) = service(&api, SessionData::default());

        auth.create_account("bob", "pw").await.unwrap();

        assert_eq!(api.calls("createUser"), 1);
        assert_eq!(api.calls("getRefreshToken"), 1);
        assert_eq!(api.calls("getXsrfToken"), 1);
    }

    #[tokio::test]
    async fn test_anonymous_session_has_no_auth() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, _) = service(&api, SessionData::default());

        assert_eq!(auth.ensure_fresh_auth().await.unwrap(), None);
        assert_eq!(api.calls("getRefreshToken"), 0);
    }

    #[tokio::test]
    async fn test_fresh_auth_is_returned_without_refresh() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, _) = service(&api, logged_in_session(Duration::minutes(10)));

        let token = auth.ensure_fresh_auth().await.unwrap().unwrap();

        assert_eq!(token.token, "auth-0");
        assert_eq!(api.calls("getRefreshToken"), 0);
    }

    #[tokio::test]
    async fn test_expired_auth_triggers_exactly_one_refresh() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, store) = service(&api, logged_in_session(-Duration::minutes(1)));
        assert_eq!(auth.state().await.unwrap(), AuthState::Expired);

        let results = join_all((0..6).map(|_| auth.ensure_fresh_auth())).await;

        assert_eq!(api.calls("getRefreshToken"), 1);
        for result in results {
            assert_eq!(result.unwrap().unwrap().token, "auth-1");
        }
        assert_eq!(
            api.last_grant(),
            Some(TokenGrant::Refresh {
                refresh_token: "refresh-0".to_string()
            })
        );

        let session = store.load().await.unwrap();
        assert_eq!(session.auth.unwrap().token, "auth-1");
        assert_eq!(session.refresh.unwrap().token, "refresh-1");
        assert_eq!(session.ident.unwrap().ident.as_deref(), Some("alice"));
        assert_eq!(auth.state().await.unwrap(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_missing_auth_with_refresh_token_refreshes() {
        let api = Arc::new(FakeApi::with_pics(0));
        let mut session = logged_in_session(Duration::minutes(10));
        session.auth = None;
        let (auth, _) = service(&api, session);

        let token = auth.ensure_fresh_auth().await.unwrap().unwrap();

        assert_eq!(token.token, "auth-1");
        assert_eq!(api.calls("getRefreshToken"), 1);
    }

    #[tokio::test]
    async fn test_expired_auth_without_refresh_is_unauthenticated() {
        let api = Arc::new(FakeApi::with_pics(0));
        let mut session = logged_in_session(-Duration::minutes(1));
        session.refresh = None;
        let (auth, _) = service(&api, session);

        let err = auth.ensure_fresh_auth().await.unwrap_err();

        assert!(err.is_unauthenticated());
        assert_eq!(api.calls("getRefreshToken"), 0);
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_unauthenticated() {
        let api = Arc::new(FakeApi::with_pics(0));
        api.fail_next("getRefreshToken", PixurError::api(401, "token revoked"));
        let (auth, _) = service(&api, logged_in_session(-Duration::minutes(1)));

        let err = auth.ensure_fresh_auth().await.unwrap_err();

        assert!(matches!(err, PixurError::Unauthenticated(ref m) if m.contains("token revoked")));
    }

    #[tokio::test]
    async fn test_explicit_refresh_ignores_freshness() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, _) = service(&api, logged_in_session(Duration::minutes(10)));

        let token = auth.refresh().await.unwrap();

        assert_eq!(token.token, "auth-1");
        assert_eq!(api.calls("getRefreshToken"), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_credentials_but_keeps_xsrf() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, store) = service(&api, logged_in_session(Duration::minutes(10)));

        auth.logout().await.unwrap();

        let credentials = api.last_credentials().unwrap();
        assert_eq!(credentials.auth_token.as_deref(), Some("auth-0"));
        let session = store.load().await.unwrap();
        assert!(!session.has_credentials());
        assert_eq!(session.xsrf.as_deref(), Some("xsrf-0"));
        assert_eq!(auth.state().await.unwrap(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_failed_logout_keeps_session() {
        let api = Arc::new(FakeApi::with_pics(0));
        api.fail_next("deleteToken", PixurError::transport("offline"));
        let (auth, store) = service(&api, logged_in_session(Duration::minutes(10)));

        assert!(auth.logout().await.is_err());
        assert!(store.load().await.unwrap().has_credentials());
    }

    #[tokio::test]
    async fn test_logout_with_expired_refresh_clears_without_request() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, store) = service(&api, dead_session());

        auth.logout().await.unwrap();

        assert_eq!(api.calls("deleteToken"), 0);
        assert_eq!(api.calls("getRefreshToken"), 0);
        assert!(!store.load().await.unwrap().has_credentials());
        assert_eq!(auth.state().await.unwrap(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_sends_stale_auth_without_refreshing() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, store) = service(&api, logged_in_session(-Duration::minutes(1)));

        auth.logout().await.unwrap();

        assert_eq!(api.calls("getRefreshToken"), 0);
        assert_eq!(api.calls("deleteToken"), 1);
        assert_eq!(api.last_credentials().unwrap().auth_token.as_deref(), Some("auth-0"));
        assert!(!store.load().await.unwrap().has_credentials());
    }

    #[tokio::test]
    async fn test_logout_rejected_by_server_still_clears() {
        let api = Arc::new(FakeApi::with_pics(0));
        api.fail_next("deleteToken", PixurError::api(401, "token revoked"));
        let (auth, store) = service(&api, logged_in_session(Duration::minutes(10)));

        auth.logout().await.unwrap();

        let session = store.load().await.unwrap();
        assert!(!session.has_credentials());
        assert_eq!(session.xsrf.as_deref(), Some("xsrf-0"));
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, _) = service(&api, SessionData::default());

        auth.logout().await.unwrap();
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_authorized_credentials() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (anonymous, _) = service(&api, SessionData::default());
        let credentials = anonymous.authorized_credentials().await.unwrap();
        assert_eq!(credentials.xsrf_token.as_deref(), Some("xsrf-fresh"));
        assert_eq!(credentials.auth_token, None);

        let (logged_in, _) = service(&api, logged_in_session(Duration::minutes(10)));
        let credentials = logged_in.authorized_credentials().await.unwrap();
        assert_eq!(credentials.xsrf_token.as_deref(), Some("xsrf-0"));
        assert_eq!(credentials.auth_token.as_deref(), Some("auth-0"));
    }

    #[tokio::test]
    async fn test_read_credentials_drop_a_dead_session() {
        let api = Arc::new(FakeApi::with_pics(0));
        let (auth, store) = service(&api, dead_session());

        assert!(auth.authorized_credentials().await.unwrap_err().is_unauthenticated());
        let credentials = auth.read_credentials().await.unwrap();

        assert_eq!(credentials.xsrf_token.as_deref(), Some("xsrf-0"));
        assert_eq!(credentials.auth_token, None);
        assert!(!store.load().await.unwrap().has_credentials());
        assert_eq!(auth.state().await.unwrap(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_read_credentials_keep_transport_errors() {
        let api = Arc::new(FakeApi::with_pics(0));
        api.fail_next("getRefreshToken", PixurError::transport("offline"));
        let (auth, store) = service(&api, logged_in_session(-Duration::minutes(1)));

        assert!(auth.read_credentials().await.unwrap_err().is_transport());
        assert!(store.load().await.unwrap().has_credentials());
    }
}
