//! reqwest implementation of [`PixurApi`].

use pixur_core::api::{Credentials, PixurApi, TokenGrant, TokenResponse};
use pixur_core::comment::Comment;
use pixur_core::config::ClientConfig;
use pixur_core::pic::{
    CommentId, Direction, NewPic, Pic, PicDetails, PicId, SoftDeleteRequest, VoteDirection,
};
use pixur_core::{PixurError, Result};
use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const XSRF_COOKIE: &str = "XSRF-TOKEN";
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";
pub const AUTH_COOKIE: &str = "auth_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const PIX_COOKIE: &str = "pix_token";

#[derive(Debug, Deserialize)]
struct FindIndexPicsResponse {
    #[serde(default)]
    pic: Vec<Pic>,
}

#[derive(Debug, Deserialize)]
struct UpsertPicResponse {
    pic: Pic,
}

#[derive(Debug, Deserialize)]
struct AddPicCommentResponse {
    comment: Comment,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetXsrfTokenResponse {
    #[serde(default)]
    xsrf_token: String,
}

/// Error body of a failed call. The gateway fills `message`; older servers
/// only send `error`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP adapter for the picture API.
#[derive(Clone)]
pub struct HttpPixurApi {
    client: Client,
    base_url: String,
}

impl HttpPixurApi {
    /// Creates an adapter rooted at `base_url` (the `/api/` prefix is added
    /// per call).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PixurError::transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/api/{}", self.base_url, method)
    }

    /// Attaches the XSRF token (cookie and header) and the auth cookie.
    fn authorize(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        Self::authorize_with(request, credentials, &[])
    }

    /// Like [`Self::authorize`], with extra cookies in the same header.
    fn authorize_with(
        mut request: RequestBuilder,
        credentials: &Credentials,
        extra_cookies: &[(&str, &str)],
    ) -> RequestBuilder {
        if let Some(xsrf) = &credentials.xsrf_token {
            request = request.header(XSRF_HEADER, xsrf);
        }
        let header = cookie_header(credentials, extra_cookies);
        if header.is_empty() {
            request
        } else {
            request.header(COOKIE, header)
        }
    }

    /// Sends a request, turning non-2xx answers into [`PixurError::Api`].
    async fn send(&self, method: &str, request: RequestBuilder) -> Result<Response> {
        debug!(method, "Calling API");
        let response = request
            .send()
            .await
            .map_err(|e| PixurError::transport(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let body: ErrorBody = serde_json::from_str(&error_text).unwrap_or_default();
            let message = body
                .message
                .or(body.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if error_text.trim().is_empty() {
                        status.canonical_reason().unwrap_or("Unknown error").to_string()
                    } else {
                        error_text.trim().to_string()
                    }
                });
            debug!(method, status = status.as_u16(), %message, "API call failed");
            return Err(PixurError::api(status.as_u16(), message));
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(method: &str, response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| PixurError::transport(format!("Failed to parse {} response: {}", method, e)))
    }

    async fn post_form(
        &self,
        method: &str,
        credentials: &Credentials,
        form: &[(&str, String)],
    ) -> Result<Response> {
        let request = Self::authorize(self.client.post(self.endpoint(method)), credentials).form(form);
        self.send(method, request).await
    }
}

/// Reads `name` from the response's `Set-Cookie` headers.
fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

fn fill_from_cookie(field: &mut String, cookie: Option<String>) {
    if field.is_empty()
        && let Some(value) = cookie
    {
        *field = value;
    }
}

#[async_trait::async_trait]
impl PixurApi for HttpPixurApi {
    async fn find_index_pics(
        &self,
        credentials: &Credentials,
        anchor: Option<PicId>,
        direction: Direction,
    ) -> Result<Vec<Pic>> {
        let method = match direction {
            Direction::Forward => "findNextIndexPics",
            Direction::Backward => "findPreviousIndexPics",
        };
        let mut request = Self::authorize(self.client.get(self.endpoint(method)), credentials);
        if let Some(anchor) = anchor.filter(|id| !id.is_zero()) {
            request = request.query(&[("start_pic_id", anchor.encode())]);
        }
        let response = self.send(method, request).await?;
        let body: FindIndexPicsResponse = Self::decode(method, response).await?;
        Ok(body.pic)
    }

    async fn lookup_pic_details(&self, credentials: &Credentials, pic_id: PicId) -> Result<PicDetails> {
        let method = "lookupPicDetails";
        let request = Self::authorize(self.client.get(self.endpoint(method)), credentials)
            .query(&[("pic_id", pic_id.encode())]);
        let response = self.send(method, request).await?;
        Self::decode(method, response).await
    }

    async fn upsert_pic(&self, credentials: &Credentials, new_pic: &NewPic) -> Result<Pic> {
        let method = "upsertPic";
        let mut form = Form::new();
        if let Some(url) = &new_pic.url {
            form = form.text("url", url.clone());
        }
        if let Some(file) = &new_pic.file {
            form = form.part("file", Part::bytes(file.bytes.clone()).file_name(file.name.clone()));
        }
        let request = Self::authorize(self.client.post(self.endpoint(method)), credentials).multipart(form);
        let response = self.send(method, request).await?;
        let body: UpsertPicResponse = Self::decode(method, response).await?;
        Ok(body.pic)
    }

    async fn soft_delete_pic(&self, credentials: &Credentials, request: &SoftDeleteRequest) -> Result<()> {
        let mut form = vec![
            ("pic_id", request.pic_id.encode()),
            ("reason", request.reason.as_str().to_string()),
        ];
        if let Some(details) = &request.details {
            form.push(("details", details.clone()));
        }
        self.post_form("softDeletePic", credentials, &form).await?;
        Ok(())
    }

    async fn upsert_pic_vote(
        &self,
        credentials: &Credentials,
        pic_id: PicId,
        vote: VoteDirection,
    ) -> Result<()> {
        let form = [("pic_id", pic_id.encode()), ("vote", vote.as_str().to_string())];
        self.post_form("upsertPicVote", credentials, &form).await?;
        Ok(())
    }

    async fn increment_pic_view_count(&self, credentials: &Credentials, pic_id: PicId) -> Result<()> {
        self.post_form("incrementPicViewCount", credentials, &[("pic_id", pic_id.encode())])
            .await?;
        Ok(())
    }

    async fn add_pic_comment(
        &self,
        credentials: &Credentials,
        pic_id: PicId,
        parent_id: CommentId,
        text: &str,
    ) -> Result<Comment> {
        let method = "addPicComment";
        let form = [
            ("pic_id", pic_id.encode()),
            ("comment_parent_id", parent_id.encode()),
            ("text", text.to_string()),
        ];
        let response = self.post_form(method, credentials, &form).await?;
        let body: AddPicCommentResponse = Self::decode(method, response).await?;
        Ok(body.comment)
    }

    async fn get_xsrf_token(&self) -> Result<String> {
        let method = "getXsrfToken";
        let response = self.send(method, self.client.post(self.endpoint(method))).await?;
        let cookie = set_cookie_value(&response, XSRF_COOKIE);
        let text = response
            .text()
            .await
            .map_err(|e| PixurError::transport(format!("Failed to read {} response: {}", method, e)))?;
        let body: GetXsrfTokenResponse = if text.trim().is_empty() {
            GetXsrfTokenResponse::default()
        } else {
            serde_json::from_str(&text)
                .map_err(|e| PixurError::transport(format!("Failed to parse {} response: {}", method, e)))?
        };

        let mut token = body.xsrf_token;
        fill_from_cookie(&mut token, cookie);
        if token.is_empty() {
            return Err(PixurError::transport("Server returned no XSRF token"));
        }
        Ok(token)
    }

    async fn get_refresh_token(&self, credentials: &Credentials, grant: &TokenGrant) -> Result<TokenResponse> {
        let method = "getRefreshToken";
        let request = self.client.post(self.endpoint(method));
        let request = match grant {
            TokenGrant::Password { ident, secret } => Self::authorize(request, credentials)
                .form(&[("ident", ident.as_str()), ("secret", secret.as_str())]),
            TokenGrant::Refresh { refresh_token } => {
                // The stale auth cookie is left off a refresh.
                let credentials = Credentials {
                    xsrf_token: credentials.xsrf_token.clone(),
                    auth_token: None,
                };
                Self::authorize_with(request, &credentials, &[(REFRESH_COOKIE, refresh_token)])
                    .form(&[("refresh_token", refresh_token.as_str())])
            }
        };
        let response = self.send(method, request).await?;

        let refresh_cookie = set_cookie_value(&response, REFRESH_COOKIE);
        let auth_cookie = set_cookie_value(&response, AUTH_COOKIE);
        let pix_cookie = set_cookie_value(&response, PIX_COOKIE);

        let mut tokens: TokenResponse = Self::decode(method, response).await?;
        fill_from_cookie(&mut tokens.refresh_token, refresh_cookie);
        fill_from_cookie(&mut tokens.auth_token, auth_cookie);
        fill_from_cookie(&mut tokens.pix_token, pix_cookie);

        if tokens.auth_token.is_empty() {
            return Err(PixurError::transport("Server returned no auth token"));
        }
        Ok(tokens)
    }

    async fn create_user(&self, credentials: &Credentials, ident: &str, secret: &str) -> Result<()> {
        let form = [("ident", ident.to_string()), ("secret", secret.to_string())];
        self.post_form("createUser", credentials, &form).await?;
        Ok(())
    }

    async fn delete_token(&self, credentials: &Credentials) -> Result<()> {
        self.post_form("deleteToken", credentials, &[]).await?;
        Ok(())
    }
}

fn cookie_header(credentials: &Credentials, extra_cookies: &[(&str, &str)]) -> String {
    let mut cookies = Vec::new();
    if let Some(xsrf) = &credentials.xsrf_token {
        cookies.push(format!("{}={}", XSRF_COOKIE, xsrf));
    }
    if let Some(auth) = &credentials.auth_token {
        cookies.push(format!("{}={}", AUTH_COOKIE, auth));
    }
    for (name, value) in extra_cookies {
        cookies.push(format!("{}={}", name, value));
    }
    cookies.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let api = HttpPixurApi::new("http://pix.example/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.endpoint("getXsrfToken"), "http://pix.example/api/getXsrfToken");
    }

    #[test]
    fn test_cookie_header() {
        let credentials = Credentials {
            xsrf_token: Some("x".to_string()),
            auth_token: Some("a".to_string()),
        };
        assert_eq!(cookie_header(&credentials, &[]), "XSRF-TOKEN=x; auth_token=a");
        assert_eq!(
            cookie_header(&Credentials::default(), &[(REFRESH_COOKIE, "r")]),
            "refresh_token=r"
        );
        assert_eq!(cookie_header(&Credentials::default(), &[]), "");
    }
}
