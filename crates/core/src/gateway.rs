use crate::error::GatewayError;
use crate::session::{NewSession, Report, ReportRequest, SessionDetail};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

const SESSION_CHAT_PATH: &str = "/api/session-chat";
const MEDICAL_REPORT_PATH: &str = "/api/medical-report";
const USER_HEADER: &str = "x-user-email";

/// Request/response access to the session record store and the report
/// generator. `CallSession` depends on this trait only, so tests can swap in
/// `MockSessionGateway`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Loads one session record. A missing record is `Ok(None)`, not an error.
    async fn fetch_session(&self, session_id: &str) -> Result<Option<SessionDetail>, GatewayError>;

    /// Creates a record; the store assigns `id` and `session_id`.
    async fn create_session(&self, request: NewSession) -> Result<SessionDetail, GatewayError>;

    /// Lists every session of the current user.
    async fn list_sessions(&self) -> Result<Vec<SessionDetail>, GatewayError>;

    /// Sends the finished transcript to the report generator. Never retried.
    async fn submit_report(&self, request: ReportRequest) -> Result<Report, GatewayError>;
}

pub struct HttpSessionGateway {
    client: Client,
    base_url: String,
    user_email: Option<String>,
}

impl HttpSessionGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_email: None,
        }
    }

    /// Identifies the caller to the store, which scopes listings by owner.
    pub fn with_user_email(mut self, email: &str) -> Self {
        self.user_email = Some(email.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_user(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.user_email {
            Some(email) => builder.header(USER_HEADER, email),
            None => builder,
        }
    }

    fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            })
        }
    }
}

#[async_trait]
impl SessionGateway for HttpSessionGateway {
    async fn fetch_session(&self, session_id: &str) -> Result<Option<SessionDetail>, GatewayError> {
        if session_id.trim().is_empty() {
            return Err(GatewayError::InvalidSessionId);
        }

        let response = self
            .with_user(self.client.get(self.url(SESSION_CHAT_PATH)))
            .query(&[("sessionId", session_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("session {} not found", session_id);
            return Ok(None);
        }

        // The store answers an unknown id with an empty body or `null`.
        let body = Self::check(response)?.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str::<Option<SessionDetail>>(&body)?)
    }

    async fn create_session(&self, request: NewSession) -> Result<SessionDetail, GatewayError> {
        let response = self
            .with_user(self.client.post(self.url(SESSION_CHAT_PATH)))
            .json(&request)
            .send()
            .await?;

        Ok(Self::check(response)?.json::<SessionDetail>().await?)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionDetail>, GatewayError> {
        let response = self
            .with_user(self.client.get(self.url(SESSION_CHAT_PATH)))
            .query(&[("sessionId", "all")])
            .send()
            .await?;

        Ok(Self::check(response)?.json::<Vec<SessionDetail>>().await?)
    }

    async fn submit_report(&self, request: ReportRequest) -> Result<Report, GatewayError> {
        tracing::info!(
            "submitting {} messages for report on session {}",
            request.messages.len(),
            request.session_id
        );

        let response = self
            .with_user(self.client.post(self.url(MEDICAL_REPORT_PATH)))
            .json(&request)
            .send()
            .await?;

        Ok(Self::check(response)?.json::<Report>().await?)
    }
}
