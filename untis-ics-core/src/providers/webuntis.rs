use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::Utc;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Credentials, Error, ProviderConfig, RawLesson, Result,
    providers::{BaseProvider, BaseProviderBuilder, Provider, ProviderInfo},
    window::DateWindow,
};

const JSONRPC_PATH: &str = "/WebUntis/jsonrpc.do";
/// Fields requested for every element type of a lesson
const ELEMENT_FIELDS: [&str; 4] = ["id", "name", "longname", "externalkey"];
/// Error code for an expired or missing session
const NOT_AUTHENTICATED: i64 = -8520;

/// An open WebUntis session
#[derive(Debug, Clone)]
pub struct WebUntisSession {
    pub session_id: String,
    /// Element id of the logged in student or teacher
    pub person_id: i64,
    pub person_type: i64,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    id: String,
    method: &'a str,
    params: P,
    jsonrpc: &'static str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct AuthParams<'a> {
    user: &'a str,
    password: &'a str,
    client: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResult {
    session_id: String,
    #[serde(default)]
    person_id: i64,
    #[serde(default)]
    person_type: i64,
}

#[derive(Debug, Serialize)]
struct TimetableParams {
    options: TimetableOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimetableOptions {
    id: i64,
    element: TimetableElement,
    start_date: u32,
    end_date: u32,
    show_ls_text: bool,
    show_studentgroup: bool,
    show_ls_number: bool,
    show_subst_text: bool,
    show_info: bool,
    show_booking: bool,
    klasse_fields: [&'static str; 4],
    room_fields: [&'static str; 4],
    subject_fields: [&'static str; 4],
    teacher_fields: [&'static str; 4],
}

#[derive(Debug, Serialize)]
struct TimetableElement {
    id: i64,
    #[serde(rename = "type")]
    element_type: i64,
}

/// WebUntis JSON-RPC client for the logged in user's own timetable
pub struct WebUntisProvider {
    base: BaseProvider,
    config: ProviderConfig,
    credentials: Credentials,
    request_id: AtomicU64,
}

impl WebUntisProvider {
    pub fn new(config: ProviderConfig, credentials: Credentials) -> Result<Self> {
        if config.server.trim().is_empty() || config.school.trim().is_empty() {
            return Err(Error::Config(
                "WebUntis server and school must not be empty".to_string(),
            ));
        }

        let info = ProviderInfo {
            name: "webuntis".to_string(),
            description: format!("WebUntis timetable of {} at {}", config.school, config.server),
        };
        let builder = match config.timeout {
            Some(secs) => BaseProviderBuilder::new_with_timeout(info, secs),
            None => BaseProviderBuilder::new(info),
        };

        Ok(Self {
            base: builder.build()?,
            config,
            credentials,
            request_id: AtomicU64::new(1),
        })
    }

    /// `https://{server}/WebUntis/jsonrpc.do`; an explicit scheme in `server` is kept
    fn endpoint(&self) -> String {
        let server = self.config.server.trim().trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            format!("{server}{JSONRPC_PATH}")
        } else {
            format!("https://{server}{JSONRPC_PATH}")
        }
    }

    fn session_cookie(&self, session: &WebUntisSession) -> String {
        format!(
            "JSESSIONID={}; schoolname=\"_{}\"",
            session.session_id,
            BASE64_STANDARD.encode(self.config.school.as_bytes())
        )
    }

    async fn call<P, T>(
        &self,
        method: &str,
        params: P,
        session: Option<&WebUntisSession>,
    ) -> Result<Option<T>>
    where
        P: Serialize + Send + Sync,
        T: DeserializeOwned,
    {
        let body = RpcRequest {
            id: self.request_id.fetch_add(1, Ordering::Relaxed).to_string(),
            method,
            params,
            jsonrpc: "2.0",
        };

        let mut request = self
            .base
            .client
            .post(self.endpoint())
            .query(&[("school", self.config.school.as_str())])
            .json(&body);
        if let Some(session) = session {
            request = request.header(header::COOKIE, self.session_cookie(session));
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;

        if response.status() == StatusCode::UNAUTHORIZED || response.status() == StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication(format!(
                "{}: HTTP {}",
                self.base.info.name,
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(self
                .base
                .custom_error(format!("{method}: HTTP {} error", response.status())));
        }

        let rpc: RpcResponse<T> = response.json().await.map_err(|e| {
            self.base
                .custom_error(format!("Failed to parse {method} response: {e}"))
        })?;

        if let Some(error) = rpc.error {
            tracing::debug!("{} returned error {}: {}", method, error.code, error.message);
            return if method == "authenticate" || error.code == NOT_AUTHENTICATED {
                Err(Error::Authentication(format!(
                    "{}: {}",
                    self.base.info.name, error.message
                )))
            } else {
                Err(self.base.custom_error(format!(
                    "{method} failed ({}): {}",
                    error.code, error.message
                )))
            };
        }

        Ok(rpc.result)
    }
}

#[async_trait]
impl Provider for WebUntisProvider {
    type Session = WebUntisSession;

    fn name(&self) -> &str {
        &self.base.info.name
    }

    fn description(&self) -> &str {
        &self.base.info.description
    }

    async fn authenticate(&self) -> Result<WebUntisSession> {
        tracing::info!(
            "Logging in to WebUntis school {} as {}",
            self.config.school,
            self.credentials.username
        );

        let params = AuthParams {
            user: &self.credentials.username,
            password: &self.credentials.password,
            client: &self.config.client_name,
        };
        let result: AuthResult = self
            .call("authenticate", params, None)
            .await?
            .ok_or_else(|| self.base.custom_error("authenticate returned no session"))?;

        if result.person_id == 0 {
            return Err(Error::Authentication(format!(
                "account {} has no own timetable",
                self.credentials.username
            )));
        }

        Ok(WebUntisSession {
            session_id: result.session_id,
            person_id: result.person_id,
            person_type: result.person_type,
        })
    }

    async fn get_lessons(
        &self,
        session: &WebUntisSession,
        window: DateWindow,
    ) -> Result<Vec<RawLesson>> {
        let params = TimetableParams {
            options: TimetableOptions {
                id: Utc::now().timestamp_millis(),
                element: TimetableElement {
                    id: session.person_id,
                    element_type: session.person_type,
                },
                start_date: window.start_number(),
                end_date: window.end_number(),
                show_ls_text: true,
                show_studentgroup: true,
                show_ls_number: true,
                show_subst_text: true,
                show_info: true,
                show_booking: true,
                klasse_fields: ELEMENT_FIELDS,
                room_fields: ELEMENT_FIELDS,
                subject_fields: ELEMENT_FIELDS,
                teacher_fields: ELEMENT_FIELDS,
            },
        };

        let lessons: Option<Vec<RawLesson>> =
            self.call("getTimetable", params, Some(session)).await?;
        Ok(lessons.unwrap_or_default())
    }

    async fn logout(&self, session: &WebUntisSession) -> Result<()> {
        self.call::<_, serde_json::Value>("logout", serde_json::json!({}), Some(session))
            .await?;
        tracing::debug!("Logged out of WebUntis session");
        Ok(())
    }
}
