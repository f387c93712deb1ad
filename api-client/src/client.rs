use crate::config::ClientConfig;
use crate::envelope::{decode_payload, envelope_message, envelope_success, normalize_ids};
use crate::error::{ApiError, ApiResult};
use crate::session::Session;
use logger_redacted::redacted_error;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

/// A file returned by a blob endpoint
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// From `Content-Disposition`, when the backend supplied one
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl Download {
    /// Bare file name to save under; never carries a directory part.
    pub fn file_name_or(&self, fallback: &str) -> String {
        self.file_name
            .as_deref()
            .and_then(safe_file_name)
            .or_else(|| safe_file_name(fallback))
            .unwrap_or_else(|| "download".to_string())
    }
}

/// The single HTTP client for the lab backend.
///
/// Attaches the session's bearer token to every request, clears the session
/// on 401, and decodes `{success, data, message}` envelopes at the boundary.
/// No retries and no caching: every call is a fresh request. Failures are
/// logged (redacted) and returned to the caller.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Session,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for an invalid configuration or when the
    /// underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig, session: Session) -> ApiResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url(), path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let endpoint = format!("GET {path}");
        let body = self.send_json(&endpoint, self.request(Method::GET, path)).await?;
        fail_logged(&endpoint, decode_payload(&endpoint, &body))
    }

    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = format!("GET {path}");
        let request = self.request(Method::GET, path).query(query);
        let body = self.send_json(&endpoint, request).await?;
        fail_logged(&endpoint, decode_payload(&endpoint, &body))
    }

    /// Whole response body after the status and `success` checks, for callers
    /// that decode the envelope themselves (paginated lists).
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn get_raw<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> ApiResult<Value> {
        let endpoint = format!("GET {path}");
        let request = self.request(Method::GET, path).query(query);
        self.send_json(&endpoint, request).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn post<B, T>(&self, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = format!("POST {path}");
        let request = self.request(Method::POST, path).json(payload);
        let body = self.send_json(&endpoint, request).await?;
        fail_logged(&endpoint, decode_payload(&endpoint, &body))
    }

    /// POST whose response payload is ignored beyond the success check.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, payload: &B) -> ApiResult<()> {
        let endpoint = format!("POST {path}");
        let request = self.request(Method::POST, path).json(payload);
        self.send_json(&endpoint, request).await.map(|_| ())
    }

    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn put<B, T>(&self, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = format!("PUT {path}");
        let request = self.request(Method::PUT, path).json(payload);
        let body = self.send_json(&endpoint, request).await?;
        fail_logged(&endpoint, decode_payload(&endpoint, &body))
    }

    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let endpoint = format!("DELETE {path}");
        self.send_json(&endpoint, self.request(Method::DELETE, path))
            .await
            .map(|_| ())
    }

    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<T> {
        let endpoint = format!("POST {path}");
        let request = self.request(Method::POST, path).multipart(form);
        let body = self.send_json(&endpoint, request).await?;
        fail_logged(&endpoint, decode_payload(&endpoint, &body))
    }

    /// Fetch a binary document (PDF reports, expense exports).
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn download(&self, path: &str) -> ApiResult<Download> {
        let endpoint = format!("GET {path}");
        self.fetch_download(&endpoint, self.request(Method::GET, path)).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`]; see [`ApiClient`].
    pub async fn download_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> ApiResult<Download> {
        let endpoint = format!("GET {path}");
        let request = self.request(Method::GET, path).query(query);
        self.fetch_download(&endpoint, request).await
    }

    async fn fetch_download(&self, endpoint: &str, request: RequestBuilder) -> ApiResult<Download> {
        let response = self.execute(endpoint, request).await?;

        let headers = response.headers();
        let file_name = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;

        debug!(endpoint = %endpoint, size = bytes.len(), "Download complete");
        Ok(Download {
            bytes: bytes.to_vec(),
            file_name,
            content_type,
        })
    }

    async fn send_json(&self, endpoint: &str, request: RequestBuilder) -> ApiResult<Value> {
        let response = self.execute(endpoint, request).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let mut body: Value = fail_logged(
            endpoint,
            serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }),
        )?;
        normalize_ids(&mut body);

        if envelope_success(&body) == Some(false) {
            return fail_logged(
                endpoint,
                Err(ApiError::Http {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                    message: envelope_message(&body),
                }),
            );
        }

        Ok(body)
    }

    async fn execute(&self, endpoint: &str, request: RequestBuilder) -> ApiResult<Response> {
        let request = match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        debug!(endpoint = %endpoint, "Sending request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return fail_logged(endpoint, Err(transport_error(endpoint, &e))),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .as_ref()
            .and_then(envelope_message);

        let error = if status == StatusCode::UNAUTHORIZED {
            self.session.expire();
            ApiError::Unauthorized {
                endpoint: endpoint.to_string(),
                message,
            }
        } else {
            ApiError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            }
        };

        fail_logged(endpoint, Err(error))
    }
}

fn transport_error(endpoint: &str, err: &reqwest::Error) -> ApiError {
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    }
}

fn fail_logged<T>(endpoint: &str, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(err) = &result {
        redacted_error!("{endpoint} failed: {err}");
    }
    result
}

/// `attachment; filename="report.pdf"` → `report.pdf`
fn content_disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .and_then(|name| safe_file_name(name.trim_matches('"')))
}

/// Last path component of a server-suggested name.
///
/// Both separators count so a Windows-style name cannot smuggle a
/// directory either. Empty, `.` and `..` yield `None`.
pub fn safe_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        _ => Some(last.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_filename() {
        assert_eq!(
            content_disposition_filename(r#"attachment; filename="expenses-2026-10.pdf""#).as_deref(),
            Some("expenses-2026-10.pdf")
        );
        assert_eq!(
            content_disposition_filename("attachment; filename=report.pdf").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(content_disposition_filename("inline"), None);
    }

    #[test]
    fn test_content_disposition_strips_directories() {
        assert_eq!(
            content_disposition_filename(r#"attachment; filename="../x.pdf""#).as_deref(),
            Some("x.pdf")
        );
        assert_eq!(
            content_disposition_filename("attachment; filename=/etc/cron.d/job").as_deref(),
            Some("job")
        );
        assert_eq!(
            content_disposition_filename(r#"attachment; filename="..\..\boot.ini""#).as_deref(),
            Some("boot.ini")
        );
        assert_eq!(content_disposition_filename(r#"attachment; filename="..""#), None);
        assert_eq!(content_disposition_filename("attachment; filename=reports/"), None);
    }

    #[test]
    fn test_file_name_or_never_escapes() {
        let download = Download {
            bytes: Vec::new(),
            file_name: Some("../../home/user/.bashrc".to_string()),
            content_type: None,
        };
        assert_eq!(download.file_name_or("report.pdf"), ".bashrc");

        let unnamed = Download {
            bytes: Vec::new(),
            file_name: Some("..".to_string()),
            content_type: None,
        };
        assert_eq!(unnamed.file_name_or("report-o-1.pdf"), "report-o-1.pdf");
    }

    #[test]
    fn test_url_join() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:8080/api/"), Session::new()).unwrap();
        assert_eq!(client.url("/patients"), "http://localhost:8080/api/patients");
        assert_eq!(client.url("doctors/1"), "http://localhost:8080/api/doctors/1");
    }
}
