//! Splunk Oracles
//!
//! Talks to the Splunk management REST API:
//!
//! - syntax: `GET /services/search/parser` with `parse_only=true`; the first
//!   `ERROR` message fails the check.
//! - execution: `POST /services/search/jobs` in blocking mode, read the job
//!   `sid` from the XML reply, then fetch `/services/search/jobs/<sid>/results`.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::StatusCode;
use rule_pilot_llm::{build_http_client, HttpClientOptions};
use rule_pilot_quality_gates::{
    ExecutionOracle, OracleError, OracleResult, SyntaxOracle, SyntaxVerdict,
};
use serde::Deserialize;
use url::Url;

use crate::models::settings::SplunkSettings;
use crate::utils::error::{AppError, AppResult};

/// Splunk management API client.
#[derive(Debug, Clone)]
pub struct SplunkClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl SplunkClient {
    pub fn new(settings: &SplunkSettings) -> AppResult<Self> {
        let base_url = Url::parse(&format!("https://{}:{}/", settings.host.trim(), settings.port))
            .map_err(|e| AppError::config(format!("Invalid Splunk host {}: {}", settings.host, e)))?;
        let http = build_http_client(&HttpClientOptions {
            proxy_url: None,
            accept_invalid_certs: !settings.verify_tls,
        })?;
        Ok(Self {
            http,
            base_url,
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> OracleResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| OracleError::Response(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn parser_url(&self, query: &str) -> OracleResult<Url> {
        let mut url = self.endpoint("services/search/parser")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("parse_only", "true")
            .append_pair("output_mode", "json");
        Ok(url)
    }

    fn results_url(&self, sid: &str) -> OracleResult<Url> {
        let mut url = self.endpoint("services/search/jobs/")?;
        url.path_segments_mut()
            .map_err(|_| OracleError::Response("Base URL cannot take path segments".to_string()))?
            .pop_if_empty()
            .push(sid)
            .push("results");
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> OracleResult<(StatusCode, String)> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;
        reject_unauthorized(status, body)
    }
}

#[async_trait]
impl SyntaxOracle for SplunkClient {
    async fn check_syntax(&self, query: &str) -> OracleResult<SyntaxVerdict> {
        let url = self.parser_url(query)?;
        let (status, body) = self.send(self.http.get(url)).await?;
        let verdict = parse_parser_reply(status, &body)?;
        if verdict.passed {
            tracing::debug!("SPL grammar is correct");
        } else {
            tracing::debug!("SPL grammar error: {}", verdict.message.as_deref().unwrap_or(""));
        }
        Ok(verdict)
    }
}

#[async_trait]
impl ExecutionOracle for SplunkClient {
    async fn execute(&self, query: &str) -> OracleResult<String> {
        let url = self.endpoint("services/search/jobs")?;
        let search = search_string(query);
        let form = [("search", search.as_str()), ("exec_mode", "blocking")];
        let (status, body) = self.send(self.http.post(url).form(&form)).await?;
        let sid = parse_job_reply(status, &body)?;
        tracing::debug!(%sid, "search job finished");

        let (status, body) = self.send(self.http.get(self.results_url(&sid)?)).await?;
        interpret_results(status, body)
    }
}

// ============================================================================
// Wire Helpers
// ============================================================================

#[derive(Debug, Deserialize)]
struct ParserReply {
    #[serde(default)]
    messages: Vec<ParserMessage>,
}

#[derive(Debug, Deserialize)]
struct ParserMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Interpret a parser endpoint reply.
fn parse_parser_reply(status: StatusCode, body: &str) -> OracleResult<SyntaxVerdict> {
    let reply: Option<ParserReply> = serde_json::from_str(body).ok();
    let first_error = reply
        .iter()
        .flat_map(|r| r.messages.iter())
        .find(|m| m.kind.eq_ignore_ascii_case("ERROR"));

    match first_error {
        Some(message) => Ok(SyntaxVerdict::invalid(message.text.clone())),
        None if status.is_success() => Ok(SyntaxVerdict::valid()),
        None => Err(OracleError::Response(format!(
            "Parser returned {}: {}",
            status, body
        ))),
    }
}

/// Bad credentials surface as an authentication error on every endpoint.
fn reject_unauthorized(status: StatusCode, body: String) -> OracleResult<(StatusCode, String)> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(OracleError::Authentication(body));
    }
    Ok((status, body))
}

/// Interpret a job creation reply: only `201 Created` carries a `sid`.
fn parse_job_reply(status: StatusCode, body: &str) -> OracleResult<String> {
    if status != StatusCode::CREATED {
        return Err(OracleError::Response(format!(
            "Error creating search job ({}): {}",
            status, body
        )));
    }
    parse_sid(body)
}

/// Interpret a results reply. `204` means the job produced no rows.
fn interpret_results(status: StatusCode, body: String) -> OracleResult<String> {
    match status {
        StatusCode::OK => Ok(body),
        StatusCode::NO_CONTENT => Ok(String::new()),
        other => Err(OracleError::Response(format!(
            "Error retrieving search results ({}): {}",
            other, body
        ))),
    }
}

/// Search jobs need a leading command; plain filters get `search`.
fn search_string(query: &str) -> String {
    let trimmed = query.trim_start();
    if trimmed.starts_with('|') || trimmed.starts_with("search ") {
        query.to_string()
    } else {
        format!("search {}", query)
    }
}

/// Read the `<sid>` element of a job creation reply.
fn parse_sid(xml: &str) -> OracleResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut in_sid = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                in_sid = e.local_name().as_ref() == b"sid";
            }
            Ok(Event::End(_)) => in_sid = false,
            Ok(Event::Text(ref e)) if in_sid => {
                let sid = e
                    .unescape()
                    .map_err(|e| OracleError::Response(format!("Invalid sid: {}", e)))?;
                let sid = sid.trim();
                if !sid.is_empty() {
                    return Ok(sid.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(OracleError::Response(format!(
                    "Error parsing XML response: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Err(OracleError::Response(
        "Search job reply has no sid".to_string(),
    ))
}
