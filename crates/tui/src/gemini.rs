//! Google Gemini chat backend.
//!
//! Thin blocking client for the `generateContent` endpoint. Each session
//! holds its own turn history and replays it in full on every send, with the
//! system instruction and the fixed safety policy attached to every request.

use log::{info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const GEMINI_MODEL: &str = "gemini-2.5-flash-preview-04-17";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Substring Google includes in the 400 body for a malformed or revoked key.
pub const AUTH_FAILURE_SIGNATURE: &str = "API key not valid";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
}

impl ProviderError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth(_))
    }
}

/// Constructed handle to the remote service; hands out chat sessions.
pub trait ChatClient: Send {
    fn start_session(
        &self,
        system_instruction: &str,
    ) -> Result<Box<dyn ChatSession>, ProviderError>;
}

/// One conversation with the model. The session owns its history; dropping
/// it discards that history.
pub trait ChatSession: Send {
    fn send(&mut self, text: &str) -> Result<String, ProviderError>;
}

pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|error| ProviderError::Transport(format!("HTTP client init failed: {error}")))?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl ChatClient for GeminiClient {
    fn start_session(
        &self,
        system_instruction: &str,
    ) -> Result<Box<dyn ChatSession>, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            GEMINI_MODEL,
            self.api_key
        );
        Ok(Box::new(GeminiSession {
            http: self.http.clone(),
            url,
            system_instruction: system_instruction.to_string(),
            contents: Vec::new(),
        }))
    }
}

struct GeminiSession {
    http: Client,
    url: String,
    system_instruction: String,
    contents: Vec<Value>,
}

impl ChatSession for GeminiSession {
    fn send(&mut self, text: &str) -> Result<String, ProviderError> {
        self.contents.push(json!({
            "role": "user",
            "parts": [{"text": text}]
        }));

        match self.request() {
            Ok(reply) => {
                self.contents.push(json!({
                    "role": "model",
                    "parts": [{"text": reply}]
                }));
                Ok(reply)
            }
            Err(error) => {
                // A failed turn never enters the history; a retry of the
                // same question must not replay it as a second user turn.
                self.contents.pop();
                Err(error)
            }
        }
    }
}

impl GeminiSession {
    fn request(&self) -> Result<String, ProviderError> {
        let body = build_request_body(&self.contents, &self.system_instruction);
        info!("gemini request model={} turns={}", GEMINI_MODEL, self.contents.len());

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|error| ProviderError::Transport(format!("HTTP request failed: {error}")))?;

        let status = response.status();
        let payload = response
            .text()
            .map_err(|error| ProviderError::Transport(format!("failed to read response: {error}")))?;

        if !status.is_success() {
            warn!("gemini error status={} body={}", status, truncated(&payload, 300));
            return Err(classify_http_failure(status.as_u16(), &payload));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&payload)
            .map_err(|error| ProviderError::Transport(format!("malformed response: {error}")))?;
        Ok(extract_reply(&parsed))
    }
}

pub(crate) fn safety_settings() -> Value {
    let settings: Vec<Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| {
            json!({
                "category": category,
                "threshold": SAFETY_THRESHOLD,
            })
        })
        .collect();
    Value::Array(settings)
}

pub(crate) fn build_request_body(contents: &[Value], system_instruction: &str) -> Value {
    json!({
        "contents": contents,
        "systemInstruction": {
            "parts": [{"text": system_instruction}]
        },
        "safetySettings": safety_settings(),
    })
}

fn truncated(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub(crate) fn classify_http_failure(status: u16, body: &str) -> ProviderError {
    // The Display impls add their own prefixes; keep only the body here.
    let detail = truncated(body, 200);
    if status == 401 || status == 403 || body.contains(AUTH_FAILURE_SIGNATURE) {
        return ProviderError::Auth(detail);
    }
    ProviderError::Api {
        status,
        message: detail,
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenates candidate text. Blocked or truncated candidates produce a
/// readable sentence instead of an empty reply.
fn extract_reply(response: &GenerateContentResponse) -> String {
    let Some(candidate) = response.candidates.first() else {
        return "The model returned an empty response. Please retry or rephrase.".to_string();
    };

    let text: String = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();
    if !text.is_empty() {
        return text;
    }

    match candidate.finish_reason.as_deref() {
        Some("SAFETY") => {
            "My response was blocked by the content safety filter. Try rephrasing your question."
                .to_string()
        }
        Some("RECITATION") => {
            "My response was blocked by a recitation filter. Try rephrasing.".to_string()
        }
        Some("MAX_TOKENS") => {
            "I ran out of output tokens before finishing. Try a narrower question.".to_string()
        }
        Some(reason) if reason != "STOP" => {
            format!("The model returned an empty response (reason: {reason}). Please retry or rephrase.")
        }
        _ => "The model returned an empty response. Please retry or rephrase.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_request_body, classify_http_failure, extract_reply, safety_settings, ChatSession,
        GeminiSession, GenerateContentResponse, ProviderError,
    };
    use serde_json::{json, Value};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    fn read_request_body(stream: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut buf).unwrap();
            assert!(n > 0, "connection closed before headers");
            data.extend_from_slice(&buf[..n]);
            if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
        let length: usize = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse().unwrap())
            .unwrap_or(0);
        while data.len() < header_end + length {
            let n = stream.read(&mut buf).unwrap();
            assert!(n > 0, "connection closed before body");
            data.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&data[header_end..header_end + length]).to_string()
    }

    /// One-shot HTTP stub: serves the canned responses in order, sending
    /// each observed request body back over the channel.
    fn serve_responses(responses: Vec<String>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (body_tx, body_rx) = mpsc::channel();
        thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let body = read_request_body(&mut stream);
                body_tx.send(body).unwrap();
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        (format!("http://{addr}/generate"), body_rx)
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn request_body_carries_instruction_history_and_safety_policy() {
        let contents = vec![
            json!({"role": "user", "parts": [{"text": "hi"}]}),
            json!({"role": "model", "parts": [{"text": "hello"}]}),
            json!({"role": "user", "parts": [{"text": "valuation?"}]}),
        ];
        let body = build_request_body(&contents, "you are a helpful assistant");

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("you are a helpful assistant")
        );
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], json!("model"));

        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        for entry in safety {
            assert_eq!(entry["threshold"], json!("BLOCK_MEDIUM_AND_ABOVE"));
        }
    }

    #[test]
    fn safety_policy_names_all_four_categories() {
        let rendered = safety_settings().to_string();
        for category in [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ] {
            assert!(rendered.contains(category), "missing {category}");
        }
    }

    #[test]
    fn extract_reply_concatenates_candidate_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Our lead program "}, {"text": "is ART-101."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_reply(&response), "Our lead program is ART-101.");
    }

    #[test]
    fn blocked_candidate_yields_readable_fallback() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(extract_reply(&response).contains("safety filter"));
    }

    #[test]
    fn empty_candidate_list_yields_readable_fallback() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(extract_reply(&response).contains("empty response"));
    }

    #[test]
    fn auth_status_codes_classify_as_auth() {
        assert!(classify_http_failure(401, "unauthorized").is_auth());
        assert!(classify_http_failure(403, "forbidden").is_auth());
    }

    #[test]
    fn invalid_key_body_signature_classifies_as_auth() {
        let error = classify_http_failure(400, r#"{"error": "API key not valid"}"#);
        assert!(error.is_auth());
    }

    #[test]
    fn other_statuses_classify_as_api_errors() {
        match classify_http_failure(500, "boom") {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn api_error_renders_its_status_prefix_once() {
        let rendered = classify_http_failure(503, "service unavailable").to_string();
        assert_eq!(rendered, "API error 503: service unavailable");
    }

    #[test]
    fn failed_send_is_not_replayed_on_the_next_request() {
        let reply = r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]},"finishReason":"STOP"}]}"#;
        let (url, bodies) = serve_responses(vec![
            http_response("500 Internal Server Error", r#"{"error":"boom"}"#),
            http_response("200 OK", reply),
        ]);

        let mut session = GeminiSession {
            http: reqwest::blocking::Client::new(),
            url,
            system_instruction: "instruction".to_string(),
            contents: Vec::new(),
        };

        assert!(session.send("first question").is_err());
        // The failed turn is rolled back, not left pending.
        assert!(session.contents.is_empty());

        assert_eq!(session.send("second question").unwrap(), "ok");
        assert_eq!(session.contents.len(), 2);

        let first: Value = serde_json::from_str(&bodies.recv().unwrap()).unwrap();
        assert_eq!(first["contents"].as_array().unwrap().len(), 1);

        let second: Value = serde_json::from_str(&bodies.recv().unwrap()).unwrap();
        let turns = second["contents"].as_array().unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0]["parts"][0]["text"], json!("second question"));
    }
}
