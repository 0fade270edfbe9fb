use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::LanguageModel;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Talks to the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    /// A missing key is only reported once a request is made.
    pub fn new(api_key: Option<String>, model: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|v| !v.trim().is_empty()),
            model,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str, response_schema: Option<Value>) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("API_KEY not found"))?;

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        debug!("Requesting {url}");
        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&GenerateRequest::new(prompt, response_schema))
            .send()
            .await
            .context("Failed to reach the language model")?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await
            .context("Language model reply is not a generateContent response")?;

        response.text()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, response_schema: Option<Value>) -> Self {
        Self {
            contents: [Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: response_schema.map(|schema| GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate with all parts joined.
    fn text(self) -> Result<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Language model returned no candidates"))?;
        let text = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|v| v.text)
            .collect::<String>();
        Ok(text.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::*;
    use crate::utils::logging::TEST_LOGGING;

    /// Answers a single HTTP request with `status` and `body`, handing back the raw request.
    async fn serve_once(status: &'static str, body: String) -> Result<(String, JoinHandle<Result<String>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = format!("http://{}/v1beta", listener.local_addr()?);

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let mut request = Vec::new();
            let mut buffer = [0u8; 4096];
            loop {
                let read = socket.read(&mut buffer).await?;
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await?;
            socket.shutdown().await?;
            Ok(String::from_utf8_lossy(&request).into_owned())
        });

        Ok((endpoint, server))
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    #[tokio::test]
    async fn sends_schema_and_joins_parts() -> Result<()> {
        *TEST_LOGGING;
        let reply = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "  {\"name\":" }, { "text": "\"Owl\"}\n" }] }
            }]
        });
        let (endpoint, server) = serve_once("200 OK", reply.to_string()).await?;

        let client = GeminiClient::new(Some("secret".into()), DEFAULT_MODEL.into(), endpoint);
        let text = client
            .generate("Describe me", Some(json!({ "type": "OBJECT" })))
            .await?;
        assert_eq!(text, r#"{"name":"Owl"}"#);

        let request = server.await??;
        assert!(request.starts_with(
            "POST /v1beta/models/gemini-2.5-flash:generateContent?key=secret HTTP/1.1"
        ));
        let body = request.split_once("\r\n\r\n").map(|v| v.1).unwrap_or_default();
        let body = serde_json::from_str::<Value>(body)?;
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Describe me");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        Ok(())
    }

    #[tokio::test]
    async fn plain_text_requests_omit_generation_config() -> Result<()> {
        let reply = json!({ "candidates": [{ "content": { "parts": [{ "text": "Keep going!" }] } }] });
        let (endpoint, server) = serve_once("200 OK", reply.to_string()).await?;

        let client = GeminiClient::new(Some("k".into()), "other-model".into(), endpoint);
        assert_eq!(client.generate("Cheer me up", None).await?, "Keep going!");

        let request = server.await??;
        assert!(!request.contains("generationConfig"));
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_an_error() -> Result<()> {
        let (endpoint, server) =
            serve_once("429 Too Many Requests", r#"{"error":{}}"#.to_owned()).await?;

        let client = GeminiClient::new(Some("k".into()), DEFAULT_MODEL.into(), endpoint);
        assert!(client.generate("Anything", None).await.is_err());
        server.await??;
        Ok(())
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let client = GeminiClient::new(Some("  ".into()), DEFAULT_MODEL.into(), DEFAULT_ENDPOINT.into());
        let error = client.generate("Anything", None).await.unwrap_err();
        assert_eq!(error.to_string(), "API_KEY not found");
    }

    #[test]
    fn empty_candidates_are_rejected() {
        let response = serde_json::from_str::<GenerateResponse>("{}").unwrap();
        assert!(response.text().is_err());
    }
}
