// Ollama API client

use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Error, GenerateError};
use crate::models::{GenerationConfig, ModelOptions};

/// Text fragments in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GenerateError>> + Send>>;

/// The model-serving capability: send a prompt, receive a stream of text.
///
/// This abstraction allows mocking the model server in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<FragmentStream, GenerateError>;
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    client: Client,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'a ModelOptions,
    pub stream: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_options(options: &&ModelOptions) -> bool {
    options.is_empty()
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub thinking: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl OllamaClient {
    /// Every configured header is attached to every request.
    pub fn new(config: &GenerationConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_str(name)
                .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
            headers.append(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(GenerateError::Request)?;

        Ok(Self {
            base_url: config.endpoint.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Check that the server is up before anything else happens.
    pub async fn heartbeat(&self) -> Result<(), GenerateError> {
        let response = self
            .client
            .get(self.url("/"))
            .send()
            .await
            .map_err(GenerateError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status { status, body });
        }

        Ok(())
    }

    /// Stream the generate response line by line
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest<'_>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<GenerateResponse, GenerateError>> + Send>>, GenerateError>
    {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(request)
            .send()
            .await
            .map_err(GenerateError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status { status, body });
        }

        // Buffer bytes until a full newline-delimited record is available
        let stream = futures::stream::unfold(
            (response.bytes_stream(), Vec::new(), false),
            |(mut byte_stream, mut buffer, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                        let rest = buffer.split_off(pos + 1);
                        let line = std::mem::replace(&mut buffer, rest);

                        let text = String::from_utf8_lossy(&line);
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            let result = serde_json::from_str::<GenerateResponse>(trimmed)
                                .map_err(GenerateError::Decode);
                            return Some((result, (byte_stream, buffer, false)));
                        }
                        continue;
                    }

                    match byte_stream.next().await {
                        Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                        Some(Err(e)) => {
                            return Some((Err(GenerateError::Stream(e)), (byte_stream, buffer, true)));
                        }
                        None => {
                            // The last record may not end with a newline
                            let text = String::from_utf8_lossy(&buffer).trim().to_string();
                            if text.is_empty() {
                                return None;
                            }
                            let result = serde_json::from_str::<GenerateResponse>(&text)
                                .map_err(GenerateError::Decode);
                            return Some((result, (byte_stream, Vec::new(), true)));
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<FragmentStream, GenerateError> {
        let request = GenerateRequest {
            model,
            prompt,
            options,
            stream: true,
        };
        debug!(model, prompt_len = prompt.len(), "sending generate request");

        let responses = self.generate_stream(&request).await?;
        Ok(into_fragments(responses))
    }
}

/// Flatten generate records into plain text fragments.
///
/// Servers that report reasoning in a separate `thinking` field get it
/// wrapped in `<thinking>` markup, so downstream parsing sees a single
/// text stream either way.
pub fn into_fragments<S>(responses: S) -> FragmentStream
where
    S: Stream<Item = Result<GenerateResponse, GenerateError>> + Send + 'static,
{
    let mut in_thinking_block = false;

    let fragments = responses
        .map(move |result| {
            let mut out = Vec::new();
            match result {
                Ok(response) => {
                    if let Some(error) = response.error {
                        out.push(Err(GenerateError::Model(error)));
                        return out;
                    }
                    if !response.thinking.is_empty() {
                        if !in_thinking_block {
                            out.push(Ok("<thinking>".to_string()));
                            in_thinking_block = true;
                        }
                        out.push(Ok(response.thinking));
                    }
                    if !response.response.is_empty() {
                        if in_thinking_block {
                            out.push(Ok("</thinking>".to_string()));
                            in_thinking_block = false;
                        }
                        out.push(Ok(response.response));
                    }
                    if response.done && in_thinking_block {
                        out.push(Ok("</thinking>".to_string()));
                        in_thinking_block = false;
                    }
                }
                Err(err) => out.push(Err(err)),
            }
            out
        })
        .flat_map(futures::stream::iter);

    Box::pin(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> GenerationConfig {
        GenerationConfig {
            endpoint: Url::parse(&server.uri()).unwrap(),
            model: "qwen3:4b".to_string(),
            headers: BTreeMap::from([("Authorization".to_string(), "Bearer token".to_string())]),
            options: ModelOptions::default(),
            keywords: vec!["fix".to_string()],
            timeout: Duration::from_secs(5),
        }
    }

    async fn collect(stream: FragmentStream) -> Vec<Result<String, GenerateError>> {
        stream.collect().await
    }

    #[test]
    fn test_client_creation() {
        let config = GenerationConfig {
            endpoint: Url::parse("http://localhost:11434").unwrap(),
            model: "qwen3:4b".to_string(),
            headers: BTreeMap::new(),
            options: ModelOptions::default(),
            keywords: Vec::new(),
            timeout: Duration::from_secs(300),
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.url("/api/generate"), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let config = GenerationConfig {
            endpoint: Url::parse("http://localhost:11434").unwrap(),
            model: "m".to_string(),
            headers: BTreeMap::from([("Bad Header".to_string(), "x".to_string())]),
            options: ModelOptions::default(),
            keywords: Vec::new(),
            timeout: Duration::from_secs(5),
        };
        assert!(matches!(
            OllamaClient::new(&config),
            Err(Error::Config(ConfigError::InvalidHeader(name))) if name == "Bad Header"
        ));
    }

    #[test]
    fn test_generate_request_serialization() {
        let options = ModelOptions {
            temperature: Some(0.5),
            ..Default::default()
        };
        let request = GenerateRequest {
            model: "test",
            prompt: "Hello",
            options: &options,
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test");
        assert_eq!(json["options"]["temperature"], 0.5);
        assert_eq!(json["stream"], true);

        let empty = ModelOptions::default();
        let request = GenerateRequest {
            options: &empty,
            ..request
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_generate_response_deserialization() {
        let json = r#"{"response":"Hello","done":true,"context":[]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.response, "Hello");
        assert!(response.done);
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_heartbeat_sends_configured_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("Authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server)).unwrap();
        assert!(client.heartbeat().await.is_ok());
    }

    #[tokio::test]
    async fn test_heartbeat_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server)).unwrap();
        let err = client.heartbeat().await.unwrap_err();
        assert!(matches!(err, GenerateError::Status { status, .. } if status.as_u16() == 401));
    }

    #[tokio::test]
    async fn test_generate_streams_fragments() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"response\":\"<think>\",\"done\":false}\n",
            "{\"response\":\"ok</think>\",\"done\":false}\n",
            "\n",
            "{\"response\":\"fix: typo\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}"
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({"model": "qwen3:4b", "stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server)).unwrap();
        let stream = client
            .generate("qwen3:4b", "prompt", &ModelOptions::default())
            .await
            .unwrap();
        let fragments: Vec<String> = collect(stream)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(fragments, vec!["<think>", "ok</think>", "fix: typo"]);
    }

    #[tokio::test]
    async fn test_generate_reports_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server)).unwrap();
        let result = client
            .generate("missing", "prompt", &ModelOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(GenerateError::Status { body, .. }) if body == "model not found"
        ));
    }

    #[tokio::test]
    async fn test_thinking_field_is_wrapped_in_tags() {
        let records = vec![
            Ok(GenerateResponse {
                response: String::new(),
                thinking: "let me see".to_string(),
                done: false,
                error: None,
            }),
            Ok(GenerateResponse {
                response: "feat: add x".to_string(),
                thinking: String::new(),
                done: true,
                error: None,
            }),
        ];
        let fragments: Vec<String> = collect(into_fragments(futures::stream::iter(records)))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            fragments,
            vec!["<thinking>", "let me see", "</thinking>", "feat: add x"]
        );
    }

    #[tokio::test]
    async fn test_error_record_becomes_model_error() {
        let records = vec![Ok(GenerateResponse {
            response: String::new(),
            thinking: String::new(),
            done: false,
            error: Some("out of memory".to_string()),
        })];
        let mut fragments = collect(into_fragments(futures::stream::iter(records))).await;
        assert_eq!(fragments.len(), 1);
        assert!(matches!(
            fragments.remove(0),
            Err(GenerateError::Model(msg)) if msg == "out of memory"
        ));
    }
}
