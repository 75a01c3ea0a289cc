use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

const GENERATIVE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// One structured generation request: a prompt plus the JSON schema the
/// model response must conform to (generative-language REST schema format).
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub response_schema: serde_json::Value,
}

/// Transport boundary to the generative-language backend. Any backend
/// honoring the same request/response shape is substitutable.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Returns the raw JSON text produced by the model.
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestGenerativeClient {
    client: Client,
}

impl ReqwestGenerativeClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Advisory(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn advisory_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("generative api error: http {}", status.as_u16())
        } else {
            format!("generative api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Advisory(message)
    }

    fn generate_endpoint(model: &str) -> Result<Url, InfraError> {
        let mut url = Url::parse(GENERATIVE_API_BASE)
            .map_err(|error| InfraError::Advisory(format!("invalid generative api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Advisory("generative api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("models");
            segments.push(&format!("{model}:generateContent"));
        }
        Ok(url)
    }
}

#[derive(Debug, serde::Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, serde::Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: &'a serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<ResponseCandidate>>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn extract_generated_text(body: &str) -> Result<String, InfraError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|error| {
        InfraError::Advisory(format!("invalid generate payload: {error}; body={body}"))
    })?;

    let text = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<String>();

    if text.trim().is_empty() {
        return Err(InfraError::Advisory(
            "generate response did not include any text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl GenerativeClient for ReqwestGenerativeClient {
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, InfraError> {
        Self::ensure_non_empty(api_key, "api key")?;
        Self::ensure_non_empty(model, "model")?;
        Self::ensure_non_empty(&request.prompt, "prompt")?;

        let endpoint = Self::generate_endpoint(model)?;
        let payload = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
            },
        };

        let response = self
            .client
            .post(endpoint)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|error| InfraError::Advisory(format!("network error while generating content: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Advisory(format!("failed reading generate response: {error}")))?;

        if !status.is_success() {
            return Err(Self::advisory_http_error(status, &body));
        }

        extract_generated_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_endpoint_embeds_model_action() {
        let endpoint = ReqwestGenerativeClient::generate_endpoint(DEFAULT_MODEL)
            .expect("build endpoint");
        assert_eq!(
            endpoint.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn extract_generated_text_joins_candidate_parts() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "[{\"title\":"}, {"text": "\"a\"}]"}]}}
            ]
        }"#;
        let text = extract_generated_text(body).expect("extract text");
        assert_eq!(text, "[{\"title\":\"a\"}]");
    }

    #[test]
    fn extract_generated_text_rejects_empty_candidates() {
        assert!(extract_generated_text("{\"candidates\": []}").is_err());
        assert!(extract_generated_text("not json").is_err());
    }
}
