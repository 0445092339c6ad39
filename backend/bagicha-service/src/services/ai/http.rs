use super::provider::AiProvider;
use super::types::{AnalysisRequest, CareSchedule, CareScheduleRequest, MatchRequest, MatchResult};
use crate::config::AiProviderConfig;
use crate::error::{AppError, AppResult};
use crate::models::PlantAnalysis;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// AI gateway reached over HTTP.
///
/// The gateway owns prompts and vendor SDKs. This side posts the task as
/// JSON to `{base}/analyze`, `{base}/match` or `{base}/care-schedule` and
/// expects the structured result back.
pub struct HttpAiProvider {
    client: HttpClient,
    name: String,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAiProvider {
    pub fn new(config: &AiProviderConfig) -> AppResult<Self> {
        let client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post_task<Req, Res>(&self, path: &str, body: &Req) -> AppResult<Res>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: request failed: {e}", self.name)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("{}: {path} returned {status}", self.name)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: unreadable body: {e}", self.name)))?;
        parse_payload(&text).map_err(|e| AppError::Upstream(format!("{}: {e}", self.name)))
    }
}

/// Parse a model answer, tolerating a surrounding markdown code fence.
pub fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| format!("invalid JSON payload: {e}"))
}

/// `matches` must be present and an array.
pub fn validate_matches(value: serde_json::Value) -> Result<MatchResult, String> {
    if !value.get("matches").is_some_and(serde_json::Value::is_array) {
        return Err("invalid match format".to_string());
    }
    serde_json::from_value(value).map_err(|e| format!("invalid match payload: {e}"))
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze_plant(&self, request: &AnalysisRequest) -> AppResult<PlantAnalysis> {
        self.post_task("analyze", request).await
    }

    async fn find_matches(&self, request: &MatchRequest) -> AppResult<MatchResult> {
        let raw: serde_json::Value = self.post_task("match", request).await?;
        validate_matches(raw).map_err(|e| AppError::Upstream(format!("{}: {e}", self.name)))
    }

    async fn care_schedule(&self, request: &CareScheduleRequest) -> AppResult<CareSchedule> {
        self.post_task("care-schedule", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload_strips_code_fence() {
        let text = "```json\n{\"commonName\":\"Tulsi\",\"healthStatus\":\"healthy\"}\n```";
        let analysis: PlantAnalysis = parse_payload(text).unwrap();
        assert_eq!(analysis.common_name, "Tulsi");

        let bare: PlantAnalysis = parse_payload("{\"species\":\"Ocimum tenuiflorum\"}").unwrap();
        assert_eq!(bare.species, "Ocimum tenuiflorum");
    }

    #[test]
    fn test_match_payload_requires_array() {
        assert!(validate_matches(json!({"matchTip": "x"})).is_err());
        assert!(validate_matches(json!({"matches": {"postId": "a"}})).is_err());

        let ok = validate_matches(json!({"matches": [], "matchTip": "Swap in spring"})).unwrap();
        assert!(ok.matches.is_empty());
        assert_eq!(ok.match_tip, "Swap in spring");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = HttpAiProvider::new(&AiProviderConfig {
            name: "primary".into(),
            base_url: "http://localhost:9000/ai/".into(),
            api_key: None,
        })
        .unwrap();
        assert_eq!(provider.base_url, "http://localhost:9000/ai");
        assert_eq!(provider.name(), "primary");
    }
}
