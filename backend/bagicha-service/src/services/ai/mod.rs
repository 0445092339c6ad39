//! AI plant identification with fallback between providers.
//!
//! [`AiChain`] tries each configured [`AiProvider`] in order and stops at
//! the first success. What happens when every provider fails depends on
//! the task: analysis answers a canned result, matching answers an empty
//! match list, and care schedules surface an error.

pub mod http;
pub mod provider;
pub mod types;

pub use http::HttpAiProvider;
pub use provider::AiProvider;
pub use types::{
    fallback_analysis, AnalysisOutcome, AnalysisRequest, CareSchedule, CareScheduleRequest,
    MatchCandidate, MatchRequest, MatchResult, MatchSuggestion,
};

use crate::config::AiProviderConfig;
use crate::error::{AppError, AppResult};
use std::sync::Arc;

pub const CARE_SCHEDULE_FAILED: &str = "All AI providers failed to generate care schedule.";

#[derive(Clone, Default)]
pub struct AiChain {
    providers: Vec<Arc<dyn AiProvider>>,
}

impl AiChain {
    pub fn new(providers: Vec<Arc<dyn AiProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(configs: &[AiProviderConfig]) -> AppResult<Self> {
        let providers = configs
            .iter()
            .map(|cfg| HttpAiProvider::new(cfg).map(|p| Arc::new(p) as Arc<dyn AiProvider>))
            .collect::<AppResult<Vec<_>>>()?;
        if providers.is_empty() {
            tracing::warn!("no AI providers configured; analysis will return fallback results");
        }
        Ok(Self { providers })
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn analyze_plant(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        for provider in &self.providers {
            match provider.analyze_plant(request).await {
                Ok(data) => {
                    tracing::info!(provider = provider.name(), "plant analysis succeeded");
                    return AnalysisOutcome {
                        success: true,
                        data,
                        provider: Some(provider.name().to_string()),
                    };
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "plant analysis failed")
                }
            }
        }

        tracing::error!("all AI providers failed plant analysis; returning fallback");
        AnalysisOutcome {
            success: false,
            data: fallback_analysis(),
            provider: None,
        }
    }

    pub async fn find_matches(&self, request: &MatchRequest) -> MatchResult {
        for provider in &self.providers {
            match provider.find_matches(request).await {
                Ok(result) => return result,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "matching failed")
                }
            }
        }
        MatchResult::none()
    }

    pub async fn care_schedule(&self, request: &CareScheduleRequest) -> AppResult<CareSchedule> {
        for provider in &self.providers {
            match provider.care_schedule(request).await {
                Ok(schedule) => return Ok(schedule),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "care schedule failed")
                }
            }
        }
        Err(AppError::Upstream(CARE_SCHEDULE_FAILED.to_string()))
    }
}

impl std::fmt::Debug for AiChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiChain")
            .field("providers", &self.provider_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlantAnalysis;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: &'static str,
        works: bool,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, works: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                works,
                calls: AtomicUsize::new(0),
            })
        }

        fn outcome<T>(&self, value: T) -> AppResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.works {
                Ok(value)
            } else {
                Err(AppError::Upstream(format!("{} is down", self.name)))
            }
        }
    }

    #[async_trait]
    impl AiProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn analyze_plant(&self, _request: &AnalysisRequest) -> AppResult<PlantAnalysis> {
            self.outcome(PlantAnalysis {
                common_name: format!("from {}", self.name),
                ..PlantAnalysis::default()
            })
        }

        async fn find_matches(&self, _request: &MatchRequest) -> AppResult<MatchResult> {
            self.outcome(MatchResult {
                matches: Vec::new(),
                match_tip: format!("tip from {}", self.name),
            })
        }

        async fn care_schedule(&self, _request: &CareScheduleRequest) -> AppResult<CareSchedule> {
            self.outcome(CareSchedule::default())
        }
    }

    fn chain_of(providers: &[Arc<Scripted>]) -> AiChain {
        AiChain::new(
            providers
                .iter()
                .map(|p| p.clone() as Arc<dyn AiProvider>)
                .collect(),
        )
    }

    fn analysis_request() -> AnalysisRequest {
        AnalysisRequest {
            image_url: Some("https://cdn.example.com/monstera.jpg".into()),
            image_base64: None,
            mime_type: None,
            weather: None,
            location: "your location".into(),
        }
    }

    fn care_request() -> CareScheduleRequest {
        CareScheduleRequest {
            plants: vec!["Tulsi".into()],
            weather: None,
            city: "Pune".into(),
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let first = Scripted::new("first", false);
        let second = Scripted::new("second", true);
        let third = Scripted::new("third", true);
        let chain = chain_of(&[first.clone(), second, third.clone()]);

        let outcome = chain.analyze_plant(&analysis_request()).await;
        assert!(outcome.success);
        assert_eq!(outcome.data.common_name, "from second");
        assert_eq!(outcome.provider.as_deref(), Some("second"));
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failed_analysis_returns_fallback() {
        let chain = chain_of(&[Scripted::new("a", false), Scripted::new("b", false)]);
        let outcome = chain.analyze_plant(&analysis_request()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.data, fallback_analysis());
    }

    #[tokio::test]
    async fn test_empty_chain_degrades() {
        let chain = AiChain::default();
        assert!(!chain.analyze_plant(&analysis_request()).await.success);

        let request = MatchRequest {
            user_post: MatchCandidate {
                post_id: "p".into(),
                post_type: "available".into(),
                plant: "Tulsi".into(),
                tags: vec![],
                location: "Pune, India".into(),
            },
            candidates: vec![],
            user_location: None,
        };
        assert_eq!(chain.find_matches(&request).await, MatchResult::none());

        match chain.care_schedule(&care_request()).await {
            Err(AppError::Upstream(msg)) => assert_eq!(msg, CARE_SCHEDULE_FAILED),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_care_schedule_uses_first_success() {
        let chain = chain_of(&[Scripted::new("a", false), Scripted::new("b", true)]);
        assert!(chain.care_schedule(&care_request()).await.is_ok());
    }
}
