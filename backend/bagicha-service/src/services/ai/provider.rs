use super::types::{AnalysisRequest, CareSchedule, CareScheduleRequest, MatchRequest, MatchResult};
use crate::error::AppResult;
use crate::models::PlantAnalysis;
use async_trait::async_trait;

/// One vendor endpoint in the AI chain.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn analyze_plant(&self, request: &AnalysisRequest) -> AppResult<PlantAnalysis>;

    async fn find_matches(&self, request: &MatchRequest) -> AppResult<MatchResult>;

    async fn care_schedule(&self, request: &CareScheduleRequest) -> AppResult<CareSchedule>;
}
