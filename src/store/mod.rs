//! Survey data store
//!
//! Handlers only see the [`SurveyStore`] trait; [`MemoryStore`] is the bundled
//! in-process implementation.

pub mod memory;

use crate::models::{
    Grade, NewSurvey, ResponseDetail, SchoolYear, Survey, SurveyResponse, User, UserYearProfile,
};
use async_trait::async_trait;

pub use memory::MemoryStore;

/// Store failures surfaced to handlers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations used by the admin and LIFF APIs
///
/// Ordering guarantees: school years newest `start_date` first, surveys and
/// responses newest first, survey dates ascending by date.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn list_school_years(&self) -> StoreResult<Vec<SchoolYear>>;

    async fn get_school_year(&self, id: &str) -> StoreResult<Option<SchoolYear>>;

    /// The single school year currently open for answers
    async fn active_school_year(&self) -> StoreResult<Option<SchoolYear>>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_line_id(&self, line_user_id: &str) -> StoreResult<Option<User>>;

    async fn create_user(
        &self,
        line_user_id: &str,
        display_name: Option<String>,
    ) -> StoreResult<User>;

    async fn update_display_name(&self, user_id: &str, display_name: String) -> StoreResult<User>;

    async fn find_profile(
        &self,
        user_id: &str,
        school_year_id: &str,
    ) -> StoreResult<Option<UserYearProfile>>;

    /// Create or replace the profile for (user, school year)
    async fn upsert_profile(
        &self,
        user_id: &str,
        school_year_id: &str,
        grade: Grade,
        class_name: Option<String>,
    ) -> StoreResult<UserYearProfile>;

    async fn list_surveys(&self) -> StoreResult<Vec<Survey>>;

    async fn get_survey(&self, id: &str) -> StoreResult<Option<Survey>>;

    /// Most recently created survey of a school year
    async fn latest_survey(&self, school_year_id: &str) -> StoreResult<Option<Survey>>;

    async fn create_survey(&self, survey: NewSurvey) -> StoreResult<Survey>;

    async fn list_responses(&self, survey_id: &str) -> StoreResult<Vec<SurveyResponse>>;

    async fn find_response(
        &self,
        survey_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<SurveyResponse>>;

    /// Create the response for (survey, user) or replace all of its details at once
    async fn upsert_response(
        &self,
        survey_id: &str,
        user_id: &str,
        details: Vec<ResponseDetail>,
    ) -> StoreResult<SurveyResponse>;
}
