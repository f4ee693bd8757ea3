use super::{StoreError, StoreResult, SurveyStore};
use crate::models::{
    new_id, Grade, NewSurvey, ResponseDetail, SchoolYear, Survey, SurveyDate, SurveyResponse,
    User, UserYearProfile,
};
use crate::settings::SchoolYearSettings;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    school_years: Vec<SchoolYear>,
    users: Vec<User>,
    profiles: Vec<UserYearProfile>,
    surveys: Vec<Survey>,
    responses: Vec<SurveyResponse>,
}

impl Tables {
    fn school_years_newest_first(&self) -> Vec<SchoolYear> {
        let mut years = self.school_years.clone();
        years.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        years
    }

    fn user_mut(&mut self, user_id: &str) -> StoreResult<&mut User> {
        self.users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(StoreError::NotFound("user"))
    }
}

/// In-process store; all tables sit behind one lock so every write is atomic
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the configured school years
    #[must_use]
    pub fn from_settings(school_years: &[SchoolYearSettings]) -> Self {
        let years: Vec<SchoolYear> = school_years
            .iter()
            .map(|year| SchoolYear {
                id: new_id(),
                name: year.name.clone(),
                start_date: year.start_date,
                end_date: year.end_date,
                is_active: year.is_active,
            })
            .collect();

        if years.iter().filter(|year| year.is_active).count() > 1 {
            log::warn!("More than one school year is marked active; the newest one is used");
        }
        log::info!("Seeded {} school year(s)", years.len());

        Self {
            tables: RwLock::new(Tables {
                school_years: years,
                ..Tables::default()
            }),
        }
    }

    /// Add a school year outside the configured seed list
    pub async fn add_school_year(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        is_active: bool,
    ) -> SchoolYear {
        let year = SchoolYear {
            id: new_id(),
            name: name.to_string(),
            start_date,
            end_date,
            is_active,
        };
        self.tables.write().await.school_years.push(year.clone());
        year
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn list_school_years(&self) -> StoreResult<Vec<SchoolYear>> {
        Ok(self.tables.read().await.school_years_newest_first())
    }

    async fn get_school_year(&self, id: &str) -> StoreResult<Option<SchoolYear>> {
        let tables = self.tables.read().await;
        Ok(tables.school_years.iter().find(|year| year.id == id).cloned())
    }

    async fn active_school_year(&self) -> StoreResult<Option<SchoolYear>> {
        let tables = self.tables.read().await;
        Ok(tables
            .school_years_newest_first()
            .into_iter()
            .find(|year| year.is_active))
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_line_id(&self, line_user_id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.line_user_id == line_user_id)
            .cloned())
    }

    async fn create_user(
        &self,
        line_user_id: &str,
        display_name: Option<String>,
    ) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|user| user.line_user_id == line_user_id) {
            return Err(StoreError::Conflict("LINE user already registered".to_string()));
        }
        let user = User {
            id: new_id(),
            line_user_id: line_user_id.to_string(),
            display_name,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_display_name(&self, user_id: &str, display_name: String) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(user_id)?;
        user.display_name = Some(display_name);
        Ok(user.clone())
    }

    async fn find_profile(
        &self,
        user_id: &str,
        school_year_id: &str,
    ) -> StoreResult<Option<UserYearProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .find(|profile| profile.user_id == user_id && profile.school_year_id == school_year_id)
            .cloned())
    }

    async fn upsert_profile(
        &self,
        user_id: &str,
        school_year_id: &str,
        grade: Grade,
        class_name: Option<String>,
    ) -> StoreResult<UserYearProfile> {
        let mut tables = self.tables.write().await;
        if !tables.school_years.iter().any(|year| year.id == school_year_id) {
            return Err(StoreError::NotFound("school year"));
        }
        tables.user_mut(user_id)?;

        if let Some(profile) = tables
            .profiles
            .iter_mut()
            .find(|profile| profile.user_id == user_id && profile.school_year_id == school_year_id)
        {
            profile.grade = grade;
            profile.class_name = class_name;
            return Ok(profile.clone());
        }

        let profile = UserYearProfile {
            id: new_id(),
            user_id: user_id.to_string(),
            school_year_id: school_year_id.to_string(),
            grade,
            class_name,
        };
        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn list_surveys(&self) -> StoreResult<Vec<Survey>> {
        let tables = self.tables.read().await;
        Ok(tables.surveys.iter().rev().cloned().collect())
    }

    async fn get_survey(&self, id: &str) -> StoreResult<Option<Survey>> {
        let tables = self.tables.read().await;
        Ok(tables.surveys.iter().find(|survey| survey.id == id).cloned())
    }

    async fn latest_survey(&self, school_year_id: &str) -> StoreResult<Option<Survey>> {
        let tables = self.tables.read().await;
        Ok(tables
            .surveys
            .iter()
            .rev()
            .find(|survey| survey.school_year_id == school_year_id)
            .cloned())
    }

    async fn create_survey(&self, survey: NewSurvey) -> StoreResult<Survey> {
        let mut tables = self.tables.write().await;
        if !tables
            .school_years
            .iter()
            .any(|year| year.id == survey.school_year_id)
        {
            return Err(StoreError::NotFound("school year"));
        }

        let mut survey_dates: Vec<SurveyDate> = survey
            .dates
            .into_iter()
            .map(|(date, grade)| SurveyDate {
                id: new_id(),
                date,
                grade,
            })
            .collect();
        survey_dates.sort_by_key(|survey_date| survey_date.date);

        let survey = Survey {
            id: new_id(),
            school_year_id: survey.school_year_id,
            title: survey.title,
            description: survey.description,
            created_at: Utc::now(),
            survey_dates,
        };
        tables.surveys.push(survey.clone());
        Ok(survey)
    }

    async fn list_responses(&self, survey_id: &str) -> StoreResult<Vec<SurveyResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .responses
            .iter()
            .rev()
            .filter(|response| response.survey_id == survey_id)
            .cloned()
            .collect())
    }

    async fn find_response(
        &self,
        survey_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<SurveyResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .responses
            .iter()
            .find(|response| response.survey_id == survey_id && response.user_id == user_id)
            .cloned())
    }

    async fn upsert_response(
        &self,
        survey_id: &str,
        user_id: &str,
        details: Vec<ResponseDetail>,
    ) -> StoreResult<SurveyResponse> {
        let mut tables = self.tables.write().await;
        let survey = tables
            .surveys
            .iter()
            .find(|survey| survey.id == survey_id)
            .ok_or(StoreError::NotFound("survey"))?;
        if let Some(unknown) = details.iter().find(|detail| !survey.has_date(&detail.survey_date_id)) {
            return Err(StoreError::Conflict(format!(
                "Survey date {} does not belong to survey {survey_id}",
                unknown.survey_date_id
            )));
        }
        tables.user_mut(user_id)?;

        if let Some(response) = tables
            .responses
            .iter_mut()
            .find(|response| response.survey_id == survey_id && response.user_id == user_id)
        {
            response.details = details;
            return Ok(response.clone());
        }

        let response = SurveyResponse {
            id: new_id(),
            survey_id: survey_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            details,
        };
        tables.responses.push(response.clone());
        Ok(response)
    }
}
