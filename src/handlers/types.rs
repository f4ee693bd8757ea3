// Request and response shapes shared across handlers
use crate::models::{Grade, SchoolYear, Survey, UserYearProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurveyDateInput {
    pub date: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSurveyRequest {
    pub school_year_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub survey_dates: Option<Vec<SurveyDateInput>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseFilterQuery {
    pub grade: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdTokenQuery {
    pub id_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LiffAuthRequest {
    pub id_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileRequest {
    pub id_token: Option<String>,
    pub display_name: Option<String>,
    pub grade: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseDetailInput {
    pub survey_date_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub id_token: Option<String>,
    pub survey_id: Option<String>,
    pub response_details: Option<Vec<ResponseDetailInput>>,
}

/// Survey with its school year embedded
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyView {
    #[serde(flatten)]
    pub survey: Survey,
    pub school_year: Option<SchoolYear>,
}

#[derive(Debug, Serialize)]
pub struct SchoolYearRef {
    pub id: String,
    pub name: String,
}

impl From<&SchoolYear> for SchoolYearRef {
    fn from(year: &SchoolYear) -> Self {
        Self {
            id: year.id.clone(),
            name: year.name.clone(),
        }
    }
}

/// Profile as returned to LIFF clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub grade: Grade,
    pub class_name: Option<String>,
    pub school_year: SchoolYearRef,
}

impl ProfileView {
    #[must_use]
    pub fn new(profile: UserYearProfile, school_year: &SchoolYear) -> Self {
        Self {
            id: profile.id,
            grade: profile.grade,
            class_name: profile.class_name,
            school_year: SchoolYearRef::from(school_year),
        }
    }
}

/// Trim a text field, treating blank as absent
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
