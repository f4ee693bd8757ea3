use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Placeholder shown for users without a display name
pub const UNNAMED_USER: &str = "(名前なし)";

/// Fresh record identifier
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Kindergarten grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    Junior,
    Middle,
    Senior,
}

impl Grade {
    /// Label used in exports
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Grade::Junior => "年少",
            Grade::Middle => "年中",
            Grade::Senior => "年長",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Junior => "JUNIOR",
            Grade::Middle => "MIDDLE",
            Grade::Senior => "SENIOR",
        }
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JUNIOR" => Ok(Grade::Junior),
            "MIDDLE" => Ok(Grade::Middle),
            "SENIOR" => Ok(Grade::Senior),
            other => Err(format!("Invalid grade: {other}")),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability answer for one candidate date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Available,
    Unavailable,
}

impl ResponseStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ResponseStatus::Available => "○",
            ResponseStatus::Unavailable => "×",
        }
    }
}

impl FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(ResponseStatus::Available),
            "UNAVAILABLE" => Ok(ResponseStatus::Unavailable),
            other => Err(format!("Invalid response status: {other}")),
        }
    }
}

/// Parent identified by their LINE account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub line_user_id: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display name, or the placeholder when unset or blank
    #[must_use]
    pub fn name_or_placeholder(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNNAMED_USER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYear {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// A user's grade and class for one school year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserYearProfile {
    pub id: String,
    pub user_id: String,
    pub school_year_id: String,
    pub grade: Grade,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDate {
    pub id: String,
    pub date: NaiveDate,
    pub grade: Grade,
}

/// Scheduling survey; `survey_dates` are kept in ascending date order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub school_year_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub survey_dates: Vec<SurveyDate>,
}

impl Survey {
    #[must_use]
    pub fn has_date(&self, survey_date_id: &str) -> bool {
        self.survey_dates.iter().any(|date| date.id == survey_date_id)
    }
}

/// Answer for one candidate date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    pub survey_date_id: String,
    pub status: ResponseStatus,
}

/// One user's answers to one survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: String,
    pub survey_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub details: Vec<ResponseDetail>,
}

impl SurveyResponse {
    #[must_use]
    pub fn status_for(&self, survey_date_id: &str) -> Option<ResponseStatus> {
        self.details
            .iter()
            .find(|detail| detail.survey_date_id == survey_date_id)
            .map(|detail| detail.status)
    }
}

/// Input for creating a survey
#[derive(Debug, Clone)]
pub struct NewSurvey {
    pub school_year_id: String,
    pub title: String,
    pub description: Option<String>,
    pub dates: Vec<(NaiveDate, Grade)>,
}

/// Parse a survey date given as `YYYY-MM-DD` or an RFC 3339 timestamp
#[must_use]
pub fn parse_survey_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_wire_format() {
        assert_eq!(serde_json::to_string(&Grade::Junior).unwrap(), "\"JUNIOR\"");
        assert_eq!(
            serde_json::from_str::<Grade>("\"SENIOR\"").unwrap(),
            Grade::Senior
        );
        assert!(serde_json::from_str::<Grade>("\"senior\"").is_err());
        assert_eq!("MIDDLE".parse::<Grade>().unwrap(), Grade::Middle);
        assert!("ELDEST".parse::<Grade>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Grade::Junior.label(), "年少");
        assert_eq!(Grade::Middle.label(), "年中");
        assert_eq!(Grade::Senior.label(), "年長");
        assert_eq!(ResponseStatus::Available.label(), "○");
        assert_eq!(ResponseStatus::Unavailable.label(), "×");
    }

    #[test]
    fn test_parse_survey_date() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        assert_eq!(parse_survey_date("2025-06-14"), Some(expected));
        assert_eq!(parse_survey_date("2025-06-14T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_survey_date("2025-06-14T08:00:00+09:00"), Some(
            NaiveDate::from_ymd_opt(2025, 6, 13).unwrap()
        ));
        assert_eq!(parse_survey_date("2025-02-30"), None);
        assert_eq!(parse_survey_date("next tuesday"), None);
    }

    #[test]
    fn test_name_placeholder() {
        let mut user = User {
            id: new_id(),
            line_user_id: "U1".to_string(),
            display_name: None,
            created_at: Utc::now(),
        };
        assert_eq!(user.name_or_placeholder(), UNNAMED_USER);
        user.display_name = Some("Hanako".to_string());
        assert_eq!(user.name_or_placeholder(), "Hanako");
    }

    #[test]
    fn test_survey_serializes_camel_case() {
        let survey = Survey {
            id: "s1".to_string(),
            school_year_id: "y1".to_string(),
            title: "Reading day".to_string(),
            description: None,
            created_at: Utc::now(),
            survey_dates: vec![SurveyDate {
                id: "d1".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
                grade: Grade::Junior,
            }],
        };
        let value = serde_json::to_value(&survey).unwrap();
        assert_eq!(value["schoolYearId"], "y1");
        assert_eq!(value["surveyDates"][0]["date"], "2025-06-14");
        assert_eq!(value["surveyDates"][0]["grade"], "JUNIOR");
    }
}
