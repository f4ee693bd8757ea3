//! Survey response reporting
//!
//! Builds the per-user rows shown by the responses API and renders the same rows
//! as a spreadsheet-friendly CSV download.

use crate::models::{Grade, ResponseStatus, SchoolYear, Survey, User, UNNAMED_USER};
use crate::store::{StoreResult, SurveyStore};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Byte order mark so spreadsheet apps detect UTF-8
const UTF8_BOM: char = '\u{feff}';

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static FILENAME_RESERVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|]"#).expect("reserved character pattern is valid"));

/// Grade and class filters shared by the responses view and the export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFilter {
    pub grade: Option<Grade>,
    pub class_name: Option<String>,
}

impl ResponseFilter {
    /// Build from raw query values; empty values mean "no filter"
    ///
    /// # Errors
    ///
    /// Returns an error if `grade` is not a known grade.
    pub fn from_query(grade: Option<&str>, class_name: Option<&str>) -> Result<Self, String> {
        let grade = match grade.filter(|value| !value.is_empty()) {
            Some(value) => Some(value.parse::<Grade>()?),
            None => None,
        };
        Ok(Self {
            grade,
            class_name: class_name
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }

    fn matches(&self, row: &ResponseRow) -> bool {
        if self.grade.is_some() && row.grade != self.grade {
            return false;
        }
        if self.class_name.is_some() && row.class_name != self.class_name {
            return false;
        }
        true
    }
}

/// Answer for one survey date, `None` when the user skipped it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateStatus {
    pub survey_date_id: String,
    pub date: NaiveDate,
    pub grade: Grade,
    pub status: Option<ResponseStatus>,
}

/// One respondent with their grade/class for the survey's school year
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRow {
    pub response_id: String,
    pub user_id: String,
    pub user_name: String,
    pub grade: Option<Grade>,
    pub class_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub date_statuses: Vec<DateStatus>,
}

/// Collect the filtered rows for a survey, newest response first
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn collect_rows(
    store: &dyn SurveyStore,
    survey: &Survey,
    filter: &ResponseFilter,
) -> StoreResult<Vec<ResponseRow>> {
    let mut rows = Vec::new();

    for response in store.list_responses(&survey.id).await? {
        let user = store.get_user(&response.user_id).await?;
        let profile = store
            .find_profile(&response.user_id, &survey.school_year_id)
            .await?;

        let date_statuses = survey
            .survey_dates
            .iter()
            .map(|survey_date| DateStatus {
                survey_date_id: survey_date.id.clone(),
                date: survey_date.date,
                grade: survey_date.grade,
                status: response.status_for(&survey_date.id),
            })
            .collect();

        let user_name = user
            .as_ref()
            .map_or(UNNAMED_USER, User::name_or_placeholder)
            .to_string();

        let row = ResponseRow {
            response_id: response.id.clone(),
            user_id: response.user_id.clone(),
            user_name,
            grade: profile.as_ref().map(|profile| profile.grade),
            class_name: profile
                .and_then(|profile| profile.class_name)
                .filter(|class_name| !class_name.is_empty()),
            created_at: response.created_at,
            date_statuses,
        };

        if filter.matches(&row) {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Quote a CSV field when it contains a comma, quote or newline
#[must_use]
pub fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render rows as CSV with a leading BOM and `\n` line endings
#[must_use]
pub fn render_csv(survey: &Survey, rows: &[ResponseRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);

    let mut header = vec![
        escape_csv("user_name"),
        escape_csv("grade"),
        escape_csv("class_name"),
    ];
    header.extend(survey.survey_dates.iter().map(|survey_date| {
        escape_csv(&format!(
            "{}_{}",
            survey_date.date.format("%Y-%m-%d"),
            survey_date.grade.label()
        ))
    }));
    lines.push(header.join(","));

    for row in rows {
        let mut values = vec![
            escape_csv(&row.user_name),
            escape_csv(row.grade.map_or("", Grade::label)),
            escape_csv(row.class_name.as_deref().unwrap_or("")),
        ];
        values.extend(
            row.date_statuses
                .iter()
                .map(|date_status| escape_csv(date_status.status.map_or("", ResponseStatus::label))),
        );
        lines.push(values.join(","));
    }

    let mut csv = String::new();
    csv.push(UTF8_BOM);
    csv.push_str(&lines.join("\n"));
    csv
}

fn sanitize_filename_part(value: &str) -> String {
    let underscored = WHITESPACE_RUN.replace_all(value, "_");
    FILENAME_RESERVED.replace_all(&underscored, "").into_owned()
}

/// `<school year>_<title>_responses.csv`
#[must_use]
pub fn export_filename(school_year: &SchoolYear, survey: &Survey) -> String {
    format!(
        "{}_{}_responses.csv",
        sanitize_filename_part(&school_year.name),
        sanitize_filename_part(&survey.title)
    )
}

/// `Content-Disposition` value with a percent-encoded filename
#[must_use]
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"",
        urlencoding::encode(filename)
    )
}
