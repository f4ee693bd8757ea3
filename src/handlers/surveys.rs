// Admin survey API: school years, surveys, responses and CSV export.
// Every handler requires an admin session.
use super::auth::require_admin;
use super::types::{CreateSurveyRequest, ResponseFilterQuery, SurveyView};
use crate::error::AppError;
use crate::export::{self, ResponseFilter};
use crate::models::{parse_survey_date, Grade, NewSurvey, SchoolYear, Survey};
use crate::session::SessionManager;
use crate::store::SurveyStore;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

/// `GET /api/school-years`
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the store fails.
pub async fn list_school_years(
    req: HttpRequest,
    session_manager: web::Data<SessionManager>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &session_manager)?;
    let school_years = store.list_school_years().await?;
    Ok(HttpResponse::Ok().json(school_years))
}

/// `GET /api/surveys`
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the store fails.
pub async fn list_surveys(
    req: HttpRequest,
    session_manager: web::Data<SessionManager>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &session_manager)?;

    let school_years = store.list_school_years().await?;
    let surveys: Vec<SurveyView> = store
        .list_surveys()
        .await?
        .into_iter()
        .map(|survey| with_school_year(survey, &school_years))
        .collect();

    Ok(HttpResponse::Ok().json(surveys))
}

fn with_school_year(survey: Survey, school_years: &[SchoolYear]) -> SurveyView {
    let school_year = school_years
        .iter()
        .find(|year| year.id == survey.school_year_id)
        .cloned();
    SurveyView {
        survey,
        school_year,
    }
}

/// Validate a create request into a store insert
fn validate_new_survey(body: CreateSurveyRequest) -> Result<NewSurvey, AppError> {
    let school_year_id = body
        .school_year_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("年度を選択してください"))?;

    let title = body
        .title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .ok_or_else(|| AppError::bad_request("タイトルを入力してください"))?;

    let inputs = body
        .survey_dates
        .filter(|dates| !dates.is_empty())
        .ok_or_else(|| AppError::bad_request("開催候補日を1つ以上追加してください"))?;

    let mut dates = Vec::with_capacity(inputs.len());
    for input in inputs {
        let raw_date = input
            .date
            .filter(|date| !date.is_empty())
            .ok_or_else(|| AppError::bad_request("候補日の日付を入力してください"))?;
        let date = parse_survey_date(&raw_date)
            .ok_or_else(|| AppError::bad_request("候補日の日付形式が不正です"))?;
        let grade = input
            .grade
            .and_then(|grade| grade.parse::<Grade>().ok())
            .ok_or_else(|| AppError::bad_request("候補日の対象学年を選択してください"))?;
        dates.push((date, grade));
    }

    Ok(NewSurvey {
        school_year_id,
        title,
        description: super::types::non_blank(body.description),
        dates,
    })
}

/// `POST /api/surveys`
///
/// # Errors
///
/// Returns an error if the caller is not an admin, the request is invalid, the
/// school year does not exist or the store fails.
pub async fn create_survey(
    req: HttpRequest,
    body: web::Json<CreateSurveyRequest>,
    session_manager: web::Data<SessionManager>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &session_manager)?;

    let new_survey = validate_new_survey(body.into_inner())?;
    let Some(school_year) = store.get_school_year(&new_survey.school_year_id).await? else {
        return Err(AppError::bad_request("指定された年度が見つかりません"));
    };

    let survey = store.create_survey(new_survey).await?;
    info!(
        "Created survey {} with {} candidate date(s)",
        survey.id,
        survey.survey_dates.len()
    );

    Ok(HttpResponse::Created().json(SurveyView {
        survey,
        school_year: Some(school_year),
    }))
}

/// Load the survey, its school year and the filter shared by the responses views
async fn load_survey_context(
    store: &dyn SurveyStore,
    survey_id: &str,
    query: &ResponseFilterQuery,
) -> Result<(Survey, Option<SchoolYear>, ResponseFilter), AppError> {
    let filter = ResponseFilter::from_query(query.grade.as_deref(), query.class_name.as_deref())
        .map_err(|_| AppError::bad_request("無効な学年が指定されました"))?;

    let survey = store
        .get_survey(survey_id)
        .await?
        .ok_or_else(|| AppError::not_found("指定されたアンケートが見つかりません"))?;
    let school_year = store.get_school_year(&survey.school_year_id).await?;

    Ok((survey, school_year, filter))
}

/// `GET /api/surveys/{survey_id}/responses`
///
/// # Errors
///
/// Returns an error if the caller is not an admin, the grade filter is invalid, the
/// survey does not exist or the store fails.
pub async fn list_responses(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ResponseFilterQuery>,
    session_manager: web::Data<SessionManager>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &session_manager)?;

    let (survey, school_year, filter) =
        load_survey_context(store.get_ref(), &path.into_inner(), &query).await?;
    let rows = export::collect_rows(store.get_ref(), &survey, &filter).await?;

    Ok(HttpResponse::Ok().json(json!({
        "survey": {
            "id": survey.id,
            "title": survey.title,
            "description": survey.description,
            "schoolYear": school_year,
            "surveyDates": survey.survey_dates,
        },
        "responses": rows,
    })))
}

/// `GET /api/surveys/{survey_id}/responses/export`
///
/// # Errors
///
/// Returns an error if the caller is not an admin, the grade filter is invalid, the
/// survey does not exist or the store fails.
pub async fn export_responses(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ResponseFilterQuery>,
    session_manager: web::Data<SessionManager>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &session_manager)?;

    let (survey, school_year, filter) =
        load_survey_context(store.get_ref(), &path.into_inner(), &query).await?;
    let school_year = school_year
        .ok_or_else(|| AppError::internal(format!("Survey {} has no school year", survey.id)))?;

    let rows = export::collect_rows(store.get_ref(), &survey, &filter).await?;
    let csv = export::render_csv(&survey, &rows);
    let filename = export::export_filename(&school_year, &survey);

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            export::content_disposition(&filename),
        ))
        .body(csv))
}
