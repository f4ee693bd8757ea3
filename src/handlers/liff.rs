// LIFF API: parents identified by a LINE ID token register a profile for the
// active school year and answer its latest survey.
use super::types::{
    non_blank, IdTokenQuery, LiffAuthRequest, ProfileRequest, ProfileView, ResponseDetailInput,
    SchoolYearRef, SubmitResponseRequest,
};
use crate::error::AppError;
use crate::line::{IdTokenVerifier, LineUserInfo};
use crate::models::{Grade, ResponseDetail, ResponseStatus, SchoolYear, User};
use crate::store::{StoreError, SurveyStore};
use actix_web::{web, HttpResponse};
use log::{info, warn};
use serde_json::json;
use std::collections::HashSet;

fn require_id_token(id_token: Option<String>) -> Result<String, AppError> {
    id_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::bad_request("IDトークンが必要です"))
}

/// Verify the ID token, mapping every failure to a generic 401
async fn verify_line_user(
    verifier: &dyn IdTokenVerifier,
    id_token: &str,
) -> Result<LineUserInfo, AppError> {
    verifier.verify(id_token).await.map_err(|e| {
        warn!("LINE ID token verification failed: {e}");
        AppError::authentication_failed()
    })
}

async fn find_user(store: &dyn SurveyStore, line_user: &LineUserInfo) -> Result<User, AppError> {
    store
        .find_user_by_line_id(&line_user.line_user_id)
        .await?
        .ok_or_else(|| AppError::not_found("ユーザーが見つかりません"))
}

/// Look up the LINE user, registering them on first sight. A concurrent first
/// sign-in may win the insert; the loser then reads the winner's row. The flag is
/// true only when this call created the user.
async fn find_or_create_user(
    store: &dyn SurveyStore,
    line_user: &LineUserInfo,
    display_name: Option<String>,
) -> Result<(User, bool), AppError> {
    if let Some(user) = store.find_user_by_line_id(&line_user.line_user_id).await? {
        return Ok((user, false));
    }
    match store.create_user(&line_user.line_user_id, display_name).await {
        Ok(user) => {
            info!("Registered new LINE user {}", user.id);
            Ok((user, true))
        }
        Err(StoreError::Conflict(reason)) => {
            info!("LINE user registered concurrently, reusing existing row");
            store
                .find_user_by_line_id(&line_user.line_user_id)
                .await?
                .map(|user| (user, false))
                .ok_or_else(|| StoreError::Conflict(reason).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn current_profile(
    store: &dyn SurveyStore,
    user: &User,
    active_year: Option<&SchoolYear>,
) -> Result<Option<ProfileView>, AppError> {
    let Some(year) = active_year else {
        return Ok(None);
    };
    Ok(store
        .find_profile(&user.id, &year.id)
        .await?
        .map(|profile| ProfileView::new(profile, year)))
}

/// `POST /api/liff/auth`
///
/// # Errors
///
/// Returns an error if the ID token is missing (400), fails verification (401) or
/// the store fails.
pub async fn authenticate(
    body: web::Json<LiffAuthRequest>,
    verifier: web::Data<dyn IdTokenVerifier>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    let id_token = require_id_token(body.into_inner().id_token)?;
    let line_user = verify_line_user(verifier.get_ref(), &id_token).await?;

    let (user, is_new_user) =
        find_or_create_user(store.get_ref(), &line_user, line_user.display_name.clone()).await?;

    let active_year = store.active_school_year().await?;
    let profile = current_profile(store.get_ref(), &user, active_year.as_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "userId": user.id,
        "displayName": user.display_name,
        "isNewUser": is_new_user,
        "hasCurrentYearProfile": profile.is_some(),
        "activeSchoolYearId": active_year.map(|year| year.id),
        "profile": profile,
    })))
}

/// `GET /api/liff/profile?idToken=`
///
/// # Errors
///
/// Returns an error if the ID token is missing (400), fails verification (401), the
/// user is unknown (404) or the store fails.
pub async fn get_profile(
    query: web::Query<IdTokenQuery>,
    verifier: web::Data<dyn IdTokenVerifier>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    let id_token = require_id_token(query.into_inner().id_token)?;
    let line_user = verify_line_user(verifier.get_ref(), &id_token).await?;
    let user = find_user(store.get_ref(), &line_user).await?;

    let active_year = store.active_school_year().await?;
    let profile = current_profile(store.get_ref(), &user, active_year.as_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "userId": user.id,
        "displayName": user.display_name,
        "profile": profile,
    })))
}

/// `POST /api/liff/profile`
///
/// # Errors
///
/// Returns an error if a field is missing or invalid (400), the ID token fails
/// verification (401), no school year is active (400) or the store fails.
pub async fn save_profile(
    body: web::Json<ProfileRequest>,
    verifier: web::Data<dyn IdTokenVerifier>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let id_token = require_id_token(body.id_token)?;
    let display_name = non_blank(body.display_name)
        .ok_or_else(|| AppError::bad_request("名前を入力してください"))?;
    let grade = body
        .grade
        .and_then(|grade| grade.parse::<Grade>().ok())
        .ok_or_else(|| AppError::bad_request("学年を選択してください"))?;
    let class_name = non_blank(body.class_name);

    let line_user = verify_line_user(verifier.get_ref(), &id_token).await?;

    let active_year = store
        .active_school_year()
        .await?
        .ok_or_else(|| AppError::bad_request("現在アクティブな年度がありません"))?;

    let user = match find_or_create_user(store.get_ref(), &line_user, Some(display_name.clone()))
        .await?
    {
        (user, true) => user,
        (user, false) => store.update_display_name(&user.id, display_name).await?,
    };

    let profile = store
        .upsert_profile(&user.id, &active_year.id, grade, class_name)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "userId": user.id,
        "displayName": user.display_name,
        "profile": ProfileView::new(profile, &active_year),
    })))
}

/// `GET /api/liff/survey?idToken=`
///
/// # Errors
///
/// Returns an error if the ID token is missing (400), fails verification (401), the
/// user is unknown (404), has no profile for the active year (400) or the store fails.
pub async fn get_survey(
    query: web::Query<IdTokenQuery>,
    verifier: web::Data<dyn IdTokenVerifier>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    let id_token = require_id_token(query.into_inner().id_token)?;
    let line_user = verify_line_user(verifier.get_ref(), &id_token).await?;
    let user = find_user(store.get_ref(), &line_user).await?;

    let empty = json!({ "survey": null, "existingResponse": null });

    let Some(active_year) = store.active_school_year().await? else {
        return Ok(HttpResponse::Ok().json(empty));
    };

    if store.find_profile(&user.id, &active_year.id).await?.is_none() {
        return Err(AppError::bad_request("プロフィールを登録してください"));
    }

    let Some(survey) = store.latest_survey(&active_year.id).await? else {
        return Ok(HttpResponse::Ok().json(empty));
    };

    let existing_response = store
        .find_response(&survey.id, &user.id)
        .await?
        .map(|response| {
            json!({
                "id": response.id,
                "responseDetails": response.details,
            })
        });

    Ok(HttpResponse::Ok().json(json!({
        "survey": {
            "id": survey.id,
            "title": survey.title,
            "description": survey.description,
            "schoolYear": SchoolYearRef::from(&active_year),
            "surveyDates": survey.survey_dates,
        },
        "existingResponse": existing_response,
    })))
}

/// Parse submitted answers, rejecting blanks and unknown statuses
fn parse_details(
    inputs: Option<Vec<ResponseDetailInput>>,
) -> Result<Vec<ResponseDetail>, AppError> {
    let inputs = inputs
        .filter(|details| !details.is_empty())
        .ok_or_else(|| AppError::bad_request("回答を入力してください"))?;

    inputs
        .into_iter()
        .map(|input| {
            let survey_date_id = input
                .survey_date_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| AppError::bad_request("候補日IDが不正です"))?;
            let status = input
                .status
                .and_then(|status| status.parse::<ResponseStatus>().ok())
                .ok_or_else(|| AppError::bad_request("回答ステータスが不正です"))?;
            Ok(ResponseDetail {
                survey_date_id,
                status,
            })
        })
        .collect()
}

/// `POST /api/liff/survey`
///
/// # Errors
///
/// Returns an error if the request is invalid (400), the ID token fails verification
/// (401), the user or survey is unknown (404), the survey's year is closed (400),
/// the answers do not cover every candidate date exactly once (400) or the store fails.
pub async fn submit_survey(
    body: web::Json<SubmitResponseRequest>,
    verifier: web::Data<dyn IdTokenVerifier>,
    store: web::Data<dyn SurveyStore>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let id_token = require_id_token(body.id_token)?;
    let survey_id = body
        .survey_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("アンケートIDが必要です"))?;
    let details = parse_details(body.response_details)?;

    let line_user = verify_line_user(verifier.get_ref(), &id_token).await?;
    let user = find_user(store.get_ref(), &line_user).await?;

    let survey = store
        .get_survey(&survey_id)
        .await?
        .ok_or_else(|| AppError::not_found("アンケートが見つかりません"))?;

    let year_is_active = store
        .get_school_year(&survey.school_year_id)
        .await?
        .is_some_and(|year| year.is_active);
    if !year_is_active {
        return Err(AppError::bad_request("このアンケートの年度は終了しています"));
    }

    if details.iter().any(|detail| !survey.has_date(&detail.survey_date_id)) {
        return Err(AppError::bad_request("無効な候補日IDが含まれています"));
    }

    let answered: HashSet<&str> = details
        .iter()
        .map(|detail| detail.survey_date_id.as_str())
        .collect();
    let answers_every_date = details.len() == survey.survey_dates.len()
        && survey
            .survey_dates
            .iter()
            .all(|survey_date| answered.contains(survey_date.id.as_str()));
    if !answers_every_date {
        return Err(AppError::bad_request("すべての候補日について回答してください"));
    }

    let response = store.upsert_response(&survey.id, &user.id, details).await?;
    info!("Saved response {} for survey {}", response.id, survey.id);

    let response_details: Vec<_> = response
        .details
        .iter()
        .filter_map(|detail| {
            survey
                .survey_dates
                .iter()
                .find(|survey_date| survey_date.id == detail.survey_date_id)
                .map(|survey_date| {
                    json!({
                        "surveyDateId": detail.survey_date_id,
                        "date": survey_date.date,
                        "grade": survey_date.grade,
                        "status": detail.status,
                    })
                })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "message": "Response submitted",
        "response": {
            "id": response.id,
            "responseDetails": response_details,
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewSurvey, Survey, SurveyResponse, UserYearProfile};
    use crate::store::{MemoryStore, StoreResult};
    use crate::testing::{StubVerifier, TestFixtures};
    use actix_web::body::to_bytes;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Store whose first user lookup misses, as if another request registered the
    /// LINE user between our lookup and our insert
    struct LateRegistrationStore {
        inner: Arc<MemoryStore>,
        miss_next_lookup: AtomicBool,
    }

    #[async_trait]
    impl SurveyStore for LateRegistrationStore {
        async fn list_school_years(&self) -> StoreResult<Vec<SchoolYear>> {
            self.inner.list_school_years().await
        }

        async fn get_school_year(&self, id: &str) -> StoreResult<Option<SchoolYear>> {
            self.inner.get_school_year(id).await
        }

        async fn active_school_year(&self) -> StoreResult<Option<SchoolYear>> {
            self.inner.active_school_year().await
        }

        async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
            self.inner.get_user(id).await
        }

        async fn find_user_by_line_id(&self, line_user_id: &str) -> StoreResult<Option<User>> {
            if self.miss_next_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_user_by_line_id(line_user_id).await
        }

        async fn create_user(
            &self,
            line_user_id: &str,
            display_name: Option<String>,
        ) -> StoreResult<User> {
            self.inner.create_user(line_user_id, display_name).await
        }

        async fn update_display_name(
            &self,
            user_id: &str,
            display_name: String,
        ) -> StoreResult<User> {
            self.inner.update_display_name(user_id, display_name).await
        }

        async fn find_profile(
            &self,
            user_id: &str,
            school_year_id: &str,
        ) -> StoreResult<Option<UserYearProfile>> {
            self.inner.find_profile(user_id, school_year_id).await
        }

        async fn upsert_profile(
            &self,
            user_id: &str,
            school_year_id: &str,
            grade: Grade,
            class_name: Option<String>,
        ) -> StoreResult<UserYearProfile> {
            self.inner
                .upsert_profile(user_id, school_year_id, grade, class_name)
                .await
        }

        async fn list_surveys(&self) -> StoreResult<Vec<Survey>> {
            self.inner.list_surveys().await
        }

        async fn get_survey(&self, id: &str) -> StoreResult<Option<Survey>> {
            self.inner.get_survey(id).await
        }

        async fn latest_survey(&self, school_year_id: &str) -> StoreResult<Option<Survey>> {
            self.inner.latest_survey(school_year_id).await
        }

        async fn create_survey(&self, survey: NewSurvey) -> StoreResult<Survey> {
            self.inner.create_survey(survey).await
        }

        async fn list_responses(&self, survey_id: &str) -> StoreResult<Vec<SurveyResponse>> {
            self.inner.list_responses(survey_id).await
        }

        async fn find_response(
            &self,
            survey_id: &str,
            user_id: &str,
        ) -> StoreResult<Option<SurveyResponse>> {
            self.inner.find_response(survey_id, user_id).await
        }

        async fn upsert_response(
            &self,
            survey_id: &str,
            user_id: &str,
            details: Vec<ResponseDetail>,
        ) -> StoreResult<SurveyResponse> {
            self.inner.upsert_response(survey_id, user_id, details).await
        }
    }

    async fn late_registration(
        line_user_id: &str,
    ) -> (Arc<MemoryStore>, User, web::Data<dyn SurveyStore>) {
        let (inner, _year) = TestFixtures::store().await;
        let existing = inner
            .create_user(line_user_id, Some("first tab".to_string()))
            .await
            .unwrap();
        let store: Arc<dyn SurveyStore> = Arc::new(LateRegistrationStore {
            inner: inner.clone(),
            miss_next_lookup: AtomicBool::new(true),
        });
        (inner, existing, web::Data::from(store))
    }

    fn verifier() -> web::Data<dyn IdTokenVerifier> {
        let verifier: Arc<dyn IdTokenVerifier> = Arc::new(
            StubVerifier::new().with_user("id-token", "U-racer", Some("second tab")),
        );
        web::Data::from(verifier)
    }

    async fn json_body(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_auth_reuses_user_registered_concurrently() {
        let (inner, existing, store) = late_registration("U-racer").await;

        let response = authenticate(
            web::Json(LiffAuthRequest {
                id_token: Some("id-token".to_string()),
            }),
            verifier(),
            store,
        )
        .await
        .unwrap();

        assert!(response.status().is_success());
        let body = json_body(response).await;
        assert_eq!(body["userId"], existing.id.as_str());
        assert_eq!(body["isNewUser"], false);
        assert_eq!(
            inner.find_user_by_line_id("U-racer").await.unwrap().unwrap().id,
            existing.id
        );
    }

    #[actix_web::test]
    async fn test_profile_save_reuses_user_registered_concurrently() {
        let (inner, existing, store) = late_registration("U-racer").await;

        let response = save_profile(
            web::Json(ProfileRequest {
                id_token: Some("id-token".to_string()),
                display_name: Some("やまだ はなこ".to_string()),
                grade: Some("SENIOR".to_string()),
                class_name: None,
            }),
            verifier(),
            store,
        )
        .await
        .unwrap();

        assert!(response.status().is_success());
        let body = json_body(response).await;
        assert_eq!(body["userId"], existing.id.as_str());
        assert_eq!(body["displayName"], "やまだ はなこ");
        let stored = inner.get_user(&existing.id).await.unwrap().unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("やまだ はなこ"));
    }
}
