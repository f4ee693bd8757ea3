// LINE mini-app flow end to end: a parent registers, answers, changes their mind,
// and the admin sees the latest answers
use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::{test, App};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;
use yomikikase::models::{Grade, NewSurvey};
use yomikikase::session::COOKIE_NAME;
use yomikikase::store::{MemoryStore, SurveyStore};
use yomikikase::testing::constants::{TEST_ADMIN_PASSWORD, TEST_ADMIN_USERNAME};
use yomikikase::testing::{StubVerifier, TestFixtures};
use yomikikase::{edge_gatekeeper, AppState, YomikikaseSettings};

const LIFF_ID: &str = "2000000000-abcdefgh";

fn line_users() -> StubVerifier {
    StubVerifier::new().with_user("id-token-mother", "U-mother", Some("LINE name"))
}

fn settings() -> YomikikaseSettings {
    let mut settings = TestFixtures::settings();
    settings.line.liff_id = Some(LIFF_ID.to_string());
    settings
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[actix_web::test]
async fn test_parent_answers_and_admin_sees_latest() {
    let (store, year) = TestFixtures::store().await;
    // Only the newest survey of the active year is offered
    store
        .create_survey(NewSurvey {
            school_year_id: year.id.clone(),
            title: "May".to_string(),
            description: None,
            dates: vec![(date(2025, 5, 8), Grade::Middle)],
        })
        .await
        .unwrap();
    let june = store
        .create_survey(NewSurvey {
            school_year_id: year.id.clone(),
            title: "June".to_string(),
            description: None,
            dates: vec![
                (date(2025, 6, 5), Grade::Junior),
                (date(2025, 6, 12), Grade::Senior),
            ],
        })
        .await
        .unwrap();

    let state = AppState::with_components(settings(), store.clone(), Arc::new(line_users()));
    let app = test::init_service(
        App::new()
            .wrap(from_fn(edge_gatekeeper))
            .configure(move |cfg| state.configure(cfg)),
    )
    .await;

    // The mini-app bootstraps from the public config endpoint
    let req = test::TestRequest::get().uri("/api/config").to_request();
    let config: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(config["liffId"], LIFF_ID);

    let req = test::TestRequest::post()
        .uri("/api/liff/auth")
        .set_json(json!({ "idToken": "id-token-mother" }))
        .to_request();
    let auth: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(auth["isNewUser"], true);
    assert_eq!(auth["activeSchoolYearId"], year.id.as_str());

    let req = test::TestRequest::post()
        .uri("/api/liff/profile")
        .set_json(json!({
            "idToken": "id-token-mother",
            "displayName": "Yamada",
            "grade": "MIDDLE",
            "className": "さくら",
        }))
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["userId"], auth["userId"]);
    assert_eq!(profile["displayName"], "Yamada");

    let req = test::TestRequest::get()
        .uri("/api/liff/survey?idToken=id-token-mother")
        .to_request();
    let offered: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(offered["survey"]["id"], june.id.as_str());
    assert_eq!(offered["survey"]["schoolYear"]["name"], "2025年度");

    let dates = offered["survey"]["surveyDates"].as_array().unwrap().clone();
    let submit = |first: &str, second: &str| {
        test::TestRequest::post()
            .uri("/api/liff/survey")
            .set_json(json!({
                "idToken": "id-token-mother",
                "surveyId": june.id,
                "responseDetails": [
                    { "surveyDateId": dates[1]["id"], "status": second },
                    { "surveyDateId": dates[0]["id"], "status": first },
                ],
            }))
            .to_request()
    };

    let first: Value = test::call_and_read_body_json(&app, submit("AVAILABLE", "AVAILABLE")).await;
    let second: Value =
        test::call_and_read_body_json(&app, submit("UNAVAILABLE", "AVAILABLE")).await;
    assert_eq!(first["response"]["id"], second["response"]["id"]);

    let responses = store.list_responses(&june.id).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].details.len(), 2);

    // Admin view reflects the replaced answers
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": TEST_ADMIN_USERNAME, "password": TEST_ADMIN_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == COOKIE_NAME)
        .unwrap()
        .into_owned();

    let req = test::TestRequest::get()
        .uri(&format!("/api/surveys/{}/responses", june.id))
        .cookie(cookie)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let row = &body["responses"][0];
    assert_eq!(row["userName"], "Yamada");
    assert_eq!(row["grade"], "MIDDLE");
    assert_eq!(row["className"], "さくら");
    assert_eq!(row["dateStatuses"][0]["status"], "UNAVAILABLE");
    assert_eq!(row["dateStatuses"][1]["status"], "AVAILABLE");
}

#[actix_web::test]
async fn test_no_active_year_offers_nothing() {
    let store = Arc::new(MemoryStore::new());
    store
        .add_school_year("2024年度", date(2024, 4, 1), date(2025, 3, 31), false)
        .await;
    let state = AppState::with_components(settings(), store, Arc::new(line_users()));
    let app = test::init_service(
        App::new()
            .wrap(from_fn(edge_gatekeeper))
            .configure(move |cfg| state.configure(cfg)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/liff/auth")
        .set_json(json!({ "idToken": "id-token-mother" }))
        .to_request();
    let auth: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(auth["activeSchoolYearId"], Value::Null);
    assert_eq!(auth["hasCurrentYearProfile"], false);

    let req = test::TestRequest::post()
        .uri("/api/liff/profile")
        .set_json(json!({ "idToken": "id-token-mother", "displayName": "Yamada", "grade": "MIDDLE" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::get()
        .uri("/api/liff/survey?idToken=id-token-mother")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "survey": null, "existingResponse": null }));
}
