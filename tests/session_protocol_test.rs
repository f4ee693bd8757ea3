// The edge gatekeeper and the session manager must accept exactly the same cookies
use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::{test, App};
use serde_json::{json, Value};
use std::time::Instant;
use yomikikase::gatekeeper::{GateDecision, LOGIN_PATH};
use yomikikase::session::token::{mint_at, SESSION_MAX_AGE_MS};
use yomikikase::session::{SessionSecret, COOKIE_NAME};
use yomikikase::testing::constants::{TEST_ADMIN_PASSWORD, TEST_ADMIN_USERNAME, TEST_NOW_MS};
use yomikikase::testing::{StubVerifier, TestFixtures};
use yomikikase::{edge_gatekeeper, AppState, EdgeGatekeeper, SessionManager};

const NOW_MS: i64 = TEST_NOW_MS;

fn flip_first(hex: &str) -> String {
    let replacement = if hex.starts_with('0') { "1" } else { "0" };
    format!("{replacement}{}", &hex[1..])
}

fn candidate_cookies() -> Vec<(&'static str, String)> {
    let secret = TestFixtures::secret();
    let valid = mint_at(&secret, NOW_MS);
    let mut parts: Vec<String> = valid.split(':').map(str::to_string).collect();
    let mut tampered_signature = parts.clone();
    tampered_signature[2] = flip_first(&tampered_signature[2]);
    let mut tampered_time = parts.clone();
    tampered_time[1] = (NOW_MS - 1).to_string();
    parts[0] = "0".repeat(64);

    vec![
        ("valid", valid.clone()),
        ("just issued", mint_at(&secret, NOW_MS - 1)),
        ("at max age", mint_at(&secret, NOW_MS - SESSION_MAX_AGE_MS)),
        ("expired", mint_at(&secret, NOW_MS - SESSION_MAX_AGE_MS - 1)),
        ("issued in the future", mint_at(&secret, NOW_MS + 60_000)),
        ("other secret", mint_at(&SessionSecret::new("other").unwrap(), NOW_MS)),
        ("tampered signature", tampered_signature.join(":")),
        ("tampered issuedAt", tampered_time.join(":")),
        ("tampered token", parts.join(":")),
        ("uppercase signature", valid.to_uppercase()),
        ("two parts", valid.rsplitn(2, ':').last().unwrap().to_string()),
        ("four parts", format!("{valid}:extra")),
        ("non-numeric issuedAt", "abc:notanumber:def".to_string()),
        ("leading plus", {
            let p: Vec<&str> = valid.split(':').collect();
            format!("{}:+{}:{}", p[0], p[1], p[2])
        }),
        ("garbage", "not-a-session".to_string()),
        ("empty", String::new()),
    ]
}

#[::core::prelude::v1::test]
fn test_gatekeeper_and_manager_agree() {
    let settings = TestFixtures::settings();
    let clock = TestFixtures::clock();
    let manager = SessionManager::from_settings(&settings).with_clock(clock.clone());
    let gate = EdgeGatekeeper::from_settings(&settings).with_clock(clock);

    for (label, value) in candidate_cookies() {
        let manager_accepts = manager.verify(&value);
        let gate_accepts = gate.decide("/admin", Some(&value)) == GateDecision::Pass;
        assert_eq!(manager_accepts, gate_accepts, "disagreement on {label}");
    }
}

#[::core::prelude::v1::test]
fn test_expected_verdicts() {
    let manager = TestFixtures::session_manager(TestFixtures::clock());

    let accepted: Vec<&str> = candidate_cookies()
        .iter()
        .filter(|(_, value)| manager.verify(value))
        .map(|(label, _)| *label)
        .collect();
    assert_eq!(
        accepted,
        vec!["valid", "just issued", "at max age", "issued in the future"]
    );
}

#[::core::prelude::v1::test]
fn test_missing_secret_rejects_everything() {
    let settings = TestFixtures::settings_without_secret();
    let clock = TestFixtures::clock();
    let manager = SessionManager::from_settings(&settings).with_clock(clock.clone());
    let gate = EdgeGatekeeper::from_settings(&settings).with_clock(clock);

    assert!(manager.mint().is_err());
    for (label, value) in candidate_cookies() {
        assert!(!manager.verify(&value), "manager accepted {label}");
        assert_ne!(
            gate.decide("/admin", Some(&value)),
            GateDecision::Pass,
            "gatekeeper accepted {label}"
        );
    }
}

macro_rules! init_app {
    ($state:expr) => {{
        let state: AppState = $state;
        test::init_service(
            App::new()
                .wrap(from_fn(edge_gatekeeper))
                .configure(move |cfg| state.configure(cfg)),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_session_lifecycle_through_app() {
    let clock = TestFixtures::clock();
    let (store, _) = TestFixtures::store().await;
    let app = init_app!(TestFixtures::state(store, StubVerifier::new(), clock.clone()));

    // Unauthenticated: pages redirect, login page and APIs stay reachable
    let req = test::TestRequest::get().uri("/admin").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get("Location").unwrap(), LOGIN_PATH);

    let req = test::TestRequest::get().uri("/admin/login").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": TEST_ADMIN_USERNAME, "password": TEST_ADMIN_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == COOKIE_NAME)
        .unwrap()
        .into_owned();

    // Fresh cookie passes both checks
    let req = test::TestRequest::get()
        .uri("/admin")
        .cookie(cookie.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/auth/session")
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["authenticated"], true);

    // One millisecond past the lifetime both checks refuse it
    clock.advance(SESSION_MAX_AGE_MS + 1);

    let req = test::TestRequest::get()
        .uri("/admin")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let cleared = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == COOKIE_NAME)
        .expect("stale cookie is cleared");
    assert_eq!(cleared.value(), "");

    let req = test::TestRequest::get()
        .uri("/api/auth/session")
        .cookie(cookie)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["authenticated"], false);
}

#[actix_web::test]
async fn test_percent_encoded_admin_path_is_gated() {
    let (store, _) = TestFixtures::store().await;
    let app = init_app!(TestFixtures::state(
        store,
        StubVerifier::new(),
        TestFixtures::clock()
    ));

    for uri in ["/%61dmin", "/adm%69n", "/%61%64%6d%69%6e"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri} was served");
        assert_eq!(resp.headers().get("Location").unwrap(), LOGIN_PATH);
    }

    // A forged cookie on an encoded path is still cleared
    let req = test::TestRequest::get()
        .uri("/%61dmin")
        .cookie(actix_web::cookie::Cookie::new(COOKIE_NAME, "a:1:b"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(resp
        .response()
        .cookies()
        .any(|cookie| cookie.name() == COOKIE_NAME && cookie.value().is_empty()));
}

fn with_byte_changed(signature: &str, index: usize) -> String {
    let mut bytes = signature.as_bytes().to_vec();
    bytes[index] = if bytes[index] == b'0' { b'1' } else { b'0' };
    String::from_utf8(bytes).unwrap()
}

#[::core::prelude::v1::test]
#[ignore = "timing measurement; run explicitly"]
fn test_signature_check_time_is_flat() {
    let manager = TestFixtures::session_manager(TestFixtures::clock());
    let valid = mint_at(&TestFixtures::secret(), NOW_MS);
    let (prefix, signature) = valid.rsplit_once(':').unwrap();

    let candidates = [
        ("early mismatch", with_byte_changed(signature, 0)),
        ("late mismatch", with_byte_changed(signature, signature.len() - 1)),
        ("truncated", signature[..signature.len() - 1].to_string()),
        ("extended", format!("{signature}0")),
    ];

    let timings: Vec<(&str, f64)> = candidates
        .iter()
        .map(|(label, candidate)| {
            let value = format!("{prefix}:{candidate}");
            let start = Instant::now();
            for _ in 0..20_000 {
                assert!(!manager.verify(&value));
            }
            (*label, start.elapsed().as_secs_f64())
        })
        .collect();

    let fastest = timings.iter().map(|(_, t)| *t).fold(f64::INFINITY, f64::min);
    let slowest = timings.iter().map(|(_, t)| *t).fold(0.0, f64::max);
    assert!(slowest / fastest < 1.5, "timings diverge: {timings:?}");
}
