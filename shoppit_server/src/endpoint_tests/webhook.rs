//! Middleware-level tests: the Wave HMAC gate and the JWT/ACL pair.

use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App, HttpResponse};
use shop_common::Secret;
use shoppit_engine::db_types::Role;

use crate::{
    auth::TokenIssuer,
    config::AuthConfig,
    endpoint_tests::mocks::test_customer,
    helpers::calculate_hmac,
    middleware::{AclMiddlewareFactory, HmacMiddlewareFactory, JwtMiddlewareFactory},
};

const WAVE_SECRET: &str = "wave-webhook-secret";

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

fn configure_wave(enabled: bool) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let scope = web::scope("/wave")
            .wrap(HmacMiddlewareFactory::new("Wave-Signature", Secret::new(WAVE_SECRET.to_string()), enabled))
            .route("/webhook", web::post().to(echo));
        cfg.service(scope);
    }
}

#[actix_web::test]
async fn correctly_signed_webhooks_pass() {
    let app = test::init_service(App::new().configure(configure_wave(true))).await;
    let body = br#"{"reference":"ABCD1234","amount":"7000.00","status":"completed"}"#.to_vec();
    let signature = calculate_hmac(WAVE_SECRET, &body);
    let req = TestRequest::post()
        .uri("/wave/webhook")
        .insert_header(("Wave-Signature", signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn unsigned_webhooks_are_forbidden() {
    let app = test::init_service(App::new().configure(configure_wave(true))).await;
    let req = TestRequest::post().uri("/wave/webhook").set_payload(b"{}".to_vec()).to_request();
    let err = test::try_call_service(&app, req).await.expect_err("unsigned request should be rejected");
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn tampered_webhooks_are_forbidden() {
    let app = test::init_service(App::new().configure(configure_wave(true))).await;
    let body = br#"{"reference":"ABCD1234","amount":"7000.00","status":"completed"}"#.to_vec();
    let signature = calculate_hmac(WAVE_SECRET, &body);
    let req = TestRequest::post()
        .uri("/wave/webhook")
        .insert_header(("Wave-Signature", signature))
        .set_payload(br#"{"reference":"ABCD1234","amount":"1.00","status":"completed"}"#.to_vec())
        .to_request();
    let err = test::try_call_service(&app, req).await.expect_err("tampered request should be rejected");
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn disabled_hmac_checks_allow_everything() {
    let app = test::init_service(App::new().configure(configure_wave(false))).await;
    let req = TestRequest::post().uri("/wave/webhook").set_payload(b"{}".to_vec()).to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
}

//----------------------------------------------  JWT + ACL  ---------------------------------------------------

fn jwt_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("jwt-endpoint-test-secret-0123456789".to_string()) }
}

async fn admin_only() -> HttpResponse {
    HttpResponse::Ok().body("admin ok")
}

fn configure_protected() -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let scope = web::scope("/api").wrap(JwtMiddlewareFactory::new(jwt_config())).service(
            web::resource("/admin")
                .wrap(AclMiddlewareFactory::new(&[Role::ReadAll]))
                .route(web::get().to(admin_only)),
        );
        cfg.service(scope);
    }
}

async fn call_protected(token: Option<String>) -> Result<StatusCode, StatusCode> {
    let app = test::init_service(App::new().configure(configure_protected())).await;
    let mut req = TestRequest::get().uri("/api/admin");
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => Ok(res.status()),
        Err(e) => Err(e.as_response_error().status_code()),
    }
}

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let status = call_protected(None).await.expect_err("should be rejected");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn tokens_without_the_required_role_are_forbidden() {
    let issuer = TokenIssuer::new(&jwt_config());
    let token = issuer.issue_token(&test_customer(1, "amina"), vec![Role::User]).unwrap();
    let status = call_protected(Some(token)).await.expect_err("should be rejected");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn tokens_with_the_required_role_pass() {
    let issuer = TokenIssuer::new(&jwt_config());
    let token = issuer.issue_token(&test_customer(1, "admin"), vec![Role::User, Role::ReadAll]).unwrap();
    let status = call_protected(Some(token)).await.expect("should be accepted");
    assert_eq!(status, StatusCode::OK);
}
