use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use log::*;
use shop_common::Secret;
use shoppit_engine::{db_types::Role, events::EventProducers, AccountApi, AccountApiError, AuthApi};

use super::mocks::*;
use crate::{
    auth::{validate_token, TokenIssuer},
    config::AuthConfig,
    routes::{LoginRoute, RegisterRoute},
};

fn test_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("endpoint-test-secret-0123456789abcdef".to_string()) }
}

async fn post_register(body: serde_json::Value, account_manager: MockAccountManager) -> (StatusCode, String) {
    let _ = env_logger::try_init().ok();
    let config = test_auth_config();
    let app = App::new()
        .app_data(web::Data::new(AccountApi::new(account_manager, EventProducers::default())))
        .app_data(web::Data::new(TokenIssuer::new(&config)))
        .service(RegisterRoute::<MockAccountManager>::new());
    let app = test::init_service(app).await;
    let req = TestRequest::post().uri("/auth/register").set_json(body).to_request();
    let (_, res) = test::call_service(&app, req).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

#[actix_web::test]
async fn register_issues_a_token() {
    let mut account_manager = MockAccountManager::new();
    account_manager.expect_create_customer().returning(|new| {
        let mut customer = test_customer(7, &new.username);
        customer.email = new.email;
        Ok(customer)
    });
    let body = serde_json::json!({
        "username": "amina",
        "email": "amina@example.com",
        "password": "s3cret",
        "phone": "+2250700000000"
    });
    let (status, body) = post_register(body, account_manager).await;
    info!("Response body: {body}");
    assert_eq!(status, StatusCode::CREATED);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["customer_id"], 7);
    assert_eq!(response["username"], "amina");
    let claims = validate_token(response["token"].as_str().unwrap(), &test_auth_config()).unwrap();
    assert_eq!(claims.sub, 7);
    assert_eq!(claims.roles, vec![Role::User]);
}

#[actix_web::test]
async fn register_reports_duplicates_as_conflicts() {
    let mut account_manager = MockAccountManager::new();
    account_manager
        .expect_create_customer()
        .returning(|new| Err(AccountApiError::DuplicateUsername(new.username)));
    let body = serde_json::json!({ "username": "amina", "email": "amina@example.com", "password": "pw" });
    let (status, body) = post_register(body, account_manager).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already exists"), "was: {body}");
}

async fn post_login(
    body: serde_json::Value,
    account_manager: MockAccountManager,
    auth_manager: MockAuthManager,
) -> (StatusCode, String) {
    let _ = env_logger::try_init().ok();
    let config = test_auth_config();
    let app = App::new()
        .app_data(web::Data::new(AccountApi::new(account_manager, EventProducers::default())))
        .app_data(web::Data::new(AuthApi::new(auth_manager)))
        .app_data(web::Data::new(TokenIssuer::new(&config)))
        .service(LoginRoute::<MockAccountManager, MockAuthManager>::new());
    let app = test::init_service(app).await;
    let req = TestRequest::post().uri("/auth/login").set_json(body).to_request();
    let (_, res) = test::call_service(&app, req).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

#[actix_web::test]
async fn login_with_valid_credentials() {
    let mut account_manager = MockAccountManager::new();
    account_manager.expect_verify_credentials().returning(|username, _| Ok(test_customer(3, username)));
    let mut auth_manager = MockAuthManager::new();
    auth_manager.expect_fetch_roles_for_customer().returning(|_| Ok(vec![Role::User, Role::ReadAll]));
    let body = serde_json::json!({ "username": "admin", "password": "pw" });
    let (status, body) = post_login(body, account_manager, auth_manager).await;
    assert!(status.is_success());
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    let claims = validate_token(response["token"].as_str().unwrap(), &test_auth_config()).unwrap();
    assert_eq!(claims.sub, 3);
    assert_eq!(claims.roles, vec![Role::User, Role::ReadAll]);
}

#[actix_web::test]
async fn login_with_bad_credentials() {
    let mut account_manager = MockAccountManager::new();
    account_manager.expect_verify_credentials().returning(|_, _| Err(AccountApiError::InvalidCredentials));
    let auth_manager = MockAuthManager::new();
    let body = serde_json::json!({ "username": "admin", "password": "nope" });
    let (status, body) = post_login(body, account_manager, auth_manager).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. Invalid username or password."}"#);
}
