use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use shop_common::Money;
use shoppit_engine::{
    api::cart_objects::CartSummary,
    db_types::CartItem,
    CartApi,
    CartApiError,
};

use super::mocks::MockCartManager;
use crate::routes::{AddItemRoute, CartSummaryRoute};

async fn call(
    cart_manager: MockCartManager,
    req: TestRequest,
) -> (StatusCode, String) {
    let _ = env_logger::try_init().ok();
    let app = App::new()
        .app_data(web::Data::new(CartApi::new(cart_manager)))
        .service(AddItemRoute::<MockCartManager>::new())
        .service(CartSummaryRoute::<MockCartManager>::new());
    let app = test::init_service(app).await;
    let (_, res) = test::call_service(&app, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

#[actix_web::test]
async fn adding_a_new_item_returns_created() {
    let mut cart_manager = MockCartManager::new();
    cart_manager
        .expect_add_item_to_cart()
        .returning(|_, product_id| Ok((CartItem { id: 11, cart_id: 1, product_id, quantity: 1 }, true)));
    let req = TestRequest::post()
        .uri("/cart/items")
        .set_json(serde_json::json!({ "cart_code": "CART-1", "product_id": 5 }));
    let (status, body) = call(cart_manager, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["data"]["product_id"], 5);
    assert_eq!(response["data"]["quantity"], 1);
}

#[actix_web::test]
async fn re_adding_an_item_returns_ok() {
    let mut cart_manager = MockCartManager::new();
    cart_manager
        .expect_add_item_to_cart()
        .returning(|_, product_id| Ok((CartItem { id: 11, cart_id: 1, product_id, quantity: 3 }, false)));
    let req = TestRequest::post()
        .uri("/cart/items")
        .set_json(serde_json::json!({ "cart_code": "CART-1", "product_id": 5 }));
    let (status, _) = call(cart_manager, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_products_map_to_not_found() {
    let mut cart_manager = MockCartManager::new();
    cart_manager.expect_add_item_to_cart().returning(|_, product_id| Err(CartApiError::ProductNotFound(product_id)));
    let req = TestRequest::post()
        .uri("/cart/items")
        .set_json(serde_json::json!({ "cart_code": "CART-1", "product_id": 404 }));
    let (status, body) = call(cart_manager, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("No product exists with id 404"), "was: {body}");
}

#[actix_web::test]
async fn summaries_for_unknown_or_paid_carts_are_not_found() {
    let mut cart_manager = MockCartManager::new();
    cart_manager.expect_fetch_cart_summary().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/cart/summary?cart_code=GHOST");
    let (status, _) = call(cart_manager, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn summaries_serialize_totals_in_minor_units() {
    let mut cart_manager = MockCartManager::new();
    cart_manager.expect_fetch_cart_summary().returning(|code| {
        Ok(Some(CartSummary { cart_code: code.to_string(), num_items: 4, total: Money::from(16500) }))
    });
    let req = TestRequest::get().uri("/cart/summary?cart_code=CART-1");
    let (status, body) = call(cart_manager, req).await;
    assert!(status.is_success());
    let response: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["num_items"], 4);
    assert_eq!(response["total"], 16500);
}
