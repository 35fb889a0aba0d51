//! End-to-end reconciliation tests: the duplicate, forged and out-of-order confirmation cases that the
//! checkout engine exists to handle.

use chrono::Duration;
use shop_common::Money;
use shoppit_engine::{
    db_types::{NewProduct, Provider, TransactionStatus},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    transaction_objects::{PaymentConfirmation, TransactionQueryFilter},
    CartApi,
    CatalogApi,
    CheckoutApi,
    CheckoutError,
    SqliteDatabase,
};

const DELIVERY_FEE: i64 = 500;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Seeds a product and a cart holding two of them; returns the expected charge total.
async fn seed_cart(db: &SqliteDatabase, cart_code: &str) -> Money {
    let catalog = CatalogApi::new(db.clone());
    let cart = CartApi::new(db.clone());
    let product = catalog
        .add_product(NewProduct {
            name: "Wax shirt".to_string(),
            slug: format!("wax-shirt-{cart_code}"),
            description: None,
            image_url: None,
            price: Money::from(3250),
        })
        .await
        .unwrap();
    let (item, _) = cart.add_item(cart_code, product.id).await.unwrap();
    cart.update_quantity(item.id, 2).await.unwrap();
    Money::from(3250 * 2 + DELIVERY_FEE)
}

fn confirmation_of(amount: Money, currency: &str) -> PaymentConfirmation {
    PaymentConfirmation {
        provider_tx_id: "prov-912".to_string(),
        amount,
        currency: currency.to_string(),
        succeeded: true,
    }
}

#[tokio::test]
async fn happy_path_checkout_and_confirmation() {
    let db = new_db().await;
    let expected = seed_cart(&db, "CART-A").await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());

    let draft = api
        .begin_checkout("CART-A", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None)
        .await
        .unwrap();
    assert_eq!(draft.transaction.status, TransactionStatus::Pending);
    assert_eq!(draft.transaction.amount, expected);
    assert_eq!(draft.cart_total + draft.delivery_fee, expected);

    let tx_ref = draft.transaction.tx_ref.clone();
    let confirmed = api.confirm_transaction(&tx_ref, confirmation_of(expected, "XOF")).await.unwrap();
    assert_eq!(confirmed.status, TransactionStatus::Completed);
    assert_eq!(confirmed.provider_tx_id.as_deref(), Some("prov-912"));

    // The cart is paid and thus frozen: summaries vanish, checkouts are refused
    let cart = CartApi::new(db.clone());
    assert!(cart.summary("CART-A").await.unwrap().is_none());
    let again = api
        .begin_checkout("CART-A", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None)
        .await
        .unwrap_err();
    assert!(matches!(again, CheckoutError::CartAlreadyPaid(_)));
}

#[tokio::test]
async fn duplicate_confirmations_are_absorbed() {
    let db = new_db().await;
    let expected = seed_cart(&db, "CART-B").await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());
    let draft =
        api.begin_checkout("CART-B", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None).await.unwrap();
    let tx_ref = draft.transaction.tx_ref.clone();

    api.confirm_transaction(&tx_ref, confirmation_of(expected, "XOF")).await.unwrap();
    let replay = api.confirm_transaction(&tx_ref, confirmation_of(expected, "XOF")).await.unwrap_err();
    assert!(matches!(replay, CheckoutError::TransactionModificationNoOp));

    // The transaction is still completed, exactly once
    let tx = api.transaction_by_ref(&tx_ref).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn forged_confirmations_never_complete() {
    let db = new_db().await;
    let expected = seed_cart(&db, "CART-C").await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());
    let draft =
        api.begin_checkout("CART-C", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None).await.unwrap();
    let tx_ref = draft.transaction.tx_ref.clone();

    // Unknown reference: nothing happens
    let bogus = shoppit_engine::db_types::TxRef::from("not-a-ref".to_string());
    let err = api.confirm_transaction(&bogus, confirmation_of(expected, "XOF")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::TransactionNotFound(_)));

    // Wrong amount: verification fails and the transaction is parked in Failed
    let err = api.confirm_transaction(&tx_ref, confirmation_of(Money::from(1), "XOF")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::VerificationFailed(_)));
    let tx = api.transaction_by_ref(&tx_ref).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Failed);

    // Wrong currency, right amount: still no
    let err = api.confirm_transaction(&tx_ref, confirmation_of(expected, "USD")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::VerificationFailed(_)));

    // A later, fully verified confirmation supersedes the transient failure
    let confirmed = api.confirm_transaction(&tx_ref, confirmation_of(expected, "XOF")).await.unwrap();
    assert_eq!(confirmed.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn failed_provider_reports_mark_the_transaction_failed() {
    let db = new_db().await;
    let expected = seed_cart(&db, "CART-D").await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());
    let draft =
        api.begin_checkout("CART-D", Provider::PayPal, "USD", Money::from(DELIVERY_FEE), None).await.unwrap();
    let tx_ref = draft.transaction.tx_ref.clone();

    let mut failed = confirmation_of(expected, "USD");
    failed.succeeded = false;
    let tx = api.confirm_transaction(&tx_ref, failed).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Failed);

    // Cancelling a failed transaction is allowed; completing a cancelled one is not
    let tx = api.cancel_transaction(&tx_ref, "abandoned").await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Cancelled);
    let err = api.confirm_transaction(&tx_ref, confirmation_of(expected, "USD")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::TransactionModificationForbidden { .. }));
}

#[tokio::test]
async fn push_payments_reconcile_against_the_cart() {
    let db = new_db().await;
    let expected = seed_cart(&db, "CART-W").await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());

    // Amount mismatch: rejected, nothing written
    let err = api
        .reconcile_push_payment(
            "CART-W",
            Provider::Wave,
            "XOF",
            Money::from(DELIVERY_FEE),
            confirmation_of(Money::from(42), "XOF"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::VerificationFailed(_)));

    // Unknown cart: rejected
    let err = api
        .reconcile_push_payment(
            "NO-SUCH-CART",
            Provider::Wave,
            "XOF",
            Money::from(DELIVERY_FEE),
            confirmation_of(expected, "XOF"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::CartNotFound(_)));

    // Exact amount: a completed Wave transaction appears and the cart is paid
    let tx = api
        .reconcile_push_payment(
            "CART-W",
            Provider::Wave,
            "XOF",
            Money::from(DELIVERY_FEE),
            confirmation_of(expected, "XOF"),
        )
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(tx.provider, Provider::Wave);
    assert_eq!(tx.amount, expected);

    // Replay: absorbed as a no-op
    let replay = api
        .reconcile_push_payment(
            "CART-W",
            Provider::Wave,
            "XOF",
            Money::from(DELIVERY_FEE),
            confirmation_of(expected, "XOF"),
        )
        .await
        .unwrap_err();
    assert!(matches!(replay, CheckoutError::TransactionModificationNoOp));
}

#[tokio::test]
async fn carts_must_exist_and_hold_something() {
    let db = new_db().await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());
    let err = api
        .begin_checkout("GHOST", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::CartNotFound(_)));

    // An existing but empty cart cannot be checked out
    let cart = CartApi::new(db.clone());
    let catalog = CatalogApi::new(db.clone());
    let product = catalog
        .add_product(NewProduct {
            name: "Thing".to_string(),
            slug: "thing".to_string(),
            description: None,
            image_url: None,
            price: Money::from(100),
        })
        .await
        .unwrap();
    let (item, _) = cart.add_item("CART-E", product.id).await.unwrap();
    cart.remove_item(item.id).await.unwrap();
    let err = api
        .begin_checkout("CART-E", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::CartEmpty(_)));
}

#[tokio::test]
async fn stale_pending_transactions_expire() {
    let db = new_db().await;
    let expected = seed_cart(&db, "CART-F").await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());
    let draft =
        api.begin_checkout("CART-F", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None).await.unwrap();
    let tx_ref = draft.transaction.tx_ref.clone();

    // A generous timeout expires nothing
    let expired = api.expire_stale_transactions(Duration::hours(2)).await.unwrap();
    assert!(expired.is_empty());

    // A negative timeout treats everything pending as stale
    let expired = api.expire_stale_transactions(Duration::seconds(-1)).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].tx_ref, tx_ref);
    assert_eq!(expired[0].status, TransactionStatus::Cancelled);

    // Expired means cancelled: a late confirmation is refused
    let err = api.confirm_transaction(&tx_ref, confirmation_of(expected, "XOF")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::TransactionModificationForbidden { .. }));
}

#[tokio::test]
async fn transaction_search_filters_compose() {
    let db = new_db().await;
    seed_cart(&db, "CART-G").await;
    seed_cart(&db, "CART-H").await;
    let api = CheckoutApi::new(db.clone(), EventProducers::default());
    api.begin_checkout("CART-G", Provider::Flutterwave, "XOF", Money::from(DELIVERY_FEE), None).await.unwrap();
    api.begin_checkout("CART-H", Provider::PayPal, "USD", Money::from(DELIVERY_FEE), None).await.unwrap();

    let all = api.search_transactions(TransactionQueryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let paypal_only =
        api.search_transactions(TransactionQueryFilter::default().with_provider(Provider::PayPal)).await.unwrap();
    assert_eq!(paypal_only.len(), 1);
    assert_eq!(paypal_only[0].provider, Provider::PayPal);

    let pending = api
        .search_transactions(TransactionQueryFilter::default().with_status(TransactionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    let completed = api
        .search_transactions(TransactionQueryFilter::default().with_status(TransactionStatus::Completed))
        .await
        .unwrap();
    assert!(completed.is_empty());
}
