use std::{net::SocketAddr, str::FromStr, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::{info, warn};
use provider_tools::{FlutterwaveApi, MailRelayApi, PayPalApi};
use shoppit_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    AuthApi,
    CartApi,
    CatalogApi,
    CheckoutApi,
    SqliteDatabase,
};

use crate::{
    auth::TokenIssuer,
    checkout_routes::{
        FlutterwaveCallbackRoute,
        FlutterwaveCheckoutRoute,
        PaypalCallbackRoute,
        PaypalCheckoutRoute,
        WaveWebhookRoute,
    },
    config::{ServerConfig, ServerOptions},
    errors::{AuthError, ServerError, ServerError::AuthenticationError},
    expiry_worker::start_expiry_worker,
    middleware::{HmacMiddlewareFactory, JwtMiddlewareFactory},
    routes::{
        health,
        AddItemRoute,
        CartSummaryRoute,
        CheckTokenRoute,
        CreateProductRoute,
        DeleteCartItemRoute,
        GetCartRoute,
        LoginRoute,
        MyProfileRoute,
        MyTransactionsRoute,
        ProductDetailRoute,
        ProductInCartRoute,
        ProductsRoute,
        RegisterRoute,
        TransactionsSearchRoute,
        UpdateMyProfileRoute,
        UpdateProductRoute,
        UpdateQuantityRoute,
        UpdateRolesRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(100, default_hooks(&config)?);
    let producers = handlers.producers();
    handlers.start_handlers();
    let _expiry = start_expiry_worker(db.clone(), producers.clone(), config.pending_tx_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default event wiring: welcome emails on registration, and an audit line for every completed payment.
fn default_hooks(config: &ServerConfig) -> Result<EventHooks, ServerError> {
    let mailer =
        MailRelayApi::new(config.mail.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mut hooks = EventHooks::default();
    hooks.on_customer_registered(move |event| {
        let mailer = mailer.clone();
        async move {
            let customer = event.customer;
            if let Err(e) = mailer.send_welcome_email(&customer.email, &customer.username).await {
                warn!("📧️ Could not send a welcome email to {}: {e}", customer.email);
            }
        }
        .boxed()
    });
    hooks.on_transaction_completed(|event| {
        async move {
            let tx = event.transaction;
            info!(
                "🧾️ Payment complete: transaction {} via {} for {} {} (cart {})",
                tx.tx_ref, tx.provider, tx.amount, tx.currency, tx.cart_id
            );
        }
        .boxed()
    });
    Ok(hooks)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let flutterwave = FlutterwaveApi::new(config.flutterwave.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let paypal =
        PayPalApi::new(config.paypal.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let catalog_api = CatalogApi::new(db.clone());
        let cart_api = CartApi::new(db.clone());
        let account_api = AccountApi::new(db.clone(), producers.clone());
        let auth_api = AuthApi::new(db.clone());
        let checkout_api = CheckoutApi::new(db.clone(), producers.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shoppit::access_log"))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(account_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(flutterwave.clone()))
            .app_data(web::Data::new(paypal.clone()));
        // Routes that require authentication
        let api_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(config.auth.clone()))
            .service(CheckTokenRoute::new())
            .service(MyProfileRoute::<SqliteDatabase>::new())
            .service(UpdateMyProfileRoute::<SqliteDatabase>::new())
            .service(MyTransactionsRoute::<SqliteDatabase>::new())
            .service(FlutterwaveCheckoutRoute::<SqliteDatabase>::new())
            .service(PaypalCheckoutRoute::<SqliteDatabase>::new())
            .service(TransactionsSearchRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(UpdateRolesRoute::<SqliteDatabase>::new());
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let wave_whitelist = config.wave.whitelist.clone();
        let wave_scope = web::scope("/wave")
            .wrap(HmacMiddlewareFactory::new(
                "Wave-Signature",
                config.wave.hmac_secret.clone(),
                config.wave.hmac_checks,
            ))
            .wrap_fn(move |req, srv| {
                // Collect the peer IP from the x-forwarded-for or forwarded headers _if_ the corresponding
                // configuration flag is set. Otherwise, use the peer address from the connection info.
                let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
                let peer_ip = req
                    .headers()
                    .get("X-Forwarded-For")
                    .and_then(|v| use_x_forwarded_for.then(|| v.to_str().ok()).flatten())
                    .or_else(|| {
                        req.headers().get("Forwarded").and_then(|v| use_forwarded.then(|| v.to_str().ok()).flatten())
                    })
                    .or_else(|| peer_addr.as_deref())
                    .and_then(|s| SocketAddr::from_str(s).ok().map(|a| a.ip()).or_else(|| s.parse().ok()));
                let whitelisted = match (peer_ip, &wave_whitelist) {
                    (Some(ip), Some(whitelist)) => {
                        info!("Wave webhook from {ip}");
                        whitelist.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("No IP address found in Wave remote peer request, denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req).boxed_local()
                } else {
                    ok(req.error_response(AuthenticationError(AuthError::ForbiddenPeer))).boxed_local()
                }
            })
            .service(WaveWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(RegisterRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(ProductDetailRoute::<SqliteDatabase>::new())
            .service(AddItemRoute::<SqliteDatabase>::new())
            .service(ProductInCartRoute::<SqliteDatabase>::new())
            .service(CartSummaryRoute::<SqliteDatabase>::new())
            .service(GetCartRoute::<SqliteDatabase>::new())
            .service(UpdateQuantityRoute::<SqliteDatabase>::new())
            .service(DeleteCartItemRoute::<SqliteDatabase>::new())
            .service(FlutterwaveCallbackRoute::<SqliteDatabase>::new())
            .service(PaypalCallbackRoute::<SqliteDatabase>::new())
            .service(api_scope)
            .service(wave_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
