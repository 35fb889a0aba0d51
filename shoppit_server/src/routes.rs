//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database
//! calls, provider API calls) must therefore be awaited, never blocked on.

use std::ops::Deref;

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use shoppit_engine::{
    db_types::{NewCustomer, NewProduct, Role},
    traits::{
        AccountManagement,
        AuthManagement,
        CartManagement,
        CatalogManagement,
        CheckoutDatabase,
        ProductUpdate,
    },
    transaction_objects::TransactionQueryFilter,
    AccountApi,
    AuthApi,
    CartApi,
    CatalogApi,
    CheckoutApi,
};

use crate::{
    auth::{JwtClaims, TokenIssuer},
    data_objects::{
        AddItemRequest,
        CartQuery,
        DeleteItemRequest,
        ItemInCartQuery,
        LoginRequest,
        RoleUpdateRequest,
        TokenResponse,
        UpdateQuantityRequest,
    },
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so the registration boilerplate is generated by the `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:ty),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(register => Post "/auth/register" impl AccountManagement);
/// Create a customer account and log them in.
///
/// New accounts always start with just the `user` role, so the access token is issued directly rather than
/// round-tripping through the role store.
pub async fn register<B: AccountManagement>(
    body: web::Json<NewCustomer>,
    api: web::Data<AccountApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let new_customer = body.into_inner();
    debug!("💻️ Registration request for username '{}'", new_customer.username);
    let customer = api.register(new_customer).await?;
    let token = signer.issue_token(&customer, vec![Role::User])?;
    let response =
        TokenResponse { token, customer_id: customer.id, username: customer.username.clone() };
    Ok(HttpResponse::Created().json(response))
}

route!(login => Post "/auth/login" impl AccountManagement, AuthManagement);
/// Issue an access token for a valid username/password pair.
///
/// The token carries every role the customer holds at login time. The token is valid for 24 hours and will NOT
/// refresh; clients log in again when it lapses.
pub async fn login<BAcc, BAuth>(
    body: web::Json<LoginRequest>,
    api: web::Data<AccountApi<BAcc>>,
    auth_api: web::Data<AuthApi<BAuth>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError>
where
    BAcc: AccountManagement,
    BAuth: AuthManagement,
{
    let LoginRequest { username, password } = body.into_inner();
    debug!("💻️ Login request for username '{username}'");
    let customer = api.login(&username, &password).await?;
    let roles = auth_api.roles_for_customer(customer.id).await?;
    let token = signer.issue_token(&customer, roles)?;
    let response = TokenResponse { token, customer_id: customer.id, username: customer.username.clone() };
    Ok(HttpResponse::Ok().json(response))
}

route!(check_token => Get "/check_token" requires [Role::User]);
pub async fn check_token(claims: JwtClaims) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET check_token for customer {}", claims.sub);
    Ok(HttpResponse::Ok().body("Token is valid."))
}

//----------------------------------------------   Catalogue  ----------------------------------------------------
route!(products => Get "/products" impl CatalogManagement);
pub async fn products<B: CatalogManagement>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let products = api.products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_detail => Get "/products/{slug}" impl CatalogManagement);
pub async fn product_detail<B: CatalogManagement>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let slug = path.into_inner();
    debug!("💻️ GET product {slug}");
    let product =
        api.product_by_slug(&slug).await?.ok_or_else(|| ServerError::NoRecordFound(format!("product {slug}")))?;
    Ok(HttpResponse::Ok().json(product))
}

route!(create_product => Post "/products" impl CatalogManagement where requires [Role::Write]);
/// Admin endpoint (Write role) to add a product to the catalogue.
pub async fn create_product<B: CatalogManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = body.into_inner();
    info!("💻️ POST create product '{}'", product.slug);
    let product = api.add_product(product).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_product => Patch "/products/{slug}" impl CatalogManagement where requires [Role::Write]);
/// Admin endpoint (Write role) to apply a partial update to a product. The slug itself is immutable.
pub async fn update_product<B: CatalogManagement>(
    path: web::Path<String>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let slug = path.into_inner();
    info!("💻️ PATCH product '{slug}'");
    let product = api.update_product(&slug, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(add_item => Post "/cart/items" impl CartManagement);
/// Add a product to a cart, creating the cart on first use. Anonymous shoppers use this too; the cart code is
/// minted client-side.
pub async fn add_item<B: CartManagement>(
    body: web::Json<AddItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddItemRequest { cart_code, product_id } = body.into_inner();
    debug!("💻️ POST add product {product_id} to cart {cart_code}");
    let (item, created) = api.add_item(&cart_code, product_id).await?;
    let mut response = if created { HttpResponse::Created() } else { HttpResponse::Ok() };
    Ok(response.json(serde_json::json!({ "data": item, "message": "Cart item saved successfully" })))
}

route!(product_in_cart => Get "/cart/item-in-cart" impl CartManagement);
pub async fn product_in_cart<B: CartManagement>(
    query: web::Query<ItemInCartQuery>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ItemInCartQuery { cart_code, product_id } = query.into_inner();
    let exists = api.item_in_cart(&cart_code, product_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "product_in_cart": exists })))
}

route!(cart_summary => Get "/cart/summary" impl CartManagement);
pub async fn cart_summary<B: CartManagement>(
    query: web::Query<CartQuery>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let cart_code = query.into_inner().cart_code;
    debug!("💻️ GET cart summary for {cart_code}");
    let summary = api
        .summary(&cart_code)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("cart {cart_code}")))?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(get_cart => Get "/cart" impl CartManagement);
pub async fn get_cart<B: CartManagement>(
    query: web::Query<CartQuery>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let cart_code = query.into_inner().cart_code;
    debug!("💻️ GET cart {cart_code}");
    let detail = api
        .detail(&cart_code)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("cart {cart_code}")))?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(update_quantity => Patch "/cart/items" impl CartManagement);
pub async fn update_quantity<B: CartManagement>(
    body: web::Json<UpdateQuantityRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let UpdateQuantityRequest { item_id, quantity } = body.into_inner();
    debug!("💻️ PATCH cart item {item_id} quantity to {quantity}");
    let item = api.update_quantity(item_id, quantity).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": item, "message": "Cart item updated successfully" })))
}

route!(delete_cart_item => Post "/cart/items/delete" impl CartManagement);
pub async fn delete_cart_item<B: CartManagement>(
    body: web::Json<DeleteItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = body.into_inner().item_id;
    debug!("💻️ POST delete cart item {item_id}");
    api.remove_item(item_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

//----------------------------------------------   Profile  ----------------------------------------------------
route!(my_profile => Get "/me" impl AccountManagement where requires [Role::User]);
/// The authenticated customer's own profile. The customer id comes from the access token, never the request.
pub async fn my_profile<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_profile for customer {}", claims.sub);
    let customer = api
        .customer_by_id(claims.sub)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("customer {}", claims.sub)))?;
    Ok(HttpResponse::Ok().json(customer))
}

route!(update_my_profile => Patch "/me" impl AccountManagement where requires [Role::User]);
pub async fn update_my_profile<B: AccountManagement>(
    claims: JwtClaims,
    body: web::Json<shoppit_engine::db_types::CustomerProfileUpdate>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PATCH my_profile for customer {}", claims.sub);
    let customer = api.update_profile(claims.sub, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(customer))
}

route!(my_transactions => Get "/me/transactions" impl AccountManagement where requires [Role::User]);
/// The authenticated customer's checkout transactions, newest first.
pub async fn my_transactions<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_transactions for customer {}", claims.sub);
    let transactions = api.transactions_for_customer(claims.sub).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(transactions_search => Get "/transactions/search" impl CheckoutDatabase where requires [Role::ReadAll]);
/// Admin search over all transactions. Useful for reconciling payments manually: a customer claims to have paid,
/// search for their pending or failed transactions and check the provider's dashboard against the `tx_ref`.
pub async fn transactions_search<A: CheckoutDatabase>(
    query: web::Query<TransactionQueryFilter>,
    api: web::Data<CheckoutApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET transactions search for [{}]", query.deref());
    let transactions = api.search_transactions(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

route!(update_roles => Post "/roles" impl AuthManagement where requires [Role::SuperAdmin]);
pub async fn update_roles<A: AuthManagement>(
    api: web::Data<AuthApi<A>>,
    body: web::Json<Vec<RoleUpdateRequest>>,
) -> Result<HttpResponse, ServerError> {
    for acl_request in body.into_inner() {
        debug!("💻️ POST update roles for customer {}", acl_request.customer_id);
        api.assign_roles(acl_request.customer_id, &acl_request.apply).await?;
        api.remove_roles(acl_request.customer_id, &acl_request.revoke).await?;
    }
    Ok(HttpResponse::Ok().finish())
}
