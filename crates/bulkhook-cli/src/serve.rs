//! HTTP surface: completion webhook ingress and export routes.

use actix_web::http::StatusCode;
use actix_web::web::{self, Bytes, Data, Json, Query};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, ResponseError, get, post};
use bulkhook_core::domain::{BulkFinishWebhook, BulkOperationState, SubmissionError};
use bulkhook_core::impls::{BULK_OPERATIONS_FINISH, ShopifyConfig, ShopifyTransport};
use bulkhook_core::{BulkQuery, Coordinator, FetchError, FetchPolicy, TenantId};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::cli::ServeArgs;

const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";

/// Shared by every worker.
pub struct AppState {
    pub coordinator: Coordinator,
    pub transport: ShopifyTransport,
}

impl AppState {
    fn check_shop(&self, shop: &TenantId) -> Result<(), ApiError> {
        if &self.transport.config().shop == shop {
            Ok(())
        } else {
            Err(ApiError::UnknownShop(shop.to_string()))
        }
    }

    fn transport_for(&self, shop: &TenantId) -> Result<ShopifyTransport, ApiError> {
        self.check_shop(shop)?;
        Ok(self.transport.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct ShopParams {
    shop: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing shop parameter")]
    MissingShop,

    #[error("shop {0} is not served here")]
    UnknownShop(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingShop | ApiError::UnknownShop(_) => StatusCode::BAD_REQUEST,
            ApiError::Fetch(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Fetch(FetchError::Submission(SubmissionError::Rejected(_))) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Fetch(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

fn shop_of(req: &HttpRequest, params: &ShopParams) -> Result<TenantId, ApiError> {
    if let Some(shop) = params.shop.as_deref().filter(|s| !s.is_empty()) {
        return Ok(TenantId::new(shop));
    }
    req.headers()
        .get(SHOP_DOMAIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(TenantId::new)
        .ok_or(ApiError::MissingShop)
}

#[post("/query_finished")]
async fn query_finished(
    req: HttpRequest,
    params: Query<ShopParams>,
    body: Bytes,
    state: Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let shop = shop_of(&req, &params)?;
    // unknown shops would otherwise grow the registry without bound
    state.check_shop(&shop)?;
    match serde_json::from_slice::<BulkFinishWebhook>(&body) {
        Ok(payload) => {
            let operation = &payload.admin_graphql_api_id;
            match payload.state() {
                Some(BulkOperationState::Completed) => {
                    info!(shop = %shop, %operation, "bulk operation finished")
                }
                Some(other) => warn!(
                    shop = %shop,
                    %operation,
                    state = %other,
                    error_code = payload.error_code.as_deref().unwrap_or(""),
                    "bulk operation did not complete"
                ),
                None => warn!(
                    shop = %shop,
                    %operation,
                    status = %payload.status,
                    "unrecognized finish status"
                ),
            }
        }
        Err(e) => warn!(shop = %shop, error = %e, "unreadable finish payload"),
    }
    // the arrival itself is the signal; the client re-checks status
    state.coordinator.notify_completion(&shop);
    Ok(HttpResponse::Ok().body("Webhook received"))
}

async fn export(
    req: HttpRequest,
    params: Query<ShopParams>,
    state: Data<AppState>,
    query: BulkQuery,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let shop = shop_of(&req, &params)?;
    let transport = state.transport_for(&shop)?;
    let records = state
        .coordinator
        .client(shop, transport)
        .fetch(&query)
        .await?
        .collect_records()
        .await?;
    Ok(Json(records.into_iter().map(|r| r.into_value()).collect()))
}

#[get("/products")]
async fn products(
    req: HttpRequest,
    params: Query<ShopParams>,
    state: Data<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    export(req, params, state, BulkQuery::products()).await
}

#[get("/variants")]
async fn variants(
    req: HttpRequest,
    params: Query<ShopParams>,
    state: Data<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    export(req, params, state, BulkQuery::variants()).await
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(query_finished)
        .service(products)
        .service(variants)
        .service(health);
}

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let policy: FetchPolicy = args.policy.clone().into();
    let shop = TenantId::new(args.shop);
    let mut config = ShopifyConfig::new(shop.clone(), SecretString::new(args.access_token));
    config.api_version = args.api_version;
    let transport = ShopifyTransport::new(config)?;

    if let Some(callback) = args.callback_url.as_deref() {
        let address = format!("{callback}?shop={shop}");
        let webhook = transport
            .ensure_webhook(BULK_OPERATIONS_FINISH, &address)
            .await?;
        info!(id = webhook.id, address = %webhook.address, "completion webhook registered");
    } else {
        warn!("no callback url configured; relying on an existing webhook subscription");
    }

    let state = Data::new(AppState {
        coordinator: Coordinator::new(policy),
        transport,
    });

    info!(host = %args.host, port = args.port, shop = %shop, "starting http server");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind((args.host.as_str(), args.port))?
        .run()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;
    use bulkhook_core::domain::{BulkOperationId, TimeoutReason};
    use std::time::Duration;

    fn state(policy: FetchPolicy) -> Data<AppState> {
        let config = ShopifyConfig::new(
            TenantId::new("a.myshopify.com"),
            SecretString::new("shpat_test".to_string()),
        );
        Data::new(AppState {
            coordinator: Coordinator::new(policy),
            transport: ShopifyTransport::new(config).unwrap(),
        })
    }

    #[actix_web::test]
    async fn query_finished_signals_the_shop() {
        let state = state(FetchPolicy::default());
        let app =
            actix_test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = actix_test::TestRequest::post()
            .uri("/query_finished?shop=a.myshopify.com")
            .set_payload(
                r#"{"admin_graphql_api_id":"gid://shopify/BulkOperation/1","status":"completed","error_code":null,"type":"query"}"#,
            )
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let bridge = state.coordinator.bridge(&TenantId::new("a.myshopify.com"));
        tokio::time::timeout(Duration::from_millis(100), bridge.await_completion())
            .await
            .expect("ingress must leave a pending signal");
    }

    #[actix_web::test]
    async fn shop_header_is_accepted_and_garbage_body_still_signals() {
        let state = state(FetchPolicy::default());
        let app =
            actix_test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = actix_test::TestRequest::post()
            .uri("/query_finished")
            .insert_header((SHOP_DOMAIN_HEADER, "a.myshopify.com"))
            .set_payload("not json")
            .to_request();
        assert!(actix_test::call_service(&app, req).await.status().is_success());
        assert!(state.coordinator.registry().contains(
            &TenantId::new("a.myshopify.com").into()
        ));
    }

    #[actix_web::test]
    async fn failed_operation_still_signals() {
        let state = state(FetchPolicy::default());
        let app =
            actix_test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = actix_test::TestRequest::post()
            .uri("/query_finished?shop=a.myshopify.com")
            .set_payload(
                r#"{"admin_graphql_api_id":"gid://shopify/BulkOperation/2","status":"failed","error_code":"internal_server_error","type":"query"}"#,
            )
            .to_request();
        assert!(actix_test::call_service(&app, req).await.status().is_success());
        assert_eq!(state.coordinator.registry().len(), 1);
    }

    #[actix_web::test]
    async fn missing_shop_is_bad_request() {
        let state = state(FetchPolicy::default());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = actix_test::TestRequest::post().uri("/query_finished").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_shop_is_rejected_before_fetching() {
        let state = state(FetchPolicy::default());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = actix_test::TestRequest::get()
            .uri("/products?shop=other.myshopify.com")
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_shop_callback_is_rejected_without_signal() {
        let state = state(FetchPolicy::default());
        let app =
            actix_test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = actix_test::TestRequest::post()
            .uri("/query_finished?shop=junk.example")
            .set_payload("{}")
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
        assert!(state.coordinator.registry().is_empty());
    }

    #[actix_web::test]
    async fn health_is_ok() {
        let app = actix_test::init_service(App::new().configure(configure)).await;
        let req = actix_test::TestRequest::get().uri("/health").to_request();
        assert!(actix_test::call_service(&app, req).await.status().is_success());
    }

    #[test]
    fn fetch_errors_map_to_gateway_statuses() {
        let timeout = ApiError::from(FetchError::Timeout {
            operation: Some(BulkOperationId::new("op-1")),
            reason: TimeoutReason::NoNotification {
                waited: Duration::from_secs(1),
            },
        });
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let failed = ApiError::from(FetchError::MissingResultUrl(BulkOperationId::new("op-1")));
        assert_eq!(failed.status_code(), StatusCode::BAD_GATEWAY);

        let rejected = ApiError::from(FetchError::Submission(SubmissionError::Rejected(vec![])));
        assert_eq!(rejected.status_code(), StatusCode::BAD_REQUEST);
    }
}
