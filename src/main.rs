use axum::{
    Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::Json,
    routing::{delete, get, post},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use stock_dashboard::auth;
use stock_dashboard::config::AppConfig;
use stock_dashboard::csv_store::CsvMarketData;
use stock_dashboard::domain::errors::{MarketDataError, ServiceError, StoreError};
use stock_dashboard::domain::models::{
    CapmReport, IndexQuote, NewTransaction, PortfolioReport, Transaction, UserContext,
    WatchlistItem,
};
use stock_dashboard::domain::repository::UserStore;
use stock_dashboard::infra::sqlite::repo::SqliteRepo;
use stock_dashboard::logging::init_logging;
use stock_dashboard::market_data::MarketDataSource;
use stock_dashboard::usecases::analytics_service::AnalyticsService;
use stock_dashboard::usecases::portfolio_service::PortfolioService;
use stock_dashboard::usecases::watchlist_service::WatchlistService;

#[cfg(test)]
mod tests;

const USER_HEADER: &str = "x-user";

#[derive(Clone)]
struct AppState {
    portfolio: Arc<PortfolioService>,
    analytics: Arc<AnalyticsService>,
    watchlist: Arc<WatchlistService>,
    users: Arc<dyn UserStore>,
}

impl AppState {
    fn new(market: Arc<dyn MarketDataSource>, repo: Arc<SqliteRepo>, benchmark: &str) -> Self {
        Self {
            portfolio: Arc::new(PortfolioService::new(market.clone(), repo.clone())),
            analytics: Arc::new(AnalyticsService::new(market.clone(), benchmark)),
            watchlist: Arc::new(WatchlistService::new(market, repo.clone())),
            users: repo,
        }
    }
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({"error": message.to_string()})))
}

fn service_error(e: ServiceError) -> ApiError {
    let status = match &e {
        ServiceError::Validation(_) | ServiceError::Analytics(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::MarketData(MarketDataError::UnknownTicker(_))
        | ServiceError::MarketData(MarketDataError::NoData { .. }) => StatusCode::NOT_FOUND,
        ServiceError::MarketData(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %e, "Request failed");
    } else {
        warn!(error = %e, "Request rejected");
    }
    api_error(status, e)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Caller identity from the `x-user` header, trusted verbatim.
struct AuthUser(UserContext);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Missing x-user header"))?;
        Ok(AuthUser(UserContext::new(username)))
    }
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn api_signup(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = auth::create_user(state.users.as_ref(), &body.username, &body.password)
        .await
        .map_err(service_error)?;
    if created {
        Ok((StatusCode::CREATED, Json(json!({"username": body.username.trim()}))))
    } else {
        Err(api_error(StatusCode::CONFLICT, "Username already exists"))
    }
}

async fn api_login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<Value> {
    let ok = auth::check_password(state.users.as_ref(), &body.username, &body.password)
        .await
        .map_err(service_error)?;
    if !ok {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid username or password"));
    }
    Ok(Json(json!({"username": body.username.trim()})))
}

#[tracing::instrument(skip(state, user), fields(user = %user.0.username))]
async fn api_portfolio(State(state): State<AppState>, user: AuthUser) -> ApiResult<PortfolioReport> {
    let report = state.portfolio.portfolio(&user.0).await.map_err(service_error)?;
    Ok(Json(report))
}

#[tracing::instrument(skip(state, user, body), fields(user = %user.0.username))]
async fn api_add_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let tx = state
        .portfolio
        .record_transaction(&user.0, body, today())
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn api_watchlist(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<WatchlistItem>> {
    let items = state.watchlist.list(&user.0, today()).await.map_err(service_error)?;
    Ok(Json(items))
}

#[derive(Deserialize)]
struct WatchRequest {
    ticker: String,
}

async fn api_watch(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<WatchRequest>,
) -> ApiResult<Value> {
    let added = state.watchlist.add(&user.0, &body.ticker).await.map_err(service_error)?;
    Ok(Json(json!({"ticker": body.ticker.trim().to_uppercase(), "added": added})))
}

async fn api_unwatch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticker): Path<String>,
) -> ApiResult<Value> {
    let removed = state.watchlist.remove(&user.0, &ticker).await.map_err(service_error)?;
    Ok(Json(json!({"ticker": ticker.trim().to_uppercase(), "removed": removed})))
}

#[derive(Deserialize)]
struct CapmQuery {
    ticker: String,
    years: Option<u32>,
}

#[tracing::instrument(skip(state, q), fields(ticker = %q.ticker))]
async fn api_capm(State(state): State<AppState>, Query(q): Query<CapmQuery>) -> ApiResult<CapmReport> {
    let report = state
        .analytics
        .capm(&q.ticker, q.years.unwrap_or(1), today())
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

async fn api_market_overview(State(state): State<AppState>) -> Json<Vec<IndexQuote>> {
    Json(state.analytics.market_overview(today()).await)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/signup", post(api_signup))
        .route("/api/login", post(api_login))
        .route("/api/portfolio", get(api_portfolio))
        .route("/api/transactions", post(api_add_transaction))
        .route("/api/watchlist", get(api_watchlist).post(api_watch))
        .route("/api/watchlist/{ticker}", delete(api_unwatch))
        .route("/api/capm", get(api_capm))
        .route("/api/market-overview", get(api_market_overview))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    init_logging(&config.log_filter);

    let repo = Arc::new(SqliteRepo::connect(&config.database_url).await?);
    let market: Arc<dyn MarketDataSource> = Arc::new(CsvMarketData::new(&config.price_data_dir));
    info!(
        database = %config.database_url,
        prices = %config.price_data_dir,
        benchmark = %config.market_index,
        "Starting dashboard backend"
    );

    let app = build_router(AppState::new(market, repo, &config.market_index));
    serve(app, config.port).await;
    Ok(())
}

async fn serve(app: Router, port: u16) {
    // Try to bind to the requested port; if it's in use, try a few subsequent ports.
    let max_attempts = 10;
    for offset in 0..max_attempts {
        let try_port = port.saturating_add(offset);
        let addr = SocketAddr::from(([127, 0, 0, 1], try_port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!(%addr, "Listening");
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "Server failed while serving");
                }
                return;
            }
            Err(e) => {
                warn!(port = try_port, error = %e, "Port unavailable, trying next");
            }
        }
    }
    error!("Failed to bind to any port in range {}..{}", port, port.saturating_add(max_attempts - 1));
}
