use crate::{AppState, build_router};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use stock_dashboard::domain::models::{PricePoint, PriceSeries};
use stock_dashboard::infra::sqlite::repo::SqliteRepo;
use stock_dashboard::market_data::InMemoryMarketData;
use tower::ServiceExt; // for `oneshot`

// Daily closes ending today, so handlers that use the wall clock find them
fn series_ending_today(ticker: &str, prices: &[i64]) -> PriceSeries {
    let today = Utc::now().date_naive();
    let first = today - Days::new(prices.len() as u64 - 1);
    let points = prices
        .iter()
        .enumerate()
        .map(|(i, p)| PricePoint::new(first + Days::new(i as u64), Decimal::from(*p)))
        .collect();
    PriceSeries::new(ticker, points).unwrap()
}

async fn app() -> Router {
    let market = Arc::new(InMemoryMarketData::new(vec![
        series_ending_today("^GSPC", &[100, 102, 101, 104, 103, 106]),
        series_ending_today("AAPL", &[50, 52, 50, 55, 53, 58]),
    ]));
    let repo = Arc::new(SqliteRepo::in_memory().await.expect("in-memory db"));
    build_router(AppState::new(market, repo, "^GSPC"))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().uri(uri);
    if let Some(u) = user {
        b = b.header("x-user", u);
    }
    b.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut b = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(u) = user {
        b = b.header("x-user", u);
    }
    b.body(Body::from(body.to_string())).unwrap()
}

fn yesterday() -> NaiveDate {
    Utc::now().date_naive() - Days::new(1)
}

#[tokio::test]
async fn test_portfolio_flow_with_mock_market() {
    let app = app().await;

    let (status, _) = send(&app, get("/api/portfolio", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for (ticker, shares, price) in [("AAPL", "10", "40"), ("aapl", "5", "70"), ("ZZZZ", "1", "9")] {
        let body = json!({
            "ticker": ticker,
            "shares": shares,
            "purchase_price": price,
            "purchase_date": yesterday(),
        });
        let (status, tx) = send(&app, send_json("POST", "/api/transactions", Some("alice"), body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(tx["id"].is_i64());
    }

    let bad = json!({"ticker": "AAPL", "shares": "0", "purchase_price": "1", "purchase_date": yesterday()});
    let (status, err) = send(&app, send_json("POST", "/api/transactions", Some("alice"), bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["error"].as_str().unwrap().contains("Shares"));

    let (status, report) = send(&app, get("/api/portfolio", Some("alice"))).await;
    assert_eq!(status, StatusCode::OK);
    let positions = report["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["ticker"], "AAPL");
    // 15 shares, cost 750, last close 58
    assert_eq!(positions[0]["total_cost"].as_str().map(|s| s.parse::<Decimal>().unwrap()), Some(Decimal::from(750)));
    assert_eq!(positions[0]["current_value"].as_str().map(|s| s.parse::<Decimal>().unwrap()), Some(Decimal::from(870)));
    assert_eq!(report["unresolved"], json!(["ZZZZ"]));
}

#[tokio::test]
async fn test_watchlist_endpoints() {
    let app = app().await;

    let (status, body) = send(&app, send_json("POST", "/api/watchlist", Some("bob"), json!({"ticker": "aapl"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ticker": "AAPL", "added": true}));

    let (_, body) = send(&app, send_json("POST", "/api/watchlist", Some("bob"), json!({"ticker": "AAPL"}))).await;
    assert_eq!(body["added"], false);

    let (status, items) = send(&app, get("/api/watchlist", Some("bob"))).await;
    assert_eq!(status, StatusCode::OK);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0]["quote"].is_object());

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/watchlist/aapl")
        .header("x-user", "bob")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["removed"], true);
}

#[tokio::test]
async fn test_capm_and_overview() {
    let app = app().await;

    let (status, report) = send(&app, get("/api/capm?ticker=aapl&years=1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["ticker"], "AAPL");
    assert_eq!(report["observations"], 5);
    assert!(report["beta"].as_f64().unwrap() > 1.0);

    let (status, _) = send(&app, get("/api/capm?ticker=MSFT", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/capm?ticker=AAPL&years=20", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, overview) = send(&app, get("/api/market-overview", None)).await;
    assert_eq!(status, StatusCode::OK);
    let overview = overview.as_array().unwrap();
    assert_eq!(overview.len(), 3);
    assert!(overview[0]["quote"].is_object());
    assert!(overview[1]["quote"].is_null());
}

#[tokio::test]
async fn test_signup_and_login() {
    let app = app().await;
    let creds = json!({"username": "carol", "password": "pw"});

    let (status, _) = send(&app, send_json("POST", "/api/signup", None, creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, send_json("POST", "/api/signup", None, creds.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, send_json("POST", "/api/login", None, creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "carol");

    let wrong = json!({"username": "carol", "password": "nope"});
    let (status, _) = send(&app, send_json("POST", "/api/login", None, wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
