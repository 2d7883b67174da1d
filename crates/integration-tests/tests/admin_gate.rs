//! The `/admin` role gate, driven through a real router and session layer.

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{Method, StatusCode, header},
    middleware::{self, Next},
    response::{Html, Response},
    routing::get,
};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use mytechgear_admin::middleware::{Staff, require_admin, set_current_staff};
use mytechgear_admin::models::CurrentStaff;
use mytechgear_core::{Email, UserId};
use mytechgear_integration_tests::StaticRoleSource;

const STAFF_EMAIL: &str = "camille@mytechgear.fr";
const PRODUCT_TABLE: &str = "<table id=\"product-table\"></table>";

/// Puts a signed-in identity into the session before the gate runs.
async fn signed_in(session: Session, request: Request, next: Next) -> Response {
    let staff = CurrentStaff {
        id: UserId::random(),
        email: Email::parse(STAFF_EMAIL).unwrap(),
    };
    set_current_staff(&session, &staff).await.unwrap();
    next.run(request).await
}

async fn product_table() -> Html<&'static str> {
    Html(PRODUCT_TABLE)
}

async fn whoami(Staff(staff): Staff) -> String {
    staff.email.to_string()
}

fn app(roles: StaticRoleSource, sign_in: bool) -> Router {
    let gated = Router::new()
        .route("/admin/products", get(product_table).post(product_table))
        .route("/admin/whoami", get(whoami))
        .route_layer(middleware::from_fn_with_state(
            roles,
            require_admin::<StaticRoleSource>,
        ));
    let gated = if sign_in {
        gated.layer(middleware::from_fn(signed_in))
    } else {
        gated
    };
    gated.layer(SessionManagerLayer::new(MemoryStore::default()))
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, location, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_customer_sees_forbidden_not_products() {
    let (status, _, body) = send(
        app(StaticRoleSource::customer(), true),
        Method::GET,
        "/admin/products",
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Access denied"));
    assert!(body.contains(STAFF_EMAIL));
    assert!(!body.contains("product-table"));
}

#[tokio::test]
async fn test_admin_reaches_products() {
    let (status, _, body) = send(
        app(StaticRoleSource::admin(), true),
        Method::GET,
        "/admin/products",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PRODUCT_TABLE);
}

#[tokio::test]
async fn test_authorized_request_carries_staff() {
    let (status, _, body) = send(
        app(StaticRoleSource::admin(), true),
        Method::GET,
        "/admin/whoami",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, STAFF_EMAIL);
}

#[tokio::test]
async fn test_anonymous_page_request_redirects_to_login() {
    let (status, location, body) = send(
        app(StaticRoleSource::admin(), false),
        Method::GET,
        "/admin/products",
    )
    .await;

    assert!(status.is_redirection());
    assert_eq!(location.as_deref(), Some("/auth/login"));
    assert!(!body.contains("product-table"));
}

#[tokio::test]
async fn test_anonymous_write_is_unauthorized() {
    let (status, location, _) = send(
        app(StaticRoleSource::admin(), false),
        Method::POST,
        "/admin/products",
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(location.is_none());
}

#[tokio::test]
async fn test_role_lookup_failure_offers_retry() {
    let (status, _, body) = send(
        app(StaticRoleSource::failing("pool timed out"), true),
        Method::GET,
        "/admin/products?q=falcon",
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("q=falcon"));
    assert!(!body.contains("product-table"));
}
