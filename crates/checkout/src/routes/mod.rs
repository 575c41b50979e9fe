//! HTTP route handlers for the checkout.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                   - Current checkout step (site or payment)
//! GET  /health             - Health check
//!
//! # Checkout
//! POST /checkout/selection - Update site/plan selection
//! POST /checkout/continue  - Apply selection and advance to payment
//! POST /checkout/back      - Return to site selection
//! POST /checkout/pay       - Submit card details (rate limited)
//!
//! # Confirmation
//! GET  /success            - Confirmation screen
//! GET  /success/email      - Welcome email preview (fragment, delayed)
//! GET  /portal             - Redirect to the parent portal
//! ```

pub mod checkout;
pub mod success;

use axum::{
    Router,
    http::{HeaderValue, header::CACHE_CONTROL},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir, set_header::SetResponseHeaderLayer, trace::DefaultOnResponse,
    trace::OnResponse, trace::TraceLayer,
};
use tracing::Span;

use crate::middleware;
use crate::state::AppState;

/// Static assets directory, relative to the workspace root.
const STATIC_DIR: &str = "crates/checkout/static";

/// Fingerprinted assets never change under the same name.
const STATIC_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Create the checkout routes router.
///
/// When `rate_limit` is set, payment submissions are limited per client IP.
pub fn checkout_routes(rate_limit: bool) -> Router<AppState> {
    let pay = Router::new().route("/pay", post(checkout::pay));
    let pay = if rate_limit {
        pay.route_layer(middleware::payment_rate_limiter())
    } else {
        pay
    };

    Router::new()
        .route("/selection", post(checkout::update_selection))
        .route("/continue", post(checkout::continue_to_payment))
        .route("/back", post(checkout::back))
        .merge(pay)
}

/// Create the confirmation routes router.
pub fn success_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(success::show))
        .route("/email", get(success::email))
}

/// Create all page routes for the checkout.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .nest("/checkout", checkout_routes(rate_limit))
        .nest("/success", success_routes())
        .route("/portal", get(success::portal))
}

/// Build the full application: routes, static files, sessions, and the
/// middleware stack (everything except the Sentry layers).
pub fn app(state: AppState) -> Router {
    let session_layer =
        middleware::create_session_layer(state.sessions().clone(), state.config());

    let static_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(STATIC_CACHE_CONTROL),
        ))
        .service(ServeDir::new(STATIC_DIR));

    Router::new()
        .route("/health", get(health))
        .merge(routes(state.config().rate_limit))
        .nest_service("/static", static_files)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use bgr_core::Price;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{CheckoutConfig, TimingConfig};
    use crate::middleware::session::SESSION_COOKIE_NAME;
    use crate::services::{Authorizer, CardInput, PaymentError};

    const DEMO_CARD: &str =
        "cardholder_name=John+Doe&card_number=4242424242424242&expiry_date=1225&cvv=123";

    fn test_config() -> CheckoutConfig {
        CheckoutConfig {
            timing: TimingConfig {
                payment_latency: Duration::ZERO,
                email_delay: Duration::ZERO,
            },
            rate_limit: false,
            ..CheckoutConfig::default()
        }
    }

    /// One browser: a router plus the session cookie it was handed.
    struct Browser {
        app: Router,
        cookie: Option<String>,
    }

    impl Browser {
        fn new(state: AppState) -> Self {
            Self {
                app: app(state),
                cookie: None,
            }
        }

        async fn send(
            &mut self,
            request: axum::http::request::Builder,
            body: Body,
        ) -> Response<Body> {
            let request = match &self.cookie {
                Some(cookie) => request.header(header::COOKIE, cookie),
                None => request,
            };
            let response = self
                .app
                .clone()
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();

            let issued = response
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find(|v| v.starts_with(SESSION_COOKIE_NAME))
                .and_then(|v| v.split(';').next())
                .map(str::to_string);
            if issued.is_some() {
                self.cookie = issued;
            }
            response
        }

        async fn get(&mut self, uri: &str) -> Response<Body> {
            self.send(Request::builder().uri(uri), Body::empty()).await
        }

        async fn post(&mut self, uri: &str, form: &str) -> Response<Body> {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            self.send(request, Body::from(form.to_string())).await
        }

        async fn page(&mut self, uri: &str) -> String {
            let response = self.get(uri).await;
            assert_eq!(response.status(), StatusCode::OK);
            body_text(response).await
        }
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    /// Choose Hydrate on the semester plan and advance to payment.
    async fn reach_payment(browser: &mut Browser) {
        let response = browser
            .post("/checkout/continue", "site_id=2&plan_type=semester")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    struct DeclineAll;

    impl Authorizer for DeclineAll {
        fn authorize(&self, _card: &CardInput, _amount: Price) -> Result<(), PaymentError> {
            Err(PaymentError::Declined {
                reason: "Card declined by issuer".to_string(),
            })
        }
    }

    /// Approves every charge and counts them.
    #[derive(Default)]
    struct CountCharges(AtomicUsize);

    impl Authorizer for CountCharges {
        fn authorize(&self, _card: &CardInput, _amount: Price) -> Result<(), PaymentError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_health() {
        let mut browser = Browser::new(AppState::new(test_config()));
        assert_eq!(browser.page("/health").await, "ok");
    }

    #[tokio::test]
    async fn test_starts_at_site_step() {
        let mut browser = Browser::new(AppState::new(test_config()));
        let html = browser.page("/").await;
        assert!(html.contains("Select a Site"));
        assert!(html.contains("Hydrate - Bethesda, MD"));
        assert!(html.contains("data-continue disabled"));
    }

    #[tokio::test]
    async fn test_continue_without_site_is_noop() {
        let mut browser = Browser::new(AppState::new(test_config()));
        let response = browser.post("/checkout/continue", "plan_type=annual").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = browser.page("/").await;
        assert!(html.contains("Select a Site"));
        assert!(!html.contains("Payment Details"));
    }

    #[tokio::test]
    async fn test_selection_shows_prices() {
        let mut browser = Browser::new(AppState::new(test_config()));
        browser.post("/checkout/selection", "site_id=4").await;

        let html = browser.page("/").await;
        assert!(html.contains(r#"<option value="4" selected>"#));
        assert!(html.contains("$165"));
        assert!(html.contains("$625"));
        assert!(html.contains("$1150"));
        assert!(!html.contains("data-continue disabled"));
    }

    #[tokio::test]
    async fn test_back_preserves_selection() {
        let mut browser = Browser::new(AppState::new(test_config()));
        browser
            .post("/checkout/continue", "site_id=3&plan_type=annual")
            .await;
        assert!(browser.page("/").await.contains("Payment Details"));

        browser.post("/checkout/back", "").await;
        let html = browser.page("/").await;
        assert!(html.contains(r#"<option value="3" selected>"#));
        assert!(html.contains(r#"value="annual" checked"#));
    }

    #[tokio::test]
    async fn test_selection_frozen_in_payment_step() {
        let mut browser = Browser::new(AppState::new(test_config()));
        reach_payment(&mut browser).await;

        let response = browser.post("/checkout/selection", "site_id=1").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(browser.page("/").await.contains("Hydrate"));
    }

    #[tokio::test]
    async fn test_unknown_plan_is_bad_request() {
        let mut browser = Browser::new(AppState::new(test_config()));
        let response = browser.post("/checkout/selection", "plan_type=weekly").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_payment_step_prefilled_with_demo_card() {
        let mut browser = Browser::new(AppState::new(test_config()));
        reach_payment(&mut browser).await;

        let html = browser.page("/").await;
        assert!(html.contains("Payment Details"));
        assert!(html.contains("Hydrate"));
        assert!(html.contains("Semester"));
        assert!(html.contains("$650"));
        assert!(html.contains(r#"value="4242 4242 4242 4242""#));
        assert!(html.contains(r#"value="12/25""#));
    }

    #[tokio::test]
    async fn test_empty_card_field_stays_on_payment() {
        let mut browser = Browser::new(AppState::new(test_config()));
        reach_payment(&mut browser).await;

        let response = browser
            .post(
                "/checkout/pay",
                "cardholder_name=John+Doe&card_number=4242424242424242&expiry_date=1225&cvv=",
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Please fill in all card fields"));
        assert!(html.contains(r#"value="4242 4242 4242 4242""#));

        assert!(browser.page("/").await.contains("Payment Details"));
        let html = browser.page("/success").await;
        assert!(!html.contains("Registration Summary"));
    }

    #[tokio::test]
    async fn test_pay_outside_payment_step_redirects_home() {
        let mut browser = Browser::new(AppState::new(test_config()));
        let response = browser.post("/checkout/pay", DEMO_CARD).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_successful_payment_hands_off_to_confirmation() {
        let mut browser = Browser::new(AppState::new(test_config()));
        reach_payment(&mut browser).await;

        let response = browser.post("/checkout/pay", DEMO_CARD).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/success");

        let html = browser.page("/success").await;
        assert!(html.contains("Registration Summary"));
        assert!(html.contains("Hydrate"));
        assert!(html.contains("Semester"));
        assert!(html.contains("$650"));
        assert!(html.contains("data-email-preview"));

        let email = browser.page("/success/email").await;
        assert!(email.contains("Welcome to Boys Gotta Run!"));
        assert!(email.contains("Hydrate"));
        assert!(email.contains("Semester"));
        assert!(email.contains("$650"));

        // Flow was reset for the next registration
        assert!(browser.page("/").await.contains("Select a Site"));
    }

    #[tokio::test]
    async fn test_confirmation_without_record() {
        let mut browser = Browser::new(AppState::new(test_config()));
        let html = browser.page("/success").await;
        assert!(html.contains("Registration Complete"));
        assert!(!html.contains("Registration Summary"));

        let email = browser.page("/success/email").await;
        assert!(email.contains("registration is confirmed"));
    }

    #[tokio::test]
    async fn test_declined_payment_renders_inline() {
        let state = AppState::with_authorizer(test_config(), Arc::new(DeclineAll));
        let mut browser = Browser::new(state);
        reach_payment(&mut browser).await;

        let response = browser.post("/checkout/pay", DEMO_CARD).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("Card declined by issuer"));

        let html = browser.page("/success").await;
        assert!(!html.contains("Registration Summary"));
    }

    #[tokio::test]
    async fn test_portal_redirect() {
        let mut browser = Browser::new(AppState::new(test_config()));
        let response = browser.get("/portal").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("https://parent.gofast.com"));
    }

    #[tokio::test]
    async fn test_session_cookie_attributes() {
        let mut browser = Browser::new(AppState::new(test_config()));
        let response = browser.post("/checkout/selection", "site_id=1").await;
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with(SESSION_COOKIE_NAME));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn test_plan_survives_site_change() {
        let mut browser = Browser::new(AppState::new(test_config()));
        browser.post("/checkout/selection", "site_id=2").await;
        // Clicking a plan radio posts the whole form
        browser
            .post("/checkout/selection", "site_id=2&plan_type=annual")
            .await;

        let html = browser.page("/").await;
        assert!(html.contains(r#"value="annual" data-autosubmit checked"#));
        // No stale hidden plan rides along with the dropdown
        assert!(!html.contains(r#"type="hidden" name="plan_type""#));

        browser
            .post("/checkout/selection", "site_id=3&plan_type=annual")
            .await;
        let html = browser.page("/").await;
        assert!(html.contains(r#"<option value="3" selected>"#));
        assert!(html.contains(r#"value="annual" data-autosubmit checked"#));

        // A post without a plan leaves it alone
        browser.post("/checkout/selection", "site_id=4").await;
        let html = browser.page("/").await;
        assert!(html.contains(r#"<option value="4" selected>"#));
        assert!(html.contains(r#"value="annual" data-autosubmit checked"#));
    }

    #[tokio::test]
    async fn test_site_step_is_one_form() {
        let mut browser = Browser::new(AppState::new(test_config()));
        browser.post("/checkout/selection", "site_id=1").await;

        let html = browser.page("/").await;
        assert_eq!(html.matches("<form").count(), 1);
        assert!(html.contains(r#"formaction="/checkout/continue""#));
    }

    #[tokio::test]
    async fn test_cookieless_sessions_are_bounded() {
        let state = AppState::new(CheckoutConfig {
            session_capacity: 8,
            ..test_config()
        });
        let app = app(state.clone());

        for _ in 0..40 {
            let request = Request::builder().uri("/success").body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(state.sessions().live_sessions().await <= 8);
    }

    #[tokio::test]
    async fn test_idle_session_is_dropped() {
        let mut browser = Browser::new(AppState::new(CheckoutConfig {
            session_idle_timeout: Duration::from_millis(50),
            ..test_config()
        }));
        browser.post("/checkout/selection", "site_id=2").await;
        assert!(browser.page("/").await.contains(r#"<option value="2" selected>"#));

        tokio::time::sleep(Duration::from_millis(120)).await;

        let html = browser.page("/").await;
        assert!(!html.contains(r#"<option value="2" selected>"#));
        assert!(html.contains("data-continue disabled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_pay_follows_first_to_confirmation() {
        let charges = Arc::new(CountCharges::default());
        let config = CheckoutConfig {
            timing: TimingConfig {
                payment_latency: Duration::from_millis(1500),
                email_delay: Duration::ZERO,
            },
            ..test_config()
        };
        let mut browser = Browser::new(AppState::with_authorizer(config, charges.clone()));
        reach_payment(&mut browser).await;
        // Rendering the payment step issues the form ID both clicks share
        browser.page("/").await;

        let pay = |browser: &Browser| {
            let request = Request::builder()
                .method("POST")
                .uri("/checkout/pay")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::COOKIE, browser.cookie.clone().unwrap())
                .body(Body::from(DEMO_CARD))
                .unwrap();
            browser.app.clone().oneshot(request)
        };
        let (first, second) = tokio::join!(pay(&browser), pay(&browser));

        for response in [first.unwrap(), second.unwrap()] {
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/success");
        }
        assert_eq!(charges.0.load(Ordering::SeqCst), 1);

        let html = browser.page("/success").await;
        assert!(html.contains("Registration Summary"));
        assert!(html.contains("Hydrate"));
    }
}
