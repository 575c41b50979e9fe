//! Confirmation screen route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use bgr_core::CheckoutRecord;
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::models::session as session_data;
use crate::services::{EmailReveal, HandoffError, WelcomeEmail, handoff};
use crate::state::AppState;

/// Registration summary shown on the confirmation screen.
#[derive(Clone)]
pub struct RegistrationView {
    pub site_name: String,
    pub plan_label: &'static str,
    pub price: String,
}

impl From<&CheckoutRecord> for RegistrationView {
    fn from(record: &CheckoutRecord) -> Self {
        Self {
            site_name: record.site_name.clone(),
            plan_label: record.pricing_type.label(),
            price: record.price.to_string(),
        }
    }
}

/// Confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "success/show.html")]
pub struct SuccessTemplate {
    pub registration: Option<RegistrationView>,
}

/// Welcome email preview fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/email_preview.html")]
pub struct EmailPreviewTemplate {
    pub email: WelcomeEmail,
}

/// Read the record, treating a malformed one as absent.
async fn read_record(session: &Session) -> Result<Option<CheckoutRecord>> {
    match handoff::load(session).await {
        Ok(record) => Ok(record),
        Err(HandoffError::Malformed(err)) => {
            tracing::warn!(error = %err, "Ignoring malformed checkout record");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Display the confirmation screen.
///
/// The email preview starts as a placeholder; its delay is measured from
/// this render.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<SuccessTemplate> {
    let record = read_record(&session).await?;
    session_data::mark_confirmation_mounted(&session).await?;

    Ok(SuccessTemplate {
        registration: record.as_ref().map(RegistrationView::from),
    })
}

/// Welcome email preview fragment, returned once the reveal delay has
/// elapsed since the confirmation screen was shown.
///
/// Dropping the request cancels the wait.
#[instrument(skip(state, session))]
pub async fn email(
    State(state): State<AppState>,
    session: Session,
) -> Result<EmailPreviewTemplate> {
    let mounted_at = session_data::confirmation_mounted_at(&session)
        .await?
        .unwrap_or_else(Utc::now);
    EmailReveal::new(mounted_at, state.config().timing.email_delay)
        .wait()
        .await;

    let record = read_record(&session).await?;
    tracing::debug!(has_record = record.is_some(), "Revealing welcome email");

    Ok(EmailPreviewTemplate {
        email: WelcomeEmail::compose(record.as_ref()),
    })
}

/// Leave for the external parent portal.
#[instrument(skip(state))]
pub async fn portal(State(state): State<AppState>) -> Response {
    let url = state.config().parent_portal_url.as_str();
    tracing::info!(url = %url, "Redirecting to parent portal");
    Redirect::to(url).into_response()
}
