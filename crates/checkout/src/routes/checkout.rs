//! Checkout flow route handlers.
//!
//! The two wizard steps are rendered from the [`CheckoutFlow`] stored in the
//! session. Every mutation is a plain form post answered with a redirect back
//! to `/`, except payment failures, which re-render the payment step inline.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use bgr_core::{Catalog, CheckoutFlow, PlanType, Selection, Site, SiteId, Step};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::models::session as session_data;
use crate::services::{CardInput, PaymentError, Submission, handoff};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// One entry of the site dropdown.
#[derive(Clone)]
pub struct SiteOptionView {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

/// One plan radio button with its price for the selected site.
#[derive(Clone)]
pub struct PlanOptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub price: String,
    pub cadence: &'static str,
    pub checked: bool,
}

/// Details of the selected site shown under the dropdown.
#[derive(Clone)]
pub struct SiteDetailsView {
    pub id: String,
    pub name: String,
    pub location: String,
    pub plans: Vec<PlanOptionView>,
}

/// Order summary shown above the card form.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub site_name: String,
    pub plan_label: &'static str,
    pub price: String,
}

/// Card form values as they are displayed back to the user.
#[derive(Clone)]
pub struct CardFormView {
    pub cardholder_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    pub error: Option<String>,
}

impl From<&CardInput> for CardFormView {
    fn from(card: &CardInput) -> Self {
        Self {
            cardholder_name: card.cardholder_name().to_string(),
            card_number: card.card_number().expose_secret().to_string(),
            expiry_date: card.expiry_date().to_string(),
            cvv: card.cvv().expose_secret().to_string(),
            error: None,
        }
    }
}

fn site_options(catalog: &Catalog, selection: &Selection) -> Vec<SiteOptionView> {
    catalog
        .sites()
        .iter()
        .map(|site| SiteOptionView {
            id: site.id.to_string(),
            label: site.label(),
            selected: selection.site_id.as_ref() == Some(&site.id),
        })
        .collect()
}

fn site_details(site: &Site, plan_type: PlanType) -> SiteDetailsView {
    SiteDetailsView {
        id: site.id.to_string(),
        name: site.name.clone(),
        location: site.location.clone(),
        plans: PlanType::ALL
            .iter()
            .map(|plan| PlanOptionView {
                value: plan.as_str(),
                label: plan.label(),
                price: site.pricing.get(*plan).to_string(),
                cadence: plan.cadence(),
                checked: *plan == plan_type,
            })
            .collect(),
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Step one: site and plan selection.
///
/// The dropdown and the plan radios post together, so a site change always
/// carries the plan currently checked.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/site.html")]
pub struct SiteStepTemplate {
    pub sites: Vec<SiteOptionView>,
    pub details: Option<SiteDetailsView>,
    pub can_continue: bool,
}

/// Step two: card details.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentStepTemplate {
    pub summary: OrderSummaryView,
    pub card: CardFormView,
}

fn site_step(catalog: &Catalog, selection: &Selection) -> SiteStepTemplate {
    let site = selection.selected_site(catalog);
    SiteStepTemplate {
        sites: site_options(catalog, selection),
        details: site.map(|s| site_details(s, selection.plan_type)),
        can_continue: site.is_some(),
    }
}

/// Build the payment step, or `None` if the selection no longer resolves.
fn payment_step(
    catalog: &Catalog,
    selection: &Selection,
    card: CardFormView,
) -> Option<PaymentStepTemplate> {
    let site = selection.selected_site(catalog)?;
    Some(PaymentStepTemplate {
        summary: OrderSummaryView {
            site_name: site.name.clone(),
            plan_label: selection.plan_type.label(),
            price: site.pricing.get(selection.plan_type).to_string(),
        },
        card,
    })
}

// =============================================================================
// Form Types
// =============================================================================

/// Site and plan picker form.
///
/// Fields are optional so a post can change just one of them. An empty
/// `site_id` clears the site.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionForm {
    pub site_id: Option<String>,
    pub plan_type: Option<String>,
}

/// Card details form. Missing fields arrive as empty strings.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PaymentForm {
    pub cardholder_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

fn apply_selection(flow: &mut CheckoutFlow, form: &SelectionForm) -> Result<()> {
    if let Some(raw) = form.site_id.as_deref() {
        flow.select_site(SiteId::from_form(Some(raw)))?;
    }
    if let Some(raw) = form.plan_type.as_deref() {
        let plan = raw
            .parse::<PlanType>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        flow.select_plan(plan)?;
    }
    Ok(())
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Display the current checkout step.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response> {
    let mut flow = session_data::load_flow(&session).await?;

    if flow.step() == Step::Payment {
        session_data::payment_form_id(&session).await?;
        let card = CardFormView::from(&CardInput::demo());
        if let Some(page) = payment_step(state.catalog(), flow.selection(), card) {
            return Ok(page.into_response());
        }
        // Selected site vanished from the catalog; fall back to selection
        tracing::warn!("Payment step without a resolvable site");
        flow.back();
        session_data::save_flow(&session, &flow).await?;
    }

    Ok(site_step(state.catalog(), flow.selection()).into_response())
}

/// Update the site or plan selection.
#[instrument(skip(session))]
pub async fn update_selection(
    session: Session,
    Form(form): Form<SelectionForm>,
) -> Result<Redirect> {
    let mut flow = session_data::load_flow(&session).await?;
    apply_selection(&mut flow, &form)?;
    session_data::save_flow(&session, &flow).await?;
    Ok(Redirect::to("/"))
}

/// Apply the posted selection, then move to the payment step.
///
/// Without a selected site this is a no-op and the site step is shown again.
#[instrument(skip(session))]
pub async fn continue_to_payment(
    session: Session,
    Form(form): Form<SelectionForm>,
) -> Result<Redirect> {
    let mut flow = session_data::load_flow(&session).await?;

    if flow.step() == Step::Site {
        apply_selection(&mut flow, &form)?;
    }

    if flow.advance() {
        let site_id = flow
            .selection()
            .site_id
            .as_ref()
            .map_or("", SiteId::as_str)
            .to_string();
        let plan = flow.selection().plan_type.as_str();
        add_breadcrumb(
            "checkout",
            "Advanced to payment",
            Some(&[("site_id", site_id.as_str()), ("plan_type", plan)]),
        );
        tracing::info!(site_id = %site_id, plan = %plan, "Advanced to payment");
    } else {
        tracing::debug!("Continue ignored");
    }

    session_data::save_flow(&session, &flow).await?;
    Ok(Redirect::to("/"))
}

/// Return to site selection, keeping the selection.
#[instrument(skip(session))]
pub async fn back(session: Session) -> Result<Redirect> {
    let mut flow = session_data::load_flow(&session).await?;
    flow.back();
    session_data::save_flow(&session, &flow).await?;
    Ok(Redirect::to("/"))
}

/// Submit the card form.
///
/// On success the checkout record is written to the session before the
/// redirect to `/success` is returned. A repeat submission while the first is
/// processing waits for it and follows it to `/success`. Failures re-render
/// the payment step with the message and the formatted values.
#[instrument(skip(state, session, form))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let flow = session_data::load_flow(&session).await?;
    if flow.step() != Step::Payment {
        return Ok(Redirect::to("/").into_response());
    }
    let Some(price) = flow.selection().price(state.catalog()) else {
        return Ok(Redirect::to("/").into_response());
    };

    let card = CardInput::from_raw(
        &form.cardholder_name,
        &form.card_number,
        &form.expiry_date,
        &form.cvv,
    );
    let form_id = session_data::payment_form_id(&session).await?;

    match state.payments().submit(&form_id, &card, price).await {
        Ok(Submission::Charged(receipt)) => {
            handoff::commit(&session, state.catalog(), flow.selection()).await?;
            session_data::clear_flow(&session).await?;

            let reference = receipt.reference.to_string();
            add_breadcrumb(
                "checkout",
                "Payment completed",
                Some(&[("reference", reference.as_str())]),
            );
            Ok(Redirect::to("/success").into_response())
        }
        // The charging request writes the record
        Ok(Submission::Joined) => Ok(Redirect::to("/success").into_response()),
        Err(err) => {
            let status = match &err {
                PaymentError::Interrupted => StatusCode::CONFLICT,
                PaymentError::Validation | PaymentError::Declined { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            };
            let mut view = CardFormView::from(&card);
            view.error = Some(err.to_string());

            let page = payment_step(state.catalog(), flow.selection(), view)
                .ok_or_else(|| AppError::Internal("selection lost during payment".to_string()))?;
            Ok((status, page).into_response())
        }
    }
}
