use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};

use crate::api::{parse_id, redirect_err, redirect_with, render};
use crate::core::session::Flash;
use crate::server::AppState;
use crate::service::subscription::{PaymentDetails, Period, Plan, price_cents};
use crate::service::{Error, Identity, Viewer};

#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub plan: Plan,
    pub name: &'static str,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
}

impl From<Plan> for PlanInfo {
    fn from(plan: Plan) -> Self {
        Self {
            plan,
            name: plan.name(),
            monthly_price_cents: price_cents(plan, Period::Monthly),
            yearly_price_cents: price_cents(plan, Period::Yearly),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub plan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub plan: String,
    pub period: Option<String>,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_expiry: String,
    #[serde(default)]
    pub card_cvc: String,
    #[serde(default)]
    pub card_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelForm {
    pub subscription_id: String,
}

pub async fn plans(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    let has_active_subscription = match viewer.user_id() {
        Some(uid) => match state.subscription_svc.active_subscription(uid).await {
            Ok(active) => active.is_some(),
            Err(e) => {
                tracing::error!("Failed to check subscription: {}", e);
                false
            }
        },
        None => false,
    };
    let plans: Vec<PlanInfo> = [Plan::Premium, Plan::Family].into_iter().map(Into::into).collect();
    render(
        &state,
        &viewer,
        "subscription/plans",
        serde_json::json!({
            "plans": plans,
            "has_active_subscription": has_active_subscription,
        }),
    )
    .into_response()
}

/// Checkout page; an unknown plan falls back to premium.
pub async fn create_page(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PlanQuery>,
) -> Response {
    let plan = query.plan.as_deref().and_then(Plan::parse).unwrap_or_default();
    render(
        &state,
        &viewer,
        "subscription/create",
        serde_json::json!({
            "selected_plan": PlanInfo::from(plan),
            "periods": [Period::Monthly, Period::Yearly],
        }),
    )
    .into_response()
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<CheckoutForm>,
) -> Redirect {
    let plan = Plan::parse(&form.plan);
    let period = match form.period.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        None => Some(Period::Monthly),
        Some(p) => Period::parse(p),
    };
    let (Some(plan), Some(period)) = (plan, period) else {
        return redirect_err(
            &state,
            &viewer,
            "/subscription/plans",
            Error::BadRequest("Unknown plan or billing period".to_string()).into(),
            "Failed to create subscription",
        );
    };
    let payment = PaymentDetails {
        card_number: form.card_number,
        card_expiry: form.card_expiry,
        card_cvc: form.card_cvc,
        card_name: form.card_name,
    };
    match state
        .subscription_svc
        .purchase(identity.user.id, plan, period, &payment)
        .await
    {
        Ok(_) => redirect_with(
            &state,
            &viewer,
            "/subscription/success",
            Flash::success("Subscription activated"),
        ),
        Err(e) => redirect_err(
            &state,
            &viewer,
            "/subscription/plans",
            e,
            "Failed to create subscription",
        ),
    }
}

pub async fn success(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    render(&state, &viewer, "subscription/success", serde_json::json!({})).into_response()
}

/// Runs the expiry sweep before listing, so statuses are current.
pub async fn my_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
) -> Response {
    if let Err(e) = state.subscription_svc.check_expired_subscriptions().await {
        tracing::error!("Subscription sweep failed: {}", e);
    }

    let uid = identity.user.id;
    let result = async {
        let subscriptions = state.subscription_svc.user_subscriptions(uid).await?;
        let active = state.subscription_svc.active_subscription(uid).await?;
        anyhow::Ok((subscriptions, active))
    }
    .await;

    match result {
        Ok((subscriptions, active)) => render(
            &state,
            &viewer,
            "subscription/my",
            serde_json::json!({
                "subscriptions": subscriptions,
                "active_subscription": active,
            }),
        )
        .into_response(),
        Err(e) => redirect_err(&state, &viewer, "/", e, "Failed to load subscriptions").into_response(),
    }
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<CancelForm>,
) -> Redirect {
    let result = match parse_id(&form.subscription_id, "subscription") {
        Ok(id) => state.subscription_svc.cancel_subscription(identity.user.id, id).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(_) => redirect_with(
            &state,
            &viewer,
            "/subscription/my",
            Flash::success("Subscription cancelled"),
        ),
        Err(e) => redirect_err(
            &state,
            &viewer,
            "/subscription/my",
            e,
            "Failed to cancel subscription",
        ),
    }
}
