// handlers/public/webhook.rs - POST /webhook/stripe

use axum::{body::Bytes, extract::Extension, http::HeaderMap};
use chrono::Utc;
use serde_json::{json, Value};

use crate::billing::{verify_signature, StripeEvent, StripeSubscription, SubscriptionChange};
use crate::error::ApiError;
use crate::handlers::publish_plan_state;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verify the signature over the raw body, then apply subscription changes.
///
/// Events for unknown customers or prices are acknowledged so Stripe does
/// not retry them.
pub async fn stripe_post(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::service_unavailable("Stripe webhook is not configured"))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing Stripe-Signature header"))?;

    verify_signature(
        signature,
        &body,
        secret,
        Utc::now().timestamp(),
        state.config.stripe.signature_tolerance_secs,
    )
    .map_err(|e| {
        tracing::warn!("Rejected Stripe webhook: {}", e);
        ApiError::bad_request(format!("Webhook signature verification failed: {}", e))
    })?;

    let event: StripeEvent =
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("Invalid event payload: {}", e)))?;
    let event_id = event.id.clone();
    tracing::info!("Stripe event {} ({})", event_id, event.event_type);

    let change = event
        .into_change()
        .map_err(|e| ApiError::bad_request(format!("Invalid subscription object: {}", e)))?;
    match change {
        SubscriptionChange::Upserted(subscription) => apply_subscription(&state, subscription).await?,
        SubscriptionChange::Deleted(subscription) => cancel_subscription(&state, subscription).await?,
        SubscriptionChange::Ignored(kind) => tracing::debug!("Ignoring Stripe event type {}", kind),
    }

    Ok(ApiResponse::success(json!({ "received": true, "id": event_id })))
}

async fn apply_subscription(state: &AppState, subscription: StripeSubscription) -> Result<(), ApiError> {
    let Some(user) = state.users().find_by_stripe_customer(&subscription.customer).await? else {
        tracing::warn!("No user for Stripe customer {}", subscription.customer);
        return Ok(());
    };
    let Some(price_id) = subscription.price_id() else {
        tracing::warn!("Stripe subscription {} has no price", subscription.id);
        return Ok(());
    };
    let Some(plan) = state.plans().find_by_price_id(price_id).await? else {
        tracing::warn!("No plan for Stripe price {}", price_id);
        return Ok(());
    };

    let user = state
        .users()
        .apply_stripe_subscription(
            user.id,
            &plan.code,
            subscription.local_status(),
            &subscription.id,
            subscription.period_end(),
        )
        .await?;
    tracing::info!("User {} is now on plan {} ({:?})", user.id, plan.code, user.subscription_status);
    publish_plan_state(state, &user).await
}

async fn cancel_subscription(state: &AppState, subscription: StripeSubscription) -> Result<(), ApiError> {
    let Some(user) = state.users().find_by_stripe_subscription(&subscription.id).await? else {
        tracing::warn!("No user for Stripe subscription {}", subscription.id);
        return Ok(());
    };
    let user = state.users().cancel_stripe_subscription(user.id).await?;
    tracing::info!("User {} subscription canceled, back on the free plan", user.id);
    publish_plan_state(state, &user).await
}
