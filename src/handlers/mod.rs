// handlers/mod.rs - Three-tier handler layout
//
// Public (no auth) → Protected (JWT auth) → Elevated (admin role)
pub mod public;    // Tier 1: auth, public page views, edge responder, Stripe webhook
pub mod protected; // Tier 2: JWT authentication required (/api/*)
pub mod elevated;  // Tier 3: admin role required (/api/admin/*)

use crate::database::models::user::User;
use crate::error::ApiError;
use crate::events::EventKind;
use crate::state::AppState;

/// Push the user's current plan, limits and page count to live subscribers
pub(crate) async fn publish_plan_state(state: &AppState, user: &User) -> Result<(), ApiError> {
    let limits = state.plans().limits_for(user).await?;
    let page_count = state.pages().count_for_user(user.id).await?;

    state.events.publish(
        user.id,
        EventKind::Subscription {
            plan: user.subscription_plan.clone(),
            status: user.subscription_status,
        },
    );
    state.events.publish(
        user.id,
        EventKind::Limits {
            pages: limits.pages,
            views_per_page: limits.views_per_page,
        },
    );
    state.events.publish(
        user.id,
        EventKind::PageCount {
            page_count,
            can_create: user.can_create_page(page_count, &limits),
        },
    );
    Ok(())
}
