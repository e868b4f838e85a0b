//! Routing after a parent logs in or registers

use app_ui::NavigationOutcome;

use crate::context::AppContext;
use crate::error::Result;
use crate::screens::{ChildProfileSelectViewModel, CreateChildViewModel};

/// Replace the whole history with the first post-login screen
///
/// A parent with children lands on profile selection; otherwise on child
/// creation.
pub async fn navigate_after_auth(cx: &AppContext, player_id: &str) -> Result<NavigationOutcome> {
    let children = cx.profiles.children_for_parent(player_id).await?;
    tracing::debug!(children = children.len(), "Routing after authentication");

    let next = cx.clone();
    let outcome = if children.is_empty() {
        cx.nav
            .clear_and_navigate_to(move || CreateChildViewModel::new(next))
            .await?
    } else {
        cx.nav
            .clear_and_navigate_to(move || ChildProfileSelectViewModel::new(next))
            .await?
    };
    Ok(outcome)
}
