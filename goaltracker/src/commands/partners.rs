//! Accountability partner commands

use super::loaded_goal_store;
use crate::app::AppState;
use crate::config::DEFAULT_REFLECTION_LIMIT;
use crate::database::{AccountabilityPartner, NewPartner, RecordId};
use crate::error::{AppError, Result};
use crate::services::partners::{invitation_mailto, partner_view, PartnerView};

pub async fn invite_partner(
    state: &AppState,
    partner: NewPartner,
) -> Result<AccountabilityPartner> {
    let store = loaded_goal_store(state).await?;
    state
        .session
        .partners()?
        .invite(partner, store.goals())
        .await
}

pub async fn list_partners(state: &AppState) -> Result<Vec<AccountabilityPartner>> {
    state.session.partners()?.list().await
}

/// What one partner can see of the user's goals and reflections
pub async fn view_as_partner(state: &AppState, partner_id: &str) -> Result<PartnerView> {
    let id = RecordId::parse(partner_id)
        .ok_or_else(|| AppError::Validation(format!("Invalid partner id: {}", partner_id)))?;

    let partner = state
        .session
        .partners()?
        .list()
        .await?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::Generic(format!("Partner not found: {}", id)))?;

    let store = loaded_goal_store(state).await?;
    let reflections = if partner.privacy_settings.share_reflections {
        state
            .session
            .reflections()?
            .list_recent(Some(DEFAULT_REFLECTION_LIMIT))
            .await?
    } else {
        Vec::new()
    };

    Ok(partner_view(&partner, store.goals(), &reflections))
}

/// `mailto:` invitation for the signed-in user
pub fn invitation_email(state: &AppState, link: &str) -> Result<String> {
    let user = state.session.require_user()?;
    Ok(invitation_mailto(&user.name, link))
}
