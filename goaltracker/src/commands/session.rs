//! Session commands
//!
//! Sign in, sign up, sign out and profile updates.

use crate::app::AppState;
use crate::database::{User, UserUpdate};
use crate::error::{AppError, Result};

pub async fn login(state: &mut AppState, email: &str, password: &str) -> Result<User> {
    state.session.login(email, password).await
}

pub async fn register(
    state: &mut AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    state.session.register(name, email, password).await
}

pub async fn logout(state: &mut AppState) -> Result<()> {
    state.session.logout().await;
    Ok(())
}

/// Currently signed-in user
pub fn current_user(state: &AppState) -> Result<User> {
    state.session.require_user().cloned()
}

pub async fn update_profile(
    state: &mut AppState,
    name: Option<String>,
    onboarding_completed: Option<bool>,
) -> Result<User> {
    let update = UserUpdate {
        name,
        onboarding_completed,
    };
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    state.session.update_user(update).await
}
