//! Accountability partner service

use crate::config::MAX_PARTNER_NAME_LENGTH;
use crate::database::{
    AccountabilityPartner, Goal, GoalId, GoalStatus, GoalType, NewPartner, Reflection, UserId,
};
use crate::error::{AppError, Result};
use crate::repository::PartnerRepository;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A shared goal as a partner sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedGoal {
    pub id: GoalId,
    pub title: String,
    pub goal_type: GoalType,
    /// Present when progress is shared
    pub progress_percentage: Option<i64>,
    /// Present when completions are shared
    pub completed: Option<bool>,
}

/// Everything one partner may see
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerView {
    pub partner_name: String,
    pub goals: Vec<SharedGoal>,
    pub reflections: Vec<Reflection>,
    pub can_encourage: bool,
}

/// Loose address check: one `@`, a non-empty local part, a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Filter `goals` and `reflections` down to what `partner` is allowed to see
pub fn partner_view(
    partner: &AccountabilityPartner,
    goals: &[Goal],
    reflections: &[Reflection],
) -> PartnerView {
    let privacy = partner.privacy_settings;

    let goals = goals
        .iter()
        .filter(|g| partner.shared_goals.contains(&g.id))
        .map(|g| SharedGoal {
            id: g.id,
            title: g.title.clone(),
            goal_type: g.goal_type,
            progress_percentage: privacy.share_progress.then(|| g.progress_percentage()),
            completed: privacy
                .share_completions
                .then_some(g.status == GoalStatus::Completed),
        })
        .collect();

    PartnerView {
        partner_name: partner.partner_name.clone(),
        goals,
        reflections: if privacy.share_reflections {
            reflections.to_vec()
        } else {
            Vec::new()
        },
        can_encourage: privacy.allow_encouragement,
    }
}

/// `mailto:` link inviting someone to follow `inviter_name` through `link`
pub fn invitation_mailto(inviter_name: &str, link: &str) -> String {
    let subject = format!("{} invited you to be their accountability partner", inviter_name);
    let body = format!(
        "Hi there!\n\n{} has invited you to be their accountability partner on GoalTracker. \
         Join them on their goal journey and support each other in achieving your dreams!\n\n\
         Click here to accept the invitation:\n{}\n\nBest regards,\nThe GoalTracker Team",
        inviter_name, link
    );

    format!(
        "mailto:?subject={}&body={}",
        urlencoding::encode(&subject),
        urlencoding::encode(&body)
    )
}

#[derive(Clone)]
pub struct PartnerService {
    user_id: UserId,
    repository: Arc<dyn PartnerRepository>,
}

impl PartnerService {
    pub fn new(user_id: UserId, repository: Arc<dyn PartnerRepository>) -> Self {
        Self {
            user_id,
            repository,
        }
    }

    /// Invite a partner. Shared goal ids must name goals in `owned_goals`.
    pub async fn invite(
        &self,
        mut partner: NewPartner,
        owned_goals: &[Goal],
    ) -> Result<AccountabilityPartner> {
        partner.partner_name = partner.partner_name.trim().to_string();
        partner.partner_email = partner.partner_email.trim().to_string();

        if partner.partner_name.is_empty() {
            return Err(AppError::Validation(
                "Partner name cannot be empty".to_string(),
            ));
        }
        if partner.partner_name.chars().count() > MAX_PARTNER_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "Partner name cannot exceed {} characters",
                MAX_PARTNER_NAME_LENGTH
            )));
        }
        if !is_valid_email(&partner.partner_email) {
            return Err(AppError::Validation(format!(
                "Invalid partner email: {}",
                partner.partner_email
            )));
        }
        if let Some(unknown) = partner
            .shared_goals
            .iter()
            .find(|id| !owned_goals.iter().any(|g| g.id == **id))
        {
            return Err(AppError::GoalNotFound(unknown.to_string()));
        }

        let mut seen = HashSet::new();
        partner.shared_goals.retain(|id| seen.insert(*id));

        let created = self.repository.insert_partner(self.user_id, partner).await?;
        tracing::info!("Invited accountability partner {}", created.id);
        Ok(created)
    }

    /// Active partners, most recent first
    pub async fn list(&self) -> Result<Vec<AccountabilityPartner>> {
        self.repository.list_partners(self.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local_store::tests::create_test_store;
    use crate::database::{PrivacySettings, RecordId};
    use crate::repository::local::sample_goal;
    use crate::repository::LocalRepository;
    use chrono::Utc;

    async fn create_test_service() -> PartnerService {
        let repository = LocalRepository::new(create_test_store().await);
        PartnerService::new(RecordId::new(3), Arc::new(repository))
    }

    fn invite(name: &str, email: &str, shared: Vec<GoalId>) -> NewPartner {
        NewPartner {
            partner_name: name.to_string(),
            partner_email: email.to_string(),
            shared_goals: shared,
            privacy_settings: PrivacySettings::default(),
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("sam@example.com"));
        assert!(is_valid_email(" sam.lee@mail.example.org "));
        assert!(!is_valid_email("sam@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("sam@@example.com"));
        assert!(!is_valid_email("sam lee@example.com"));
        assert!(!is_valid_email("sam@example."));
    }

    #[tokio::test]
    async fn test_invite_and_list() {
        let service = create_test_service().await;
        let goals = vec![sample_goal(1, GoalType::Daily)];

        let partner = service
            .invite(invite(" Sam ", "sam@example.com", vec![RecordId::new(1)]), &goals)
            .await
            .unwrap();
        assert_eq!(partner.partner_name, "Sam");
        assert_eq!(partner.shared_goals, vec![RecordId::new(1)]);

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, partner.id);
    }

    #[tokio::test]
    async fn test_invite_validation() {
        let service = create_test_service().await;
        let goals = vec![sample_goal(1, GoalType::Daily)];

        assert!(service.invite(invite("Sam", "nope", vec![]), &goals).await.is_err());
        assert!(service
            .invite(invite("", "sam@example.com", vec![]), &goals)
            .await
            .is_err());
        assert!(service
            .invite(invite(&"x".repeat(256), "sam@example.com", vec![]), &goals)
            .await
            .is_err());
        assert!(matches!(
            service
                .invite(invite("Sam", "sam@example.com", vec![RecordId::new(9)]), &goals)
                .await,
            Err(AppError::GoalNotFound(_))
        ));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_partner_view_respects_privacy() {
        let mut shared = sample_goal(1, GoalType::Daily);
        shared.total_progress = 1;
        let hidden = sample_goal(2, GoalType::Weekly);
        let reflection = Reflection {
            id: RecordId::new(1),
            user_id: None,
            prompt: "Q".to_string(),
            response: "A".to_string(),
            created_at: Utc::now(),
        };

        let mut partner = AccountabilityPartner {
            id: RecordId::new(1),
            user_id: None,
            partner_name: "Sam".to_string(),
            partner_email: "sam@example.com".to_string(),
            shared_goals: vec![RecordId::new(1)],
            privacy_settings: PrivacySettings::default(),
            status: Default::default(),
            created_at: Utc::now(),
        };

        let goals = vec![shared, hidden];
        let view = partner_view(&partner, &goals, &[reflection.clone()]);
        assert_eq!(view.goals.len(), 1);
        assert_eq!(view.goals[0].progress_percentage, Some(100));
        assert_eq!(view.goals[0].completed, Some(false));
        assert!(view.reflections.is_empty());
        assert!(view.can_encourage);

        partner.privacy_settings = PrivacySettings {
            share_progress: false,
            share_completions: false,
            allow_encouragement: false,
            share_reflections: true,
        };
        let view = partner_view(&partner, &goals, &[reflection]);
        assert_eq!(view.goals[0].progress_percentage, None);
        assert_eq!(view.goals[0].completed, None);
        assert_eq!(view.reflections.len(), 1);
        assert!(!view.can_encourage);
    }

    #[test]
    fn test_invitation_mailto() {
        let link = invitation_mailto("Ada", "https://example.com/i/1");

        assert!(link.starts_with("mailto:?subject=Ada%20invited%20you"));
        assert!(link.contains("https%3A%2F%2Fexample.com%2Fi%2F1"));
    }
}
