//! Progress sharing
//!
//! Share text per goal cadence, share links for the supported social
//! platforms and a plain-text progress report that can be written to a file.

use super::goals::GoalStore;
use crate::config::DEFAULT_SHARE_HASHTAGS;
use crate::database::{Goal, GoalType};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePlatform {
    Facebook,
    Twitter,
    LinkedIn,
    Instagram,
}

impl SharePlatform {
    pub fn name(&self) -> &'static str {
        match self {
            SharePlatform::Facebook => "Facebook",
            SharePlatform::Twitter => "Twitter",
            SharePlatform::LinkedIn => "LinkedIn",
            SharePlatform::Instagram => "Instagram",
        }
    }

    /// Share endpoint; Instagram has none
    fn share_url(&self) -> Option<&'static str> {
        match self {
            SharePlatform::Facebook => Some("https://www.facebook.com/sharer/sharer.php"),
            SharePlatform::Twitter => Some("https://twitter.com/intent/tweet"),
            SharePlatform::LinkedIn => Some("https://www.linkedin.com/sharing/share-offsite/"),
            SharePlatform::Instagram => None,
        }
    }
}

impl FromStr for SharePlatform {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facebook" => Ok(SharePlatform::Facebook),
            "twitter" | "x" => Ok(SharePlatform::Twitter),
            "linkedin" => Ok(SharePlatform::LinkedIn),
            "instagram" => Ok(SharePlatform::Instagram),
            other => Err(AppError::Validation(format!(
                "Unsupported share platform: {}",
                other
            ))),
        }
    }
}

/// What the caller should do to share
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ShareAction {
    OpenUrl(String),
    /// Platform without link sharing: the text is meant for the clipboard
    CopyText(String),
}

/// Share text for a goal, worded by cadence
pub fn share_text(goal: &Goal) -> String {
    let progress = goal.progress_percentage();
    match goal.goal_type {
        GoalType::Daily => format!(
            "🎯 Daily Goal Update: \"{}\" - {}% complete! Every day counts towards building better habits. #GoalTracker #DailyGoals #Progress",
            goal.title, progress
        ),
        GoalType::Weekly => format!(
            "📅 Weekly Goal Progress: \"{}\" - {}% achieved this week! Consistency is key to success. #WeeklyGoals #Progress #Achievement",
            goal.title, progress
        ),
        GoalType::Yearly => format!(
            "🚀 Yearly Goal Journey: \"{}\" - {}% complete! Big dreams require persistent action. #YearlyGoals #BigDreams #Progress",
            goal.title, progress
        ),
    }
}

fn query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Share action for `platform`. Hashtags are only passed to Twitter.
pub fn share_action(
    platform: SharePlatform,
    url: &str,
    text: &str,
    hashtags: &[&str],
) -> ShareAction {
    let Some(base) = platform.share_url() else {
        return ShareAction::CopyText(text.to_string());
    };

    let joined = hashtags.join(",");
    let mut params = match platform {
        SharePlatform::Facebook => vec![("u", url), ("quote", text)],
        SharePlatform::Twitter => vec![("url", url), ("text", text)],
        _ => vec![("url", url), ("summary", text)],
    };
    if platform == SharePlatform::Twitter && !hashtags.is_empty() {
        params.push(("hashtags", joined.as_str()));
    }

    ShareAction::OpenUrl(format!("{}?{}", base, query_string(&params)))
}

/// Share action for a goal's progress with the default hashtags
pub fn share_goal(platform: SharePlatform, goal: &Goal, url: &str) -> ShareAction {
    share_action(platform, url, &share_text(goal), DEFAULT_SHARE_HASHTAGS)
}

/// Plain-text report of every loaded goal
pub fn progress_report(store: &GoalStore, generated_on: NaiveDate) -> String {
    let summary = store.summary();
    let mut report = String::new();

    report.push_str("Goal Tracker progress report\n");
    report.push_str(&format!("Generated: {}\n", generated_on));
    report.push_str(&format!(
        "Goals: {} total, {} active, {} completed\n",
        summary.total, summary.active, summary.completed
    ));
    report.push_str(&format!("Average progress: {}%\n", summary.average_progress));
    report.push_str(&format!("Daily streak: {} days\n", store.daily_streak()));

    for goal_type in GoalType::ALL {
        let goals: Vec<&Goal> = store
            .goals()
            .iter()
            .filter(|g| g.goal_type == goal_type)
            .collect();
        if goals.is_empty() {
            continue;
        }

        report.push_str(&format!("\n[{}]\n", goal_type));
        for goal in goals {
            report.push_str(&format!(
                "- {} ({}): {}/{} ({}%), streak {}\n",
                goal.title,
                goal.status.as_str(),
                goal.total_progress,
                goal.target_value,
                goal.progress_percentage(),
                store.streak(&goal.id).current
            ));
        }
    }

    report
}

/// Write the report to `path`, creating parent directories
pub async fn export_report(store: &GoalStore, generated_on: NaiveDate, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::write(path, progress_report(store, generated_on)).await?;
    tracing::info!("Progress report exported to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local_store::tests::create_test_store;
    use crate::database::{NewGoal, RecordId};
    use crate::repository::local::sample_goal;
    use crate::repository::LocalRepository;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_share_text_by_type() {
        let mut goal = sample_goal(1, GoalType::Weekly);
        goal.title = "Swim".to_string();
        goal.target_value = 4;
        goal.total_progress = 2;

        let text = share_text(&goal);
        assert!(text.starts_with("📅 Weekly Goal Progress: \"Swim\" - 50%"));

        goal.goal_type = GoalType::Yearly;
        assert!(share_text(&goal).contains("#YearlyGoals"));
    }

    #[test]
    fn test_twitter_link_carries_hashtags() {
        let action = share_action(
            SharePlatform::Twitter,
            "https://example.com/g/1",
            "50% done",
            &["GoalTracker", "Progress"],
        );

        assert_eq!(
            action,
            ShareAction::OpenUrl(
                "https://twitter.com/intent/tweet?url=https%3A%2F%2Fexample.com%2Fg%2F1&text=50%25%20done&hashtags=GoalTracker%2CProgress"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_other_platform_params() {
        let ShareAction::OpenUrl(facebook) =
            share_action(SharePlatform::Facebook, "u", "t", &["Ignored"])
        else {
            panic!("expected url");
        };
        assert_eq!(facebook, "https://www.facebook.com/sharer/sharer.php?u=u&quote=t");

        let ShareAction::OpenUrl(linkedin) = share_action(SharePlatform::LinkedIn, "u", "t", &[])
        else {
            panic!("expected url");
        };
        assert!(linkedin.ends_with("?url=u&summary=t"));
    }

    #[test]
    fn test_instagram_copies_text() {
        assert_eq!(
            share_action(SharePlatform::Instagram, "u", "hello", &[]),
            ShareAction::CopyText("hello".to_string())
        );
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("LinkedIn".parse::<SharePlatform>().unwrap(), SharePlatform::LinkedIn);
        assert!("myspace".parse::<SharePlatform>().is_err());
    }

    #[tokio::test]
    async fn test_report_export() {
        let repository = LocalRepository::new(create_test_store().await);
        let mut store = GoalStore::new(RecordId::new(5), Arc::new(repository));
        store.load_goals().await;
        store
            .create_goal(NewGoal::new(
                "Learn piano",
                GoalType::Yearly,
                12,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            ))
            .await
            .unwrap();

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reports").join("progress.txt");
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        export_report(&store, today, &path).await.unwrap();

        let report = std::fs::read_to_string(&path).unwrap();
        assert_eq!(report, progress_report(&store, today));
        assert!(report.starts_with("Goal Tracker progress report\nGenerated: 2024-02-01\n"));
        assert!(report.contains("\n\n[yearly]\n- Learn piano"));
        assert!(report.ends_with('\n'));
        assert!(report.contains("Goals: 3 total, 3 active, 0 completed"));
        assert!(report.contains("[yearly]"));
        assert!(report.contains("- Learn piano (active): 0/12 (0%), streak 0"));
    }
}
