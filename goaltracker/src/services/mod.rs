//! Services module
//!
//! Business logic services that coordinate between commands and repository.

pub mod goals;
pub mod micro_goals;
pub mod partners;
pub mod reflections;
pub mod secrets;
pub mod session;
pub mod settings;
pub mod sharing;
pub mod streaks;
pub mod suggestions;

pub use goals::GoalStore;
pub use micro_goals::MicroGoalService;
pub use partners::PartnerService;
pub use reflections::ReflectionService;
pub use secrets::SecretsVault;
pub use session::SessionManager;
pub use settings::SettingsService;
pub use suggestions::SuggestionService;
