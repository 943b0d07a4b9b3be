//! Application configuration constants
//!
//! Central location for storage key conventions, remote endpoint paths,
//! and validation boundaries used throughout the application.

// ===== Local Storage Keys =====

/// Prefix for every key in the local fallback store.
/// Keys follow `<prefix>_<entity>_<ownerId>`.
pub const APP_PREFIX: &str = "goalTracker";

/// Entity names used in local store keys
pub const ENTITY_USER: &str = "user";
pub const ENTITY_ACCOUNT: &str = "account";
pub const ENTITY_GOALS: &str = "goals";
pub const ENTITY_PROGRESS: &str = "progress";
pub const ENTITY_MICRO_GOALS: &str = "microGoals";
pub const ENTITY_PARTNERS: &str = "partners";
pub const ENTITY_REFLECTIONS: &str = "reflections";
pub const ENTITY_LAST_REFLECTION: &str = "lastReflection";

// ===== Remote Endpoints =====

/// Default base URL of the hosted query / prompt service
pub const DEFAULT_API_BASE: &str = "https://builder.empromptu.ai";

/// Path of the Postgres-over-HTTP query endpoint
pub const QUERY_ENDPOINT: &str = "/api_tools/templates/call_postgres";

/// Path for registering a named prompt template
pub const SETUP_PROMPT_ENDPOINT: &str = "/api_tools/setup_ai_prompt";

/// Path for applying a named prompt to input data
pub const APPLY_PROMPT_ENDPOINT: &str = "/api_tools/apply_prompt_to_data";

/// Default schema namespace on the remote database
pub const DEFAULT_REMOTE_SCHEMA: &str = "goaltracker";

/// Maximum length of the remote schema identifier (Postgres NAMEDATALEN - 1)
pub const MAX_SCHEMA_NAME_LENGTH: usize = 63;

// ===== Environment Variables =====

pub const ENV_API_TOKEN: &str = "GOALTRACKER_API_TOKEN";
pub const ENV_APP_ID: &str = "GOALTRACKER_APP_ID";
pub const ENV_USAGE_KEY: &str = "GOALTRACKER_USAGE_KEY";
pub const ENV_VAULT_KEY: &str = "GOALTRACKER_VAULT_KEY";

// ===== Goal Limits =====

/// Maximum goal title length (matches the remote VARCHAR(500) column)
pub const MAX_TITLE_LENGTH: usize = 500;

/// Maximum free-text description length
pub const MAX_DESCRIPTION_LENGTH: usize = 5_000;

/// Smallest accepted target value
pub const MIN_TARGET_VALUE: i64 = 1;

/// Largest accepted target value
pub const MAX_TARGET_VALUE: i64 = 1_000_000;

/// Largest single progress increment
pub const MAX_PROGRESS_INCREMENT: i64 = 1_000_000;

// ===== Suggestions and Reflections =====

/// Number of items every suggestion function returns
pub const SUGGESTION_COUNT: usize = 3;

/// Default number of reflections returned by a listing
pub const DEFAULT_REFLECTION_LIMIT: i64 = 10;

/// Days after the last reflection before a new one is suggested
pub const REFLECTION_INTERVAL_DAYS: i64 = 3;

/// Completed-goal count above which harder suggestions are offered
pub const EXPERIENCED_COMPLETED_GOALS: usize = 5;

/// Active-goal count above which lighter suggestions are offered
pub const BUSY_ACTIVE_GOALS: usize = 3;

// ===== Accountability Partners =====

/// Maximum partner display name length (matches VARCHAR(255))
pub const MAX_PARTNER_NAME_LENGTH: usize = 255;

/// Default hashtags appended to share links that support them
pub const DEFAULT_SHARE_HASHTAGS: &[&str] = &["GoalTracker", "Progress"];
