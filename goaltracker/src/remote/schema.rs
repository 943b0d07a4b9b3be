//! Remote schema provisioning
//!
//! Creates the schema namespace and every table with `IF NOT EXISTS`
//! semantics. Stops at the first failing statement and reports it; nothing
//! is rolled back because every statement is idempotent.

use super::client::QueryExecutor;
use crate::config::MAX_SCHEMA_NAME_LENGTH;
use crate::error::{AppError, Result};

/// The schema name is interpolated into SQL, so only plain identifiers pass.
pub fn validate_schema_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || name.len() > MAX_SCHEMA_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Invalid remote schema name: {:?}",
            name
        )));
    }

    Ok(())
}

/// Table definitions, in dependency order
pub fn table_statements(schema: &str) -> Vec<String> {
    vec![
        format!(
            r#"CREATE TABLE IF NOT EXISTS {schema}.users (
                id SERIAL PRIMARY KEY,
                email VARCHAR(255) UNIQUE NOT NULL,
                name VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                onboarding_completed BOOLEAN DEFAULT FALSE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {schema}.goals (
                id SERIAL PRIMARY KEY,
                user_id INTEGER REFERENCES {schema}.users(id) ON DELETE CASCADE,
                title VARCHAR(500) NOT NULL,
                description TEXT,
                goal_type VARCHAR(20) NOT NULL,
                target_value INTEGER NOT NULL DEFAULT 1,
                total_progress INTEGER DEFAULT 0,
                start_date DATE NOT NULL,
                end_date DATE,
                status VARCHAR(20) DEFAULT 'active',
                habit_stack_trigger TEXT,
                reminder_time TIME,
                metadata TEXT DEFAULT '{{}}',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                completed_at TIMESTAMP
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {schema}.progress_logs (
                id SERIAL PRIMARY KEY,
                goal_id INTEGER REFERENCES {schema}.goals(id) ON DELETE CASCADE,
                value INTEGER NOT NULL,
                notes TEXT,
                logged_date DATE DEFAULT CURRENT_DATE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {schema}.accountability_partners (
                id SERIAL PRIMARY KEY,
                user_id INTEGER REFERENCES {schema}.users(id) ON DELETE CASCADE,
                partner_name VARCHAR(255) NOT NULL,
                partner_email VARCHAR(255) NOT NULL,
                shared_goals TEXT DEFAULT '[]',
                privacy_settings TEXT DEFAULT '{{}}',
                status VARCHAR(20) DEFAULT 'active',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {schema}.micro_goals (
                id SERIAL PRIMARY KEY,
                parent_goal_id INTEGER REFERENCES {schema}.goals(id) ON DELETE CASCADE,
                title VARCHAR(500) NOT NULL,
                description TEXT,
                target_date DATE,
                completed BOOLEAN DEFAULT FALSE,
                order_index INTEGER DEFAULT 0,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                completed_at TIMESTAMP
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {schema}.reflections (
                id SERIAL PRIMARY KEY,
                user_id INTEGER REFERENCES {schema}.users(id) ON DELETE CASCADE,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )"#
        ),
    ]
}

/// Provision the remote schema and tables
pub async fn initialize_remote(executor: &dyn QueryExecutor, schema: &str) -> Result<()> {
    validate_schema_name(schema)?;

    tracing::info!("Initializing remote schema {}", schema);

    executor
        .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema), Vec::new())
        .await
        .map_err(|e| {
            tracing::warn!("Failed to create remote schema: {}", e);
            e
        })?;

    for statement in table_statements(schema) {
        executor.execute(&statement, Vec::new()).await.map_err(|e| {
            tracing::warn!("Failed to create remote table: {}", e);
            e
        })?;
    }

    tracing::info!("Remote schema initialization complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::FakeExecutor;

    #[test]
    fn test_schema_name_validation() {
        assert!(validate_schema_name("goaltracker").is_ok());
        assert!(validate_schema_name("_schema_2b84").is_ok());
        assert!(validate_schema_name("").is_err());
        assert!(validate_schema_name("9lives").is_err());
        assert!(validate_schema_name("x; DROP TABLE users").is_err());
        assert!(validate_schema_name(&"a".repeat(64)).is_err());
    }

    #[tokio::test]
    async fn test_initialize_runs_every_statement() {
        let executor = FakeExecutor::empty();

        initialize_remote(&executor, "gt").await.unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 7);
        assert_eq!(calls[0].0, "CREATE SCHEMA IF NOT EXISTS gt");
        assert!(calls[1].0.contains("gt.users"));
        assert!(calls[6].0.contains("gt.reflections"));
    }

    #[tokio::test]
    async fn test_initialize_stops_at_first_failure() {
        let executor = FakeExecutor::new(|query, _| {
            if query.contains(".goals") {
                Err(AppError::Remote("HTTP 500".to_string()))
            } else {
                Ok(Vec::new())
            }
        });

        let result = initialize_remote(&executor, "gt").await;
        assert!(result.is_err());
        // schema, users, goals: nothing after the failing statement
        assert_eq!(executor.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_schema_never_reaches_backend() {
        let executor = FakeExecutor::empty();

        assert!(initialize_remote(&executor, "bad name").await.is_err());
        assert!(executor.calls().is_empty());
    }
}
