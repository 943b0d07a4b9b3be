// Goal tracker - personal goals with remote persistence and an offline fallback
// Entry point and command-line dispatch

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use goaltracker::app::{self, AppState};
use goaltracker::commands;
use goaltracker::database::{
    Goal, GoalStatus, GoalType, GoalUpdate, NewGoal, NewMicroGoal, NewPartner, PrivacySettings,
};
use goaltracker::services::settings::{OfflineAuthPolicy, PersistencePreference, Theme};
use goaltracker::services::sharing::SharePlatform;
use goaltracker::services::suggestions::GoalSuggestion;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "goaltracker")]
#[command(about = "Track daily, weekly and yearly goals", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, backend and signed-in user
    Info,

    /// Create an account and sign in
    Register {
        name: String,
        email: String,
        password: String,
    },

    /// Sign in
    Login { email: String, password: String },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Update the signed-in user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        /// Mark onboarding as completed (or not)
        #[arg(long)]
        onboarded: Option<bool>,
    },

    /// Goal management
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },

    /// Micro goals of a goal
    Micro {
        #[command(subcommand)]
        command: MicroCommands,
    },

    /// Accountability partners
    Partner {
        #[command(subcommand)]
        command: PartnerCommands,
    },

    /// Reflections
    Reflect {
        #[command(subcommand)]
        command: ReflectCommands,
    },

    /// Goal and habit suggestions
    Suggest {
        #[command(subcommand)]
        command: SuggestCommands,
    },

    /// Share progress
    Share {
        #[command(subcommand)]
        command: ShareCommands,
    },

    /// Application settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Encrypted remote credentials
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// List goals
    List {
        /// Only active goals of this type (daily, weekly, yearly)
        #[arg(short = 't', long = "type")]
        goal_type: Option<GoalType>,
    },
    /// Show one goal
    Show { id: String },
    /// Create a goal
    Create {
        title: String,
        #[arg(short = 't', long = "type", default_value = "daily")]
        goal_type: GoalType,
        #[arg(long, default_value_t = 1)]
        target: i64,
        /// Start date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        description: Option<String>,
        /// Existing habit this goal is stacked on
        #[arg(long)]
        trigger: Option<String>,
    },
    /// Update a goal
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        target: Option<i64>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        trigger: Option<String>,
        /// Archive the goal
        #[arg(long)]
        archive: bool,
    },
    /// Log progress toward a goal
    Log {
        id: String,
        #[arg(default_value_t = 1)]
        value: i64,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Mark a goal completed
    Complete { id: String },
    /// Progress log entries
    History {
        #[arg(long)]
        goal: Option<String>,
    },
    /// Summary, streaks and active goals
    Dashboard,
}

#[derive(Subcommand)]
enum MicroCommands {
    List { goal: String },
    Add {
        goal: String,
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Generate and store a staged breakdown
    Generate { goal: String },
    /// Flip completion
    Toggle { goal: String, id: String },
    Delete { goal: String, id: String },
    /// Completed versus total
    Progress { goal: String },
}

#[derive(Subcommand)]
enum PartnerCommands {
    Invite {
        name: String,
        email: String,
        /// Goal id to share (repeatable)
        #[arg(long = "goal")]
        goals: Vec<String>,
        #[arg(long)]
        hide_progress: bool,
        #[arg(long)]
        hide_completions: bool,
        #[arg(long)]
        no_encouragement: bool,
        #[arg(long)]
        share_reflections: bool,
    },
    List,
    /// What a partner can see
    View { id: String },
    /// Build a mailto invitation for a link
    Email { link: String },
}

#[derive(Subcommand)]
enum ReflectCommands {
    /// Reflection questions
    Prompts {
        #[arg(short = 't', long = "type")]
        goal_type: Option<GoalType>,
    },
    Save { prompt: String, response: String },
    List {
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Whether a reflection is due
    Status,
}

#[derive(Subcommand)]
enum SuggestCommands {
    /// Suggestions for the time of day and season
    Contextual,
    /// Suggestions based on goal history
    Personal,
    /// Habit-stacking ideas for a goal
    Habits { goal: String },
    /// Create a goal from a suggestion
    Accept {
        title: String,
        #[arg(short = 't', long = "type", default_value = "daily")]
        goal_type: GoalType,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        reasoning: String,
    },
    /// Register prompt templates with the remote prompt service
    SetupPrompts,
}

#[derive(Subcommand)]
enum ShareCommands {
    /// Share link (or copy text) for a goal
    Link {
        goal: String,
        /// facebook, twitter, linkedin or instagram
        platform: SharePlatform,
        /// Link to include in the post
        #[arg(long)]
        url: String,
    },
    /// Progress report; printed unless an output file is given
    Report {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
    System,
}

#[derive(Clone, Copy, ValueEnum)]
enum PersistenceArg {
    Auto,
    Remote,
    Local,
}

#[derive(Clone, Copy, ValueEnum)]
enum OfflineAuthArg {
    Verified,
    Demo,
}

#[derive(Subcommand)]
enum SettingsCommands {
    Show,
    /// Show, set or toggle the theme
    Theme {
        #[arg(long, value_enum)]
        set: Option<ThemeArg>,
        #[arg(long, conflicts_with = "set")]
        toggle: bool,
    },
    Persistence {
        #[arg(value_enum)]
        preference: PersistenceArg,
    },
    OfflineAuth {
        #[arg(value_enum)]
        policy: OfflineAuthArg,
    },
    Remote {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        schema: Option<String>,
    },
    /// Use the remote prompt service for suggestions
    RemoteSuggestions { enabled: bool },
}

#[derive(Subcommand)]
enum SecretCommands {
    Set { name: String, value: String },
    Remove { name: String },
    List,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_goal_change(id: &str, goal: Option<Goal>) -> Result<()> {
    match goal {
        Some(goal) => print_json(&goal),
        None => {
            println!("No goal {} in the local store; nothing changed", id);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goaltracker=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => app::default_data_dir()?,
    };

    let mut state = AppState::setup(data_dir).await?;
    let result = run(&mut state, cli.command).await;
    state.shutdown().await;
    result
}

async fn run(state: &mut AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Info => print_json(&commands::get_app_info(state))?,
        Commands::Register {
            name,
            email,
            password,
        } => print_json(&commands::register(state, &name, &email, &password).await?)?,
        Commands::Login { email, password } => {
            print_json(&commands::login(state, &email, &password).await?)?
        }
        Commands::Logout => {
            commands::logout(state).await?;
            println!("Signed out");
        }
        Commands::Whoami => print_json(&commands::current_user(state)?)?,
        Commands::Profile { name, onboarded } => {
            print_json(&commands::update_profile(state, name, onboarded).await?)?
        }
        Commands::Goal { command } => run_goal(state, command).await?,
        Commands::Micro { command } => run_micro(state, command).await?,
        Commands::Partner { command } => run_partner(state, command).await?,
        Commands::Reflect { command } => run_reflect(state, command).await?,
        Commands::Suggest { command } => run_suggest(state, command).await?,
        Commands::Share { command } => run_share(state, command).await?,
        Commands::Settings { command } => run_settings(state, command).await?,
        Commands::Secret { command } => match command {
            SecretCommands::Set { name, value } => {
                commands::set_secret(state, &name, &value).await?;
                println!("Stored {}", name);
            }
            SecretCommands::Remove { name } => {
                if commands::remove_secret(state, &name).await? {
                    println!("Removed {}", name);
                } else {
                    println!("No secret named {}", name);
                }
            }
            SecretCommands::List => print_json(&commands::list_secrets(state).await?)?,
        },
    }

    Ok(())
}

async fn run_goal(state: &AppState, command: GoalCommands) -> Result<()> {
    match command {
        GoalCommands::List { goal_type } => {
            print_json(&commands::list_goals(state, goal_type).await?)?
        }
        GoalCommands::Show { id } => print_json(&commands::get_goal(state, &id).await?)?,
        GoalCommands::Create {
            title,
            goal_type,
            target,
            start,
            end,
            description,
            trigger,
        } => {
            let start = start.unwrap_or_else(|| Local::now().date_naive());
            let mut goal = NewGoal::new(title, goal_type, target, start);
            goal.description = description;
            goal.end_date = end;
            goal.habit_stack_trigger = trigger;
            print_json(&commands::create_goal(state, goal).await?)?
        }
        GoalCommands::Update {
            id,
            title,
            description,
            target,
            end,
            trigger,
            archive,
        } => {
            let update = GoalUpdate {
                title,
                description,
                target_value: target,
                end_date: end,
                habit_stack_trigger: trigger,
                status: archive.then_some(GoalStatus::Archived),
                ..GoalUpdate::default()
            };
            print_goal_change(&id, commands::update_goal(state, &id, update).await?)?
        }
        GoalCommands::Log { id, value, notes } => {
            print_goal_change(&id, commands::log_progress(state, &id, value, notes).await?)?
        }
        GoalCommands::Complete { id } => {
            print_goal_change(&id, commands::complete_goal(state, &id).await?)?
        }
        GoalCommands::History { goal } => {
            print_json(&commands::progress_history(state, goal.as_deref()).await?)?
        }
        GoalCommands::Dashboard => print_json(&commands::dashboard(state).await?)?,
    }
    Ok(())
}

async fn run_micro(state: &AppState, command: MicroCommands) -> Result<()> {
    match command {
        MicroCommands::List { goal } => {
            print_json(&commands::list_micro_goals(state, &goal).await?)?
        }
        MicroCommands::Add {
            goal,
            title,
            description,
            due,
        } => {
            let micro_goal = NewMicroGoal {
                title,
                description,
                target_date: due,
                order_index: None,
            };
            print_json(&commands::create_micro_goal(state, &goal, micro_goal).await?)?
        }
        MicroCommands::Generate { goal } => {
            print_json(&commands::generate_micro_goals(state, &goal).await?)?
        }
        MicroCommands::Toggle { goal, id } => {
            print_json(&commands::toggle_micro_goal(state, &goal, &id).await?)?
        }
        MicroCommands::Delete { goal, id } => {
            commands::delete_micro_goal(state, &goal, &id).await?;
            println!("Deleted micro goal {}", id);
        }
        MicroCommands::Progress { goal } => {
            print_json(&commands::micro_goal_progress(state, &goal).await?)?
        }
    }
    Ok(())
}

async fn run_partner(state: &AppState, command: PartnerCommands) -> Result<()> {
    match command {
        PartnerCommands::Invite {
            name,
            email,
            goals,
            hide_progress,
            hide_completions,
            no_encouragement,
            share_reflections,
        } => {
            let shared_goals = goals
                .iter()
                .map(|id| id.parse())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let partner = NewPartner {
                partner_name: name,
                partner_email: email,
                shared_goals,
                privacy_settings: PrivacySettings {
                    share_progress: !hide_progress,
                    share_completions: !hide_completions,
                    allow_encouragement: !no_encouragement,
                    share_reflections,
                },
            };
            print_json(&commands::invite_partner(state, partner).await?)?
        }
        PartnerCommands::List => print_json(&commands::list_partners(state).await?)?,
        PartnerCommands::View { id } => print_json(&commands::view_as_partner(state, &id).await?)?,
        PartnerCommands::Email { link } => {
            println!("{}", commands::invitation_email(state, &link)?)
        }
    }
    Ok(())
}

async fn run_reflect(state: &AppState, command: ReflectCommands) -> Result<()> {
    match command {
        ReflectCommands::Prompts { goal_type } => {
            print_json(&commands::reflection_prompts(state, goal_type).await?)?
        }
        ReflectCommands::Save { prompt, response } => {
            print_json(&commands::save_reflection(state, &prompt, &response).await?)?
        }
        ReflectCommands::List { limit } => {
            print_json(&commands::list_reflections(state, limit).await?)?
        }
        ReflectCommands::Status => print_json(&commands::reflection_status(state).await?)?,
    }
    Ok(())
}

async fn run_suggest(state: &AppState, command: SuggestCommands) -> Result<()> {
    match command {
        SuggestCommands::Contextual => print_json(&commands::contextual_suggestions(state).await?)?,
        SuggestCommands::Personal => print_json(&commands::personalized_suggestions(state).await?)?,
        SuggestCommands::Habits { goal } => {
            print_json(&commands::habit_suggestions(state, &goal).await?)?
        }
        SuggestCommands::Accept {
            title,
            goal_type,
            description,
            reasoning,
        } => {
            let suggestion = GoalSuggestion {
                title,
                description,
                goal_type,
                reasoning,
            };
            print_json(&commands::accept_suggestion(state, suggestion).await?)?
        }
        SuggestCommands::SetupPrompts => {
            commands::setup_prompts(state).await?;
            println!("Prompt templates registered");
        }
    }
    Ok(())
}

async fn run_share(state: &AppState, command: ShareCommands) -> Result<()> {
    match command {
        ShareCommands::Link { goal, platform, url } => {
            print_json(&commands::share_goal(state, &goal, platform, &url).await?)?
        }
        ShareCommands::Report { output: Some(path) } => {
            commands::export_report(state, &path).await?;
            println!("Report written to {}", path.display());
        }
        ShareCommands::Report { output: None } => {
            print!("{}", commands::progress_report(state).await?)
        }
    }
    Ok(())
}

async fn run_settings(state: &AppState, command: SettingsCommands) -> Result<()> {
    match command {
        SettingsCommands::Show => print_json(&commands::get_settings(state).await?)?,
        SettingsCommands::Theme { set, toggle } => {
            let theme = if toggle {
                commands::toggle_theme(state).await?
            } else if let Some(theme) = set {
                let theme = match theme {
                    ThemeArg::Light => Theme::Light,
                    ThemeArg::Dark => Theme::Dark,
                    ThemeArg::System => Theme::System,
                };
                commands::set_theme(state, theme).await?;
                theme
            } else {
                commands::get_theme(state).await?
            };
            print_json(&theme)?
        }
        SettingsCommands::Persistence { preference } => {
            let preference = match preference {
                PersistenceArg::Auto => PersistencePreference::Auto,
                PersistenceArg::Remote => PersistencePreference::Remote,
                PersistenceArg::Local => PersistencePreference::Local,
            };
            commands::set_persistence(state, preference).await?;
            print_json(&preference)?
        }
        SettingsCommands::OfflineAuth { policy } => {
            let policy = match policy {
                OfflineAuthArg::Verified => OfflineAuthPolicy::Verified,
                OfflineAuthArg::Demo => OfflineAuthPolicy::Demo,
            };
            commands::set_offline_auth(state, policy).await?;
            print_json(&policy)?
        }
        SettingsCommands::Remote {
            enabled,
            url,
            schema,
        } => print_json(&commands::update_remote_settings(state, enabled, url, schema).await?)?,
        SettingsCommands::RemoteSuggestions { enabled } => {
            commands::set_remote_suggestions(state, enabled).await?;
            println!("Remote suggestions {}", if enabled { "enabled" } else { "disabled" });
        }
    }
    Ok(())
}
