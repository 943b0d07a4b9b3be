//! Suggestion and reflection generator
//!
//! Rule-based goal suggestions, habit-stacking sentences, micro-goal
//! breakdowns and reflection prompts. Selection randomness comes from the
//! caller's RNG. `SuggestionService` can ask the hosted prompt service first
//! and uses these rules whenever that is disabled, fails or returns something
//! unusable.

use crate::config::{BUSY_ACTIVE_GOALS, EXPERIENCED_COMPLETED_GOALS, SUGGESTION_COUNT};
use crate::database::{Goal, GoalStatus, GoalType, NewGoal, NewMicroGoal};
use crate::error::Result;
use crate::remote::prompts::{
    CONTEXTUAL_SUGGESTIONS_PROMPT, HABIT_STACKING_PROMPT, MICRO_GOAL_PROMPT, REFLECTION_PROMPT,
};
use crate::remote::{PromptClient, ReturnType};
use chrono::{Datelike, Months, NaiveDate, Timelike};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Before noon is morning, before 17:00 afternoon
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    /// Northern-hemisphere meteorological seasons
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

/// Situation the contextual suggestions are filtered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionContext {
    pub time_of_day: TimeOfDay,
    pub season: Season,
}

impl SuggestionContext {
    pub fn at<T: Datelike + Timelike>(moment: &T) -> Self {
        Self {
            time_of_day: TimeOfDay::from_hour(moment.hour()),
            season: Season::from_month(moment.month()),
        }
    }

    pub fn now() -> Self {
        Self::at(&chrono::Local::now())
    }
}

/// Goal counts that shape history-based suggestions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalHistory {
    pub completed: usize,
    pub current: usize,
}

impl GoalHistory {
    pub fn from_goals(goals: &[Goal]) -> Self {
        Self {
            completed: goals
                .iter()
                .filter(|g| g.status == GoalStatus::Completed)
                .count(),
            current: goals
                .iter()
                .filter(|g| g.status == GoalStatus::Active)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePreference {
    Mixed,
    Only(GoalType),
}

impl Default for TypePreference {
    fn default() -> Self {
        TypePreference::Only(GoalType::Daily)
    }
}

/// Most common goal type among `goals`; daily when there are none
pub fn preferred_goal_type(goals: &[Goal]) -> TypePreference {
    GoalType::ALL
        .iter()
        .map(|t| (goals.iter().filter(|g| g.goal_type == *t).count(), *t))
        .filter(|(count, _)| *count > 0)
        .max_by_key(|(count, _)| *count)
        .map(|(_, t)| TypePreference::Only(t))
        .unwrap_or_default()
}

/// A suggested goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSuggestion {
    pub title: String,
    pub description: String,
    pub goal_type: GoalType,
    #[serde(default)]
    pub reasoning: String,
}

impl GoalSuggestion {
    /// Goal request for accepting this suggestion on `today`
    pub fn to_new_goal(&self, today: NaiveDate) -> NewGoal {
        let target = match self.goal_type {
            GoalType::Daily | GoalType::Weekly => 1,
            GoalType::Yearly => 12,
        };

        let mut goal = NewGoal::new(self.title.clone(), self.goal_type, target, today)
            .with_description(self.description.clone());
        if self.goal_type == GoalType::Yearly {
            goal.end_date = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1);
        }

        let mut metadata = Map::new();
        metadata.insert("source".to_string(), json!("ai_suggestion"));
        metadata.insert("reasoning".to_string(), json!(self.reasoning));
        goal.metadata = metadata;
        goal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionPrompt {
    pub question: String,
    pub purpose: String,
}

struct Candidate {
    title: &'static str,
    description: &'static str,
    goal_type: GoalType,
    reasoning: &'static str,
    time: Option<TimeOfDay>,
    season: Option<Season>,
}

impl Candidate {
    const fn new(
        title: &'static str,
        description: &'static str,
        goal_type: GoalType,
        reasoning: &'static str,
    ) -> Self {
        Self {
            title,
            description,
            goal_type,
            reasoning,
            time: None,
            season: None,
        }
    }

    const fn at(mut self, time: TimeOfDay) -> Self {
        self.time = Some(time);
        self
    }

    const fn during(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    fn suggestion(&self) -> GoalSuggestion {
        GoalSuggestion {
            title: self.title.to_string(),
            description: self.description.to_string(),
            goal_type: self.goal_type,
            reasoning: self.reasoning.to_string(),
        }
    }
}

const CONTEXTUAL_CANDIDATES: &[Candidate] = &[
    Candidate::new(
        "Morning Meditation",
        "Start your day with 10 minutes of mindfulness and deep breathing",
        GoalType::Daily,
        "Morning routines help set a positive tone for the day and reduce stress",
    )
    .at(TimeOfDay::Morning),
    Candidate::new(
        "Sunrise Walk",
        "Take a 20-minute walk outside to energize your morning",
        GoalType::Daily,
        "Morning sunlight helps regulate circadian rhythms and boosts mood",
    )
    .at(TimeOfDay::Morning),
    Candidate::new(
        "Healthy Breakfast Routine",
        "Prepare and eat a nutritious breakfast every morning",
        GoalType::Daily,
        "A good breakfast provides energy and nutrients for the day ahead",
    )
    .at(TimeOfDay::Morning),
    Candidate::new(
        "Midday Movement Break",
        "Take a 15-minute movement break during your workday",
        GoalType::Daily,
        "Regular movement breaks improve focus and reduce physical strain",
    )
    .at(TimeOfDay::Afternoon),
    Candidate::new(
        "Lunch Hour Learning",
        "Spend 30 minutes learning something new during lunch",
        GoalType::Daily,
        "Continuous learning keeps your mind sharp and opens opportunities",
    )
    .at(TimeOfDay::Afternoon),
    Candidate::new(
        "Evening Gratitude Journal",
        "Write down 3 things you're grateful for each evening",
        GoalType::Daily,
        "Gratitude practice improves mental well-being and life satisfaction",
    )
    .at(TimeOfDay::Evening),
    Candidate::new(
        "Digital Sunset",
        "Put away all screens 1 hour before bedtime",
        GoalType::Daily,
        "Reducing blue light exposure improves sleep quality",
    )
    .at(TimeOfDay::Evening),
    Candidate::new(
        "Weekly Nature Adventure",
        "Spend at least 2 hours in nature each week",
        GoalType::Weekly,
        "Time in nature reduces stress and improves mental health",
    ),
    Candidate::new(
        "Social Connection Time",
        "Have a meaningful conversation with a friend or family member",
        GoalType::Weekly,
        "Strong social connections are essential for happiness and longevity",
    ),
    Candidate::new(
        "Creative Expression",
        "Dedicate time to a creative hobby or artistic pursuit",
        GoalType::Weekly,
        "Creative activities reduce stress and provide a sense of accomplishment",
    ),
    Candidate::new(
        "Learn a New Language",
        "Achieve conversational level in a language you've always wanted to learn",
        GoalType::Yearly,
        "Language learning improves cognitive function and opens cultural doors",
    ),
    Candidate::new(
        "Complete a Fitness Challenge",
        "Train for and complete a marathon, triathlon, or fitness milestone",
        GoalType::Yearly,
        "Long-term fitness goals provide motivation and improve overall health",
    ),
    Candidate::new(
        "Master a New Skill",
        "Become proficient in a skill that interests you or advances your career",
        GoalType::Yearly,
        "Skill development keeps you competitive and provides personal satisfaction",
    ),
    Candidate::new(
        "Spring Garden Project",
        "Start and maintain a small garden or herb collection",
        GoalType::Yearly,
        "Gardening connects you with nature and provides fresh, healthy food",
    )
    .during(Season::Spring),
    Candidate::new(
        "Summer Outdoor Adventures",
        "Try 5 new outdoor activities this summer",
        GoalType::Yearly,
        "Summer is perfect for exploring new outdoor experiences",
    )
    .during(Season::Summer),
    Candidate::new(
        "Fall Learning Project",
        "Take an online course or workshop in something that interests you",
        GoalType::Yearly,
        "Fall is traditionally a time for learning and personal growth",
    )
    .during(Season::Fall),
    Candidate::new(
        "Winter Wellness Focus",
        "Develop a consistent self-care routine for the winter months",
        GoalType::Yearly,
        "Winter wellness routines help combat seasonal mood changes",
    )
    .during(Season::Winter),
];

const HISTORY_CANDIDATES: &[Candidate] = &[
    Candidate::new(
        "Improve Sleep Schedule",
        "Go to bed and wake up at consistent times every day",
        GoalType::Daily,
        "Good sleep is the foundation of all other healthy habits",
    ),
    Candidate::new(
        "Weekly Meal Prep",
        "Prepare healthy meals for the week every Sunday",
        GoalType::Weekly,
        "Meal prep saves time and helps maintain healthy eating habits",
    ),
    Candidate::new(
        "Monthly Budget Review",
        "Review and optimize your budget every month",
        GoalType::Weekly,
        "Regular financial check-ins help you stay on track with money goals",
    ),
    Candidate::new(
        "Daily Reading Habit",
        "Read for at least 20 minutes every day",
        GoalType::Daily,
        "Reading expands knowledge and improves focus and vocabulary",
    ),
    Candidate::new(
        "Exercise Consistency",
        "Work out at least 3 times per week",
        GoalType::Weekly,
        "Regular exercise improves physical and mental health",
    ),
    Candidate::new(
        "Learn a Professional Skill",
        "Develop a skill that will advance your career this year",
        GoalType::Yearly,
        "Professional development opens new opportunities and increases earning potential",
    ),
];

const MENTOR_CANDIDATE: Candidate = Candidate::new(
    "Mentor Someone",
    "Share your knowledge by mentoring someone in your field",
    GoalType::Yearly,
    "Based on your success with goals, you could help others achieve theirs",
);

const MINDFULNESS_CANDIDATE: Candidate = Candidate::new(
    "Daily Mindfulness Check-in",
    "Take 5 minutes each day to check in with yourself",
    GoalType::Daily,
    "With many active goals, mindfulness can help you stay focused and balanced",
);

/// Three random suggestions that fit the time of day and season.
///
/// Outside the morning, daily suggestions tied to another time of day are
/// dropped. Seasonal suggestions only appear in their season.
pub fn contextual_suggestions<R>(context: &SuggestionContext, rng: &mut R) -> Vec<GoalSuggestion>
where
    R: Rng + ?Sized,
{
    let mut eligible: Vec<&Candidate> = CONTEXTUAL_CANDIDATES
        .iter()
        .filter(|c| {
            context.time_of_day == TimeOfDay::Morning
                || c.time.map_or(true, |t| t == context.time_of_day)
                || c.goal_type != GoalType::Daily
        })
        .filter(|c| c.season.map_or(true, |s| s == context.season))
        .collect();

    eligible.shuffle(rng);
    eligible
        .into_iter()
        .take(SUGGESTION_COUNT)
        .map(Candidate::suggestion)
        .collect()
}

/// Three suggestions shaped by goal history and the preferred goal type.
///
/// Experienced users get a harder suggestion, busy users a lighter one up
/// front. When fewer than three match the preferred type the rest are
/// filled in from the full list, in order.
pub fn history_suggestions(
    history: &GoalHistory,
    preference: TypePreference,
) -> Vec<GoalSuggestion> {
    let mut candidates: Vec<&Candidate> = HISTORY_CANDIDATES.iter().collect();
    if history.completed > EXPERIENCED_COMPLETED_GOALS {
        candidates.push(&MENTOR_CANDIDATE);
    }
    if history.current > BUSY_ACTIVE_GOALS {
        candidates.insert(0, &MINDFULNESS_CANDIDATE);
    }

    let mut picked: Vec<&Candidate> = match preference {
        TypePreference::Mixed => candidates.clone(),
        TypePreference::Only(goal_type) => candidates
            .iter()
            .copied()
            .filter(|c| c.goal_type == goal_type)
            .collect(),
    };
    picked.truncate(SUGGESTION_COUNT);

    for candidate in &candidates {
        if picked.len() >= SUGGESTION_COUNT {
            break;
        }
        if !picked.iter().any(|p| p.title == candidate.title) {
            picked.push(candidate);
        }
    }

    picked.into_iter().map(Candidate::suggestion).collect()
}

/// Three "After I ..., I will ..." sentences matched on the goal title
pub fn habit_stacking_suggestions(goal_title: &str) -> Vec<String> {
    let title = goal_title.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| title.contains(w));

    let sentences: [&str; 3] = if has(&["exercise", "workout", "fitness"]) {
        [
            "After I brush my teeth in the morning, I will do 10 push-ups",
            "After I finish my morning coffee, I will do a 5-minute stretch routine",
            "After I get home from work, I will change into workout clothes immediately",
        ]
    } else if has(&["read", "book", "learn"]) {
        [
            "After I eat breakfast, I will read for 15 minutes",
            "After I finish work, I will read instead of checking social media",
            "After I get into bed, I will read for 10 minutes before sleep",
        ]
    } else if has(&["health", "meditat", "mindful"]) {
        [
            "After I wake up, I will drink a glass of water",
            "After I sit down at my desk, I will take 3 deep breaths",
            "After I finish lunch, I will take a 5-minute walk",
        ]
    } else if has(&["work", "productiv", "focus"]) {
        [
            "After I start my computer, I will review my daily priorities",
            "After I finish a task, I will take a 2-minute break",
            "After I eat lunch, I will organize my workspace",
        ]
    } else if has(&["creat", "write", "art"]) {
        [
            "After I finish dinner, I will spend 20 minutes on my creative project",
            "After I drink my morning coffee, I will write in my journal",
            "After I complete my work tasks, I will work on my creative goal",
        ]
    } else {
        [
            "After I check my phone in the morning, I will work on my goal for 10 minutes",
            "After I eat lunch, I will spend 15 minutes on my goal",
            "After I finish work, I will dedicate 20 minutes to my goal",
        ]
    };

    sentences.iter().map(|s| s.to_string()).collect()
}

type Milestone = (&'static str, &'static str, u32);

const FITNESS_MILESTONES: [Milestone; 5] = [
    (
        "Establish Exercise Routine",
        "Create a consistent workout schedule and stick to it for 30 days",
        1,
    ),
    ("Build Endurance Base", "Focus on building cardiovascular endurance and basic strength", 3),
    ("Increase Intensity", "Add more challenging workouts and longer training sessions", 6),
    ("Peak Performance Phase", "Reach your highest fitness level and maintain it", 9),
    ("Achieve Final Goal", "Complete your fitness milestone and celebrate your achievement", 12),
];

const LEARNING_MILESTONES: [Milestone; 5] = [
    ("Research and Plan", "Research learning resources and create a structured learning plan", 1),
    ("Master the Basics", "Learn and practice fundamental concepts and skills", 3),
    (
        "Intermediate Proficiency",
        "Develop intermediate-level skills and start practical application",
        6,
    ),
    ("Advanced Application", "Apply your skills in real-world scenarios and complex projects", 9),
    ("Mastery and Teaching", "Achieve proficiency and share your knowledge with others", 12),
];

const CAREER_MILESTONES: [Milestone; 5] = [
    (
        "Assess Current Position",
        "Evaluate your current skills, experience, and career trajectory",
        1,
    ),
    ("Develop Key Skills", "Identify and develop the skills needed for your career goal", 4),
    ("Build Network", "Connect with professionals in your field and expand your network", 6),
    ("Gain Experience", "Take on projects or roles that provide relevant experience", 9),
    ("Achieve Career Milestone", "Reach your career goal and plan for continued growth", 12),
];

const FINANCIAL_MILESTONES: [Milestone; 5] = [
    ("Create Financial Plan", "Assess your current finances and create a detailed savings plan", 1),
    ("Optimize Expenses", "Review and reduce unnecessary expenses to increase savings", 2),
    (
        "Increase Income",
        "Explore ways to increase your income through side hustles or career advancement",
        4,
    ),
    (
        "Build Emergency Fund",
        "Establish a solid emergency fund before focusing on other financial goals",
        6,
    ),
    ("Reach Savings Target", "Achieve your financial goal and plan for future investments", 12),
];

const GENERIC_MILESTONES: [Milestone; 5] = [
    (
        "Define Specific Objectives",
        "Break down your yearly goal into specific, measurable objectives",
        1,
    ),
    ("Create Action Plan", "Develop a detailed plan with timelines and milestones", 2),
    ("Build Momentum", "Start implementation and build consistent daily habits", 4),
    ("Overcome Challenges", "Address obstacles and adjust your approach as needed", 8),
    ("Achieve Your Goal", "Complete your yearly goal and celebrate your success", 12),
];

/// Five staged milestones for a yearly goal, dated months after `today`
pub fn micro_goal_breakdown(goal_title: &str, today: NaiveDate) -> Vec<NewMicroGoal> {
    let title = goal_title.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| title.contains(w));

    let milestones = if has(&["fitness", "exercise", "marathon", "weight"]) {
        &FITNESS_MILESTONES
    } else if has(&["learn", "language", "skill", "course"]) {
        &LEARNING_MILESTONES
    } else if has(&["career", "job", "promotion", "business"]) {
        &CAREER_MILESTONES
    } else if has(&["save", "money", "financial", "budget"]) {
        &FINANCIAL_MILESTONES
    } else {
        &GENERIC_MILESTONES
    };

    milestones
        .iter()
        .enumerate()
        .map(|(index, (title, description, months))| NewMicroGoal {
            title: title.to_string(),
            description: Some(description.to_string()),
            target_date: today.checked_add_months(Months::new(*months)),
            order_index: Some(index as i64),
        })
        .collect()
}

const REFLECTION_PROMPTS: [(&str, &str); 10] = [
    (
        "What's one thing you learned about yourself while working on your goals this week?",
        "Self-awareness and personal growth",
    ),
    (
        "Which goal brought you the most satisfaction when you made progress on it?",
        "Identifying motivation sources",
    ),
    (
        "What obstacle did you overcome recently, and how did you do it?",
        "Building resilience strategies",
    ),
    (
        "How has working on your goals changed your daily routine?",
        "Recognizing positive changes",
    ),
    (
        "What would you tell someone who's struggling with the same goal you're working on?",
        "Consolidating lessons learned",
    ),
    (
        "When you think about your progress, what are you most proud of?",
        "Celebrating achievements",
    ),
    (
        "What's one small change you could make to improve your goal progress?",
        "Continuous improvement",
    ),
    (
        "How do you feel when you complete a task related to your goals?",
        "Understanding emotional rewards",
    ),
    (
        "What support or resources have been most helpful in your goal journey?",
        "Identifying success factors",
    ),
    (
        "If you could go back and give yourself advice when you started this goal, what would it be?",
        "Reflecting on growth and learning",
    ),
];

/// Three distinct prompts drawn at random from the fixed set
pub fn reflection_prompts<R>(rng: &mut R) -> Vec<ReflectionPrompt>
where
    R: Rng + ?Sized,
{
    REFLECTION_PROMPTS
        .choose_multiple(rng, SUGGESTION_COUNT)
        .map(|(question, purpose)| ReflectionPrompt {
            question: question.to_string(),
            purpose: purpose.to_string(),
        })
        .collect()
}

/// Suggestion source that prefers the hosted prompt service when configured
#[derive(Clone, Default)]
pub struct SuggestionService {
    prompts: Option<PromptClient>,
}

impl SuggestionService {
    /// Local rules only
    pub fn local() -> Self {
        Self { prompts: None }
    }

    pub fn with_prompts(prompts: PromptClient) -> Self {
        Self {
            prompts: Some(prompts),
        }
    }

    pub fn uses_remote(&self) -> bool {
        self.prompts.is_some()
    }

    /// Register prompt templates with the service, when one is configured
    pub async fn setup(&self) -> Result<()> {
        match &self.prompts {
            Some(prompts) => prompts.setup_all().await,
            None => Ok(()),
        }
    }

    async fn ask(&self, name: &str, input: Value, return_type: ReturnType) -> Option<Value> {
        let prompts = self.prompts.as_ref()?;
        let input = match input {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        match prompts.apply_prompt(name, input, return_type).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Prompt {} failed, using local suggestions: {}", name, e);
                None
            }
        }
    }

    pub async fn contextual<R>(
        &self,
        context: &SuggestionContext,
        existing_goals: &[Goal],
        rng: &mut R,
    ) -> Vec<GoalSuggestion>
    where
        R: Rng + ?Sized,
    {
        let titles: Vec<&str> = existing_goals.iter().take(5).map(|g| g.title.as_str()).collect();
        let input = json!({
            "user_context": serde_json::to_string(context).unwrap_or_default(),
            "existing_goals": titles.join(", "),
            "user_preferences": "",
        });

        if let Some(value) = self
            .ask(CONTEXTUAL_SUGGESTIONS_PROMPT, input, ReturnType::Json)
            .await
        {
            let parsed = parse_json_list::<GoalSuggestion>(value);
            let usable: Vec<GoalSuggestion> = parsed
                .into_iter()
                .filter(|s| !s.title.trim().is_empty())
                .take(SUGGESTION_COUNT)
                .collect();
            if usable.len() == SUGGESTION_COUNT {
                return usable;
            }
            tracing::warn!("Prompt returned too few suggestions, using local suggestions");
        }

        contextual_suggestions(context, rng)
    }

    pub async fn habit_stacking(&self, goal_title: &str) -> Vec<String> {
        let input = json!({
            "existing_habits": "",
            "new_goal": goal_title,
            "user_schedule": "",
        });

        if let Some(Value::String(text)) = self
            .ask(HABIT_STACKING_PROMPT, input, ReturnType::PrettyText)
            .await
        {
            let lines: Vec<String> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take(SUGGESTION_COUNT)
                .map(str::to_string)
                .collect();
            if lines.len() == SUGGESTION_COUNT {
                return lines;
            }
        }

        habit_stacking_suggestions(goal_title)
    }

    pub async fn micro_goals(&self, goal: &Goal, today: NaiveDate) -> Vec<NewMicroGoal> {
        let input = json!({
            "yearly_goal": goal.title,
            "timeline": "12 months",
            "constraints": "",
        });

        if let Some(value) = self.ask(MICRO_GOAL_PROMPT, input, ReturnType::Json).await {
            let parsed: Vec<NewMicroGoal> = parse_json_list(value)
                .into_iter()
                .filter(|m: &NewMicroGoal| !m.title.trim().is_empty())
                .collect();
            if (3..=5).contains(&parsed.len()) {
                return parsed;
            }
        }

        micro_goal_breakdown(&goal.title, today)
    }

    pub async fn reflection_prompts<R>(
        &self,
        goal_type: Option<GoalType>,
        rng: &mut R,
    ) -> Vec<ReflectionPrompt>
    where
        R: Rng + ?Sized,
    {
        let input = json!({
            "goal_progress": "",
            "challenges": "",
            "goal_type": goal_type.map(|t| t.as_str()).unwrap_or("mixed"),
        });

        if let Some(value) = self.ask(REFLECTION_PROMPT, input, ReturnType::Json).await {
            let usable: Vec<ReflectionPrompt> = parse_json_list::<ReflectionPrompt>(value)
                .into_iter()
                .filter(|p| !p.question.trim().is_empty())
                .take(SUGGESTION_COUNT)
                .collect();
            if usable.len() == SUGGESTION_COUNT {
                return usable;
            }
            tracing::warn!("Prompt returned too few reflection questions, using local prompts");
        }

        reflection_prompts(rng)
    }
}

/// Items of a JSON array (or JSON text of one) that decode as `T`
fn parse_json_list<T: serde::de::DeserializeOwned>(value: Value) -> Vec<T> {
    let value = match value {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
        other => other,
    };

    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::client::tests::{serve_once, test_credentials};
    use crate::repository::local::sample_goal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_context_derivation() {
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(1), Season::Winter);
    }

    #[test]
    fn test_contextual_always_three_valid() {
        let mut rng = rng();
        for time_of_day in [TimeOfDay::Morning, TimeOfDay::Afternoon, TimeOfDay::Evening] {
            for season in [Season::Spring, Season::Summer, Season::Fall, Season::Winter] {
                let context = SuggestionContext { time_of_day, season };
                let suggestions = contextual_suggestions(&context, &mut rng);

                assert_eq!(suggestions.len(), 3);
                assert!(suggestions.iter().all(|s| !s.title.is_empty()));
                let titles: HashSet<_> = suggestions.iter().map(|s| &s.title).collect();
                assert_eq!(titles.len(), 3);
            }
        }
    }

    #[test]
    fn test_evening_excludes_morning_dailies() {
        let context = SuggestionContext {
            time_of_day: TimeOfDay::Evening,
            season: Season::Summer,
        };
        let mut rng = rng();

        for _ in 0..50 {
            for suggestion in contextual_suggestions(&context, &mut rng) {
                assert_ne!(suggestion.title, "Morning Meditation");
                assert_ne!(suggestion.title, "Midday Movement Break");
                assert_ne!(suggestion.title, "Spring Garden Project");
            }
        }
    }

    #[test]
    fn test_history_suggestions_topped_up_to_three() {
        // Only two daily items exist in the base list
        let suggestions =
            history_suggestions(&GoalHistory::default(), TypePreference::Only(GoalType::Daily));
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].title, "Improve Sleep Schedule");
        assert_eq!(suggestions[1].title, "Daily Reading Habit");

        let yearly =
            history_suggestions(&GoalHistory::default(), TypePreference::Only(GoalType::Yearly));
        assert_eq!(yearly.len(), 3);
        assert_eq!(yearly[0].goal_type, GoalType::Yearly);
    }

    #[test]
    fn test_history_adapts_to_counts() {
        let busy = GoalHistory {
            completed: 0,
            current: 4,
        };
        let suggestions = history_suggestions(&busy, TypePreference::Mixed);
        assert_eq!(suggestions[0].title, "Daily Mindfulness Check-in");

        let experienced = GoalHistory {
            completed: 6,
            current: 0,
        };
        let yearly = history_suggestions(&experienced, TypePreference::Only(GoalType::Yearly));
        assert!(yearly.iter().any(|s| s.title == "Mentor Someone"));
    }

    #[test]
    fn test_preferred_type_is_most_common() {
        let goals = vec![
            sample_goal(1, GoalType::Weekly),
            sample_goal(2, GoalType::Weekly),
            sample_goal(3, GoalType::Daily),
        ];
        assert_eq!(preferred_goal_type(&goals), TypePreference::Only(GoalType::Weekly));
        assert_eq!(preferred_goal_type(&[]), TypePreference::Only(GoalType::Daily));
    }

    #[test]
    fn test_habit_keywords() {
        let exercise = habit_stacking_suggestions("Morning Workout");
        assert_eq!(exercise.len(), 3);
        assert!(exercise[0].contains("push-ups"));

        let reading = habit_stacking_suggestions("Read more books");
        assert!(reading[0].contains("read for 15 minutes"));

        let generic = habit_stacking_suggestions("Call grandma");
        assert!(generic.iter().all(|s| s.starts_with("After I")));
    }

    #[test]
    fn test_micro_goal_breakdown_dates() {
        let today = date(2024, 1, 15);
        let plan = micro_goal_breakdown("Run a marathon", today);

        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0].title, "Establish Exercise Routine");
        assert_eq!(plan[0].target_date, Some(date(2024, 2, 15)));
        assert_eq!(plan[4].target_date, Some(date(2025, 1, 15)));
        assert_eq!(plan[4].order_index, Some(4));

        let savings = micro_goal_breakdown("Save money for a house", today);
        assert_eq!(savings[1].target_date, Some(date(2024, 3, 15)));

        let generic = micro_goal_breakdown("Visit Japan", today);
        assert_eq!(generic[3].target_date, Some(date(2024, 9, 15)));
    }

    #[test]
    fn test_reflection_prompts_distinct() {
        let prompts = reflection_prompts(&mut rng());

        assert_eq!(prompts.len(), 3);
        let questions: HashSet<_> = prompts.iter().map(|p| &p.question).collect();
        assert_eq!(questions.len(), 3);
    }

    #[test]
    fn test_accepting_yearly_suggestion() {
        let suggestion = GoalSuggestion {
            title: "Learn a New Language".to_string(),
            description: "Conversational level".to_string(),
            goal_type: GoalType::Yearly,
            reasoning: "Cognitive benefits".to_string(),
        };

        let goal = suggestion.to_new_goal(date(2024, 5, 2));
        assert_eq!(goal.target_value, 12);
        assert_eq!(goal.end_date, Some(date(2025, 1, 1)));
        assert_eq!(goal.metadata["source"], "ai_suggestion");
    }

    #[test]
    fn test_parse_json_list_accepts_text() {
        let parsed: Vec<ReflectionPrompt> = parse_json_list(json!(
            "[{\"question\":\"Q\",\"purpose\":\"P\"},{\"bad\":1}]"
        ));
        assert_eq!(parsed.len(), 1);
        assert!(parse_json_list::<ReflectionPrompt>(json!(42)).is_empty());
    }

    fn remote_service(base_url: &str) -> SuggestionService {
        SuggestionService::with_prompts(PromptClient::new(base_url, test_credentials()).unwrap())
    }

    fn is_local_prompt(prompt: &ReflectionPrompt) -> bool {
        REFLECTION_PROMPTS
            .iter()
            .any(|(question, _)| *question == prompt.question)
    }

    #[tokio::test]
    async fn test_remote_reflection_prompts_used_when_complete() {
        let body = r#"{"value":[
            {"question":"What went well?","purpose":"Wins"},
            {"question":"What got in the way?","purpose":"Obstacles"},
            {"question":"What comes next?","purpose":"Planning"}
        ]}"#;
        let (base_url, server) = serve_once("200 OK", body).await;

        let prompts = remote_service(&base_url)
            .reflection_prompts(Some(GoalType::Daily), &mut rng())
            .await;
        server.await.unwrap();

        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0].question, "What went well?");
    }

    #[tokio::test]
    async fn test_blank_remote_questions_fall_back_to_local_prompts() {
        let body = r#"{"value":[
            {"question":"What went well?","purpose":"Wins"},
            {"question":"   ","purpose":"Blank"},
            {"question":"What comes next?","purpose":"Planning"}
        ]}"#;
        let (base_url, server) = serve_once("200 OK", body).await;

        let prompts = remote_service(&base_url)
            .reflection_prompts(None, &mut rng())
            .await;
        server.await.unwrap();

        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(is_local_prompt));
    }

    #[tokio::test]
    async fn test_local_service_uses_rules() {
        let service = SuggestionService::local();
        let context = SuggestionContext {
            time_of_day: TimeOfDay::Morning,
            season: Season::Spring,
        };

        assert!(!service.uses_remote());
        assert_eq!(service.contextual(&context, &[], &mut rng()).await.len(), 3);
        assert_eq!(service.habit_stacking("Daily fitness").await.len(), 3);
        assert_eq!(
            service.reflection_prompts(None, &mut rng()).await.len(),
            3
        );
    }
}
