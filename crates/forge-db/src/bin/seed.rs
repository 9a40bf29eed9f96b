//! forge-seed: reset the database and load demo data.
//!
//! Reads `DATABASE_URL` and `SESSION_SECRET` from the environment (or `.env`).
//! Provider keys are stored for every `<PROVIDER>_API_KEY` variable that is
//! set; they are sealed under `SESSION_SECRET`, so the server must run with
//! the same secret to use them.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use forge_crypto::{hash_password, key_preview, KeySealer, MasterKey, PasswordParams};
use forge_db::{
    datetime, AiKeyRepository, AiProvider, CalendarEventRepository, CreateCalendarEventRequest,
    Database, DeliverableInput, GoalInput, GoalRepository, InfoTagInput, NewAiKey,
    UserRepository,
};

const DEMO_EMAIL: &str = "test@example.com";
const DEMO_PASSWORD: &str = "password123";

fn deliverable(title: &str, completed: bool, minutes: i32) -> DeliverableInput {
    DeliverableInput {
        title: title.to_string(),
        completed,
        minutes_estimate: Some(minutes),
        ..Default::default()
    }
}

fn tag(title: &str, info: &str) -> InfoTagInput {
    InfoTagInput {
        title: title.to_string(),
        info: info.to_string(),
    }
}

fn demo_goals() -> Result<Vec<GoalInput>> {
    let due = |s: &str| {
        datetime::parse_flexible(s)
            .map(Some)
            .map_err(|e| anyhow::anyhow!(e))
    };

    Ok(vec![
        GoalInput {
            title: "Finish pre-commit setup".to_string(),
            description: "Finalize and install the repository pre-commit hooks; run autoupdate \
                          and fix any reported issues."
                .to_string(),
            due_date: due("2026-01-15T17:00:00")?,
            deliverables: vec![
                deliverable("Add .pre-commit-config.yaml", true, 30),
                deliverable("Run pre-commit install", false, 15),
                deliverable("Run pre-commit autoupdate", false, 20),
            ],
            info_tags: vec![tag("Owner", "Patrick Li"), tag("Repo", "forge (repo setup)")],
        },
        GoalInput {
            title: "Polish frontend layout".to_string(),
            description: "Adjust responsive styles and finalize the main landing section in the \
                          React app."
                .to_string(),
            due_date: None,
            deliverables: vec![
                deliverable("Fix mobile header spacing", true, 10),
                deliverable("Adjust hero section spacing", false, 25),
            ],
            info_tags: vec![tag("Priority", "Medium"), tag("Area", "UI/UX")],
        },
        GoalInput {
            title: "Add unit tests for auth".to_string(),
            description: "Write unit tests covering login/logout and token refresh logic."
                .to_string(),
            due_date: due("2026-02-01T09:30:00")?,
            deliverables: vec![
                deliverable("Test login flow", false, 40),
                deliverable("Test token refresh", false, 35),
            ],
            info_tags: vec![tag("Priority", "High"), tag("Owner", "Backend team")],
        },
    ])
}

fn at(day: DateTime<Utc>, hour: u32, minute: u32) -> Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).context("invalid time of day")?;
    Ok(Utc.from_utc_datetime(&day.date_naive().and_time(time)))
}

fn demo_events(now: DateTime<Utc>) -> Result<Vec<CreateCalendarEventRequest>> {
    let tomorrow = now + Duration::days(1);
    let event = |title: &str, start, end, kind: &str| CreateCalendarEventRequest {
        title: title.to_string(),
        start,
        end,
        kind: Some(kind.to_string()),
        metadata: None,
    };

    Ok(vec![
        event("Morning standup", at(now, 9, 0)?, at(now, 9, 30)?, "break"),
        event("Code review session", at(now, 14, 0)?, at(now, 15, 0)?, "task"),
        event("Team planning", at(tomorrow, 10, 0)?, at(tomorrow, 11, 30)?, "task"),
    ])
}

fn provider_key_name(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::Anthropic => "Claude API Key",
        AiProvider::Openai => "OpenAI API Key",
        AiProvider::Google => "Google AI API Key",
        AiProvider::Mistral => "Mistral API Key",
        AiProvider::Cohere => "Cohere API Key",
    }
}

async fn clear(db: &Database) -> Result<()> {
    // Everything else cascades from app_user.
    sqlx::query("DELETE FROM app_user")
        .execute(db.pool())
        .await
        .context("failed to clear tables")?;
    Ok(())
}

async fn seed_keys(db: &Database) -> Result<usize> {
    let secret = match std::env::var("SESSION_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            warn!("SESSION_SECRET is not set; skipping provider API keys");
            return Ok(0);
        }
    };
    let sealer = KeySealer::new(&MasterKey::from_secret(&secret)?)?;

    let mut stored = 0;
    for provider in AiProvider::ALL {
        let Ok(api_key) = std::env::var(provider.env_key_var()) else {
            continue;
        };
        let api_key = api_key.trim();
        if api_key.is_empty() {
            continue;
        }
        db.ai_keys
            .create(
                DEMO_EMAIL,
                NewAiKey {
                    provider,
                    name: Some(provider_key_name(provider).to_string()),
                    sealed_key: sealer.seal(DEMO_EMAIL, api_key)?,
                    key_preview: key_preview(api_key),
                },
            )
            .await?;
        info!(provider = %provider, "Stored provider API key");
        stored += 1;
    }
    Ok(stored)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;

    clear(&db).await?;

    let hash = hash_password(DEMO_PASSWORD, &PasswordParams::default())?;
    db.users.create(DEMO_EMAIL, &hash).await?;
    info!(email = DEMO_EMAIL, "Created demo user");

    for input in demo_goals()? {
        let goal = db.goals.create(DEMO_EMAIL, input).await?;
        info!(goal_id = %goal.id, title = %goal.title, "Created goal");
    }

    for event in demo_events(Utc::now())? {
        db.calendar_events.create(DEMO_EMAIL, event).await?;
    }

    let keys = seed_keys(&db).await?;
    info!(api_keys = keys, "Seed complete");
    Ok(())
}
