use clap::Parser;
use lonetown::db::{DatabaseConfig, PgStore};
use lonetown::models::{
    CommunicationStyle, EmotionalIntelligence, Gender, LifeGoals, PersonalityTraits,
    RelationshipValues, StateTimestamps, TraitProfile, User, UserState,
};
use lonetown::{Uuid, get_db_pool, utils};
use rand::Rng;
use rand::seq::IndexedRandom;

const FIRST_NAMES: &[&str] = &[
    "Maya", "Arjun", "Sofia", "Liam", "Priya", "Noah", "Ines", "Kofi", "Hana", "Mateo", "Aisha",
    "Felix", "Nina", "Omar", "Clara", "Ravi",
];

const INTEREST_TAGS: &[&str] = &[
    "hiking",
    "jazz",
    "cooking",
    "film",
    "chess",
    "surfing",
    "pottery",
    "opera",
    "climbing",
    "photography",
    "gardening",
    "board games",
    "running",
    "poetry",
    "astronomy",
];

const GENDERS: &[Gender] = &[Gender::Male, Gender::Female, Gender::NonBinary, Gender::Other];

#[derive(Parser, Debug)]
#[command(about = "Seed the database with randomized demo users")]
struct Args {
    /// Number of users to create
    #[arg(long, default_value_t = 20)]
    count: usize,
}

fn random_profile(rng: &mut impl Rng) -> TraitProfile {
    let mut v = move || rng.random_range(1..=10u8);
    TraitProfile {
        personality: PersonalityTraits {
            openness: v(),
            conscientiousness: v(),
            extraversion: v(),
            agreeableness: v(),
            neuroticism: v(),
        },
        emotional_intelligence: EmotionalIntelligence {
            self_awareness: v(),
            empathy: v(),
            social_skills: v(),
            emotional_regulation: v(),
        },
        relationship_values: RelationshipValues {
            commitment: v(),
            loyalty: v(),
            honesty: v(),
            communication: v(),
            independence: v(),
            affection: v(),
        },
        life_goals: LifeGoals {
            career: v(),
            family: v(),
            personal_growth: v(),
            adventure: v(),
            stability: v(),
        },
        communication_style: CommunicationStyle {
            directness: v(),
            conflict_resolution: v(),
            expressiveness: v(),
            listening: v(),
        },
        interests: Default::default(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();
    let args = Args::parse();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;
    let store = PgStore::new(pool);

    let mut rng = rand::rng();

    for i in 0..args.count {
        let mut traits = random_profile(&mut rng);
        let tag_count = rng.random_range(2..=6);
        traits.interests = INTEREST_TAGS
            .choose_multiple(&mut rng, tag_count)
            .map(|s| s.to_string())
            .collect();

        let gender = *GENDERS.choose(&mut rng).unwrap_or(&Gender::Other);
        let mut interested_in: Vec<Gender> = GENDERS
            .iter()
            .filter(|_| rng.random_bool(0.5))
            .copied()
            .collect();
        if interested_in.is_empty() {
            interested_in.push(*GENDERS.choose(&mut rng).unwrap_or(&Gender::Other));
        }

        let first = FIRST_NAMES.choose(&mut rng).unwrap_or(&"Sam");
        let user = User {
            id: Uuid::new_v4(),
            name: format!("{first} {}", i + 1),
            gender,
            interested_in,
            traits,
            state: UserState::Available,
            state_timestamps: StateTimestamps::default(),
            current_match_id: None,
        };

        store
            .insert_user(&user)
            .await
            .map_err(|e| anyhow::anyhow!("failed to insert user: {e}"))?;
        tracing::info!(user_id = %user.id, name = %user.name, "seeded user");
    }

    println!("Seeded {} users.", args.count);

    Ok(())
}
