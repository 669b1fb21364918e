use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ADJECTIVES: &[&str] = &[
    "Brave", "Swift", "Clever", "Sneaky", "Mighty", "Quiet", "Lucky", "Rusty",
    "Shiny", "Frosty", "Dusty", "Jolly", "Grumpy", "Sleepy", "Wild", "Bold",
];

const NOUNS: &[&str] = &[
    "Creeper", "Miner", "Golem", "Fox", "Axolotl", "Piglin", "Builder", "Ocelot",
    "Dragon", "Llama", "Rover", "Crafter", "Parrot", "Strider", "Bee", "Turtle",
];

/// Runtime identity handed to the game. The auth token is always empty:
/// only offline play is supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchIdentity {
    pub username: String,
    pub session_id: String,
    pub auth_token: String,
}

impl LaunchIdentity {
    /// Keeps a non-empty username, otherwise asks the generator for one.
    /// The session id is fresh on every call.
    pub fn resolve(username: &str, generator: &dyn IdentityGenerator) -> Self {
        let username = if username.is_empty() {
            generator.random_username()
        } else {
            username.to_string()
        };

        Self {
            username,
            session_id: generator.random_session_id(),
            auth_token: String::new(),
        }
    }

    pub fn user_type(&self) -> &'static str {
        "legacy"
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait IdentityGenerator: Send + Sync {
    fn random_username(&self) -> String;
    fn random_session_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdentity;

impl IdentityGenerator for RandomIdentity {
    fn random_username(&self) -> String {
        let mut rng = rand::thread_rng();
        let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Brave");
        let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Miner");
        let number: u16 = rng.gen_range(0..1000);
        format!("{}{}{}", adjective, noun, number)
    }

    fn random_session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_explicit_username_is_kept() {
        let mut generator = MockIdentityGenerator::new();
        generator.expect_random_username().never();
        generator
            .expect_random_session_id()
            .times(1)
            .returning(|| "session-1".to_string());

        let identity = LaunchIdentity::resolve("Notch", &generator);
        assert_eq!(identity.username, "Notch");
        assert_eq!(identity.session_id, "session-1");
        assert!(identity.auth_token.is_empty());
    }

    #[test]
    fn test_empty_username_is_generated() {
        let mut generator = MockIdentityGenerator::new();
        generator
            .expect_random_username()
            .times(1)
            .returning(|| "SneakyFox42".to_string());
        generator
            .expect_random_session_id()
            .returning(|| "session-2".to_string());

        let identity = LaunchIdentity::resolve("", &generator);
        assert_eq!(identity.username, "SneakyFox42");
        assert_eq!(identity.session_id, "session-2");
    }

    #[test]
    fn test_random_identity_values() {
        let generator = RandomIdentity;

        let name = generator.random_username();
        assert!(!name.is_empty());
        assert!(name.len() <= 16, "{} is longer than a valid player name", name);

        let ids: HashSet<String> = (0..64).map(|_| generator.random_session_id()).collect();
        assert_eq!(ids.len(), 64);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));
    }

    #[test]
    fn test_generated_identity_sessions_differ() {
        let first = LaunchIdentity::resolve("", &RandomIdentity);
        let second = LaunchIdentity::resolve("", &RandomIdentity);
        assert!(!first.username.is_empty());
        assert_ne!(first.session_id, second.session_id);
    }
}
