//! Client identity: a public id plus the secret that binds it to a room
//! seat. Persisted to a small JSON file so reconnects reuse the same seat.

use std::path::Path;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAuth {
    pub id: String,
    pub secret: String,
}

impl ClientAuth {
    pub fn generate(rng: &mut impl Rng) -> Self {
        Self {
            id: random_string(rng, 8),
            secret: random_string(rng, 16),
        }
    }

    /// Reuse stored credentials, or generate and store fresh ones. A file
    /// that cannot be read or written just means a fresh identity per run.
    pub fn load_or_generate(path: &Path, rng: &mut impl Rng) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            if let Ok(auth) = serde_json::from_str::<ClientAuth>(&data) {
                return auth;
            }
            tracing::warn!(path = %path.display(), "unreadable auth file, regenerating");
        }
        let auth = Self::generate(rng);
        match serde_json::to_string_pretty(&auth) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    tracing::warn!(path = %path.display(), "could not store auth: {err}");
                }
            }
            Err(err) => tracing::warn!("could not serialize auth: {err}"),
        }
        auth
    }
}

fn random_string(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generated_credentials_are_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = ClientAuth::generate(&mut rng);
        let b = ClientAuth::generate(&mut rng);
        assert_eq!(a.id.len(), 8);
        assert_eq!(a.secret.len(), 16);
        assert_ne!(a, b);
        assert!(a.id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn stored_credentials_survive_a_second_load() {
        let dir = std::env::temp_dir().join("billiards-auth-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("auth.json");
        let _ = std::fs::remove_file(&path);

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let first = ClientAuth::load_or_generate(&path, &mut rng);
        let second = ClientAuth::load_or_generate(&path, &mut rng);
        assert_eq!(first, second);

        let _ = std::fs::remove_file(&path);
    }
}
