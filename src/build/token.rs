use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_LEN: usize = 32;

/// Mint the correlation token for a new build of `repo` PR `pr`.
///
/// Jenkins only numbers a build once it leaves the queue, so the bot tags
/// each build with this token and finds it again by parameter. Tokens are a
/// salted hash; a collision between two live builds is practically impossible.
pub fn mint_job_id(repo: &str, pr: &str) -> String {
    let salt: u64 = rand::thread_rng().gen();
    let mut hasher = Sha256::new();
    hasher.update(repo.as_bytes());
    hasher.update(pr.as_bytes());
    hasher.update(salt.to_le_bytes());
    let mut token = hex::encode(hasher.finalize());
    token.truncate(TOKEN_LEN);
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = mint_job_id("widgets", "42");
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_tokens_are_salted() {
        let tokens: HashSet<String> = (0..100).map(|_| mint_job_id("widgets", "42")).collect();
        assert_eq!(tokens.len(), 100);
    }
}
