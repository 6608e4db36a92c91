//! Rotating request identity.
//!
//! Every fetch presents a fresh, realistic desktop user-agent. The pool
//! randomizes the Chrome build number per draw and never serves the same
//! string twice in a row, so bursts of requests do not share a verbatim
//! identity. The RNG is injected (seedable) so tests are deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Supplies one user-agent string per fetch.
pub trait IdentityProvider: Send + Sync {
    fn user_agent(&self) -> String;
}

/// Desktop user-agent templates; `{ver}` is replaced with a randomized
/// Chrome build between 120 and 131.
const TEMPLATES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{ver}.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{ver}.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{ver}.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

struct PoolState {
    rng: StdRng,
    last: Option<String>,
}

/// Randomized user-agent pool.
pub struct UserAgentPool {
    state: Mutex<PoolState>,
}

impl UserAgentPool {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(PoolState { rng, last: None }),
        }
    }

    fn draw(state: &mut PoolState) -> String {
        let template = TEMPLATES[state.rng.gen_range(0..TEMPLATES.len())];
        let ver = state.rng.gen_range(120..=131);
        template.replace("{ver}", &ver.to_string())
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for UserAgentPool {
    fn user_agent(&self) -> String {
        let mut state = self.state.lock().expect("identity pool poisoned");
        let mut ua = Self::draw(&mut state);
        // Re-draw until the string differs from the previous one.
        while state.last.as_deref() == Some(ua.as_str()) {
            ua = Self::draw(&mut state);
        }
        state.last = Some(ua.clone());
        ua
    }
}

/// Fixed identity for tests that need a stable header value.
pub struct FixedIdentity(pub String);

impl IdentityProvider for FixedIdentity {
    fn user_agent(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_draws_never_repeat_verbatim() {
        let pool = UserAgentPool::with_seed(7);
        let mut last = pool.user_agent();
        for _ in 0..50 {
            let next = pool.user_agent();
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn seeded_pools_are_deterministic() {
        let a = UserAgentPool::with_seed(42);
        let b = UserAgentPool::with_seed(42);
        for _ in 0..10 {
            assert_eq!(a.user_agent(), b.user_agent());
        }
    }

    #[test]
    fn agents_look_like_real_browsers() {
        let pool = UserAgentPool::with_seed(1);
        for _ in 0..20 {
            let ua = pool.user_agent();
            assert!(ua.starts_with("Mozilla/5.0"));
            assert!(!ua.contains("{ver}"));
        }
    }
}
