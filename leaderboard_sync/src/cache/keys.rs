//! Cache key layout.
//!
//! ```text
//! leaderboard:{tenant}:{casino}:page:{page}:size:{page_size}
//! leaderboard-config:{tenant}:{casino}
//! tenant:{tenant}
//! ```
//!
//! Every key carries the tenant id right after its kind prefix, so no key can
//! be shared across tenants.

/// Key for one page of a leaderboard.
pub fn page_key(tenant_id: &str, casino: &str, page: u32, page_size: u32) -> String {
    format!("leaderboard:{tenant_id}:{casino}:page:{page}:size:{page_size}")
}

/// Key for a leaderboard's display configuration.
pub fn config_key(tenant_id: &str, casino: &str) -> String {
    format!("leaderboard-config:{tenant_id}:{casino}")
}

/// Key for a tenant lookup.
pub fn tenant_key(tenant_id: &str) -> String {
    format!("tenant:{tenant_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts() {
        assert_eq!(page_key("T", "stake", 1, 20), "leaderboard:T:stake:page:1:size:20");
        assert_eq!(config_key("T", "stake"), "leaderboard-config:T:stake");
        assert_eq!(tenant_key("T"), "tenant:T");
    }

    #[test]
    fn tenants_never_share_keys() {
        assert_ne!(page_key("a", "stake", 1, 20), page_key("b", "stake", 1, 20));
        assert_ne!(config_key("a", "stake"), config_key("b", "stake"));
    }
}
