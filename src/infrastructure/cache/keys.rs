//! Cache key layout, one namespace per concern.
//!
//! | Key                          | Holds                       |
//! |------------------------------|-----------------------------|
//! | `url:<code>`                 | cached target               |
//! | `user:<owner>:url:<code>`    | owner-scoped duplicate      |
//! | `clicks:<code>`              | realtime click counter      |
//! | `rate:<actor>`               | rate window counter         |
//! | `analytics:<code>`           | bounded click event log     |

pub fn url_key(code: &str) -> String {
    format!("url:{code}")
}

pub fn owner_url_key(owner: &str, code: &str) -> String {
    format!("user:{owner}:url:{code}")
}

pub fn clicks_key(code: &str) -> String {
    format!("clicks:{code}")
}

pub fn rate_key(actor_key: &str) -> String {
    format!("rate:{actor_key}")
}

pub fn analytics_key(code: &str) -> String {
    format!("analytics:{code}")
}

/// Realtime counter and event log of `code`.
pub fn click_state_keys(code: &str) -> Vec<String> {
    vec![clicks_key(code), analytics_key(code)]
}

/// Every key derived from `code` that holds a cached target.
pub fn target_keys(code: &str, owner: Option<&str>) -> Vec<String> {
    let mut keys = vec![url_key(code)];
    if let Some(owner) = owner {
        keys.push(owner_url_key(owner, code));
    }
    keys
}
