use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Claims carried by bearer tokens issued on login
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ApiClaim {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

impl ApiClaim {
    /// New claim for user, validity is set when token is issued
    pub fn new_expired(user_id: i64) -> Self {
        ApiClaim {
            sub: user_id.to_string(),
            iat: unix_secs(SystemTime::now()),
            exp: 0,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.iat = unix_secs(SystemTime::now());
        self.exp = unix_secs(until);
    }
}
