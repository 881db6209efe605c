//! Non-deterministic generators

use rand::Rng;
use uuid::Uuid;

/// Fresh random UUID (version 4)
pub fn guid() -> String {
    Uuid::new_v4().to_string()
}

/// Fresh random integer in `0..=i32::MAX`
pub fn number() -> String {
    rand::thread_rng().gen_range(0..=i32::MAX).to_string()
}
