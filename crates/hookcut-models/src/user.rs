//! User records and credit arithmetic.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

string_id!(
    /// Identifier of an authenticated user.
    UserId
);

/// Credits charged for every clip produced.
pub const CREDITS_PER_CLIP: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub credits: u32,
}

impl User {
    /// Number of clips this user can pay for out of `requested`.
    pub fn affordable_clip_count(&self, requested: u32) -> u32 {
        affordable_clip_count(self.credits, requested)
    }
}

/// `min(floor(credits / 2), requested)`.
pub fn affordable_clip_count(credits: u32, requested: u32) -> u32 {
    (credits / CREDITS_PER_CLIP).min(requested)
}

/// Credits to charge for `clips` created clips.
pub fn clip_cost(clips: usize) -> u32 {
    u32::try_from(clips)
        .unwrap_or(u32::MAX)
        .saturating_mul(CREDITS_PER_CLIP)
}
