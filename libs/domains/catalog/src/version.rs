use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque optimistic-concurrency stamp carried by every mutable record.
///
/// A write request supplies the token it read; the store compares it against
/// the currently persisted token and rejects the write on mismatch. Every
/// successful write replaces the token with a fresh one.
///
/// Tokens are comparable for equality only — the type deliberately has no
/// `Ord` implementation and the random generation strategy carries no
/// ordering information.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[schema(value_type = Uuid)]
pub struct VersionToken(Uuid);

impl VersionToken {
    /// Generate a new, unique token.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for VersionToken {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_differ() {
        assert_ne!(VersionToken::fresh(), VersionToken::fresh());
    }

    #[test]
    fn round_trips_through_uuid() {
        let token = VersionToken::fresh();
        assert_eq!(VersionToken::from(token.as_uuid()), token);
    }
}
