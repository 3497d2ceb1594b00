//! Review star rating.

use serde::{Deserialize, Serialize};

/// Error returned when a rating is outside 1..=5.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("stars must be between 1 and 5 (got {got})")]
pub struct StarsError {
    /// The rejected value.
    pub got: i64,
}

/// A star rating from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i16")]
pub struct Stars(i16);

impl Stars {
    /// Lowest allowed rating.
    pub const MIN: i16 = 1;
    /// Highest allowed rating.
    pub const MAX: i16 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns `StarsError` if `value` is outside 1..=5.
    pub fn new(value: i64) -> Result<Self, StarsError> {
        i16::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(StarsError { got: value })
    }

    /// Get the rating as an `i16`.
    #[must_use]
    pub const fn get(self) -> i16 {
        self.0
    }
}

impl TryFrom<i64> for Stars {
    type Error = StarsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Stars> for i16 {
    fn from(stars: Stars) -> Self {
        stars.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Stars {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Stars {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Stars {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(Stars::new(0).is_err());
        assert_eq!(Stars::new(1).unwrap().get(), 1);
        assert_eq!(Stars::new(5).unwrap().get(), 5);
        assert_eq!(Stars::new(6), Err(StarsError { got: 6 }));
        assert!(Stars::new(i64::from(i16::MAX) + 1).is_err());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert_eq!(serde_json::from_str::<Stars>("4").unwrap().get(), 4);
        assert!(serde_json::from_str::<Stars>("9").is_err());
    }
}
