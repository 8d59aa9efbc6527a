use {
    derive_more::{
        Display,
        From,
        FromStr,
    },
    sqlx::{
        Decode,
        Encode,
        postgres::{
            PgArgumentBuffer,
            PgTypeInfo,
            PgValueRef,
        },
    },
    crate::prelude::*,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, FromStr, Deserialize, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub(crate) struct FixtureId(i64);

impl FixtureId {
    pub(crate) fn get(self) -> i64 {
        self.0
    }
}

impl<'a> FromParam<'a> for FixtureId {
    type Error = &'a str;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse().map_err(|_| param)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, FromStr, Deserialize, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub(crate) struct TeamId(i64);

#[derive(Debug, thiserror::Error)]
pub(crate) enum LeagueCodeError {
    #[error("league code is empty")]
    Empty,
    #[error("league code is longer than {} characters", LeagueCode::MAX_LEN)]
    TooLong,
    #[error("league code contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Short code naming a league, e.g. `U11` or `pioniri-a`. ASCII letters, digits, `-` and `_` only, matching the
/// `league_code` column checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub(crate) struct LeagueCode(String);

impl LeagueCode {
    const MAX_LEN: usize = 32;

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LeagueCode {
    type Err = LeagueCodeError;

    fn from_str(s: &str) -> Result<Self, LeagueCodeError> {
        if s.is_empty() {
            return Err(LeagueCodeError::Empty)
        }
        if s.chars().count() > Self::MAX_LEN {
            return Err(LeagueCodeError::TooLong)
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_')) {
            return Err(LeagueCodeError::InvalidChar(c))
        }
        Ok(Self(s.to_owned()))
    }
}

impl<'de> Deserialize<'de> for LeagueCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

impl<'r> Decode<'r, Postgres> for LeagueCode {
    fn decode(value: PgValueRef<'r>) -> Result<Self, Box<dyn std::error::Error + 'static + Send + Sync>> {
        let code = <&str as Decode<Postgres>>::decode(value)?;
        Ok(code.parse()?)
    }
}

impl<'q> Encode<'q, Postgres> for LeagueCode {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Encode::<Postgres>::encode_by_ref(&self.as_str(), buf)
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Encode::<Postgres>::produces(&self.as_str())
    }

    fn size_hint(&self) -> usize {
        Encode::<Postgres>::size_hint(&self.as_str())
    }
}

impl sqlx::Type<Postgres> for LeagueCode {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'a> FromParam<'a> for LeagueCode {
    type Error = &'a str;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse().map_err(|_| param)
    }
}

impl fmt::Display for LeagueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn league_codes() {
        assert_eq!("U11".parse::<LeagueCode>().map(|code| code.to_string()).ok().as_deref(), Some("U11"));
        assert_eq!("pioniri-a_2".parse::<LeagueCode>().map(|code| code.to_string()).ok().as_deref(), Some("pioniri-a_2"));
        assert!(matches!("".parse::<LeagueCode>(), Err(LeagueCodeError::Empty)));
        assert!(matches!("U 11".parse::<LeagueCode>(), Err(LeagueCodeError::InvalidChar(' '))));
        assert!(matches!("x".repeat(33).parse::<LeagueCode>(), Err(LeagueCodeError::TooLong)));
        assert!(matches!("Pioniri A".parse::<LeagueCode>(), Err(LeagueCodeError::InvalidChar(' '))));
        assert!(matches!("mlađi".parse::<LeagueCode>(), Err(LeagueCodeError::InvalidChar('đ'))));
    }

    #[test]
    fn league_code_columns_enforce_the_same_format() {
        let schema = include_str!("../migrations/20260101000000_league_tables.sql");
        let check = format!("CHECK (league_code ~ '^[A-Za-z0-9_-]{{1,{}}}$')", LeagueCode::MAX_LEN);
        assert_eq!(schema.matches(&check).count(), 3);
        assert_eq!(schema.matches("league_code TEXT NOT NULL").count(), 3);
    }

    #[test]
    fn fixture_ids() {
        assert_eq!("42".parse::<FixtureId>().ok(), Some(FixtureId::from(42)));
        assert!("abc".parse::<FixtureId>().is_err());
        assert!("".parse::<FixtureId>().is_err());
        assert_eq!(FixtureId::from_param("17").ok(), Some(FixtureId::from(17)));
        assert_eq!(FixtureId::from_param("1.5").err(), Some("1.5"));
    }
}
