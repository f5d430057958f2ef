//! Serde helpers that send snowflake IDs as JSON strings.
//!
//! Snowflakes exceed 2^53 and lose precision as JavaScript numbers. Incoming
//! IDs are accepted either as strings or as numbers.

use serde::{de, Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Num(i64),
}

impl RawId {
    fn into_id<E: de::Error>(self) -> Result<i64, E> {
        match self {
            RawId::Num(n) => Ok(n),
            RawId::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid id '{}'", s))),
        }
    }
}

pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    RawId::deserialize(deserializer)?.into_id()
}

pub mod option {
    use super::RawId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        Option::<RawId>::deserialize(deserializer)?
            .map(RawId::into_id)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Owned {
        #[serde(with = "super")]
        id: i64,
        #[serde(with = "super::option", default)]
        owner: Option<i64>,
    }

    #[test]
    fn ids_serialize_as_strings() {
        let json = serde_json::to_value(Owned {
            id: 1234567890123456789,
            owner: Some(5),
        })
        .unwrap();
        assert_eq!(json["id"], "1234567890123456789");
        assert_eq!(json["owner"], "5");
    }

    #[test]
    fn ids_accept_numbers_or_strings() {
        let a: Owned = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        let b: Owned = serde_json::from_str(r#"{"id": "42", "owner": "9"}"#).unwrap();
        assert_eq!(a.id, 42);
        assert_eq!(a.owner, None);
        assert_eq!(b.owner, Some(9));
        assert!(serde_json::from_str::<Owned>(r#"{"id": "abc"}"#).is_err());
    }
}
