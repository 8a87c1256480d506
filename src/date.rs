use chrono::{DateTime, TimeZone, Utc};
use serde::{self, Deserialize, Deserializer};

// The signature of a deserialize_with function must follow the pattern:
//
//    fn deserialize<'de, D>(D) -> Result<T, D::Error>
//    where
//        D: Deserializer<'de>
//
// although it may also be generic over the output types T.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    // NOTE:
    // the cat API returns creation.date as a String holding epoch millis, not
    // an integer, so parse to i64 first
    let millis = s.parse::<i64>().map_err(serde::de::Error::custom)?;
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        serde::de::Error::custom(format!(
            "creation date out of range: {}",
            millis
        ))
    })
}
