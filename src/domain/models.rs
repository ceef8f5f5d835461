use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::types::{PostId, UserName};

/// One measured run: the row written to a benchmark CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    #[serde(rename = "PARAM")]
    pub param: u32,
    /// Mean latency of the successful requests, NaN when none succeeded.
    #[serde(rename = "AVG_TIME", serialize_with = "two_decimals")]
    pub avg_time_ms: f64,
    #[serde(rename = "RUN")]
    pub run: u32,
    #[serde(rename = "FAILED", serialize_with = "as_flag")]
    pub failed: bool,
}

fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", value))
}

fn as_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: UserName,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub author: UserName,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Follow {
    pub follower: UserName,
    pub followee: UserName,
}
