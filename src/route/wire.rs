//! Serde adapters for the transport document.
//!
//! Peers may send the zero timestamp (`0001-01-01T00:00:00Z`) for an unset stamp, so
//! it is folded into `None` on the way in. Durations travel as integer nanoseconds.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unix seconds of `0001-01-01T00:00:00Z`.
const ZERO_TIME_UNIX: i64 = -62_135_596_800;

pub(crate) mod timestamp {
    use super::*;

    pub(crate) fn serialize<S>(v: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match v {
            Some(t) => t.serialize(s),
            None => s.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<DateTime<Utc>>::deserialize(d)?;
        Ok(raw.filter(|t| t.timestamp() != ZERO_TIME_UNIX))
    }
}

pub(crate) mod duration_nanos {
    use super::*;

    pub(crate) fn serialize<S>(v: &TimeDelta, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_i64(nanos_saturating(*v))
    }

    pub(crate) fn deserialize<'de, D>(d: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(TimeDelta::nanoseconds(i64::deserialize(d)?))
    }
}

pub(crate) fn nanos_saturating(d: TimeDelta) -> i64 {
    d.num_nanoseconds()
        .unwrap_or(if d < TimeDelta::zero() { i64::MIN } else { i64::MAX })
}

pub(crate) fn is_zero_delta(v: &TimeDelta) -> bool {
    *v == TimeDelta::zero()
}

pub(crate) fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

pub(crate) fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

pub(crate) fn is_zero_usize(v: &usize) -> bool {
    *v == 0
}
