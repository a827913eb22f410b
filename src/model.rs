//! Domain model: sales, items, checkout codes, and audit records.

use crate::error::Error;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Length of the random nonce embedded in a checkout code.
pub const CHECKOUT_NONCE_LEN: usize = 8;

/// A one-hour sale window. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One saleable unit. Reservation state lives in the store and is never
/// serialized; listing exposes only the public fields.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: i64,
    pub sale_id: i64,
    pub name: String,
    pub sold: bool,
    pub created_at: DateTime<Utc>,
}

/// The opaque token returned by a successful checkout.
///
/// String form is `user:item:nonce` with an 8-char alphanumeric nonce. The
/// token is self-describing: purchase re-parses it and checks the parts
/// against item state, no checkout row lookup needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCode {
    pub user_id: i64,
    pub item_id: i64,
    pub rand: String,
}

impl CheckoutCode {
    /// Create a code for the given user and item with a fresh random nonce.
    pub fn generate(user_id: i64, item_id: i64) -> Self {
        let rand = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CHECKOUT_NONCE_LEN)
            .map(char::from)
            .collect();

        Self {
            user_id,
            item_id,
            rand,
        }
    }
}

impl fmt::Display for CheckoutCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user_id, self.item_id, self.rand)
    }
}

impl FromStr for CheckoutCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let (Some(user), Some(item), Some(rand)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::MalformedCode(format!(
                "expected 3 colon-separated parts in {s:?}"
            )));
        };

        let user_id: i64 = user
            .parse()
            .map_err(|e| Error::MalformedCode(format!("can't parse user id: {e}")))?;
        let item_id: i64 = item
            .parse()
            .map_err(|e| Error::MalformedCode(format!("can't parse item id: {e}")))?;

        if rand.len() != CHECKOUT_NONCE_LEN || !rand.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::MalformedCode(format!("invalid nonce {rand:?}")));
        }

        Ok(Self {
            user_id,
            item_id,
            rand: rand.to_string(),
        })
    }
}

/// One checkout attempt, appended to the audit log.
///
/// `code` is set on success, `error` on explicit unavailability; the two are
/// mutually exclusive.
#[derive(Debug, Clone)]
pub struct CheckoutAttempt {
    pub user_id: i64,
    pub item_id: i64,
    pub created_at: DateTime<Utc>,
    pub code: Option<String>,
    pub error: Option<String>,
}

impl CheckoutAttempt {
    pub fn succeeded(user_id: i64, item_id: i64, code: String) -> Self {
        Self {
            user_id,
            item_id,
            created_at: Utc::now(),
            code: Some(code),
            error: None,
        }
    }

    pub fn failed(user_id: i64, item_id: i64, error: String) -> Self {
        Self {
            user_id,
            item_id,
            created_at: Utc::now(),
            code: None,
            error: Some(error),
        }
    }
}

/// Cached reservation state for one item.
///
/// Wire form (shared cache value) is `userID|untilEpoch|code`, where `code`
/// is the full checkout token. Sub-second precision is dropped on the wire;
/// both tiers treat `until` as advisory and the store stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationEntry {
    pub user_id: i64,
    pub until: DateTime<Utc>,
    pub code: String,
}

impl ReservationEntry {
    /// Whether the hold is still live at `now`.
    pub fn live_at(&self, now: DateTime<Utc>) -> bool {
        self.until > now
    }
}

impl fmt::Display for ReservationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.user_id, self.until.timestamp(), self.code)
    }
}

impl FromStr for ReservationEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '|');

        let (Some(user), Some(until), Some(code)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Internal(format!(
                "expected reservation entry to have 3 parts, got {s:?}"
            )));
        };

        let user_id: i64 = user
            .parse()
            .map_err(|e| Error::Internal(format!("can't parse reservation user id: {e}")))?;
        let epoch: i64 = until
            .parse()
            .map_err(|e| Error::Internal(format!("can't parse reservation expiry: {e}")))?;
        let until = DateTime::from_timestamp(epoch, 0)
            .ok_or_else(|| Error::Internal(format!("reservation expiry {epoch} out of range")))?;

        Ok(Self {
            user_id,
            until,
            code: code.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn checkout_code_roundtrip() {
        let code = CheckoutCode::generate(7, 42);
        assert_eq!(code.rand.len(), CHECKOUT_NONCE_LEN);
        assert!(code.rand.bytes().all(|b| b.is_ascii_alphanumeric()));

        let parsed: CheckoutCode = code.to_string().parse().unwrap();
        assert_eq!(parsed, code);
    }

    #[test]
    fn checkout_code_format() {
        let code = CheckoutCode {
            user_id: 7,
            item_id: 1,
            rand: "a1B2c3D4".to_string(),
        };
        assert_eq!(code.to_string(), "7:1:a1B2c3D4");
    }

    #[test]
    fn checkout_code_rejects_malformed() {
        for bad in [
            "",
            "7",
            "7:1",
            "x:1:a1B2c3D4",
            "7:y:a1B2c3D4",
            "7:1:short",
            "7:1:waytoolongnonce",
            "7:1:a1B2c3D!",
        ] {
            let err = bad.parse::<CheckoutCode>().unwrap_err();
            assert!(
                matches!(err, Error::MalformedCode(_)),
                "expected MalformedCode for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn reservation_entry_roundtrip() {
        let entry = ReservationEntry {
            user_id: 7,
            until: Utc.with_ymd_and_hms(2025, 6, 1, 10, 3, 0).unwrap(),
            code: "7:1:a1B2c3D4".to_string(),
        };

        let parsed: ReservationEntry = entry.to_string().parse().unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn reservation_entry_rejects_malformed() {
        for bad in ["", "7|only-two", "x|1700000000|code", "7|notanumber|code"] {
            assert!(bad.parse::<ReservationEntry>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn reservation_entry_liveness() {
        let now = Utc::now();
        let entry = ReservationEntry {
            user_id: 7,
            until: now + chrono::Duration::seconds(10),
            code: "7:1:a1B2c3D4".to_string(),
        };

        assert!(entry.live_at(now));
        assert!(!entry.live_at(now + chrono::Duration::seconds(11)));
    }
}
