use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{AuctionId, ProjectId};
use crate::MarketError;

/// The lifecycle states of an auction.
///
/// Auctions are created `Pending`, opened for bidding (`Active`) and closed
/// as either `Completed` or `Cancelled`. The two closing states are terminal.
/// On the wire a status is its numeric code.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AuctionStatus {
    /// Created, not yet accepting bids
    Pending = 0,
    /// Accepting bids inside the bidding window
    Active = 1,
    /// Closed normally
    Completed = 2,
    /// Closed without a result
    Cancelled = 3,
}

impl AuctionStatus {
    /// Every status, in code order
    pub const ALL: [AuctionStatus; 4] = [
        AuctionStatus::Pending,
        AuctionStatus::Active,
        AuctionStatus::Completed,
        AuctionStatus::Cancelled,
    ];

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: AuctionStatus) -> bool {
        use AuctionStatus::*;
        matches!(
            (self, next),
            (Pending, Active) | (Pending, Cancelled) | (Active, Completed) | (Active, Cancelled)
        )
    }

    /// Check a requested transition, failing with `InvalidTransition`
    pub fn transition(self, next: AuctionStatus) -> Result<AuctionStatus, MarketError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(MarketError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Completed and Cancelled admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, AuctionStatus::Completed | AuctionStatus::Cancelled)
    }

    /// Only Pending and Cancelled auctions may be deleted
    pub fn is_deletable(self) -> bool {
        matches!(self, AuctionStatus::Pending | AuctionStatus::Cancelled)
    }
}

impl TryFrom<u8> for AuctionStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Active),
            2 => Ok(Self::Completed),
            3 => Ok(Self::Cancelled),
            other => Err(format!("unknown auction status {other}")),
        }
    }
}

impl TryFrom<i64> for AuctionStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| format!("unknown auction status {value}"))
            .and_then(Self::try_from)
    }
}

impl From<AuctionStatus> for u8 {
    fn from(value: AuctionStatus) -> Self {
        value as u8
    }
}

impl Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        })
    }
}

#[cfg(feature = "schemars")]
impl schemars::JsonSchema for AuctionStatus {
    fn inline_schema() -> bool {
        true
    }

    fn schema_name() -> std::borrow::Cow<'static, str> {
        "AuctionStatus".into()
    }

    fn json_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "integer",
            "enum": [0, 1, 2, 3],
            "description": "0 = pending, 1 = active, 2 = completed, 3 = cancelled",
        })
    }
}

/// An auction attached to a project.
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    /// The auction id
    pub id: AuctionId,
    /// The project being auctioned
    pub project_id: ProjectId,
    /// When bidding opens
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub bidding_started_at: OffsetDateTime,
    /// When bidding closes
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub bidding_deadline: OffsetDateTime,
    /// The lifecycle status
    pub status: AuctionStatus,
    /// When the auction was created
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the auction was last modified
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Auction {
    /// Check that the auction accepts bids at `now`.
    ///
    /// The window is closed on both ends: a bid placed exactly at the start
    /// or exactly at the deadline is accepted.
    pub fn check_live(&self, now: OffsetDateTime) -> Result<(), MarketError> {
        if self.status != AuctionStatus::Active {
            return Err(MarketError::AuctionNotActive {
                current: self.status,
                required: AuctionStatus::Active,
            });
        }
        if now < self.bidding_started_at {
            return Err(MarketError::AuctionNotStarted {
                starts_at: self.bidding_started_at,
            });
        }
        if now > self.bidding_deadline {
            return Err(MarketError::AuctionEnded {
                ended_at: self.bidding_deadline,
            });
        }
        Ok(())
    }

    /// Whether bidding is open at `now`
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.check_live(now).is_ok()
    }

    /// Validate an update request against the stored auction.
    ///
    /// A new deadline must be strictly after `now` and strictly after the
    /// stored start; a new status must be allowed by the lifecycle table.
    pub fn plan_update(
        &self,
        update: &AuctionUpdate,
        now: OffsetDateTime,
    ) -> Result<AuctionChanges, MarketError> {
        if update.status.is_none() && update.bidding_deadline.is_none() {
            return Err(MarketError::Validation(
                "nothing to update: provide status and/or bidding_deadline".to_owned(),
            ));
        }

        let status = match update.status {
            Some(next) => self.status.transition(next)?,
            None => self.status,
        };

        let bidding_deadline = match update.bidding_deadline {
            Some(deadline) => {
                if deadline <= now {
                    return Err(MarketError::InvalidSchedule(
                        "the new bidding deadline must be in the future".to_owned(),
                    ));
                }
                if deadline <= self.bidding_started_at {
                    return Err(MarketError::InvalidSchedule(
                        "the new bidding deadline must be after the bidding start".to_owned(),
                    ));
                }
                deadline
            }
            None => self.bidding_deadline,
        };

        Ok(AuctionChanges {
            expected: self.status,
            status,
            bidding_deadline,
        })
    }

    /// Check that the auction may be deleted
    pub fn check_deletable(&self) -> Result<(), MarketError> {
        if self.status.is_deletable() {
            Ok(())
        } else {
            Err(MarketError::DeletionNotAllowed(self.status))
        }
    }
}

/// The request body for creating an auction
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuction {
    /// The project to auction
    pub project_id: ProjectId,
    /// When bidding opens
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub bidding_started_at: OffsetDateTime,
    /// When bidding closes; must be after `bidding_started_at`
    #[cfg_attr(feature = "schemars", schemars(schema_with = "super::datetime_schema"))]
    #[serde(with = "time::serde::rfc3339")]
    pub bidding_deadline: OffsetDateTime,
}

impl NewAuction {
    /// Check the schedule invariant
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.bidding_deadline > self.bidding_started_at {
            Ok(())
        } else {
            Err(MarketError::Validation(
                "bidding_deadline must be after bidding_started_at".to_owned(),
            ))
        }
    }
}

/// The request body for updating an auction
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionUpdate {
    /// The requested status
    #[serde(default)]
    pub status: Option<AuctionStatus>,
    /// The requested deadline
    #[cfg_attr(
        feature = "schemars",
        schemars(schema_with = "super::optional_datetime_schema")
    )]
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub bidding_deadline: Option<OffsetDateTime>,
}

/// A validated update, ready to be written.
///
/// `expected` is the status the update was validated against; the write only
/// applies if the stored status still matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionChanges {
    /// The status the update was validated against
    pub expected: AuctionStatus,
    /// The new status
    pub status: AuctionStatus,
    /// The new deadline
    pub bidding_deadline: OffsetDateTime,
}

/// Filters for listing auctions
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionQuery {
    /// Only auctions for this project
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// Only auctions in this status
    #[serde(default)]
    pub status: Option<AuctionStatus>,
    /// Only auctions whose bidding starts at or after this time
    #[cfg_attr(
        feature = "schemars",
        schemars(schema_with = "super::optional_datetime_schema")
    )]
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    /// Only auctions whose bidding closes at or before this time
    #[cfg_attr(
        feature = "schemars",
        schemars(schema_with = "super::optional_datetime_schema")
    )]
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn auction(status: AuctionStatus, now: OffsetDateTime) -> Auction {
        Auction {
            id: AuctionId(1),
            project_id: ProjectId(1),
            bidding_started_at: now + Duration::hours(1),
            bidding_deadline: now + Duration::hours(2),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        use AuctionStatus::*;
        let allowed = [
            (Pending, Active),
            (Pending, Cancelled),
            (Active, Completed),
            (Active, Cancelled),
        ];

        let mut checked = 0;
        for from in AuctionStatus::ALL {
            for to in AuctionStatus::ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {}",
                    if expected { "allowed" } else { "denied" }
                );
                match from.transition(to) {
                    Ok(next) => {
                        assert!(expected);
                        assert_eq!(next, to);
                    }
                    Err(MarketError::InvalidTransition { from: f, to: t }) => {
                        assert!(!expected);
                        assert_eq!((f, t), (from, to));
                    }
                    Err(other) => panic!("unexpected error {other}"),
                }
                checked += 1;
            }
        }
        assert_eq!(checked, 16);
    }

    #[test]
    fn test_terminal_and_deletable() {
        assert!(AuctionStatus::Completed.is_terminal());
        assert!(AuctionStatus::Cancelled.is_terminal());
        assert!(!AuctionStatus::Active.is_terminal());

        let now = OffsetDateTime::now_utc();
        assert!(auction(AuctionStatus::Pending, now).check_deletable().is_ok());
        assert!(auction(AuctionStatus::Cancelled, now).check_deletable().is_ok());
        assert!(matches!(
            auction(AuctionStatus::Active, now).check_deletable(),
            Err(MarketError::DeletionNotAllowed(AuctionStatus::Active))
        ));
        assert!(matches!(
            auction(AuctionStatus::Completed, now).check_deletable(),
            Err(MarketError::DeletionNotAllowed(AuctionStatus::Completed))
        ));
    }

    #[test]
    fn test_status_codes() {
        for status in AuctionStatus::ALL {
            let code: u8 = status.into();
            assert_eq!(AuctionStatus::try_from(code), Ok(status));
            assert_eq!(serde_json::to_string(&status).unwrap(), code.to_string());
        }
        assert!(AuctionStatus::try_from(4u8).is_err());
        assert!(AuctionStatus::try_from(-1i64).is_err());
        assert!(serde_json::from_str::<AuctionStatus>("7").is_err());
    }

    #[test]
    fn test_live_window_boundaries() {
        let now = OffsetDateTime::now_utc();
        let live = auction(AuctionStatus::Active, now);
        let start = live.bidding_started_at;
        let deadline = live.bidding_deadline;
        let tick = Duration::nanoseconds(1);

        assert!(matches!(
            live.check_live(start - tick),
            Err(MarketError::AuctionNotStarted { starts_at }) if starts_at == start
        ));
        assert!(live.check_live(start).is_ok());
        assert!(live.check_live(start + Duration::minutes(30)).is_ok());
        assert!(live.check_live(deadline).is_ok());
        assert!(matches!(
            live.check_live(deadline + tick),
            Err(MarketError::AuctionEnded { ended_at }) if ended_at == deadline
        ));

        for status in [
            AuctionStatus::Pending,
            AuctionStatus::Completed,
            AuctionStatus::Cancelled,
        ] {
            assert!(matches!(
                auction(status, now).check_live(start + Duration::minutes(30)),
                Err(MarketError::AuctionNotActive { current, required: AuctionStatus::Active })
                    if current == status
            ));
        }
    }

    #[test]
    fn test_plan_update() {
        let now = OffsetDateTime::now_utc();
        let pending = auction(AuctionStatus::Pending, now);

        assert!(matches!(
            pending.plan_update(&AuctionUpdate::default(), now),
            Err(MarketError::Validation(_))
        ));

        let activate = AuctionUpdate {
            status: Some(AuctionStatus::Active),
            bidding_deadline: None,
        };
        let changes = pending.plan_update(&activate, now).unwrap();
        assert_eq!(changes.expected, AuctionStatus::Pending);
        assert_eq!(changes.status, AuctionStatus::Active);
        assert_eq!(changes.bidding_deadline, pending.bidding_deadline);

        let complete = AuctionUpdate {
            status: Some(AuctionStatus::Completed),
            bidding_deadline: None,
        };
        assert!(matches!(
            pending.plan_update(&complete, now),
            Err(MarketError::InvalidTransition { .. })
        ));

        // the deadline must be after now, and after the start
        let in_the_past = AuctionUpdate {
            status: None,
            bidding_deadline: Some(now - Duration::minutes(1)),
        };
        assert!(matches!(
            pending.plan_update(&in_the_past, now),
            Err(MarketError::InvalidSchedule(_))
        ));
        let before_start = AuctionUpdate {
            status: None,
            bidding_deadline: Some(now + Duration::minutes(30)),
        };
        assert!(matches!(
            pending.plan_update(&before_start, now),
            Err(MarketError::InvalidSchedule(_))
        ));
        let at_start = AuctionUpdate {
            status: None,
            bidding_deadline: Some(pending.bidding_started_at),
        };
        assert!(matches!(
            pending.plan_update(&at_start, now),
            Err(MarketError::InvalidSchedule(_))
        ));

        let extend = AuctionUpdate {
            status: None,
            bidding_deadline: Some(now + Duration::hours(3)),
        };
        let changes = pending.plan_update(&extend, now).unwrap();
        assert_eq!(changes.status, AuctionStatus::Pending);
        assert!(changes.bidding_deadline > pending.bidding_started_at);
    }

    #[test]
    fn test_new_auction_schedule() {
        let now = OffsetDateTime::now_utc();
        let ok = NewAuction {
            project_id: ProjectId(3),
            bidding_started_at: now,
            bidding_deadline: now + Duration::hours(1),
        };
        assert!(ok.validate().is_ok());

        let inverted = NewAuction {
            bidding_deadline: now,
            ..ok.clone()
        };
        assert!(matches!(inverted.validate(), Err(MarketError::Validation(_))));
    }
}
