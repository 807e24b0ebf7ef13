//! The dispatch status machine.
//!
//! Every driver's live dispatch record is in exactly one of these states.
//! The wire form is the exact uppercase string the dispatch board displays
//! (`"READY AT HOME"`, `"ETA WILL BE LATE"`, ...), so the enum serializes
//! to and parses from those strings verbatim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed enumeration of dispatch states.
///
/// The idle family (`Ready`, `WillBeReady`, `ReadyAtHome`, `AtHome`,
/// `LetUsKnow`) never carries a load. The assigned family (`Covered`,
/// `AtPu`, `AtDel`, `TruckIssues`, `Eta`, `EtaWillBeLate`) always does —
/// see [`DispatchStatus::has_active_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStatus {
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "WILL BE READY")]
    WillBeReady,
    #[serde(rename = "READY AT HOME")]
    ReadyAtHome,
    #[serde(rename = "AT HOME")]
    AtHome,
    #[serde(rename = "LET US KNOW")]
    LetUsKnow,
    #[serde(rename = "COVERED")]
    Covered,
    #[serde(rename = "AT PU")]
    AtPu,
    #[serde(rename = "ETA")]
    Eta,
    #[serde(rename = "ETA WILL BE LATE")]
    EtaWillBeLate,
    #[serde(rename = "AT DEL")]
    AtDel,
    #[serde(rename = "TRUCK ISSUES")]
    TruckIssues,
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dispatch status: {0:?}")]
pub struct ParseStatusError(pub String);

impl DispatchStatus {
    /// The exact board string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Ready => "READY",
            DispatchStatus::WillBeReady => "WILL BE READY",
            DispatchStatus::ReadyAtHome => "READY AT HOME",
            DispatchStatus::AtHome => "AT HOME",
            DispatchStatus::LetUsKnow => "LET US KNOW",
            DispatchStatus::Covered => "COVERED",
            DispatchStatus::AtPu => "AT PU",
            DispatchStatus::Eta => "ETA",
            DispatchStatus::EtaWillBeLate => "ETA WILL BE LATE",
            DispatchStatus::AtDel => "AT DEL",
            DispatchStatus::TruckIssues => "TRUCK ISSUES",
        }
    }

    /// True iff this status carries an attached load.
    ///
    /// Invariant enforced by the engine: `cargo_id` on a dispatch record is
    /// `Some` exactly when its status is in this set.
    pub fn has_active_load(&self) -> bool {
        matches!(
            self,
            DispatchStatus::Covered
                | DispatchStatus::AtPu
                | DispatchStatus::AtDel
                | DispatchStatus::TruckIssues
                | DispatchStatus::Eta
                | DispatchStatus::EtaWillBeLate
        )
    }

    /// True iff this status is in the idle family (no load attached).
    pub fn is_idle(&self) -> bool {
        !self.has_active_load()
    }

    /// True iff countdowns for this status track an estimate
    /// (pickup for `Covered`, delivery for the ETA pair).
    pub fn tracks_estimate(&self) -> bool {
        matches!(
            self,
            DispatchStatus::Covered | DispatchStatus::Eta | DispatchStatus::EtaWillBeLate
        )
    }

    /// Board listing order: free drivers first, out-of-rotation last.
    pub fn sort_rank(&self) -> u8 {
        match self {
            DispatchStatus::Ready => 1,
            DispatchStatus::WillBeReady => 2,
            DispatchStatus::ReadyAtHome => 3,
            DispatchStatus::Covered => 4,
            DispatchStatus::AtPu => 5,
            DispatchStatus::Eta => 6,
            DispatchStatus::AtDel => 7,
            DispatchStatus::EtaWillBeLate => 8,
            DispatchStatus::TruckIssues => 9,
            DispatchStatus::AtHome => 10,
            DispatchStatus::LetUsKnow => 11,
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(DispatchStatus::Ready),
            "WILL BE READY" => Ok(DispatchStatus::WillBeReady),
            "READY AT HOME" => Ok(DispatchStatus::ReadyAtHome),
            "AT HOME" => Ok(DispatchStatus::AtHome),
            "LET US KNOW" => Ok(DispatchStatus::LetUsKnow),
            "COVERED" => Ok(DispatchStatus::Covered),
            "AT PU" => Ok(DispatchStatus::AtPu),
            "ETA" => Ok(DispatchStatus::Eta),
            "ETA WILL BE LATE" => Ok(DispatchStatus::EtaWillBeLate),
            "AT DEL" => Ok(DispatchStatus::AtDel),
            "TRUCK ISSUES" => Ok(DispatchStatus::TruckIssues),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Transition guard consulted by the engine before every status change.
///
/// Dispatchers may currently move a driver between any two states; the
/// product has no confirmed adjacency rules. This function is the seam
/// where such a table would go — callers already route every transition
/// through it.
pub fn transition_allowed(_from: DispatchStatus, _to: DispatchStatus) -> bool {
    true
}
