//! Fixed enumerations shared by training and inference.
//!
//! Adding a value here changes the one-hot column set, which is baked into
//! every persisted bundle: old bundles must be retrained.

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Country name to dataset country code.
pub const COUNTRY_CODES: [(&str, i64); 17] = [
    ("India", 25),
    ("Poland", 26),
    ("USA", 27),
    ("Germany", 28),
    ("Italy", 30),
    ("France", 32),
    ("Spain", 38),
    ("China", 39),
    ("UK", 40),
    ("Netherlands", 77),
    ("Belgium", 78),
    ("Sweden", 79),
    ("Switzerland", 80),
    ("Turkey", 84),
    ("Austria", 89),
    ("Norway", 107),
    ("Finland", 113),
];

pub const MONTH_NAMES: [(&str, u32); 12] = [
    ("January", 1),
    ("February", 2),
    ("March", 3),
    ("April", 4),
    ("May", 5),
    ("June", 6),
    ("July", 7),
    ("August", 8),
    ("September", 9),
    ("October", 10),
    ("November", 11),
    ("December", 12),
];

/// Look up a country code by (case-insensitive) name.
pub fn country_code(name: &str) -> Result<i64, TransformError> {
    let name = name.trim();
    COUNTRY_CODES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, code)| code)
        .ok_or_else(|| TransformError::unknown("country", name))
}

/// Reverse lookup for display; codes outside the list have no name.
pub fn country_name(code: i64) -> Option<&'static str> {
    COUNTRY_CODES.iter().find(|&&(_, c)| c == code).map(|&(n, _)| n)
}

pub fn month_number(name: &str) -> Result<u32, TransformError> {
    let name = name.trim();
    MONTH_NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, m)| m)
        .ok_or_else(|| TransformError::unknown("month", name))
}

/// Quote pipeline stage.
///
/// Declaration order is the one-hot order; the first entry is the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    NotLostForAm,
    Offerable,
    Offered,
    Revised,
    ToBeApproved,
    Wonderful,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::NotLostForAm,
        Status::Offerable,
        Status::Offered,
        Status::Revised,
        Status::ToBeApproved,
        Status::Wonderful,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::NotLostForAm => "Not lost for AM",
            Status::Offerable => "Offerable",
            Status::Offered => "Offered",
            Status::Revised => "Revised",
            Status::ToBeApproved => "To be approved",
            Status::Wonderful => "Wonderful",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TransformError> {
        let s = s.trim();
        Status::ALL
            .into_iter()
            .find(|st| st.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| TransformError::unknown("status", s))
    }

    pub fn column(self) -> String {
        format!("status_{}", self.label())
    }

    pub fn next(self) -> Self {
        cycle(&Status::ALL, self, 1)
    }

    pub fn prev(self) -> Self {
        cycle(&Status::ALL, self, -1)
    }
}

/// Product classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Others,
    Pl,
    S,
    W,
    Wi,
}

impl ItemType {
    pub const ALL: [ItemType; 5] = [ItemType::Others, ItemType::Pl, ItemType::S, ItemType::W, ItemType::Wi];

    pub fn label(self) -> &'static str {
        match self {
            ItemType::Others => "Others",
            ItemType::Pl => "PL",
            ItemType::S => "S",
            ItemType::W => "W",
            ItemType::Wi => "WI",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TransformError> {
        let s = s.trim();
        ItemType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| TransformError::unknown("item type", s))
    }

    pub fn column(self) -> String {
        format!("item_type_{}", self.label())
    }

    pub fn next(self) -> Self {
        cycle(&ItemType::ALL, self, 1)
    }

    pub fn prev(self) -> Self {
        cycle(&ItemType::ALL, self, -1)
    }
}

/// Resolved quote outcome (training label).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Won => "Won",
            Outcome::Lost => "Lost",
        }
    }

    /// Classification target value.
    pub fn as_target(self) -> f64 {
        match self {
            Outcome::Won => 1.0,
            Outcome::Lost => 0.0,
        }
    }
}

/// Value of the dataset's `status` column: either an open stage or a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusLabel {
    Stage(Status),
    Resolved(Outcome),
}

impl StatusLabel {
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("won") {
            return Ok(StatusLabel::Resolved(Outcome::Won));
        }
        if t.eq_ignore_ascii_case("lost") {
            return Ok(StatusLabel::Resolved(Outcome::Lost));
        }
        Status::parse(t).map(StatusLabel::Stage)
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusLabel::Stage(s) => s.label(),
            StatusLabel::Resolved(o) => o.label(),
        }
    }

    pub fn stage(self) -> Option<Status> {
        match self {
            StatusLabel::Stage(s) => Some(s),
            StatusLabel::Resolved(_) => None,
        }
    }

    pub fn outcome(self) -> Option<Outcome> {
        match self {
            StatusLabel::Stage(_) => None,
            StatusLabel::Resolved(o) => Some(o),
        }
    }
}

/// Classifier output as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictedOutcome {
    Win,
    NotWin,
}

impl PredictedOutcome {
    /// `1` maps to `Win`; anything else is `NotWin`.
    pub fn from_class(class: u8) -> Self {
        if class == 1 { PredictedOutcome::Win } else { PredictedOutcome::NotWin }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PredictedOutcome::Win => "Win",
            PredictedOutcome::NotWin => "Not Win",
        }
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], cur: T, delta: i32) -> T {
    let n = all.len() as i32;
    let idx = all.iter().position(|&v| v == cur).unwrap_or(0) as i32;
    all[((idx + delta).rem_euclid(n)) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_status_is_unknown() {
        let err = Status::parse("Cancelled").unwrap_err();
        assert_eq!(
            err,
            TransformError::UnknownCategory {
                field: "status",
                value: "Cancelled".to_string()
            }
        );
        assert!(StatusLabel::parse("Cancelled").is_err());
    }

    #[test]
    fn status_label_resolves_outcomes() {
        assert_eq!(StatusLabel::parse("Won").unwrap().outcome(), Some(Outcome::Won));
        assert_eq!(StatusLabel::parse(" lost ").unwrap().outcome(), Some(Outcome::Lost));
        assert_eq!(
            StatusLabel::parse("To be approved").unwrap().stage(),
            Some(Status::ToBeApproved)
        );
    }

    #[test]
    fn catalog_lookups() {
        assert_eq!(country_code("india").unwrap(), 25);
        assert_eq!(country_name(113), Some("Finland"));
        assert!(country_code("Atlantis").is_err());
        assert_eq!(month_number("December").unwrap(), 12);
        assert_eq!(ItemType::parse("wi").unwrap(), ItemType::Wi);
        assert!(ItemType::parse("IPL").is_err());
    }

    #[test]
    fn cycling_wraps() {
        assert_eq!(Status::Wonderful.next(), Status::NotLostForAm);
        assert_eq!(ItemType::Others.prev(), ItemType::Wi);
        assert_eq!(PredictedOutcome::from_class(1), PredictedOutcome::Win);
        assert_eq!(PredictedOutcome::from_class(0), PredictedOutcome::NotWin);
    }
}
