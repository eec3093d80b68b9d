//! Defines the `Season` enum, mapping the season labels stored with every weather
//! record to typed variants with a fixed canonical order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The meteorological season a weather record belongs to.
///
/// Seasons are precomputed per record in the source dataset and stored as their
/// English name (`"Winter"`, `"Spring"`, ...). They are never derived from the date
/// at query time.
///
/// The derived `Ord` follows the canonical order used for seasonal tables:
/// Winter, Spring, Summer, Autumn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// December to February in the northern hemisphere.
    Winter,
    /// March to May.
    Spring,
    /// June to August.
    Summer,
    /// September to November.
    Autumn,
}

impl Season {
    /// All seasons in canonical order.
    pub const CANONICAL: [Season; 4] = [
        Season::Winter,
        Season::Spring,
        Season::Summer,
        Season::Autumn,
    ];

    /// The label stored in the `season` column.
    ///
    /// # Examples
    ///
    /// ```
    /// use weather_dashboard::Season;
    ///
    /// assert_eq!(Season::Autumn.as_str(), "Autumn");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }

    /// Converts a stored season label into a `Season`.
    ///
    /// Matching is exact, as the dataset only ever contains the four English labels.
    /// Returns `None` for anything else.
    ///
    /// # Examples
    ///
    /// ```
    /// use weather_dashboard::Season;
    ///
    /// assert_eq!(Season::from_label("Summer"), Some(Season::Summer));
    /// assert_eq!(Season::from_label("summer"), None);
    /// ```
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Winter" => Some(Season::Winter),
            "Spring" => Some(Season::Spring),
            "Summer" => Some(Season::Summer),
            "Autumn" => Some(Season::Autumn),
            _ => None,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the four season labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown season '{0}', expected one of Winter, Spring, Summer, Autumn")]
pub struct ParseSeasonError(pub String);

/// Case-insensitive parsing, meant for user input (CLI flags).
impl FromStr for Season {
    type Err = ParseSeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::CANONICAL
            .into_iter()
            .find(|season| season.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSeasonError(s.to_string()))
    }
}
