// 🎖️ Pay Grades - the primary lookup key across every reference table
// Identifiers match exactly: "O-1E" is not "o-1e" and not "O1E"

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::reference::LookupError;

// ============================================================================
// PAY GRADE
// ============================================================================

/// PayGrade - Enlisted, warrant and commissioned grades
///
/// Declaration order is the canonical column order of the housing
/// allowance tables (after the leading area-code column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PayGrade {
    E1,
    E2,
    E3,
    E4,
    E5,
    E6,
    E7,
    E8,
    E9,
    W1,
    W2,
    W3,
    W4,
    W5,
    /// Commissioned officer with over 4 years of prior enlisted/warrant service
    O1E,
    O2E,
    O3E,
    O1,
    O2,
    O3,
    O4,
    O5,
    O6,
    O7,
    O8,
    O9,
    O10,
}

/// Grade category - drives the subsistence allowance rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeCategory {
    Enlisted,
    Warrant,
    Officer,
}

impl PayGrade {
    /// Every grade, in canonical table order
    pub const ALL: [PayGrade; 27] = [
        PayGrade::E1,
        PayGrade::E2,
        PayGrade::E3,
        PayGrade::E4,
        PayGrade::E5,
        PayGrade::E6,
        PayGrade::E7,
        PayGrade::E8,
        PayGrade::E9,
        PayGrade::W1,
        PayGrade::W2,
        PayGrade::W3,
        PayGrade::W4,
        PayGrade::W5,
        PayGrade::O1E,
        PayGrade::O2E,
        PayGrade::O3E,
        PayGrade::O1,
        PayGrade::O2,
        PayGrade::O3,
        PayGrade::O4,
        PayGrade::O5,
        PayGrade::O6,
        PayGrade::O7,
        PayGrade::O8,
        PayGrade::O9,
        PayGrade::O10,
    ];

    /// Identifier as printed in the published tables
    pub fn as_str(&self) -> &'static str {
        match self {
            PayGrade::E1 => "E-1",
            PayGrade::E2 => "E-2",
            PayGrade::E3 => "E-3",
            PayGrade::E4 => "E-4",
            PayGrade::E5 => "E-5",
            PayGrade::E6 => "E-6",
            PayGrade::E7 => "E-7",
            PayGrade::E8 => "E-8",
            PayGrade::E9 => "E-9",
            PayGrade::W1 => "W-1",
            PayGrade::W2 => "W-2",
            PayGrade::W3 => "W-3",
            PayGrade::W4 => "W-4",
            PayGrade::W5 => "W-5",
            PayGrade::O1E => "O-1E",
            PayGrade::O2E => "O-2E",
            PayGrade::O3E => "O-3E",
            PayGrade::O1 => "O-1",
            PayGrade::O2 => "O-2",
            PayGrade::O3 => "O-3",
            PayGrade::O4 => "O-4",
            PayGrade::O5 => "O-5",
            PayGrade::O6 => "O-6",
            PayGrade::O7 => "O-7",
            PayGrade::O8 => "O-8",
            PayGrade::O9 => "O-9",
            PayGrade::O10 => "O-10",
        }
    }

    pub fn category(&self) -> GradeCategory {
        match self.as_str().as_bytes()[0] {
            b'O' => GradeCategory::Officer,
            b'W' => GradeCategory::Warrant,
            _ => GradeCategory::Enlisted,
        }
    }

    /// Officer grades (including the O-1E..O-3E variants) draw the officer BAS rate.
    /// Warrant officers are paid the enlisted rate.
    pub fn is_officer(&self) -> bool {
        self.category() == GradeCategory::Officer
    }

    /// Position in the canonical column order
    pub fn column(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Self {
        PayGrade::ALL[(self.column() + 1) % PayGrade::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        let len = PayGrade::ALL.len();
        PayGrade::ALL[(self.column() + len - 1) % len]
    }
}

impl fmt::Display for PayGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayGrade {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayGrade::ALL
            .iter()
            .copied()
            .find(|grade| grade.as_str() == s)
            .ok_or_else(|| LookupError::UnknownGrade(s.to_string()))
    }
}

impl TryFrom<String> for PayGrade {
    type Error = LookupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayGrade> for String {
    fn from(grade: PayGrade) -> Self {
        grade.as_str().to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
