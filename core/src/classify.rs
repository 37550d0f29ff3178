use std::fmt;

use serde::{Deserialize, Serialize};

/// Blood pressure severity on the five-level scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Normal,
    Elevated,
    Stage1,
    Stage2,
    Crisis,
}

/// Four-level view used by the terminal report, with stage 2 and crisis merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Normal,
    Elevated,
    High1,
    High2,
}

/// Classify a systolic/diastolic pair. Total: every pair maps to one category.
#[must_use]
pub fn classify(systolic: u32, diastolic: u32) -> Category {
    if systolic >= 180 || diastolic >= 120 {
        Category::Crisis
    } else if systolic >= 140 || diastolic >= 90 {
        Category::Stage2
    } else if (130..140).contains(&systolic) || (80..90).contains(&diastolic) {
        Category::Stage1
    } else if (120..130).contains(&systolic) && diastolic < 80 {
        Category::Elevated
    } else {
        Category::Normal
    }
}

impl Category {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Normal => "Normal",
            Category::Elevated => "Elevated",
            Category::Stage1 => "High Stage 1",
            Category::Stage2 => "High Stage 2",
            Category::Crisis => "Hypertensive Crisis",
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Category::Normal => Severity::Normal,
            Category::Elevated => Severity::Elevated,
            Category::Stage1 => Severity::High1,
            Category::Stage2 | Category::Crisis => Severity::High2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Severity {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Elevated => "Elevated",
            Severity::High1 => "High-1",
            Severity::High2 => "High-2",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
