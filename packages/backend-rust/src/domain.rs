use std::fmt;

use serde::{Deserialize, Serialize};

/// CEFR proficiency level a lesson is pitched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::A1,
        Level::A2,
        Level::B1,
        Level::B2,
        Level::C1,
        Level::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            "C1" => Some(Self::C1),
            "C2" => Some(Self::C2),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Airport,
    Restaurant,
    Hotel,
    Cafe,
    Shop,
    Doctor,
    JobInterview,
    Bank,
    #[default]
    Random,
}

impl Scenario {
    pub const ALL: [Scenario; 9] = [
        Scenario::Airport,
        Scenario::Restaurant,
        Scenario::Hotel,
        Scenario::Cafe,
        Scenario::Shop,
        Scenario::Doctor,
        Scenario::JobInterview,
        Scenario::Bank,
        Scenario::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airport => "airport",
            Self::Restaurant => "restaurant",
            Self::Hotel => "hotel",
            Self::Cafe => "cafe",
            Self::Shop => "shop",
            Self::Doctor => "doctor",
            Self::JobInterview => "job-interview",
            Self::Bank => "bank",
            Self::Random => "random",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == normalized)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Closed set of mistake categories the tutor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MistakeType {
    Grammar,
    Spelling,
    WordOrder,
    Vocabulary,
}

impl MistakeType {
    pub const ALL: [MistakeType; 4] = [
        MistakeType::Grammar,
        MistakeType::Spelling,
        MistakeType::WordOrder,
        MistakeType::Vocabulary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grammar => "grammar",
            Self::Spelling => "spelling",
            Self::WordOrder => "word-order",
            Self::Vocabulary => "vocabulary",
        }
    }

    /// Accepts the canonical names plus the spellings models tend to drift into
    /// (`word order`, `word_order`, `Grammar`).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "grammar" => Some(Self::Grammar),
            "spelling" => Some(Self::Spelling),
            "word-order" => Some(Self::WordOrder),
            "vocabulary" => Some(Self::Vocabulary),
            _ => None,
        }
    }
}

impl fmt::Display for MistakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
