use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Front,
    Back,
    Side,
    Top,
    Bottom,
    #[serde(rename = "Part Zoom")]
    PartZoom,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::Front,
        Position::Back,
        Position::Side,
        Position::Top,
        Position::Bottom,
        Position::PartZoom,
    ];

    /// Lateral labels produced by models trained before the `Side` merge.
    pub const LEGACY_LATERAL_LABELS: [&'static str; 4] =
        ["Left", "Right", "Lateral Left", "Lateral Right"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Front => "Front",
            Position::Back => "Back",
            Position::Side => "Side",
            Position::Top => "Top",
            Position::Bottom => "Bottom",
            Position::PartZoom => "Part Zoom",
        }
    }

    /// Parses a model label, folding the legacy lateral labels into `Side`.
    pub fn from_label(label: &str) -> Option<Self> {
        if Self::is_legacy_lateral(label) {
            return Some(Position::Side);
        }
        Self::ALL.into_iter().find(|p| p.as_str() == label)
    }

    pub fn is_legacy_lateral(label: &str) -> bool {
        Self::LEGACY_LATERAL_LABELS.contains(&label)
    }

    /// Training sub-folder holding images for this position.
    pub fn folder_name(&self) -> String {
        self.as_str().replace(' ', "")
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
