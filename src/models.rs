use std::fmt;

use serde::Serialize;

/// The closed set of bins the sorter knows about.
///
/// Variant order matches the classifier's output indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WasteLabel {
    Metal,
    Paper,
    Plastic,
    Other,
}

impl WasteLabel {
    pub const ALL: [WasteLabel; 4] = [
        WasteLabel::Metal,
        WasteLabel::Paper,
        WasteLabel::Plastic,
        WasteLabel::Other,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WasteLabel::Metal => "Metal",
            WasteLabel::Paper => "Paper",
            WasteLabel::Plastic => "Plastic",
            WasteLabel::Other => "Other",
        }
    }
}

impl fmt::Display for WasteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
pub struct ClassificationResponse {
    pub class: WasteLabel,
    pub confidence: f32,
}

/// Body sent to the device's `/servo` endpoint.
#[derive(Debug, Serialize)]
pub struct ServoCommand {
    pub waste_type: WasteLabel,
}

#[derive(Debug, Serialize)]
pub struct ServoAck {
    pub status: &'static str,
    pub waste_type: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
