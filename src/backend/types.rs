//! Wire formats of the backend endpoints and the decoded values handed to the
//! rest of the crate.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `GET /status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub arduino_connected: bool,
    pub camera_available: bool,
}

/// `POST /measure-base`
#[derive(Debug, Clone, Deserialize)]
pub struct BaseWeightResponse {
    pub weight: f64,
}

/// `POST /capture`
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureResponse {
    pub image: String,
}

/// `POST /classify`
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyResponse {
    pub category: String,
    #[serde(rename = "type")]
    pub waste_type: String,
}

/// Body of `POST /process-waste`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessWasteRequest<'a> {
    #[serde(rename = "type")]
    pub waste_type: &'a str,
}

/// `POST /process-waste`
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessWasteResponse {
    pub weight: f64,
    pub amount: f64,
    pub id: String,
    pub qr_code: String,
}

// ---------------------------------------------------------------------------
// WasteKind
// ---------------------------------------------------------------------------

/// Main waste category the sorter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasteKind {
    Dry,
    Wet,
    /// A type the backend knows but this client has no bin name for.
    Other,
    /// The classifier could not place the item (`"UNKNOWN"` or empty).
    Unknown,
}

impl WasteKind {
    /// Interpret the backend's `type` string (`"DRY"`, `"WET"`, ...).
    pub fn parse(waste_type: &str) -> Self {
        match waste_type.trim().to_ascii_uppercase().as_str() {
            "DRY" => WasteKind::Dry,
            "WET" => WasteKind::Wet,
            "" | "UNKNOWN" => WasteKind::Unknown,
            _ => WasteKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WasteKind::Dry => "Dry waste",
            WasteKind::Wet => "Wet waste",
            WasteKind::Other => "Other",
            WasteKind::Unknown => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Classification / SortOutcome
// ---------------------------------------------------------------------------

/// Result of the classification stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Free-form sub-category reported by the model (e.g. `"plastic, dry-waste"`).
    pub category: String,
    /// Sorter instruction, sent back verbatim to `/process-waste`.
    pub waste_type: String,
}

impl Classification {
    pub fn new(category: impl Into<String>, waste_type: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            waste_type: waste_type.into(),
        }
    }

    pub fn kind(&self) -> WasteKind {
        WasteKind::parse(&self.waste_type)
    }
}

impl From<ClassifyResponse> for Classification {
    fn from(r: ClassifyResponse) -> Self {
        Self {
            category: r.category,
            waste_type: r.waste_type,
        }
    }
}

/// Result of the sorting stage: measured weight, reward and its QR voucher.
#[derive(Debug, Clone, PartialEq)]
pub struct SortOutcome {
    /// Net item weight in grams.
    pub weight: f64,
    /// Reward credited for the item.
    pub amount: f64,
    /// Voucher id encoded in the QR code (e.g. `QR_1A2B3C4D`).
    pub id: String,
    /// PNG bytes of the voucher QR code.
    pub qr_code: Vec<u8>,
}
