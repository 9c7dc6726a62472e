//! Per-phase image identifiers.
//!
//! The identifiers are opaque to the library; a front end maps them to its
//! own artwork. Every phase always has an identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MoonCalError, Result};
use crate::models::Phase;

/// Image identifier for each of the eight phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseImages {
    images: BTreeMap<Phase, String>,
}

impl PhaseImages {
    /// The built-in identifiers.
    pub fn new() -> Self {
        let images = Phase::ALL
            .into_iter()
            .map(|phase| (phase, default_image(phase).to_string()))
            .collect();
        Self { images }
    }

    pub fn get(&self, phase: Phase) -> &str {
        self.images
            .get(&phase)
            .map(String::as_str)
            .unwrap_or_else(|| default_image(phase))
    }

    /// Replace the identifier of one phase.
    pub fn with(mut self, phase: Phase, image: impl Into<String>) -> Self {
        self.images.insert(phase, image.into());
        self
    }

    /// Overlay a JSON object of `{"PHASE": "image"}` pairs on the defaults.
    ///
    /// ```
    /// use mooncal_core::images::PhaseImages;
    /// use mooncal_core::Phase;
    ///
    /// let images = PhaseImages::from_json(r#"{"FULL": "big_moon"}"#).unwrap();
    /// assert_eq!(images.get(Phase::Full), "big_moon");
    /// assert_eq!(images.get(Phase::New), "new_moon");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: BTreeMap<Phase, String> = serde_json::from_str(json)
            .map_err(|e| MoonCalError::ParseError(format!("Invalid image table: {}", e)))?;
        Ok(overrides
            .into_iter()
            .fold(Self::new(), |images, (phase, image)| images.with(phase, image)))
    }
}

impl Default for PhaseImages {
    fn default() -> Self {
        Self::new()
    }
}

fn default_image(phase: Phase) -> &'static str {
    match phase {
        Phase::New => "new_moon",
        Phase::WaxingCrescent => "waxing_crescent",
        Phase::FirstQuarter => "first_quarter_moon",
        Phase::WaxingGibbous => "waxing_gibbous",
        Phase::Full => "full_moon",
        Phase::WaningGibbous => "waning_gibbous",
        Phase::LastQuarter => "last_quarter_moon",
        Phase::WaningCrescent => "waning_crescent",
    }
}
