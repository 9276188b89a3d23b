//! Evalscript generation for Sentinel-2 L2A band combinations.
//!
//! The gateway accepts a logical band selector (`RGB` or a comma-separated
//! list such as `RED,NIR`) and turns it into the V3 evalscript the Process
//! API executes per pixel. Pure string work, deterministic, no I/O.

use crate::error::ValidationError;

/// Spectral band codes for the supported logical bands.
///
/// `RGB` is special-cased to the true-color composite rather than a single
/// band.
const BAND_CODES: &[(&str, &str)] = &[
    ("RED", "B04"),
    ("GREEN", "B03"),
    ("BLUE", "B02"),
    ("NIR", "B08"),
    ("SWIR", "B11"),
];

/// A validated band selection, normalized for cache keying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandSelection {
    /// Sentinel-2 band codes in request order
    codes: Vec<&'static str>,
    true_color: bool,
}

impl BandSelection {
    /// The canonical selector string used in cache keys and job records:
    /// `RGB` for the true-color composite, otherwise the upper-cased
    /// logical names joined with commas.
    pub fn canonical(&self) -> String {
        if self.true_color {
            return "RGB".to_string();
        }
        self.codes
            .iter()
            .map(|code| logical_name(code))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Number of output channels the evalscript produces.
    pub fn channel_count(&self) -> usize {
        self.codes.len()
    }

    /// Render the evalscript for this selection.
    pub fn evalscript(&self) -> String {
        let inputs = self
            .codes
            .iter()
            .map(|code| format!("\"{code}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let samples = self
            .codes
            .iter()
            .map(|code| format!("s.{code}"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "//VERSION=3\n\
             function setup() {{\n  \
               return {{\n    \
                 input: [{inputs}],\n    \
                 output: {{ bands: {count} }}\n  \
               }};\n\
             }}\n\
             function evaluatePixel(s) {{\n  \
               return [{samples}];\n\
             }}\n",
            count = self.codes.len(),
        )
    }
}

/// Parse and validate a band selector string.
///
/// Case-insensitive; surrounding whitespace per entry is ignored. Unknown
/// band names fail with [`ValidationError::UnknownBand`], an empty selector
/// with [`ValidationError::EmptyBands`].
pub fn parse_band_selector(selector: &str) -> Result<BandSelection, ValidationError> {
    let names: Vec<String> = selector
        .split(',')
        .map(|name| name.trim().to_ascii_uppercase())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(ValidationError::EmptyBands);
    }

    if names.len() == 1 && names[0] == "RGB" {
        return Ok(BandSelection {
            codes: vec!["B04", "B03", "B02"],
            true_color: true,
        });
    }

    let mut codes = Vec::with_capacity(names.len());
    for name in &names {
        let code = BAND_CODES
            .iter()
            .find(|(logical, _)| *logical == name.as_str())
            .map(|(_, code)| *code)
            .ok_or_else(|| ValidationError::UnknownBand { band: name.clone() })?;
        codes.push(code);
    }

    Ok(BandSelection {
        codes,
        true_color: false,
    })
}

/// Build an evalscript straight from a selector string.
pub fn build_evalscript(selector: &str) -> Result<String, ValidationError> {
    Ok(parse_band_selector(selector)?.evalscript())
}

fn logical_name(code: &str) -> &'static str {
    BAND_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(logical, _)| *logical)
        .unwrap_or("RED")
}

// =============================================================================
// Tests
// =============================================================================
