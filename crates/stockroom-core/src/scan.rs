//! # Scan Lookup
//!
//! Turning a picture of a label into an item code.
//!
//! ## Decoder Chain
//! ```text
//! image.png
//!    │
//!    ▼
//! ┌────────┐  fail  ┌─────────┐  fail  ┌────────┐  fail
//! │   QR   │──────► │ Code128 │──────► │ EAN-13 │──────► ... ──► Unrecognized
//! └───┬────┘        └────┬────┘        └───┬────┘
//!     │ ok               │ ok              │ ok
//!     ▼                  ▼                 ▼
//!   "4006381333931"  (first success wins)
//! ```
//!
//! The chain itself does no image work. Concrete decoders live with whoever
//! owns the imaging stack and plug in through [`CodeDecoder`].

use std::fmt;
use std::path::Path;

use crate::error::ScanError;

/// A single symbology reader.
pub trait CodeDecoder: Send + Sync {
    /// Short name used in error messages (e.g. `"qr"`, `"ean13"`).
    fn name(&self) -> &str;

    /// Decodes the code string from the image at `image`.
    fn decode(&self, image: &Path) -> Result<String, ScanError>;
}

/// An ordered list of decoders tried until one succeeds.
#[derive(Default)]
pub struct DecoderChain {
    decoders: Vec<Box<dyn CodeDecoder>>,
}

impl DecoderChain {
    pub fn new() -> Self {
        DecoderChain::default()
    }

    /// Appends a decoder; it runs after every decoder already in the chain.
    pub fn with(mut self, decoder: impl CodeDecoder + 'static) -> Self {
        self.decoders.push(Box::new(decoder));
        self
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Tries each decoder in order. The first success wins; if none
    /// succeeds, a single `Unrecognized` error names every decoder tried.
    ///
    /// Decoded strings are trimmed; a decoder returning only whitespace
    /// counts as a failure.
    pub fn decode(&self, image: &Path) -> Result<String, ScanError> {
        let mut attempted = Vec::with_capacity(self.decoders.len());

        for decoder in &self.decoders {
            match decoder.decode(image) {
                Ok(code) if !code.trim().is_empty() => return Ok(code.trim().to_string()),
                _ => attempted.push(decoder.name().to_string()),
            }
        }

        Err(ScanError::Unrecognized { attempted })
    }
}

impl fmt::Debug for DecoderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.decoders.iter().map(|d| d.name()).collect();
        f.debug_struct("DecoderChain").field("decoders", &names).finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
