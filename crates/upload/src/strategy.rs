//! Upload strategy selection.
//!
//! `Auto` tries a rapid upload for files over 256 KiB when enabled, and
//! otherwise (or after a miss) picks block upload for files above the
//! configured threshold and a direct upload for the rest.

use std::fmt;
use std::str::FromStr;

use pcs_protocol::constants::MIN_RAPID_UPLOAD_SIZE;
use serde::{Deserialize, Serialize};

use crate::types::UploadConfig;

/// How a file is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Auto,
    /// One multipart request with the whole file.
    Direct,
    /// Fingerprint only; fails if the service does not hold the content.
    Rapid,
    /// Temporary blocks merged into one superfile.
    Block,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Auto => "auto",
            Strategy::Direct => "direct",
            Strategy::Rapid => "rapid",
            Strategy::Block => "block",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "direct" => Ok(Strategy::Direct),
            "rapid" => Ok(Strategy::Rapid),
            "block" => Ok(Strategy::Block),
            other => Err(format!(
                "unknown strategy {other:?} (expected auto, direct, rapid or block)"
            )),
        }
    }
}

/// Whether a file of `len` bytes can be rapid-uploaded at all.
pub fn rapid_eligible(len: u64) -> bool {
    len > MIN_RAPID_UPLOAD_SIZE
}

/// Whether `requested` should start with a rapid upload attempt.
pub fn tries_rapid(requested: Strategy, len: u64, config: &UploadConfig) -> bool {
    match requested {
        Strategy::Rapid => true,
        Strategy::Auto => config.rapid_upload && rapid_eligible(len),
        Strategy::Direct | Strategy::Block => false,
    }
}

/// The byte-sending strategy for `requested`, used directly or after a
/// rapid-upload miss. Never returns `Auto` or `Rapid`.
pub fn transfer_strategy(requested: Strategy, len: u64, config: &UploadConfig) -> Strategy {
    match requested {
        Strategy::Direct => Strategy::Direct,
        Strategy::Block => Strategy::Block,
        Strategy::Auto | Strategy::Rapid => {
            if len > config.block_threshold {
                Strategy::Block
            } else {
                Strategy::Direct
            }
        }
    }
}
