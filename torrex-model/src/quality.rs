use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Coarse resolution class of a release.
///
/// Variant order is the ranking order: `UltraHd` sorts first and
/// `Unknown` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QualityTier {
    #[cfg_attr(feature = "serde", serde(rename = "4k"))]
    UltraHd,
    #[cfg_attr(feature = "serde", serde(rename = "1080p"))]
    FullHd,
    #[cfg_attr(feature = "serde", serde(rename = "720p"))]
    Hd,
    #[cfg_attr(feature = "serde", serde(rename = "480p"))]
    Sd,
    #[cfg_attr(feature = "serde", serde(rename = "Unknown"))]
    Unknown,
}

impl QualityTier {
    pub const ALL: [QualityTier; 5] = [
        QualityTier::UltraHd,
        QualityTier::FullHd,
        QualityTier::Hd,
        QualityTier::Sd,
        QualityTier::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::UltraHd => "4k",
            QualityTier::FullHd => "1080p",
            QualityTier::Hd => "720p",
            QualityTier::Sd => "480p",
            QualityTier::Unknown => "Unknown",
        }
    }

    /// Position in the ranking order, 0 being best.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl Display for QualityTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QualityTier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "4k" | "2160p" | "uhd" => Ok(QualityTier::UltraHd),
            "1080p" => Ok(QualityTier::FullHd),
            "720p" => Ok(QualityTier::Hd),
            "480p" => Ok(QualityTier::Sd),
            "unknown" => Ok(QualityTier::Unknown),
            other => Err(ModelError::UnknownQuality(other.to_string())),
        }
    }
}

/// Fine-grained release attribute detected from title text: rip source,
/// audio codec or dynamic range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "UPPERCASE")
)]
pub enum SpecTag {
    Hdr,
    Dts,
    Ddp,
    Dd,
    Sdr,
    WebDl,
    BluRay,
    DvdRip,
    Cam,
    Ts,
    Tc,
    R5,
    DvdScr,
    HdTv,
    PdTv,
    Dsr,
    Workprint,
    VhsRip,
    VodRip,
    TvRip,
    WebRip,
    BrRip,
    BdRip,
    HdCam,
    HdRip,
}

impl SpecTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecTag::Hdr => "HDR",
            SpecTag::Dts => "DTS",
            SpecTag::Ddp => "DDP",
            SpecTag::Dd => "DD",
            SpecTag::Sdr => "SDR",
            SpecTag::WebDl => "WEBDL",
            SpecTag::BluRay => "BLURAY",
            SpecTag::DvdRip => "DVDRIP",
            SpecTag::Cam => "CAM",
            SpecTag::Ts => "TS",
            SpecTag::Tc => "TC",
            SpecTag::R5 => "R5",
            SpecTag::DvdScr => "DVDSCR",
            SpecTag::HdTv => "HDTV",
            SpecTag::PdTv => "PDTV",
            SpecTag::Dsr => "DSR",
            SpecTag::Workprint => "WORKPRINT",
            SpecTag::VhsRip => "VHSRIP",
            SpecTag::VodRip => "VODRIP",
            SpecTag::TvRip => "TVRIP",
            SpecTag::WebRip => "WEBRIP",
            SpecTag::BrRip => "BRRIP",
            SpecTag::BdRip => "BDRIP",
            SpecTag::HdCam => "HDCAM",
            SpecTag::HdRip => "HDRIP",
        }
    }

    /// Member of the "RIPS" exclusion group.
    pub fn is_rip(&self) -> bool {
        matches!(
            self,
            SpecTag::HdRip
                | SpecTag::BrRip
                | SpecTag::BdRip
                | SpecTag::WebRip
                | SpecTag::TvRip
                | SpecTag::VodRip
        )
    }

    /// Member of the "CAM" exclusion group.
    pub fn is_cam(&self) -> bool {
        matches!(
            self,
            SpecTag::Cam
                | SpecTag::Ts
                | SpecTag::Tc
                | SpecTag::R5
                | SpecTag::DvdScr
                | SpecTag::HdTv
                | SpecTag::PdTv
                | SpecTag::Dsr
                | SpecTag::Workprint
                | SpecTag::VhsRip
                | SpecTag::HdCam
        )
    }
}

impl Display for SpecTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
