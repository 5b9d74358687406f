//! Located regions reported by the matchers.

use crate::util::math::clamp_unit;
use serde::Serialize;
use std::fmt;

/// Method tag attached to every match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MatchMethod {
    #[serde(rename = "TM_CCOEFF_NORMED")]
    CcoeffNormed,
    #[serde(rename = "TM_CCORR_NORMED")]
    CcorrNormed,
    #[serde(rename = "TM_SQDIFF_NORMED")]
    SqdiffNormed,
    #[serde(rename = "AHASH")]
    AHash,
    #[serde(rename = "PHASH")]
    PHash,
    #[serde(rename = "DHASH")]
    DHash,
    #[serde(rename = "SIFT")]
    Sift,
}

impl MatchMethod {
    /// Returns the tag as printed on marked images.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CcoeffNormed => "TM_CCOEFF_NORMED",
            Self::CcorrNormed => "TM_CCORR_NORMED",
            Self::SqdiffNormed => "TM_SQDIFF_NORMED",
            Self::AHash => "AHASH",
            Self::PHash => "PHASH",
            Self::DHash => "DHASH",
            Self::Sift => "SIFT",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One located region: top-left corner, size, similarity, and method tag.
///
/// `similarity` is always "higher is better" and lies in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub similarity: f32,
    pub method: MatchMethod,
    /// Reserved for multi-scale matching.
    pub scale: f32,
}

impl MatchResult {
    /// Builds a result, clamping negative coordinates to zero and the
    /// similarity to `[0, 1]`.
    pub fn new(x: i64, y: i64, w: u32, h: u32, similarity: f32, method: MatchMethod) -> Self {
        Self {
            x: x.clamp(0, i64::from(u32::MAX)) as u32,
            y: y.clamp(0, i64::from(u32::MAX)) as u32,
            w,
            h,
            similarity: clamp_unit(similarity),
            method,
            scale: 1.0,
        }
    }

    /// Returns `(x, y, w, h)`.
    pub fn rect(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.w, self.h)
    }

    /// Returns true when both rectangles share a positive-area intersection.
    pub fn overlaps(&self, other: &MatchResult) -> bool {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.x.saturating_add(self.w).min(other.x.saturating_add(other.w));
        let y1 = self.y.saturating_add(self.h).min(other.y.saturating_add(other.h));
        x1 > x0 && y1 > y0
    }
}
