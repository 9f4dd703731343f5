use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How often a task is expected to be done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Frequency {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Kind of a reward row. One `Star` per completion; `Sticker`s at milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RewardKind {
    Star,
    Sticker,
}

impl RewardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardKind::Star => "STAR",
            RewardKind::Sticker => "STICKER",
        }
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardKind {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAR" => Ok(RewardKind::Star),
            "STICKER" => Ok(RewardKind::Sticker),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Number of stars needed for one sticker unlock, always within
/// [`StickerThreshold::MIN`, `StickerThreshold::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StickerThreshold(u8);

impl StickerThreshold {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;
    pub const DEFAULT: StickerThreshold = StickerThreshold(5);

    /// Exact constructor; `None` when out of range.
    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Some(StickerThreshold(value as u8))
        } else {
            None
        }
    }

    /// Floors and clamps an arbitrary requested value into range.
    pub fn clamped(requested: f64) -> Self {
        if requested.is_nan() {
            return Self::DEFAULT;
        }
        let v = requested
            .floor()
            .clamp(Self::MIN as f64, Self::MAX as f64);
        StickerThreshold(v as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// True when `star_count` lands exactly on a milestone.
    pub fn is_milestone(self, star_count: i64) -> bool {
        star_count > 0 && star_count % i64::from(self.0) == 0
    }

    /// Stars still missing until the next milestone (never zero).
    pub fn stars_until_next(self, star_count: i64) -> i64 {
        let t = i64::from(self.0);
        t - star_count.rem_euclid(t)
    }
}

impl Default for StickerThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for StickerThreshold {
    type Error = String;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        StickerThreshold::new(value).ok_or_else(|| {
            format!(
                "sticker threshold must be between {} and {}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<StickerThreshold> for i64 {
    fn from(value: StickerThreshold) -> Self {
        i64::from(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_clamps_and_floors() {
        assert_eq!(StickerThreshold::clamped(0.0).get(), 1);
        assert_eq!(StickerThreshold::clamped(-3.0).get(), 1);
        assert_eq!(StickerThreshold::clamped(7.9).get(), 7);
        assert_eq!(StickerThreshold::clamped(21.0).get(), 20);
        assert_eq!(StickerThreshold::clamped(f64::INFINITY).get(), 20);
        assert_eq!(StickerThreshold::clamped(f64::NAN), StickerThreshold::DEFAULT);
    }

    #[test]
    fn threshold_exact_range() {
        assert!(StickerThreshold::new(0).is_none());
        assert!(StickerThreshold::new(21).is_none());
        assert_eq!(StickerThreshold::new(20).map(StickerThreshold::get), Some(20));
        assert_eq!(StickerThreshold::default().get(), 5);
    }

    #[test]
    fn milestones() {
        let t = StickerThreshold::new(5).unwrap();
        assert!(!t.is_milestone(0));
        assert!(!t.is_milestone(4));
        assert!(t.is_milestone(5));
        assert!(t.is_milestone(10));
        assert_eq!(t.stars_until_next(0), 5);
        assert_eq!(t.stars_until_next(4), 1);
        assert_eq!(t.stars_until_next(5), 5);
    }

    #[test]
    fn enums_use_uppercase_wire_names() {
        assert_eq!(serde_json::to_string(&Frequency::Weekly).unwrap(), "\"WEEKLY\"");
        assert_eq!("STICKER".parse::<RewardKind>(), Ok(RewardKind::Sticker));
        assert!("daily".parse::<Frequency>().is_err());
    }

    #[test]
    fn threshold_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<StickerThreshold>("0").is_err());
        let t: StickerThreshold = serde_json::from_str("12").unwrap();
        assert_eq!(t.get(), 12);
    }
}
