//! Sticker unlocking rules.
//!
//! A child earns one star per completed task. Whenever the running star count
//! lands on a multiple of the parent's sticker threshold, one sticker the
//! child does not own yet is drawn uniformly at random from the catalog. Once
//! every catalog sticker is owned, milestones stop minting anything until the
//! child's rewards are reset.

use std::collections::HashSet;

use habitstar_shared::catalog::{STICKERS, Sticker};
use habitstar_shared::domain::StickerThreshold;
use rand::Rng;
use rand::seq::SliceRandom;

/// Picks a catalog sticker whose id is not in `held`, uniformly at random.
/// Returns `None` when the whole catalog is already held.
pub fn pick_sticker<R: Rng + ?Sized>(held: &HashSet<String>, rng: &mut R) -> Option<&'static Sticker> {
    let available: Vec<&'static Sticker> = STICKERS
        .iter()
        .filter(|s| !held.contains(s.id))
        .collect();
    available.choose(rng).copied()
}

/// Sticker to mint after the child's star count became `star_count`.
///
/// `held` must be the child's sticker set as it was before the new star was
/// recorded.
pub fn milestone_sticker<R: Rng + ?Sized>(
    star_count: i64,
    threshold: StickerThreshold,
    held: &HashSet<String>,
    rng: &mut R,
) -> Option<&'static Sticker> {
    if !threshold.is_milestone(star_count) {
        return None;
    }
    pick_sticker(held, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    /// Replays `n` completions for a fresh child; returns (stars, minted stickers in order).
    fn replay(n: i64, threshold: StickerThreshold, rng: &mut StdRng) -> (i64, Vec<(i64, &'static str)>) {
        let mut stars = 0;
        let mut held = HashSet::new();
        let mut minted = Vec::new();
        for _ in 0..n {
            stars += 1;
            if let Some(s) = milestone_sticker(stars, threshold, &held, rng) {
                assert!(held.insert(s.id.to_string()), "sticker {} minted twice", s.id);
                minted.push((stars, s.id));
            }
        }
        (stars, minted)
    }

    #[test]
    fn stickers_follow_every_threshold_until_catalog_is_exhausted() {
        let mut rng = StdRng::seed_from_u64(7);
        for t in StickerThreshold::MIN..=StickerThreshold::MAX {
            let threshold = StickerThreshold::new(i64::from(t)).unwrap();
            let n = i64::from(t) * (STICKERS.len() as i64 + 3);
            let (stars, minted) = replay(n, threshold, &mut rng);
            assert_eq!(stars, n);
            assert_eq!(minted.len(), STICKERS.len(), "threshold {t}");
            for (i, (at, _)) in minted.iter().enumerate() {
                assert_eq!(*at, (i as i64 + 1) * i64::from(t), "threshold {t}");
            }
        }
    }

    #[test]
    fn five_star_scenario() {
        let mut rng = StdRng::seed_from_u64(1);
        let t = StickerThreshold::DEFAULT;
        let (stars, minted) = replay(4, t, &mut rng);
        assert_eq!(stars, 4);
        assert!(minted.is_empty());
        let (stars, minted) = replay(5, t, &mut rng);
        assert_eq!(stars, 5);
        assert_eq!(minted.len(), 1);
        assert!(STICKERS.iter().any(|s| s.id == minted[0].1));
    }

    #[test]
    fn full_collection_mints_nothing() {
        let held: HashSet<String> = STICKERS.iter().map(|s| s.id.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(pick_sticker(&held, &mut rng).is_none());
        assert!(milestone_sticker(5, StickerThreshold::DEFAULT, &held, &mut rng).is_none());
    }

    #[test]
    fn off_milestone_never_mints() {
        let mut rng = StdRng::seed_from_u64(3);
        let held = HashSet::new();
        for stars in [1, 2, 3, 4, 6, 9, 11] {
            assert!(milestone_sticker(stars, StickerThreshold::DEFAULT, &held, &mut rng).is_none());
        }
    }

    #[test]
    fn picks_are_spread_over_remaining_stickers() {
        // Hold all but four; every remaining id should show up with a fair share.
        let remaining = ["rocket", "cake", "sun", "medal"];
        let held: HashSet<String> = STICKERS
            .iter()
            .map(|s| s.id)
            .filter(|id| !remaining.contains(id))
            .map(str::to_string)
            .collect();
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 4_000;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..draws {
            let s = pick_sticker(&held, &mut rng).unwrap();
            assert!(!held.contains(s.id));
            *counts.entry(s.id).or_default() += 1;
        }
        assert_eq!(counts.len(), remaining.len());
        for id in remaining {
            let c = counts[id];
            // expected 1000 each; allow a wide band so the test never flakes
            assert!((700..=1300).contains(&c), "{id} drawn {c} times");
        }
    }
}
