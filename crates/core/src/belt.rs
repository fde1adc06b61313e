use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank earned from cumulative points, lowest first.
///
/// Always derived from the points total; nothing persists a belt.
///
/// ```
/// # use sensei_core::Belt;
/// assert_eq!(Belt::for_points(29), Belt::White);
/// assert_eq!(Belt::for_points(30), Belt::Yellow);
/// assert_eq!(Belt::for_points(10_000), Belt::Black);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Belt {
    White,
    Yellow,
    Orange,
    Green,
    Blue,
    Purple,
    Brown,
    Red,
    Black,
}

impl Belt {
    /// Every belt in ascending order.
    pub const ALL: [Belt; 9] = [
        Belt::White,
        Belt::Yellow,
        Belt::Orange,
        Belt::Green,
        Belt::Blue,
        Belt::Purple,
        Belt::Brown,
        Belt::Red,
        Belt::Black,
    ];

    /// Minimum points needed to hold this belt.
    #[must_use]
    pub fn threshold(self) -> u32 {
        match self {
            Belt::White => 0,
            Belt::Yellow => 30,
            Belt::Orange => 60,
            Belt::Green => 90,
            Belt::Blue => 130,
            Belt::Purple => 180,
            Belt::Brown => 250,
            Belt::Red => 350,
            Belt::Black => 500,
        }
    }

    /// Highest belt whose threshold is `<= points`.
    #[must_use]
    pub fn for_points(points: u32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|belt| points >= belt.threshold())
            .unwrap_or(Belt::White)
    }

    /// The belt above this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|belt| belt.threshold() > self.threshold())
    }

    /// Points still missing to reach the next belt; `None` at Black.
    #[must_use]
    pub fn points_to_next(points: u32) -> Option<u32> {
        Self::for_points(points)
            .next()
            .map(|next| next.threshold().saturating_sub(points))
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Belt::White => "White",
            Belt::Yellow => "Yellow",
            Belt::Orange => "Orange",
            Belt::Green => "Green",
            Belt::Blue => "Blue",
            Belt::Purple => "Purple",
            Belt::Brown => "Brown",
            Belt::Red => "Red",
            Belt::Black => "Black",
        }
    }

    /// Compact label for tight spaces such as a nav chip.
    #[must_use]
    pub fn short_label(self) -> &'static str {
        match self {
            Belt::White => "W",
            Belt::Yellow => "Y",
            Belt::Orange => "O",
            Belt::Green => "G",
            Belt::Blue => "B",
            Belt::Purple => "P",
            Belt::Brown => "Br",
            Belt::Red => "R",
            Belt::Black => "Bk",
        }
    }
}

impl fmt::Display for Belt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_lowest_and_five_hundred_is_highest() {
        assert_eq!(Belt::for_points(0), Belt::White);
        assert_eq!(Belt::for_points(500), Belt::Black);
        assert_eq!(Belt::for_points(u32::MAX), Belt::Black);
    }

    #[test]
    fn boundaries_land_on_correct_side() {
        assert_eq!(Belt::for_points(29), Belt::White);
        assert_eq!(Belt::for_points(30), Belt::Yellow);
        assert_eq!(Belt::for_points(59), Belt::Yellow);
        assert_eq!(Belt::for_points(60), Belt::Orange);
        assert_eq!(Belt::for_points(90), Belt::Green);
        assert_eq!(Belt::for_points(130), Belt::Blue);
        assert_eq!(Belt::for_points(180), Belt::Purple);
        assert_eq!(Belt::for_points(250), Belt::Brown);
        assert_eq!(Belt::for_points(349), Belt::Brown);
        assert_eq!(Belt::for_points(350), Belt::Red);
        assert_eq!(Belt::for_points(499), Belt::Red);
    }

    #[test]
    fn mapping_is_monotonic() {
        let mut previous = Belt::for_points(0);
        for points in 1..=600 {
            let current = Belt::for_points(points);
            assert!(current >= previous, "belt dropped at {points}");
            previous = current;
        }
    }

    #[test]
    fn every_threshold_maps_to_its_belt() {
        for belt in Belt::ALL {
            assert_eq!(Belt::for_points(belt.threshold()), belt);
        }
    }

    #[test]
    fn next_and_points_to_next() {
        assert_eq!(Belt::White.next(), Some(Belt::Yellow));
        assert_eq!(Belt::Black.next(), None);
        assert_eq!(Belt::points_to_next(15), Some(15));
        assert_eq!(Belt::points_to_next(45), Some(15));
        assert_eq!(Belt::points_to_next(500), None);
    }

    #[test]
    fn labels() {
        assert_eq!(Belt::Brown.to_string(), "Brown");
        assert_eq!(Belt::Brown.short_label(), "Br");
        assert_eq!(Belt::Black.short_label(), "Bk");
    }
}
