// Seat arithmetic: which side a seat belongs to and its slot within that side.

use serde::{Deserialize, Serialize};

/// Number of seats on each side of a draft.
pub const SLOTS_PER_SIDE: usize = 5;

/// Total number of seats in a draft (cells 0..=9).
pub const TOTAL_SEATS: usize = SLOTS_PER_SIDE * 2;

/// One of the two teams in a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Seats 0..=4.
    Blue,
    /// Seats 5..=9.
    Red,
}

impl Side {
    /// Side owning `cell`, or `None` when the seat is outside 0..=9.
    pub fn from_seat(cell: i64) -> Option<Self> {
        seat_slot(cell).map(|(side, _)| side)
    }

    /// Index into per-side arrays (`picks[side]`, ban counters).
    pub fn index(self) -> usize {
        match self {
            Side::Blue => 0,
            Side::Red => 1,
        }
    }

    /// First index of this side's block in the ten-entry ban array.
    pub fn ban_offset(self) -> usize {
        self.index() * SLOTS_PER_SIDE
    }

    /// Value subtracted from a seat of this side to get its local roster index.
    pub fn seat_offset(self) -> i64 {
        (self.index() * SLOTS_PER_SIDE) as i64
    }
}

/// Map a seat index to `(side, slot)`.
///
/// Domain is 0..=9. Blue seats keep their number as the slot; red seats
/// subtract five. Anything outside the domain returns `None`.
pub fn seat_slot(cell: i64) -> Option<(Side, usize)> {
    let seat = usize::try_from(cell).ok()?;
    match seat {
        0..=4 => Some((Side::Blue, seat)),
        5..=9 => Some((Side::Red, seat - SLOTS_PER_SIDE)),
        _ => None,
    }
}
