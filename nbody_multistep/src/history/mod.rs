//! Ring-buffered position and acceleration history of a multistep integrator.
//!
//! Both rings are stored slot-major: record `(slot, body)` lives at `slot * N + body`. Logical
//! slot 0 is the future slot the next step writes, slot 1 the present and the last slot the oldest
//! sample. A [`HistoryCursor`] maps logical slots to physical ones so that stepping forward never
//! moves any record.

/// Assembly of the initial ring contents.
pub mod builder;
/// Fine-grained backward integration used to seed the rings.
pub mod reconstruct;

use bytemuck::{Pod, Zeroable};

/// Size of the history kept by a multistep method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MultistepScheme {
    /// Four-step symmetric method, 5 position slots and 3 acceleration slots.
    FivePoint,
    /// Fourteen-step symmetric method, 15 position slots and 13 acceleration slots.
    FifteenPoint,
}

impl MultistepScheme {
    /// Number of position slots `H`.
    #[inline]
    pub const fn position_slots(self) -> usize {
        match self {
            Self::FivePoint => 5,
            Self::FifteenPoint => 15,
        }
    }

    /// Number of acceleration slots, `H - 2`.
    #[inline]
    pub const fn acceleration_slots(self) -> usize {
        self.position_slots() - 2
    }
}

/// Shape of the history rings for a given scheme and body count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryLayout {
    /// Multistep scheme.
    pub scheme: MultistepScheme,
    /// Number of bodies `N`.
    pub body_count: usize,
}

impl HistoryLayout {
    /// Creates a new [`HistoryLayout`].
    #[inline]
    pub const fn new(scheme: MultistepScheme, body_count: usize) -> Self {
        Self { scheme, body_count }
    }

    /// Number of position slots.
    #[inline]
    pub const fn position_slots(&self) -> usize {
        self.scheme.position_slots()
    }

    /// Number of acceleration slots.
    #[inline]
    pub const fn acceleration_slots(&self) -> usize {
        self.scheme.acceleration_slots()
    }

    /// Flat record index of `body` in physical `slot`.
    #[inline]
    pub const fn index(&self, slot: usize, body: usize) -> usize {
        slot * self.body_count + body
    }

    /// Total number of position records.
    #[inline]
    pub const fn position_len(&self) -> usize {
        self.position_slots() * self.body_count
    }

    /// Total number of acceleration records.
    #[inline]
    pub const fn acceleration_len(&self) -> usize {
        self.acceleration_slots() * self.body_count
    }
}

/// Heads of the position and acceleration rings.
///
/// Logical slot `s` lives at physical slot `(s + head) % slots`. The cursor is uploaded to the
/// device as two `u32` and advanced there by the `shift_history` kernel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct HistoryCursor {
    /// Head of the position ring.
    pub position_head: u32,
    /// Head of the acceleration ring.
    pub acceleration_head: u32,
}

impl HistoryCursor {
    /// Cursor of freshly built rings, where logical and physical slots coincide.
    pub const IDENTITY: Self = Self {
        position_head: 0,
        acceleration_head: 0,
    };

    /// Advances both rings by one step.
    ///
    /// The future slot just written becomes slot 1, every other sample ages by one slot and the
    /// oldest sample's storage becomes the next future slot.
    #[inline]
    pub fn shift(&mut self, position_slots: u32, acceleration_slots: u32) {
        self.position_head = shift_head(self.position_head, position_slots);
        self.acceleration_head = shift_head(self.acceleration_head, acceleration_slots);
    }

    /// Same as [`HistoryCursor::shift`] with slot counts read from `layout`.
    #[inline]
    pub fn shift_layout(&mut self, layout: &HistoryLayout) {
        self.shift(
            layout.position_slots() as u32,
            layout.acceleration_slots() as u32,
        );
    }

    /// Physical slot of logical position slot `slot`.
    #[inline]
    pub const fn physical_position_slot(&self, slot: usize, position_slots: usize) -> usize {
        (slot + self.position_head as usize) % position_slots
    }

    /// Physical slot of logical acceleration slot `slot`.
    #[inline]
    pub const fn physical_acceleration_slot(&self, slot: usize, acceleration_slots: usize) -> usize {
        (slot + self.acceleration_head as usize) % acceleration_slots
    }
}

#[inline]
const fn shift_head(head: u32, slots: u32) -> u32 {
    (head + slots - 1) % slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_counts() {
        assert_eq!(MultistepScheme::FivePoint.position_slots(), 5);
        assert_eq!(MultistepScheme::FivePoint.acceleration_slots(), 3);
        assert_eq!(MultistepScheme::FifteenPoint.position_slots(), 15);
        assert_eq!(MultistepScheme::FifteenPoint.acceleration_slots(), 13);
    }

    #[test]
    fn index_is_slot_major() {
        let layout = HistoryLayout::new(MultistepScheme::FivePoint, 7);
        assert_eq!(layout.index(0, 0), 0);
        assert_eq!(layout.index(1, 0), 7);
        assert_eq!(layout.index(4, 6), 34);
        assert_eq!(layout.position_len(), 35);
        assert_eq!(layout.acceleration_len(), 21);
    }

    #[test]
    fn shifting_moves_future_to_present() {
        let layout = HistoryLayout::new(MultistepScheme::FivePoint, 1);
        let mut cursor = HistoryCursor::IDENTITY;
        let future = cursor.physical_position_slot(0, 5);
        let oldest = cursor.physical_position_slot(4, 5);

        cursor.shift_layout(&layout);

        assert_eq!(cursor.physical_position_slot(1, 5), future);
        assert_eq!(cursor.physical_position_slot(0, 5), oldest);
    }

    #[test]
    fn shifting_full_cycle_is_identity() {
        for scheme in [MultistepScheme::FivePoint, MultistepScheme::FifteenPoint] {
            let layout = HistoryLayout::new(scheme, 3);
            let mut cursor = HistoryCursor::IDENTITY;

            for _ in 0..layout.position_slots() {
                cursor.shift_layout(&layout);
            }
            assert_eq!(cursor.position_head, 0);

            let mut cursor = HistoryCursor::IDENTITY;
            for _ in 0..layout.acceleration_slots() {
                cursor.shift_layout(&layout);
            }
            assert_eq!(cursor.acceleration_head, 0);
        }
    }
}
