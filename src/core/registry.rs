pub const CASCADE_CYCLE: u64 = 85;

const STEP_X: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandAnchor {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSlot {
    pub dx: u16,
    pub dy: u16,
    pub anchor: BandAnchor,
}

#[derive(Debug, Default)]
pub struct WindowRegistry {
    priority: u64,
    launched: u64,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Strictly increasing, so the latest spawn or focus always tops the stack.
    pub fn next_priority(&mut self) -> u64 {
        self.priority += 1;
        self.priority
    }

    pub fn next_slot(&mut self) -> CascadeSlot {
        let slot = cascade_slot(self.launched);
        self.launched += 1;
        slot
    }

    pub fn launched(&self) -> u64 {
        self.launched
    }

    pub fn reset(&mut self) {
        self.priority = 0;
        self.launched = 0;
    }
}

// Diagonal cascade in five bands, alternating the vertical anchor between
// the top and bottom edges so long runs of windows stay on screen. The
// launch counter never decrements; past the last band the cycle repeats.
pub fn cascade_slot(launch_index: u64) -> CascadeSlot {
    let n = launch_index % CASCADE_CYCLE;
    let (anchor, dy) = match n {
        0..=19 => (BandAnchor::Top, n),
        20..=37 => (BandAnchor::Bottom, n - 20),
        38..=55 => (BandAnchor::Top, n - 38),
        56..=74 => (BandAnchor::Bottom, n - 56),
        // The final band starts one step down rather than flush with the
        // top edge, which keeps it clear of the band that began at 38.
        _ => (BandAnchor::Top, n - 74),
    };
    CascadeSlot {
        dx: (n * STEP_X) as u16,
        dy: dy as u16,
        anchor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_strictly_increase() {
        let mut reg = WindowRegistry::new();
        let a = reg.next_priority();
        let b = reg.next_priority();
        let c = reg.next_priority();
        assert!(a < b && b < c);
    }

    #[test]
    fn refocused_window_outranks_later_spawns() {
        let mut reg = WindowRegistry::new();
        let first = reg.next_priority();
        let second = reg.next_priority();
        let third = reg.next_priority();
        // Focusing the first window hands it a fresh priority.
        let refocused = reg.next_priority();
        assert!(refocused > third);
        assert!(refocused > second);
        assert!(refocused > first);
    }

    #[test]
    fn first_band_walks_the_diagonal_from_the_top() {
        for n in 0..20 {
            let slot = cascade_slot(n);
            assert_eq!(slot.anchor, BandAnchor::Top);
            assert_eq!(slot.dx, (n * 2) as u16);
            assert_eq!(slot.dy, n as u16);
        }
    }

    #[test]
    fn band_boundaries_reset_the_vertical_offset() {
        assert_eq!(cascade_slot(20), CascadeSlot { dx: 40, dy: 0, anchor: BandAnchor::Bottom });
        assert_eq!(cascade_slot(37), CascadeSlot { dx: 74, dy: 17, anchor: BandAnchor::Bottom });
        assert_eq!(cascade_slot(38), CascadeSlot { dx: 76, dy: 0, anchor: BandAnchor::Top });
        assert_eq!(cascade_slot(55), CascadeSlot { dx: 110, dy: 17, anchor: BandAnchor::Top });
        assert_eq!(cascade_slot(56), CascadeSlot { dx: 112, dy: 0, anchor: BandAnchor::Bottom });
        assert_eq!(cascade_slot(74), CascadeSlot { dx: 148, dy: 18, anchor: BandAnchor::Bottom });
        assert_eq!(cascade_slot(75), CascadeSlot { dx: 150, dy: 1, anchor: BandAnchor::Top });
        assert_eq!(cascade_slot(84), CascadeSlot { dx: 168, dy: 10, anchor: BandAnchor::Top });
    }

    #[test]
    fn slots_wrap_after_a_full_cycle() {
        assert_eq!(cascade_slot(85), cascade_slot(0));
        assert_eq!(cascade_slot(85 + 20), cascade_slot(20));
        assert_eq!(cascade_slot(2 * 85 + 84), cascade_slot(84));
    }

    #[test]
    fn registry_hands_out_consecutive_slots() {
        let mut reg = WindowRegistry::new();
        assert_eq!(reg.next_slot(), cascade_slot(0));
        assert_eq!(reg.next_slot(), cascade_slot(1));
        assert_eq!(reg.launched(), 2);
    }

    #[test]
    fn reset_rewinds_both_counters() {
        let mut reg = WindowRegistry::new();
        reg.next_priority();
        reg.next_slot();
        reg.reset();
        assert_eq!(reg.next_priority(), 1);
        assert_eq!(reg.next_slot(), cascade_slot(0));
    }
}
