/// Maximum number of concurrent ripple origins the shader evaluates.
pub const MAX_RIPPLES: usize = 10;

/// Slot value marking an origin the shader must skip.
const INACTIVE: [f32; 4] = [-1.0, -1.0, 0.0, 0.0];

/// Fixed-size ring buffer of ripple origins.
///
/// Each slot packs `[x, y, birth_time, 0]` in surface pixel coordinates with a
/// bottom-left origin; a negative `x` marks an unused slot. Triggering an
/// eleventh ripple overwrites the oldest. Slots are never cleared explicitly,
/// the shader's age-based falloff fades them out instead.
#[derive(Debug, Clone)]
pub(crate) struct RippleBuffer {
    slots: [[f32; 4]; MAX_RIPPLES],
    next: usize,
}

impl RippleBuffer {
    pub fn new() -> Self {
        Self {
            slots: [INACTIVE; MAX_RIPPLES],
            next: 0,
        }
    }

    /// Records a ripple origin, overwriting the oldest slot once full.
    ///
    /// Never blocks and never fails; the buffer is pre-allocated.
    pub fn trigger(&mut self, x: f32, y: f32, time: f32) {
        self.slots[self.next] = [x, y, time, 0.0];
        self.next = (self.next + 1) % MAX_RIPPLES;
    }

    /// Slot storage in the layout the uniform block expects.
    pub fn slots(&self) -> &[[f32; 4]; MAX_RIPPLES] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_buffer_is_all_sentinels() {
        let buffer = RippleBuffer::new();
        assert!(buffer.slots().iter().all(|slot| slot[0] < 0.0));
    }

    #[test]
    fn eleventh_trigger_overwrites_only_the_first() {
        let mut buffer = RippleBuffer::new();
        for i in 0..11 {
            buffer.trigger(i as f32, 100.0 + i as f32, i as f32 * 0.1);
        }

        // Slot 0 now holds the 11th trigger, slots 1..=9 hold triggers 2-10.
        assert_eq!(buffer.slots()[0][0], 10.0);
        for i in 1..MAX_RIPPLES {
            assert_eq!(buffer.slots()[i][0], i as f32);
            assert_eq!(buffer.slots()[i][1], 100.0 + i as f32);
        }
    }

    #[test]
    fn trigger_records_position_and_birth_time() {
        let mut buffer = RippleBuffer::new();
        buffer.trigger(400.0, 300.0, 2.5);
        assert_eq!(buffer.slots()[0], [400.0, 300.0, 2.5, 0.0]);
        assert!(buffer.slots()[1][0] < 0.0);
    }

    #[test]
    fn index_wraps_repeatedly() {
        let mut buffer = RippleBuffer::new();
        for i in 0..35 {
            buffer.trigger(i as f32, 0.0, 0.0);
        }
        // 35 triggers: slot 4 holds the most recent (index 34).
        assert_eq!(buffer.slots()[4][0], 34.0);
        assert_eq!(buffer.slots()[5][0], 25.0);
    }
}
