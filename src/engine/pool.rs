//! Fixed capacity grain slot pool with oldest-first stealing.

use super::shaper::GrainShaper;

// -------------------------------------------------------------------------------------------------

/// Index of a slot in a [`GrainSlotPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrainHandle(usize);

impl GrainHandle {
    /// Slot index of this handle.
    pub fn index(&self) -> usize {
        self.0
    }
}

// -------------------------------------------------------------------------------------------------

/// Lifecycle state of a single grain.
///
/// All per-grain values get frozen into the slot when the grain is triggered. The position of
/// the sample a grain reads is `start_position + elapsed`, so read positions can be generated
/// lazily without copying any history.
#[derive(Debug, Clone, Copy)]
pub struct GrainSlot {
    /// Is this slot currently playing a grain?
    active: bool,
    /// Engine sample index at which the grain got triggered. Used to find steal candidates.
    start_time: u64,
    /// First history sample the grain reads, counted in samples written since the last reset.
    start_position: u64,
    /// Number of samples the grain played so far.
    elapsed: u64,
    /// Envelope phase in range `[0.0, 1.0)`.
    phase: f64,
    /// Amount to increment the envelope phase each sample.
    phase_increment: f64,
    /// The grain's waveshaper, holding the assigned algorithm and drive.
    shaper: GrainShaper,
}

impl Default for GrainSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl GrainSlot {
    /// Create a new, inactive slot.
    pub const fn new() -> Self {
        Self {
            active: false,
            start_time: 0,
            start_position: 0,
            elapsed: 0,
            phase: 0.0,
            phase_increment: 0.0,
            shaper: GrainShaper::new(),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    #[inline]
    pub fn shaper(&self) -> &GrainShaper {
        &self.shaper
    }

    /// History position of the sample which should be read next.
    #[inline]
    pub fn read_position(&self) -> u64 {
        self.start_position + self.elapsed
    }

    /// Freeze the grain's source position, length and waveshaping. A length of less than one
    /// sample is treated as a single sample grain.
    pub fn configure(&mut self, start_position: u64, length_in_samples: f64, shaper: GrainShaper) {
        debug_assert!(self.active, "Should only configure active slots");
        self.start_position = start_position;
        self.phase_increment = 1.0 / length_in_samples.max(1.0);
        self.shaper = shaper;
    }

    /// Move to the next sample. Returns true when the grain finished playing.
    #[inline]
    fn advance(&mut self) -> bool {
        self.phase += self.phase_increment;
        self.elapsed += 1;
        self.phase >= 1.0
    }

    fn start(&mut self, start_time: u64) {
        self.active = true;
        self.start_time = start_time;
        self.start_position = 0;
        self.elapsed = 0;
        self.phase = 0.0;
        self.phase_increment = 0.0;
        self.shaper = GrainShaper::new();
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

// -------------------------------------------------------------------------------------------------

/// Fixed array of `N` grain slots.
///
/// Acquiring never fails: when all slots are in use, the slot with the oldest start time gets
/// stolen. Slots with equal start times are stolen lowest index first. The pool never allocates
/// after it got created.
#[derive(Debug, Clone)]
pub struct GrainSlotPool<const N: usize> {
    slots: [GrainSlot; N],
}

impl<const N: usize> Default for GrainSlotPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> GrainSlotPool<N> {
    const _VERIFY_N: () = assert!(N > 0, "Grain pool needs at least one slot");

    /// Create a new pool with all slots inactive.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::_VERIFY_N;
        Self {
            slots: [GrainSlot::new(); N],
        }
    }

    /// Number of slots in the pool.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of currently active slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }

    /// Start a new grain at the given engine sample index and return its handle. The slot is
    /// active, at phase 0, and has no assignments yet.
    ///
    /// When all slots are in use, the oldest grain gets stolen.
    pub fn acquire(&mut self, current_sample_index: u64) -> GrainHandle {
        let index = match self.slots.iter().position(|slot| !slot.is_active()) {
            Some(free_index) => free_index,
            None => self.steal_candidate(),
        };
        self.slots[index].start(current_sample_index);
        GrainHandle(index)
    }

    /// Stop the grain in the given slot and clear all its assignments.
    pub fn release(&mut self, handle: GrainHandle) {
        self.slots[handle.0].clear();
    }

    /// Stop all grains.
    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    /// Pass each active slot to `render`, then move it to its next sample. Grains which
    /// finished playing get released.
    #[inline]
    pub fn advance_active<F: FnMut(&GrainSlot)>(&mut self, mut render: F) {
        for index in 0..N {
            let slot = &mut self.slots[index];
            if !slot.is_active() {
                continue;
            }
            render(slot);
            if slot.advance() {
                self.release(GrainHandle(index));
            }
        }
    }

    /// Access a slot by handle.
    #[inline]
    pub fn slot(&self, handle: GrainHandle) -> &GrainSlot {
        &self.slots[handle.0]
    }

    /// Mutable access to a slot by handle.
    #[inline]
    pub fn slot_mut(&mut self, handle: GrainHandle) -> &mut GrainSlot {
        &mut self.slots[handle.0]
    }

    /// Iterate over all active slots.
    pub fn active_slots(&self) -> impl Iterator<Item = (GrainHandle, &GrainSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(index, slot)| (GrainHandle(index), slot))
    }

    /// Index of the active slot with the oldest start time, lowest index on ties.
    fn steal_candidate(&self) -> usize {
        let mut candidate = 0;
        for (index, slot) in self.slots.iter().enumerate().skip(1) {
            if slot.start_time < self.slots[candidate].start_time {
                candidate = index;
            }
        }
        candidate
    }
}

// -------------------------------------------------------------------------------------------------
