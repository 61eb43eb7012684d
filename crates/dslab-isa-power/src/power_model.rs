//! Instruction power model.

use crate::profile::ProfileTable;

/// A model for computing the instantaneous power of a retired instruction at some operating point.
///
/// All methods are pure. Instruction slot and state must be valid, callers check them beforehand.
pub trait InstructionPowerModel {
    /// Returns the scaled power of instruction `id` at `state`.
    fn instruction_power(&self, id: usize, state: usize) -> f64;

    /// Returns the raw (unscaled) power coefficient of instruction `id` at `state`.
    fn raw_power(&self, id: usize, state: usize) -> f64;

    /// Returns the scaled power of a stalled pipeline cycle at `state`.
    fn stall_power(&self, state: usize) -> f64;

    /// Returns the effective number of cycles per time unit at `state`.
    fn cycle_frequency(&self, state: usize) -> f64;
}

impl ProfileTable {
    fn scaled(&self, raw: f64, state: usize) -> f64 {
        let p = self.point(state);
        raw * p.power_scale * p.frequency_scale * p.frequency_mhz as f64
    }
}

impl InstructionPowerModel for ProfileTable {
    fn instruction_power(&self, id: usize, state: usize) -> f64 {
        self.scaled(self.point(state).power[id], state)
    }

    fn raw_power(&self, id: usize, state: usize) -> f64 {
        self.point(state).power[id]
    }

    fn stall_power(&self, state: usize) -> f64 {
        self.scaled(self.point(state).stall_power, state)
    }

    fn cycle_frequency(&self, state: usize) -> f64 {
        let p = self.point(state);
        p.frequency_mhz as f64 * p.frequency_scale
    }
}
