//! Switching between operating points (DVFS).

use serde::Serialize;

use crate::error::ChargeError;
use crate::stats::CorePowerStats;

/// Completed switch of the operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateTransition {
    pub from: usize,
    pub to: usize,
    /// Frequency of the new operating point in MHz.
    pub frequency_mhz: u32,
    /// Energy charged for the switch at the new operating point.
    pub energy: f64,
}

impl CorePowerStats {
    /// Returns the current operating point.
    pub fn state(&self) -> usize {
        self.actual_state
    }

    pub fn num_states(&self) -> usize {
        self.table.num_states()
    }

    /// Switches to operating point `state` and charges the switch as NOP cycles at the new point.
    ///
    /// Requests for unknown states are ignored and return `None`.
    /// A switch to the current state is charged like any other.
    /// After a switch [`needs_stall`](Self::needs_stall) returns `true` once.
    pub fn set_state(&mut self, state: usize) -> Option<StateTransition> {
        if state >= self.table.num_states() {
            log::warn!(target: self.name(), "power state {} ignored", state);
            return None;
        }
        let from = self.actual_state;
        let energy_before = self.total_energy();
        self.actual_state = state;
        self.charge_instruction(self.table.nop_slot(), self.transition_cycles);
        self.freq_changed = true;

        let transition = StateTransition {
            from,
            to: state,
            frequency_mhz: self.table.point(state).frequency_mhz,
            energy: self.total_energy() - energy_before,
        };
        log::debug!(
            target: self.name(),
            "power state {} -> {} ({} MHz), transition energy {}",
            from,
            state,
            transition.frequency_mhz,
            transition.energy
        );
        Some(transition)
    }

    /// Same as [`set_state`](Self::set_state) but rejects unknown states.
    pub fn try_set_state(&mut self, state: usize) -> Result<StateTransition, ChargeError> {
        let num_states = self.table.num_states();
        self.set_state(state)
            .ok_or(ChargeError::InvalidState { state, num_states })
    }

    /// Returns whether the core must stall for a switch of the operating point.
    ///
    /// Every switch is reported once, subsequent calls return `false` until the next switch.
    pub fn needs_stall(&mut self) -> bool {
        std::mem::take(&mut self.freq_changed)
    }

    /// Fills `out` with frequencies (MHz) of the operating points in state order.
    ///
    /// Writes at most `out.len()` values and returns the number written.
    pub fn list_states(&self, out: &mut [u32]) -> usize {
        let mut written = 0;
        for (slot, point) in out.iter_mut().zip(self.table.operating_points()) {
            *slot = point.frequency_mhz;
            written += 1;
        }
        written
    }

    /// Returns frequencies (MHz) of the operating points in state order.
    pub fn state_frequencies(&self) -> Vec<u32> {
        self.table.operating_points().iter().map(|p| p.frequency_mhz).collect()
    }

    /// Charges the restart of a core resuming from idle at the current operating point.
    pub fn charge_restart_power(&mut self) {
        log::debug!(target: self.name(), "restart at power state {}", self.actual_state);
        self.charge_instruction(self.table.nop_slot(), self.restart_cycles);
    }
}
