//! Per-core power statistics.

use serde::Serialize;

use crate::cell::{PowerCell, PROCESSOR_ROLE};
use crate::error::ChargeError;
use crate::power_model::InstructionPowerModel;
use crate::profile::{ProfileTable, INSTRUCTION_SLOTS};
use crate::window::{WindowCounters, WindowRecord, WindowReporter, DEFAULT_WINDOW_SIZE};

/// Default number of NOP cycles charged for an operating point switch.
pub const DEFAULT_TRANSITION_CYCLES: u64 = 20000;

/// Default number of NOP cycles charged for a restart of an idle core.
pub const DEFAULT_RESTART_CYCLES: u64 = 300;

/// Energy-delay estimate between two stamps.
///
/// Two estimates are produced: one derived from the simulated time elapsed since the previous stamp
/// and one derived from the number of instructions retired since then.
/// The time-based one is the reference value, see [`EnergyStamp::value`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyStamp {
    /// Instructions retired since the instruction baseline.
    pub instructions: u64,
    /// Simulated time since the previous stamp in ns.
    pub elapsed_ns: f64,
    /// Raw energy sum multiplied by the elapsed time.
    pub by_time: f64,
    /// Raw energy sum multiplied by the instruction count and the cycle time in ns.
    pub by_instructions: f64,
}

impl EnergyStamp {
    pub fn value(&self) -> f64 {
        self.by_time
    }
}

/// Snapshot of the accumulated statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerStatsSummary {
    pub name: String,
    pub state: usize,
    pub frequency_mhz: u32,
    pub total_instructions: u64,
    pub total_energy: f64,
    pub total_power: f64,
    pub execution_time: f64,
    pub energy_per_core: f64,
    pub edp: f64,
    pub windows: u64,
}

/// Instruction-level power accounting of a single simulated core.
///
/// Owns its power table and is driven synchronously by the core model: once per retired instruction
/// (or batch of identical instructions) via [`charge_instruction`](Self::charge_instruction),
/// and on operating point switches via [`set_state`](Self::set_state).
pub struct CorePowerStats {
    name: String,
    pub(crate) table: ProfileTable,
    total_instructions: u64,
    total_energy: f64,
    execution_time: f64,
    edp: f64,
    energy_per_core: f64,
    stamp_baseline: u64,
    last_stamp_time: f64,
    pub(crate) actual_state: usize,
    pub(crate) freq_changed: bool,
    pub(crate) transition_cycles: u64,
    pub(crate) restart_cycles: u64,
    window: WindowCounters,
    reporter: Option<Box<dyn WindowReporter>>,
    cell: Option<Box<dyn PowerCell>>,
}

impl CorePowerStats {
    /// Creates statistics of core `name` starting at operating point 0.
    pub fn new(name: &str, table: ProfileTable) -> Self {
        Self {
            name: name.to_string(),
            table,
            total_instructions: 0,
            total_energy: 0.,
            execution_time: 0.,
            edp: 0.,
            energy_per_core: 0.,
            stamp_baseline: 0,
            last_stamp_time: 0.,
            actual_state: 0,
            freq_changed: false,
            transition_cycles: DEFAULT_TRANSITION_CYCLES,
            restart_cycles: DEFAULT_RESTART_CYCLES,
            window: WindowCounters::new(DEFAULT_WINDOW_SIZE),
            reporter: None,
            cell: None,
        }
    }

    /// Sets the number of instructions in a reporting window. Resets the open window.
    pub fn with_window_size(mut self, size: u64) -> Self {
        self.window = WindowCounters::new(size);
        self
    }

    /// Sets the receiver of closed window records.
    pub fn with_window_reporter(mut self, reporter: Box<dyn WindowReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Registers the core in the power cell, which will receive [`publish_power`](Self::publish_power) values.
    pub fn with_power_cell(mut self, mut cell: Box<dyn PowerCell>) -> Self {
        cell.register(&self.name, PROCESSOR_ROLE);
        self.cell = Some(cell);
        self
    }

    /// Sets the number of NOP cycles charged for an operating point switch.
    pub fn with_transition_cycles(mut self, cycles: u64) -> Self {
        self.transition_cycles = cycles;
        self
    }

    /// Sets the number of NOP cycles charged for a restart.
    pub fn with_restart_cycles(mut self, cycles: u64) -> Self {
        self.restart_cycles = cycles;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &ProfileTable {
        &self.table
    }

    /// Charges `count` retirements of instruction `id` at the current operating point.
    ///
    /// Out-of-range instruction slots are ignored.
    pub fn charge_instruction(&mut self, id: usize, count: u64) {
        if id >= INSTRUCTION_SLOTS {
            log::warn!(target: self.name.as_str(), "instruction slot {} ignored", id);
            return;
        }
        let state = self.actual_state;
        let power = self.table.instruction_power(id, state);
        let raw = self.table.raw_power(id, state);
        self.charge(count, power, raw);
    }

    /// Same as [`charge_instruction`](Self::charge_instruction) but rejects out-of-range instruction slots.
    pub fn try_charge_instruction(&mut self, id: usize, count: u64) -> Result<(), ChargeError> {
        if id >= INSTRUCTION_SLOTS {
            return Err(ChargeError::InvalidInstruction(id));
        }
        self.charge_instruction(id, count);
        Ok(())
    }

    /// Charges `count` stalled pipeline cycles at the current operating point.
    pub fn charge_stall(&mut self, count: u64) {
        let state = self.actual_state;
        let power = self.table.stall_power(state);
        let raw = self.table.point(state).stall_power;
        self.charge(count, power, raw);
    }

    fn charge(&mut self, count: u64, power: f64, raw: f64) {
        let state = self.actual_state;
        self.total_instructions += count;
        self.execution_time += count as f64 / self.table.cycle_frequency(state);

        let energy = count as f64 * power;
        self.total_energy += energy;
        // raw terms are accumulated once per call regardless of count
        self.energy_per_core += raw;
        self.edp += raw;

        if let Some((window, window_power)) = self.window.advance(count, energy) {
            let record = WindowRecord {
                state,
                execution_time: self.execution_time,
                window,
                power: window_power,
            };
            log::trace!(target: self.name.as_str(), "window {} closed, power {:.10}", window, window_power);
            if let Some(reporter) = self.reporter.as_mut() {
                if let Err(e) = reporter.report(&record) {
                    log::error!(target: self.name.as_str(), "can't write window report: {}", e);
                }
            }
        }
    }

    pub fn total_instructions(&self) -> u64 {
        self.total_instructions
    }

    pub fn total_energy(&self) -> f64 {
        self.total_energy
    }

    /// Returns the average power per charged instruction, or 0 if nothing was charged yet.
    pub fn total_power(&self) -> f64 {
        if self.total_instructions == 0 {
            return 0.;
        }
        self.total_energy / self.total_instructions as f64
    }

    /// Returns the execution time accumulated at the frequencies of the operating points used.
    pub fn execution_time(&self) -> f64 {
        self.execution_time
    }

    /// Returns the lifetime sum of raw power coefficients, unaffected by stamp resets.
    pub fn energy_per_core(&self) -> f64 {
        self.energy_per_core
    }

    /// Returns the sum of raw power coefficients since the last stamp reset.
    pub fn edp(&self) -> f64 {
        self.edp
    }

    /// Returns the number of closed windows.
    pub fn window_count(&self) -> u64 {
        self.window.count()
    }

    pub fn window(&self) -> &WindowCounters {
        &self.window
    }

    /// Samples the energy-delay estimate since the previous stamp at simulated time `now` (in seconds).
    ///
    /// The cycle time for the instruction-based estimate is taken from operating point `state`,
    /// an out-of-range state falls back to the current one.
    pub fn sample_energy_stamp(&mut self, state: usize, now: f64) -> EnergyStamp {
        let state = if state < self.table.num_states() {
            state
        } else {
            log::warn!(target: self.name.as_str(), "energy stamp for unknown state {}", state);
            self.actual_state
        };
        let instructions = self.total_instructions - self.stamp_baseline;
        let cycle_time_ns = 1000. / self.table.point(state).frequency_mhz as f64;
        let elapsed_ns = (now - self.last_stamp_time) * 1e9;

        self.stamp_baseline = self.total_instructions;
        self.last_stamp_time = now;

        EnergyStamp {
            instructions,
            elapsed_ns,
            by_time: self.edp * elapsed_ns,
            by_instructions: self.edp * instructions as f64 * cycle_time_ns,
        }
    }

    /// Zeroes the raw energy sum and the instruction baseline of energy stamps.
    pub fn reset_energy_stamp(&mut self) {
        self.edp = 0.;
        self.stamp_baseline = 0;
    }

    /// Pushes the current total power to the registered power cell.
    pub fn publish_power(&mut self) {
        let power = self.total_power();
        if let Some(cell) = self.cell.as_mut() {
            cell.set_power(power);
        }
    }

    /// Flushes the window report.
    pub fn flush_report(&mut self) {
        if let Some(reporter) = self.reporter.as_mut() {
            if let Err(e) = reporter.flush() {
                log::error!(target: self.name.as_str(), "can't flush window report: {}", e);
            }
        }
    }

    pub fn summary(&self) -> PowerStatsSummary {
        PowerStatsSummary {
            name: self.name.clone(),
            state: self.actual_state,
            frequency_mhz: self.table.point(self.actual_state).frequency_mhz,
            total_instructions: self.total_instructions,
            total_energy: self.total_energy,
            total_power: self.total_power(),
            execution_time: self.execution_time,
            energy_per_core: self.energy_per_core,
            edp: self.edp,
            windows: self.window.count(),
        }
    }
}
