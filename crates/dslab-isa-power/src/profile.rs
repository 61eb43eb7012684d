//! Calibrated operating points and the per-instruction power table.

use std::fmt::{Display, Formatter};

/// Number of instruction classes modeled by the power table.
pub const NUM_INSTRUCTIONS: usize = 119;

/// Number of instruction slots in every operating point (slot ids `0..=NUM_INSTRUCTIONS`).
pub const INSTRUCTION_SLOTS: usize = NUM_INSTRUCTIONS + 1;

/// Maximum length of an operating point name in bytes.
pub const MAX_NAME_LEN: usize = 30;

/// Maximum length of an operating point description in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 140;

/// Name of the instruction used to charge non-instruction overheads.
pub const NOP_NAME: &str = "nop";

/// One calibrated frequency point of the core.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    /// Short label of the point.
    pub name: String,
    /// Free-text description of the point.
    pub description: String,
    /// Clock frequency in MHz.
    pub frequency_mhz: u32,
    /// Calibration multiplier applied to the frequency.
    pub frequency_scale: f64,
    /// Calibration multiplier applied to all power coefficients of this point.
    pub power_scale: f64,
    /// Raw power coefficient per instruction slot, always `INSTRUCTION_SLOTS` long.
    pub power: Vec<f64>,
    /// Raw power coefficient charged while the pipeline is stalled.
    pub stall_power: f64,
}

impl OperatingPoint {
    /// Creates an operating point with all power coefficients set to zero.
    pub fn new(frequency_mhz: u32, frequency_scale: f64, power_scale: f64) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            frequency_mhz,
            frequency_scale,
            power_scale,
            power: vec![0.; INSTRUCTION_SLOTS],
            stall_power: 0.,
        }
    }

    pub(crate) fn zeroed() -> Self {
        Self::new(0, 0., 0.)
    }
}

/// Immutable table of operating points, indexed by DVFS state id.
///
/// Instruction names are shared by all operating points, only the power values differ.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    points: Vec<OperatingPoint>,
    instruction_names: Vec<String>,
    nop_slot: usize,
}

impl ProfileTable {
    pub(crate) fn from_parts(points: Vec<OperatingPoint>, instruction_names: Vec<String>, nop_slot: usize) -> Self {
        debug_assert_eq!(instruction_names.len(), INSTRUCTION_SLOTS);
        Self {
            points,
            instruction_names,
            nop_slot,
        }
    }

    /// Returns the number of operating points (DVFS states).
    pub fn num_states(&self) -> usize {
        self.points.len()
    }

    /// Returns the operating point of the given state, if it exists.
    pub fn operating_point(&self, state: usize) -> Option<&OperatingPoint> {
        self.points.get(state)
    }

    /// Returns all operating points in state order.
    pub fn operating_points(&self) -> &[OperatingPoint] {
        &self.points
    }

    /// Returns the name of the instruction in the given slot (empty if the slot is unused).
    pub fn instruction_name(&self, slot: usize) -> Option<&str> {
        self.instruction_names.get(slot).map(|s| s.as_str())
    }

    /// Looks up the slot of an instruction by its exact name.
    pub fn slot_by_name(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.instruction_names.iter().position(|n| n == name)
    }

    /// Returns the slot of the `nop` instruction.
    pub fn nop_slot(&self) -> usize {
        self.nop_slot
    }

    pub(crate) fn point(&self, state: usize) -> &OperatingPoint {
        &self.points[state]
    }
}

impl Display for ProfileTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (id, p) in self.points.iter().enumerate() {
            writeln!(f, "Profile {}", id)?;
            writeln!(f, "Name: {}", p.name)?;
            writeln!(f, "Description: {}", p.description)?;
            writeln!(f, "Frequency: {} MHz (scale {})", p.frequency_mhz, p.frequency_scale)?;
            writeln!(f, "Power scale: {}", p.power_scale)?;
            writeln!(f, "Stall power: {}", p.stall_power)?;
            writeln!(f, "NOP power: {}", p.power[self.nop_slot])?;
            writeln!(f)?;
        }
        write!(f, "Instr ID | Instruction Name")?;
        for id in 0..self.points.len() {
            write!(f, " | Power Profile {}", id)?;
        }
        writeln!(f)?;
        for (slot, name) in self.instruction_names.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            write!(f, "{:8} | {:>16}", slot, name)?;
            for p in self.points.iter() {
                write!(f, " | {:15.3}", p.power[slot])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
