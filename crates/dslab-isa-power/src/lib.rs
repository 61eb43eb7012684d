#![doc = include_str!("../README.md")]

pub mod cell;
pub mod config;
pub mod dvfs;
pub mod error;
pub mod loader;
pub mod power_model;
pub mod profile;
pub mod stats;
pub mod window;

pub use cell::{NullPowerCell, PowerCell, SharedPowerCell};
pub use config::PowerStatsConfig;
pub use dvfs::StateTransition;
pub use error::{ChargeError, ConfigError, LoadError};
pub use loader::load_table;
pub use power_model::InstructionPowerModel;
pub use profile::{OperatingPoint, ProfileTable, INSTRUCTION_SLOTS, NUM_INSTRUCTIONS};
pub use stats::{CorePowerStats, EnergyStamp, PowerStatsSummary};
pub use window::{CsvWindowReporter, WindowLog, WindowRecord, WindowReporter};
