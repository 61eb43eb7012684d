//! Power cells receiving the aggregate power of a core.

use std::cell::RefCell;
use std::rc::Rc;

/// Role label under which core power is registered.
pub const PROCESSOR_ROLE: &str = "Processor";

/// Sink collecting the aggregate power of some component.
pub trait PowerCell {
    /// Registers the component in the cell.
    fn register(&mut self, name: &str, role: &str);

    /// Sets the current power of the component.
    fn set_power(&mut self, power: f64);
}

/// Cell that drops everything.
#[derive(Default)]
pub struct NullPowerCell {}

impl PowerCell for NullPowerCell {
    fn register(&mut self, _name: &str, _role: &str) {}

    fn set_power(&mut self, _power: f64) {}
}

#[derive(Debug, Default)]
struct CellState {
    name: Option<String>,
    role: Option<String>,
    samples: Vec<f64>,
}

/// Cell which remembers registration and every published value. Clones share the same state.
#[derive(Clone, Default)]
pub struct SharedPowerCell {
    state: Rc<RefCell<CellState>>,
}

impl SharedPowerCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the cell was registered with.
    pub fn name(&self) -> Option<String> {
        self.state.borrow().name.clone()
    }

    /// Role the cell was registered with.
    pub fn role(&self) -> Option<String> {
        self.state.borrow().role.clone()
    }

    /// Last published power value.
    pub fn power(&self) -> Option<f64> {
        self.state.borrow().samples.last().copied()
    }

    /// All published power values.
    pub fn samples(&self) -> Vec<f64> {
        self.state.borrow().samples.clone()
    }
}

impl PowerCell for SharedPowerCell {
    fn register(&mut self, name: &str, role: &str) {
        let mut state = self.state.borrow_mut();
        state.name = Some(name.to_string());
        state.role = Some(role.to_string());
    }

    fn set_power(&mut self, power: f64) {
        self.state.borrow_mut().samples.push(power);
    }
}
