use dslab_isa_power::{load_table, ChargeError, CorePowerStats, StateTransition};

fn stats() -> CorePowerStats {
    CorePowerStats::new("cpu0", load_table("test-data/two_states.csv").unwrap())
}

// Two operating points: 40 MHz and 80 MHz, both scaled by 1.0, NOP coefficient 1.0 in both.
#[test]
fn test_frequency_switch_scenario() {
    let mut stats = stats();
    let nop = stats.table().nop_slot();

    stats.charge_instruction(nop, 1000);
    assert_eq!(stats.total_energy(), 40000.);
    assert!(!stats.needs_stall());

    let transition = stats.set_state(1).unwrap();
    assert_eq!(
        transition,
        StateTransition {
            from: 0,
            to: 1,
            frequency_mhz: 80,
            energy: 1_600_000.,
        }
    );
    assert_eq!(stats.total_energy(), 40000. + 1_600_000.);
    assert_eq!(stats.total_instructions(), 21000);
    assert_eq!(stats.state(), 1);

    assert!(stats.needs_stall());
    assert!(!stats.needs_stall());
    assert!(!stats.needs_stall());
}

#[test]
fn test_unknown_state_is_ignored() {
    let mut stats = stats();
    assert_eq!(stats.set_state(2), None);
    assert_eq!(stats.set_state(usize::MAX), None);
    assert_eq!(stats.state(), 0);
    assert_eq!(stats.total_instructions(), 0);
    assert_eq!(stats.total_energy(), 0.);
    assert!(!stats.needs_stall());

    assert_eq!(
        stats.try_set_state(5),
        Err(ChargeError::InvalidState { state: 5, num_states: 2 })
    );
    assert!(!stats.needs_stall());
    assert!(stats.try_set_state(1).is_ok());
    assert!(stats.needs_stall());
}

#[test]
fn test_stall_flag_is_consumed_once() {
    let mut stats = stats();
    stats.set_state(1);
    stats.set_state(0);
    assert!(stats.needs_stall());
    assert!(!stats.needs_stall());

    stats.set_state(1);
    assert!(stats.needs_stall());
    assert!(!stats.needs_stall());
}

#[test]
fn test_switch_to_current_state_is_charged() {
    let mut stats = stats();
    let transition = stats.set_state(0).unwrap();
    assert_eq!(transition.from, 0);
    assert_eq!(transition.to, 0);
    assert_eq!(transition.energy, 20000. * 40.);
    assert!(stats.needs_stall());
}

#[test]
fn test_transition_time_at_new_state() {
    let mut stats = stats();
    stats.set_state(1);
    assert_eq!(stats.execution_time(), 20000. / 80.);
}

#[test]
fn test_custom_cycles() {
    let mut stats = stats().with_transition_cycles(10).with_restart_cycles(3);
    assert_eq!(stats.set_state(1).unwrap().energy, 800.);
    stats.charge_restart_power();
    assert_eq!(stats.total_energy(), 800. + 240.);
}

#[test]
fn test_restart_power() {
    let mut stats = stats();
    stats.charge_restart_power();
    assert_eq!(stats.total_energy(), 300. * 40.);
    assert_eq!(stats.total_instructions(), 300);
    // restarts do not require a stall
    assert!(!stats.needs_stall());

    stats.set_state(1);
    let before = stats.total_energy();
    stats.charge_restart_power();
    assert_eq!(stats.total_energy() - before, 300. * 80.);
}

#[test]
fn test_list_states() {
    let stats = stats();
    assert_eq!(stats.num_states(), 2);

    let mut out = [0; 2];
    assert_eq!(stats.list_states(&mut out), 2);
    assert_eq!(out, [40, 80]);

    let mut short = [0; 1];
    assert_eq!(stats.list_states(&mut short), 1);
    assert_eq!(short, [40]);

    let mut long = [7; 3];
    assert_eq!(stats.list_states(&mut long), 2);
    assert_eq!(long, [40, 80, 7]);

    assert_eq!(stats.state_frequencies(), vec![40, 80]);
}

#[test]
fn test_charges_follow_current_state() {
    let mut stats = stats();
    stats.set_state(1);
    let before = stats.total_energy();
    // add: 3.0 at 80 MHz
    stats.charge_instruction(1, 2);
    assert_eq!(stats.total_energy() - before, 2. * 240.);
    assert_eq!(stats.summary().frequency_mhz, 80);
}
