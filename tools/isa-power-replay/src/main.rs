mod trace;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use serde::Serialize;

use dslab_isa_power::{
    CorePowerStats, EnergyStamp, PowerStatsConfig, PowerStatsSummary, SharedPowerCell, StateTransition,
};

use crate::trace::{read_trace, TraceCommand};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Replays a core trace through the instruction-level power model
struct Args {
    /// Path to YAML file with power accounting configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Path to CSV trace of the core
    #[arg(short, long)]
    trace: PathBuf,

    /// Core name, used in logs and in the window report file name
    #[arg(short, long, default_value = "cpu0")]
    name: String,

    /// Path to produced JSON file with results (default - stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ReplayResults {
    stats: PowerStatsSummary,
    transitions: Vec<StateTransition>,
    stalls: u64,
    ignored_states: u64,
    stamps: Vec<EnergyStamp>,
    published_power: Option<f64>,
}

#[derive(Default)]
struct Replay {
    transitions: Vec<StateTransition>,
    stalls: u64,
    ignored_states: u64,
    stamps: Vec<EnergyStamp>,
}

fn replay(stats: &mut CorePowerStats, commands: &[TraceCommand]) -> Replay {
    let mut result = Replay::default();
    for command in commands {
        match *command {
            TraceCommand::Instruction { slot, count } => stats.charge_instruction(slot, count),
            TraceCommand::Stall(count) => stats.charge_stall(count),
            TraceCommand::SetState(state) => match stats.set_state(state) {
                Some(transition) => result.transitions.push(transition),
                None => result.ignored_states += 1,
            },
            TraceCommand::Restart => stats.charge_restart_power(),
            TraceCommand::Stamp(time) => {
                let state = stats.state();
                result.stamps.push(stats.sample_energy_stamp(state, time));
            }
            TraceCommand::ResetStamp => stats.reset_energy_stamp(),
        }
        if stats.needs_stall() {
            result.stalls += 1;
        }
    }
    result
}

fn main() -> Result<()> {
    let args = Args::parse();

    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let config = PowerStatsConfig::from_file(&args.config)?;
    let cell = SharedPowerCell::new();
    let mut stats = CorePowerStats::from_config_with_cell(&args.name, &config, Box::new(cell.clone()))?;

    let trace = File::open(&args.trace).with_context(|| format!("can't open trace {}", args.trace.display()))?;
    let commands = read_trace(trace, stats.table())?;
    log::info!("replaying {} trace commands on {}", commands.len(), args.name);

    let replayed = replay(&mut stats, &commands);
    stats.publish_power();
    stats.flush_report();

    let results = ReplayResults {
        stats: stats.summary(),
        transitions: replayed.transitions,
        stalls: replayed.stalls,
        ignored_states: replayed.ignored_states,
        stamps: replayed.stamps,
        published_power: cell.power(),
    };
    let json = serde_json::to_string_pretty(&results)?;
    match args.output {
        Some(path) => File::create(&path)
            .with_context(|| format!("can't create {}", path.display()))?
            .write_all(json.as_bytes())?,
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_counts_stalls() {
        let table = "2\n40,1,1,a,b\n80,1,1,c,d\n0,0\n1,add,1,1\n2,nop,1,1\n".parse().unwrap();
        let mut stats = CorePowerStats::new("cpu0", table);
        let commands = vec![
            TraceCommand::Instruction { slot: 1, count: 10 },
            TraceCommand::SetState(1),
            TraceCommand::SetState(3),
            TraceCommand::Instruction { slot: 1, count: 10 },
            TraceCommand::SetState(0),
            TraceCommand::Restart,
            TraceCommand::Stamp(1e-3),
        ];
        let replayed = replay(&mut stats, &commands);
        assert_eq!(replayed.transitions.len(), 2);
        assert_eq!(replayed.stalls, 2);
        assert_eq!(replayed.ignored_states, 1);
        assert_eq!(replayed.stamps.len(), 1);
        assert_eq!(stats.state(), 0);
        assert_eq!(stats.total_instructions(), 10 + 20000 + 10 + 20000 + 300);
    }
}
