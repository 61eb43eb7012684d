//! Replay trace of a simulated core.
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! instr,add,12      <- 12 retirements of instruction "add" (slot number or name)
//! nop,5
//! stall,3           <- 3 stalled pipeline cycles
//! state,1           <- switch to operating point 1
//! restart           <- core resumes from idle
//! stamp,0.000125    <- energy stamp at simulated time (s)
//! reset_stamp
//! ```

use std::io::Read;

use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, Trim};

use dslab_isa_power::ProfileTable;

#[derive(Debug, Clone, PartialEq)]
pub enum TraceCommand {
    Instruction { slot: usize, count: u64 },
    Stall(u64),
    SetState(usize),
    Restart,
    Stamp(f64),
    ResetStamp,
}

/// Reads the whole trace, resolving instruction names with `table`.
pub fn read_trace<R: Read>(input: R, table: &ProfileTable) -> Result<Vec<TraceCommand>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(input);
    let mut commands = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }
        let command = parse_command(&fields, table).with_context(|| format!("trace line {}", line))?;
        commands.push(command);
    }
    Ok(commands)
}

fn parse_command(fields: &[&str], table: &ProfileTable) -> Result<TraceCommand> {
    let arg = |i: usize| fields.get(i).copied().ok_or_else(|| anyhow!("missing argument of {}", fields[0]));
    let count = |i: usize| -> Result<u64> {
        match fields.get(i) {
            Some(value) => Ok(value.parse::<u64>()?),
            None => Ok(1),
        }
    };
    let command = match fields[0] {
        "instr" => {
            let id = arg(1)?;
            let slot = match id.parse::<usize>() {
                Ok(slot) => slot,
                Err(_) => table
                    .slot_by_name(id)
                    .ok_or_else(|| anyhow!("unknown instruction {}", id))?,
            };
            TraceCommand::Instruction { slot, count: count(2)? }
        }
        "nop" => TraceCommand::Instruction {
            slot: table.nop_slot(),
            count: count(1)?,
        },
        "stall" => TraceCommand::Stall(arg(1)?.parse::<u64>()?),
        "state" => TraceCommand::SetState(arg(1)?.parse::<usize>()?),
        "restart" => TraceCommand::Restart,
        "stamp" => TraceCommand::Stamp(arg(1)?.parse::<f64>()?),
        "reset_stamp" => TraceCommand::ResetStamp,
        other => bail!("unknown command {}", other),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ProfileTable {
        "2\n40,1,1,a,b\n80,1,1,c,d\n0,0\n1,add,1,1\n2,nop,1,1\n".parse().unwrap()
    }

    #[test]
    fn test_read_trace() {
        let trace = "# warm up\ninstr,1\ninstr,add,12\nnop,5\nstall,3\nstate,1\nrestart\nstamp,0.5\nreset_stamp\n";
        let commands = read_trace(trace.as_bytes(), &table()).unwrap();
        assert_eq!(
            commands,
            vec![
                TraceCommand::Instruction { slot: 1, count: 1 },
                TraceCommand::Instruction { slot: 1, count: 12 },
                TraceCommand::Instruction { slot: 2, count: 5 },
                TraceCommand::Stall(3),
                TraceCommand::SetState(1),
                TraceCommand::Restart,
                TraceCommand::Stamp(0.5),
                TraceCommand::ResetStamp,
            ]
        );
    }

    #[test]
    fn test_bad_commands() {
        assert!(read_trace("instr,mul\n".as_bytes(), &table()).is_err());
        assert!(read_trace("state\n".as_bytes(), &table()).is_err());
        assert!(read_trace("jump,3\n".as_bytes(), &table()).is_err());
        assert!(read_trace("stall,many\n".as_bytes(), &table()).is_err());
    }
}
