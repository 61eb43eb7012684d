//! Power table loader.
//!
//! The table file has no tags, a line's meaning depends on its position among the valid
//! (non-comment) lines and on the number of operating points declared by the first one:
//!
//! ```text
//! # comment
//! 2                                              <- number of operating points P
//! 40,1.0,1.0,"low","40 MHz calibration"          <- P operating point rows
//! 80,1.0,1.0,"high","80 MHz calibration"
//! 0.5,0.7                                        <- stall power, one value per point
//! 1,"add",1.2,1.9                                <- instruction rows: slot, name, P values
//! 2,"nop",1.0,1.0
//! ```
//!
//! Fields are separated by commas and quotes, empty fields are skipped.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::LoadError;
use crate::profile::{
    OperatingPoint, ProfileTable, INSTRUCTION_SLOTS, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, NOP_NAME, NUM_INSTRUCTIONS,
};

/// Reads the power table from file.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<ProfileTable, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = ProfileTable::from_reader(file)?;
    log::info!(
        "loaded power table {}: {} operating points, nop slot {}",
        path.display(),
        table.num_states(),
        table.nop_slot()
    );
    Ok(table)
}

impl ProfileTable {
    /// Parses the power table from arbitrary input.
    pub fn from_reader<R: Read>(input: R) -> Result<Self, LoadError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_reader(input);
        let mut builder = TableBuilder::default();
        let mut record = StringRecord::new();
        let mut line = 0;
        let mut blank_line = None;
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(source) => {
                    let line = source.position().map(|p| p.line()).unwrap_or(line + 1);
                    return Err(LoadError::Csv { line, source });
                }
            }
            line = record.position().map(|p| p.line()).unwrap_or(line + 1);
            let fields: Vec<&str> = record
                .iter()
                .map(|f| f.trim_matches(|c: char| c == '"' || c.is_whitespace()))
                .filter(|f| !f.is_empty())
                .collect();
            match fields.first() {
                // lines of separators are only allowed at the end of the table
                None => {
                    blank_line.get_or_insert(line);
                }
                Some(first) if first.starts_with('#') => continue,
                Some(_) => match blank_line {
                    Some(blank) => return Err(LoadError::BlankLine { line: blank }),
                    None => builder.feed(line, &fields)?,
                },
            }
        }
        builder.finish()
    }
}

impl FromStr for ProfileTable {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

/// Meaning of a valid table line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    /// The number of operating points.
    ProfileCount,
    /// Calibration row of the operating point with the given id.
    OperatingPoint(usize),
    /// Stall power of every operating point.
    StallPower,
    /// Power of one instruction at every operating point.
    Instruction,
}

impl LineKind {
    /// Classifies the `valid_line`-th (1-based) valid line given the number of operating points read so far.
    fn classify(valid_line: usize, num_profiles: usize) -> Self {
        if num_profiles == 0 {
            LineKind::ProfileCount
        } else if valid_line <= num_profiles + 1 {
            LineKind::OperatingPoint(valid_line - 2)
        } else if valid_line == num_profiles + 2 {
            LineKind::StallPower
        } else {
            LineKind::Instruction
        }
    }

    /// Minimal number of fields a line of this kind must have.
    fn arity(&self, num_profiles: usize) -> usize {
        match self {
            LineKind::ProfileCount => 1,
            LineKind::OperatingPoint(_) => 5,
            LineKind::StallPower => num_profiles,
            LineKind::Instruction => 2 + num_profiles,
        }
    }
}

#[derive(Default)]
struct TableBuilder {
    valid_lines: usize,
    points: Vec<OperatingPoint>,
    instruction_names: Vec<String>,
    nop_slot: Option<usize>,
}

impl TableBuilder {
    fn feed(&mut self, line: u64, fields: &[&str]) -> Result<(), LoadError> {
        self.valid_lines += 1;
        let num_profiles = self.points.len();
        let kind = LineKind::classify(self.valid_lines, num_profiles);

        if kind == LineKind::Instruction {
            // out-of-range slots are dropped before their values are looked at
            if !slot_in_range(line, fields[0])? {
                log::debug!("power table line {}: instruction slot {} dropped", line, fields[0]);
                return Ok(());
            }
        }
        check_arity(line, fields, kind.arity(num_profiles))?;

        match kind {
            LineKind::ProfileCount => {
                let count: usize = parse_field(line, fields[0])?;
                if count == 0 {
                    return Err(LoadError::NoOperatingPoints);
                }
                self.points = vec![OperatingPoint::zeroed(); count];
                self.instruction_names = vec![String::new(); INSTRUCTION_SLOTS];
            }
            LineKind::OperatingPoint(id) => {
                let point = &mut self.points[id];
                point.frequency_mhz = parse_field(line, fields[0])?;
                if point.frequency_mhz == 0 {
                    return Err(LoadError::InvalidFrequency { line });
                }
                point.frequency_scale = parse_field(line, fields[1])?;
                point.power_scale = parse_field(line, fields[2])?;
                point.name = bounded(line, fields[3], MAX_NAME_LEN);
                point.description = bounded(line, fields[4], MAX_DESCRIPTION_LEN);
            }
            LineKind::StallPower => {
                for (point, value) in self.points.iter_mut().zip(fields) {
                    point.stall_power = parse_field(line, value)?;
                }
            }
            LineKind::Instruction => {
                let slot: usize = parse_field(line, fields[0])?;
                let name = bounded(line, fields[1], MAX_NAME_LEN);
                if name == NOP_NAME {
                    self.nop_slot = Some(slot);
                }
                self.instruction_names[slot] = name;
                for (point, value) in self.points.iter_mut().zip(&fields[2..]) {
                    point.power[slot] = parse_field(line, value)?;
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<ProfileTable, LoadError> {
        let expected = self.points.len() + 2;
        if self.points.is_empty() || self.valid_lines < expected {
            return Err(LoadError::Truncated {
                expected,
                found: self.valid_lines,
            });
        }
        let nop_slot = self.nop_slot.ok_or(LoadError::MissingNop)?;
        Ok(ProfileTable::from_parts(self.points, self.instruction_names, nop_slot))
    }
}

fn check_arity(line: u64, fields: &[&str], expected: usize) -> Result<(), LoadError> {
    if fields.len() < expected {
        return Err(LoadError::MissingField {
            line,
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

/// Checks an instruction slot index, negative and too large (even overflowing) indices are out of range.
fn slot_in_range(line: u64, value: &str) -> Result<bool, LoadError> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LoadError::InvalidNumber {
            line,
            value: value.to_string(),
        });
    }
    if digits.len() != value.len() {
        return Ok(false);
    }
    Ok(matches!(digits.parse::<usize>(), Ok(slot) if slot <= NUM_INSTRUCTIONS))
}

fn parse_field<T: FromStr>(line: u64, value: &str) -> Result<T, LoadError> {
    value.parse().map_err(|_| LoadError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

fn bounded(line: u64, value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    log::warn!("power table line {}: {:?} truncated to {} bytes", line, value, end);
    value[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_classification() {
        assert_eq!(LineKind::classify(1, 0), LineKind::ProfileCount);
        assert_eq!(LineKind::classify(2, 3), LineKind::OperatingPoint(0));
        assert_eq!(LineKind::classify(4, 3), LineKind::OperatingPoint(2));
        assert_eq!(LineKind::classify(5, 3), LineKind::StallPower);
        assert_eq!(LineKind::classify(6, 3), LineKind::Instruction);
        assert_eq!(LineKind::classify(100, 3), LineKind::Instruction);
    }

    #[test]
    fn test_arity() {
        assert_eq!(LineKind::ProfileCount.arity(4), 1);
        assert_eq!(LineKind::OperatingPoint(1).arity(4), 5);
        assert_eq!(LineKind::StallPower.arity(4), 4);
        assert_eq!(LineKind::Instruction.arity(4), 6);
    }

    #[test]
    fn test_slot_range() {
        assert_eq!(slot_in_range(1, "0").unwrap(), true);
        assert_eq!(slot_in_range(1, "119").unwrap(), true);
        assert_eq!(slot_in_range(1, "120").unwrap(), false);
        assert_eq!(slot_in_range(1, "-3").unwrap(), false);
        assert_eq!(slot_in_range(1, "99999999999999999999").unwrap(), false);
        assert!(slot_in_range(1, "first").is_err());
        assert!(slot_in_range(1, "-").is_err());
        assert!(slot_in_range(1, "1.5").is_err());
    }

    #[test]
    fn test_bounded_respects_char_boundary() {
        assert_eq!(bounded(1, "short", 30), "short");
        assert_eq!(bounded(1, "abcdef", 4), "abcd");
        // 'é' takes two bytes, cutting at 2 would split it
        assert_eq!(bounded(1, "aéb", 2), "a");
    }
}
