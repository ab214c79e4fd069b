use core::fmt::{self, Display};

use crate::cpu::State;

#[derive(Debug, Clone, Copy)]
pub struct ScheduleTable<'a> {
    state: &'a State,
}
impl<'a> ScheduleTable<'a> {
    pub fn new(state: &'a State) -> Self {
        Self { state }
    }
}
impl Display for ScheduleTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn cell(stamp: Option<u64>) -> String {
            stamp.map_or_else(|| "-".to_string(), |c| c.to_string())
        }

        writeln!(
            f,
            "{:<4} {:<24} {:>6} {:>6} {:>6} {:>6}",
            "#", "instruction", "issue", "start", "end", "write"
        )?;
        for inst in &self.state.insts {
            writeln!(
                f,
                "{:<4} {:<24} {:>6} {:>6} {:>6} {:>6}",
                inst.id,
                self.state.program.insts[inst.index].text,
                cell(inst.issue),
                cell(inst.exec_start),
                cell(inst.exec_end),
                cell(inst.write),
            )?;
        }

        let completed = self.state.insts.iter().filter(|i| i.retired()).count();
        writeln!(f, "Run stats:")?;
        writeln!(f, " - Cycles: {}", self.state.cycle)?;
        writeln!(
            f,
            " - Instructions completed: {}/{}",
            completed,
            self.state.insts.len()
        )?;
        write!(f, " - Log entries: {}", self.state.log.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler;
    use crate::config::SimConfig;

    #[test]
    fn renders_one_row_per_dynamic_instruction() {
        let config = SimConfig::default();
        let program = assembler::parse("DADDI R1, R1, 1\nDADDI R2, R2, 2").unwrap();
        let state = State::initialize(program, &config, &[]);

        let table = ScheduleTable::new(&state).to_string();
        assert!(table.contains("DADDI R1, R1, 1"));
        assert!(table.contains("DADDI R2, R2, 2"));
        assert!(table.contains("Instructions completed: 0/2"));
    }
}
