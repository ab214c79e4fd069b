use core::fmt;
use std::collections::HashMap;

use thiserror::Error;

use crate::assembler::Program;
use crate::cache::DataCache;
use crate::config::SimConfig;
use crate::instructions::{Decoded, DynInst, Register};
use crate::register_alias_table::RegisterAliasTable;
use crate::registers::RegisterFile;
use crate::reservation_station::{RsId, StationTable};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("station {station}: {reason}")]
    BrokenStation { station: RsId, reason: String },
    #[error("register {register} renamed to {tag}, which no busy station carries")]
    DanglingRegisterTag { register: Register, tag: RsId },
    #[error("registers may only be seeded before the first cycle (now at cycle {cycle})")]
    SeedAfterStart { cycle: u64 },
}
impl EngineError {
    pub(crate) fn broken(station: RsId, reason: impl Into<String>) -> Self {
        Self::BrokenStation {
            station,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cdb {
    pub tag: RsId,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    CacheMiss { addr: i64 },
    DivideByZero { station: RsId },
    UndefinedLabel { label: String },
}
impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::CacheMiss { addr } => write!(f, "cache miss at address {}", addr),
            Self::DivideByZero { station } => {
                write!(f, "{}: divide by zero, result forced to 0", station)
            }
            Self::UndefinedLabel { label } => {
                write!(f, "branch to undefined label `{}`", label)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub cycle: u64,
    pub event: LogEvent,
}
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[cycle {}] {}", self.cycle, self.event)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub program: Program,
    pub cycle: u64,
    pub pc: u32,
    pub insts: Vec<DynInst>, // ids double as list indices
    pub stations: StationTable,
    pub registers: RegisterFile,
    pub rat: RegisterAliasTable,
    pub memory: HashMap<i64, f64>, // sparse; unmapped addresses read as 0
    pub cache: DataCache,
    pub cdb: Option<Cdb>,
    pub log: Vec<LogEntry>,
    pub finished: bool,
    pub branch_stall: bool,
    next_inst_id: usize,
}
impl State {
    pub fn initialize(
        program: Program,
        config: &SimConfig,
        initial_registers: &[(Register, f64)],
    ) -> State {
        let insts: Vec<DynInst> = (0..program.insts.len())
            .map(|index| DynInst::new(index, index))
            .collect();
        let next_inst_id = insts.len();

        let mut registers = RegisterFile::new();
        for &(reg, value) in initial_registers {
            registers.set(reg, value);
        }

        State {
            program,
            cycle: 0,
            pc: 0,
            insts,
            stations: StationTable::build(&config.rs_sizes),
            registers,
            rat: RegisterAliasTable::new(),
            memory: HashMap::new(),
            cache: DataCache::new(),
            cdb: None,
            log: Vec::new(),
            finished: false,
            branch_stall: false,
            next_inst_id,
        }
    }

    pub fn set_register_value(&mut self, reg: Register, value: f64) -> Result<(), EngineError> {
        if self.cycle != 0 {
            return Err(EngineError::SeedAfterStart { cycle: self.cycle });
        }
        self.registers.set(reg, value);
        Ok(())
    }

    pub fn step(&self, config: &SimConfig) -> Result<State, EngineError> {
        if self.finished {
            return Ok(self.clone());
        }
        self.validate()?;

        // advance a clone so an error hands the caller their state unchanged
        let mut next = self.clone();
        next.cycle += 1;
        next.cdb = None;

        next.write_back();
        next.execute(config)?;
        next.issue();

        next.finished = next.all_retired() && !next.pc_in_program();
        log::trace!(
            "cycle {}: pc={} busy_stations={} finished={}",
            next.cycle,
            next.pc,
            next.stations.stations.iter().filter(|rs| rs.busy()).count(),
            next.finished
        );
        Ok(next)
    }

    pub(crate) fn decoded(&self, inst_id: usize) -> &Decoded {
        &self.program.insts[self.insts[inst_id].index]
    }

    pub(crate) fn read_mem(&self, addr: i64) -> f64 {
        self.memory.get(&addr).copied().unwrap_or(0.0)
    }

    pub(crate) fn write_mem(&mut self, addr: i64, value: f64) {
        self.memory.insert(addr, value);
    }

    pub(crate) fn log_event(&mut self, event: LogEvent) {
        log::debug!("cycle {}: {}", self.cycle, event);
        self.log.push(LogEntry {
            cycle: self.cycle,
            event,
        });
    }

    // fresh dynamic instance for loop re-entry; ids stay equal to positions
    pub(crate) fn clone_instance(&mut self, index: usize) -> usize {
        let id = self.next_inst_id;
        self.next_inst_id += 1;
        self.insts.push(DynInst::new(id, index));
        id
    }

    fn all_retired(&self) -> bool {
        self.insts.iter().all(|inst| inst.retired())
    }

    fn pc_in_program(&self) -> bool {
        self.insts.iter().any(|inst| inst.pc_address() == self.pc)
    }

    // a violation is an engine bug; the step aborts before anything mutates
    fn validate(&self) -> Result<(), EngineError> {
        for rs in &self.stations.stations {
            if !rs.busy() {
                continue;
            }
            let station = rs.id;

            match rs.inst {
                Some(id) if id >= self.insts.len() => {
                    return Err(EngineError::broken(
                        station,
                        format!("bound to unknown instruction {}", id),
                    ));
                }
                Some(id) if self.insts[id].issue.is_none() => {
                    return Err(EngineError::broken(
                        station,
                        format!("bound instruction {} never issued", id),
                    ));
                }
                _ => {}
            }

            if rs.op.is_none() {
                return Err(EngineError::broken(station, "busy without an opcode"));
            }

            for tag in [rs.vj.tag(), rs.vk.tag()].into_iter().flatten() {
                let producer_busy = self.stations.get(tag).map_or(false, |p| p.busy());
                if !producer_busy {
                    return Err(EngineError::broken(
                        station,
                        format!("waits on idle station {}", tag),
                    ));
                }
            }
        }

        for (&register, &tag) in &self.rat.table {
            let producer_busy = self.stations.get(tag).map_or(false, |p| p.busy());
            if !producer_busy {
                return Err(EngineError::DanglingRegisterTag { register, tag });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler;
    use crate::instructions::UnitClass;
    use crate::reservation_station::Operand;

    fn small_state() -> (State, SimConfig) {
        let config = SimConfig::default();
        let program = assembler::parse("ADD.D F2, F4, F6").unwrap();
        (State::initialize(program, &config, &[]), config)
    }

    #[test]
    fn seeding_is_rejected_after_first_step() {
        let (mut state, config) = small_state();
        state.set_register_value(Register::f(4), 2.0).unwrap();

        let mut next = state.step(&config).unwrap();
        assert_eq!(
            next.set_register_value(Register::f(4), 3.0),
            Err(EngineError::SeedAfterStart { cycle: 1 })
        );
    }

    #[test]
    fn dangling_operand_tag_fails_the_step() {
        let (mut state, config) = small_state();
        state = state.step(&config).unwrap(); // ADD.D now occupies ADD1

        let ghost = RsId::new(UnitClass::Mult, 2);
        state.stations.stations[0].vj = Operand::Tag(ghost);
        let err = state.step(&config).unwrap_err();
        assert_eq!(
            err,
            EngineError::broken(RsId::new(UnitClass::Add, 1), "waits on idle station MULT2")
        );
    }

    #[test]
    fn dangling_register_tag_fails_the_step() {
        let (mut state, config) = small_state();
        let ghost = RsId::new(UnitClass::Load, 3);
        state.rat.set(Register::f(8), ghost);

        let err = state.step(&config).unwrap_err();
        assert_eq!(
            err,
            EngineError::DanglingRegisterTag {
                register: Register::f(8),
                tag: ghost
            }
        );
    }

    #[test]
    fn failed_step_leaves_caller_state_unchanged() {
        let (mut state, config) = small_state();
        state.rat.set(Register::f(8), RsId::new(UnitClass::Load, 3));

        let before = state.clone();
        assert!(state.step(&config).is_err());
        assert_eq!(state, before);
    }
}
