use crate::config::SimConfig;
use crate::cpu::{EngineError, LogEvent, State};
use crate::instructions::{AluOp, BranchCond, Op, Src};
use crate::reservation_station::{Operand, RsId};

fn required(operand: Operand, station: RsId) -> Result<f64, EngineError> {
    operand
        .value()
        .ok_or_else(|| EngineError::broken(station, "executed with an unresolved operand"))
}

impl State {
    // Phase B: operand-ready stations charge their latency, count down and
    // produce a result (or side effect) on reaching zero.
    pub(crate) fn execute(&mut self, config: &SimConfig) -> Result<(), EngineError> {
        for idx in 0..self.stations.len() {
            let rs = &self.stations.stations[idx];
            if !rs.busy() || !rs.operands_ready() {
                continue;
            }

            let station = rs.id;
            let (Some(inst_id), Some(op)) = (rs.inst, rs.op) else {
                return Err(EngineError::broken(station, "busy without an opcode"));
            };
            let (vj, vk, addr) = (rs.vj, rs.vk, rs.addr);

            // first cycle with operands ready: charge the latency, loads
            // pay the miss penalty on top
            if self.insts[inst_id].exec_start.is_none() {
                let latency = match op {
                    Op::Load => {
                        let Some(addr) = addr else {
                            return Err(EngineError::broken(station, "load with no resolved address"));
                        };
                        let access = self.cache.lookup(addr, self.cycle, &config.cache);
                        if !access.hit {
                            self.log_event(LogEvent::CacheMiss { addr });
                        }
                        config.latencies.load + access.penalty
                    }
                    _ => config.latencies.for_op(op),
                };
                self.insts[inst_id].exec_start = Some(self.cycle);
                self.stations.stations[idx].remaining = Some(latency);
            }

            if let Some(time) = self.stations.stations[idx].remaining {
                if time > 0 {
                    self.stations.stations[idx].remaining = Some(time - 1);
                }
            }

            if self.stations.stations[idx].remaining != Some(0)
                || self.insts[inst_id].exec_end.is_some()
            {
                continue;
            }
            self.insts[inst_id].exec_end = Some(self.cycle);

            let result = match op {
                Op::FpAdd | Op::IntAlu(AluOp::Add) => {
                    Some(required(vj, station)? + required(vk, station)?)
                }
                Op::FpSub | Op::IntAlu(AluOp::Sub) => {
                    Some(required(vj, station)? - required(vk, station)?)
                }
                Op::FpMult => Some(required(vj, station)? * required(vk, station)?),
                Op::FpDiv => {
                    let left = required(vj, station)?;
                    let right = required(vk, station)?;
                    if right == 0.0 {
                        self.log_event(LogEvent::DivideByZero { station });
                        Some(0.0)
                    } else {
                        Some(left / right)
                    }
                }
                Op::Load => {
                    let Some(addr) = addr else {
                        return Err(EngineError::broken(station, "load with no resolved address"));
                    };
                    Some(self.read_mem(addr))
                }
                Op::Store => {
                    let Some(addr) = addr else {
                        return Err(EngineError::broken(station, "store with no resolved address"));
                    };
                    let value = required(vk, station)?;
                    self.write_mem(addr, value);
                    self.retire_without_broadcast(idx, inst_id);
                    None
                }
                Op::Branch(cond) => {
                    let left = required(vj, station)?;
                    let right = required(vk, station)?;
                    let taken = match cond {
                        BranchCond::Ne => left != right,
                        BranchCond::Eq => left == right,
                    };
                    if taken {
                        let target = match &self.decoded(inst_id).src2 {
                            Src::Label(label) => label.clone(),
                            _ => String::new(),
                        };
                        if let Some(&target_pc) = self.program.labels.get(&target) {
                            self.pc = target_pc;
                        } else {
                            self.log_event(LogEvent::UndefinedLabel { label: target });
                        }
                    }
                    self.branch_stall = false;
                    self.retire_without_broadcast(idx, inst_id);
                    None
                }
            };

            if let Some(result) = result {
                self.stations.stations[idx].result = Some(result);
            }
        }

        Ok(())
    }

    // stores and branches write no register and never occupy the bus
    fn retire_without_broadcast(&mut self, idx: usize, inst_id: usize) {
        self.insts[inst_id].write = Some(self.cycle);
        self.stations.stations[idx].release();
    }
}
