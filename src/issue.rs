use crate::cpu::State;
use crate::instructions::{Decoded, Op, Register, Src};
use crate::register_alias_table::Tag;
use crate::reservation_station::Operand;

impl State {
    // Phase C: one instruction at the PC moves into a reservation station;
    // any failed check stalls issue for this cycle.
    pub(crate) fn issue(&mut self) {
        if self.branch_stall {
            return;
        }

        let mut candidate = self
            .insts
            .iter()
            .position(|inst| inst.pc_address() == self.pc && inst.issue.is_none());

        // loop re-entry: control is back on a pc whose instance fully retired
        if candidate.is_none() {
            let template = self
                .insts
                .iter()
                .rfind(|inst| inst.pc_address() == self.pc && inst.retired())
                .map(|inst| inst.index);
            if let Some(index) = template {
                let id = self.clone_instance(index);
                log::debug!("cycle {}: re-entered pc {} as instruction {}", self.cycle, self.pc, id);
                candidate = Some(id);
            }
        }

        let Some(inst_id) = candidate else {
            return;
        };
        let decoded = self.decoded(inst_id).clone();
        let class = decoded.op.unit_class();

        // loads and stores resolve their effective address now; the base
        // register must be available (or on the bus this very cycle)
        let mut eff_addr = None;
        if decoded.op.is_mem() {
            let Some(base) = decoded.src1 else {
                return;
            };
            let offset = decoded.imm.unwrap_or(0);
            let base_value = match self.rat.get(base) {
                Tag::Station(tag) => match self.cdb {
                    Some(cdb) if cdb.tag == tag => cdb.value,
                    _ => return, // base still in flight
                },
                Tag::Register(reg) => self.registers.get(reg),
            };
            let addr = base_value as i64 + offset;

            // disambiguation against older in-flight accesses to the same
            // address: RAW for loads, WAR/WAW for stores
            for rs in &self.stations.stations {
                if !rs.busy() || rs.addr != Some(addr) {
                    continue;
                }
                let older = rs.inst.map_or(false, |id| id < inst_id);
                let conflicts = match (decoded.op, rs.op) {
                    (Op::Load, Some(Op::Store)) => true,
                    (Op::Store, Some(Op::Load)) | (Op::Store, Some(Op::Store)) => true,
                    _ => false,
                };
                if older && conflicts {
                    return;
                }
            }

            eff_addr = Some(addr);
        }

        // structural hazard: a station of the right class must be free
        let (vj, vk) = self.rename_operands(&decoded);
        let Some(rs) = self.stations.find_free(class) else {
            return;
        };
        let rs_id = rs.id;

        rs.op = Some(decoded.op);
        rs.vj = vj;
        rs.vk = vk;
        rs.addr = eff_addr;
        rs.inst = Some(inst_id);

        self.insts[inst_id].issue = Some(self.cycle);
        self.pc += 4;

        if decoded.op.is_branch() {
            self.branch_stall = true;
        }

        if decoded.op.writes_register() {
            if let Some(dest) = decoded.dest {
                self.rat.set(dest, rs_id);
            }
        }

        log::debug!(
            "cycle {}: issued instruction {} `{}` to {}",
            self.cycle,
            inst_id,
            decoded.text,
            rs_id
        );
    }

    fn rename_operands(&self, decoded: &Decoded) -> (Operand, Operand) {
        match decoded.op {
            // the address slot carries everything a load needs
            Op::Load => (Operand::Empty, Operand::Empty),

            // vk is the value to store, read from the destination field
            Op::Store => {
                let vk = match decoded.dest {
                    Some(reg) => self.resolve_register(reg),
                    None => Operand::Empty,
                };
                (Operand::Empty, vk)
            }

            // BNE R1, R2, LABEL compares dest against src1; the zero forms
            // compare against a literal 0
            Op::Branch(_) => {
                let vj = match decoded.dest {
                    Some(reg) => self.resolve_register(reg),
                    None => Operand::Value(0.0),
                };
                let vk = match decoded.src1 {
                    Some(reg) => self.resolve_register(reg),
                    None => Operand::Value(0.0),
                };
                (vj, vk)
            }

            // arithmetic: vj from src1, vk from src2 or the immediate
            _ => {
                let vj = match decoded.src1 {
                    Some(reg) => self.resolve_register(reg),
                    None => Operand::Value(0.0),
                };
                let vk = match &decoded.src2 {
                    Src::Reg(reg) => self.resolve_register(*reg),
                    _ => Operand::Value(decoded.imm.unwrap_or(0) as f64),
                };
                (vj, vk)
            }
        }
    }

    fn resolve_register(&self, reg: Register) -> Operand {
        match self.rat.get(reg) {
            Tag::Station(tag) => match self.cdb {
                Some(cdb) if cdb.tag == tag => Operand::Value(cdb.value),
                _ => Operand::Tag(tag),
            },
            Tag::Register(reg) => Operand::Value(self.registers.get(reg)),
        }
    }
}
