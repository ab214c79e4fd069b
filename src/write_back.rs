use crate::cpu::{Cdb, State};
use crate::instructions::Register;

impl State {
    // Phase A: at most one completed producer takes the bus per cycle.
    // Stores and branches never pass through here.
    pub(crate) fn write_back(&mut self) {
        // earliest-issued wins; ties fall back to table order
        let producer = self
            .stations
            .stations
            .iter()
            .enumerate()
            .filter(|(_, rs)| rs.ready_to_write())
            .filter_map(|(idx, rs)| Some((rs.inst?, rs.result?, idx)))
            .min_by_key(|&(inst_id, _, idx)| (inst_id, idx));

        let Some((inst_id, value, idx)) = producer else {
            return;
        };
        let tag = self.stations.stations[idx].id;

        log::debug!(
            "cycle {}: {} broadcasts {} for instruction {}",
            self.cycle,
            tag,
            value,
            inst_id
        );

        self.cdb = Some(Cdb { tag, value });
        self.insts[inst_id].write = Some(self.cycle);

        // registers renamed to this producer take the value and drop the alias
        let renamed: Vec<Register> = self
            .rat
            .table
            .iter()
            .filter(|(_, &t)| t == tag)
            .map(|(&reg, _)| reg)
            .collect();
        for reg in renamed {
            self.registers.set(reg, value);
            self.rat.remove(reg);
        }

        // waiting stations snoop the bus
        for rs in self.stations.stations.iter_mut() {
            if rs.busy() {
                rs.capture(tag, value);
            }
        }

        self.stations.stations[idx].release();
    }
}
