use std::collections::HashMap;

use crate::instructions::Register;
use crate::reservation_station::RsId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tag {
    Register(Register),
    Station(RsId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterAliasTable {
    pub table: HashMap<Register, RsId>,
}
impl RegisterAliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, reg: Register, station: RsId) {
        self.table.insert(reg, station);
    }

    pub fn get(&self, reg: Register) -> Tag {
        self.table
            .get(&reg)
            .map_or_else(|| Tag::Register(reg), |station| Tag::Station(*station))
    }

    pub fn remove(&mut self, reg: Register) {
        self.table.remove(&reg);
    }
}
