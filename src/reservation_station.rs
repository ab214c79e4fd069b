use core::fmt;

use crate::config::RsSizes;
use crate::instructions::{Op, UnitClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RsId {
    pub class: UnitClass,
    pub ordinal: u8,
}
impl RsId {
    pub fn new(class: UnitClass, ordinal: u8) -> Self {
        Self { class, ordinal }
    }
}
impl fmt::Display for RsId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.class.prefix(), self.ordinal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Value(f64),
    Tag(RsId),
    Empty,
}
impl Operand {
    pub fn is_ready(&self) -> bool {
        // unused slots count as ready
        !matches!(self, Operand::Tag(_))
    }

    pub fn tag(&self) -> Option<RsId> {
        match self {
            Operand::Tag(t) => Some(*t),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Operand::Value(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationStation {
    pub id: RsId,
    pub op: Option<Op>,
    pub vj: Operand,
    pub vk: Operand,
    pub addr: Option<i64>,   // resolved at issue for loads and stores
    pub inst: Option<usize>, // busy iff bound to an instruction
    pub remaining: Option<u64>,
    pub result: Option<f64>,
}
impl ReservationStation {
    pub fn new(id: RsId) -> Self {
        Self {
            id,
            op: None,
            vj: Operand::Empty,
            vk: Operand::Empty,
            addr: None,
            inst: None,
            remaining: None,
            result: None,
        }
    }

    pub fn busy(&self) -> bool {
        self.inst.is_some()
    }

    pub fn operands_ready(&self) -> bool {
        self.vj.is_ready() && self.vk.is_ready()
    }

    pub fn ready_to_write(&self) -> bool {
        self.busy() && self.remaining == Some(0) && self.result.is_some()
    }

    pub fn capture(&mut self, tag: RsId, value: f64) {
        if self.vj == Operand::Tag(tag) {
            self.vj = Operand::Value(value);
        }
        if self.vk == Operand::Tag(tag) {
            self.vk = Operand::Value(value);
        }
    }

    pub fn release(&mut self) {
        *self = Self::new(self.id);
    }
}

// Station order is fixed at build: ADD, MULT, LOAD, STORE, INTEGER, each by
// ordinal. Phase iteration and arbitration tie-breaks follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct StationTable {
    pub stations: Vec<ReservationStation>,
}
impl StationTable {
    pub fn build(sizes: &RsSizes) -> Self {
        let mut stations = Vec::new();
        for class in UnitClass::ALL {
            for ordinal in 1..=sizes.for_class(class) {
                stations.push(ReservationStation::new(RsId::new(class, ordinal as u8)));
            }
        }

        StationTable { stations }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, id: RsId) -> Option<&ReservationStation> {
        self.stations.iter().find(|rs| rs.id == id)
    }

    pub fn find_free(&mut self, class: UnitClass) -> Option<&mut ReservationStation> {
        self.stations
            .iter_mut()
            .find(|rs| rs.id.class == class && !rs.busy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_is_fixed() {
        let table = StationTable::build(&RsSizes::default());
        let ids: Vec<String> = table.stations.iter().map(|rs| rs.id.to_string()).collect();
        assert_eq!(
            ids,
            [
                "ADD1", "ADD2", "ADD3", "MULT1", "MULT2", "LOAD1", "LOAD2", "LOAD3", "STORE1",
                "STORE2", "STORE3", "INT1", "INT2", "INT3", "INT4"
            ]
        );
    }

    #[test]
    fn allocation_takes_lowest_free_ordinal() {
        let mut table = StationTable::build(&RsSizes::default());
        table.find_free(UnitClass::Mult).unwrap().inst = Some(0);
        let next = table.find_free(UnitClass::Mult).unwrap();
        assert_eq!(next.id, RsId::new(UnitClass::Mult, 2));

        next.inst = Some(1);
        assert!(table.find_free(UnitClass::Mult).is_none());
    }

    #[test]
    fn capture_fills_matching_tags_only() {
        let producer = RsId::new(UnitClass::Load, 1);
        let other = RsId::new(UnitClass::Load, 2);

        let mut rs = ReservationStation::new(RsId::new(UnitClass::Add, 1));
        rs.vj = Operand::Tag(producer);
        rs.vk = Operand::Tag(other);

        rs.capture(producer, 1.5);
        assert_eq!(rs.vj, Operand::Value(1.5));
        assert_eq!(rs.vk, Operand::Tag(other));
        assert!(!rs.operands_ready());
    }
}
