use core::fmt;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum Register {
    General(u8),
    Floating(u8),
}
impl Register {
    pub fn g(r: u8) -> Self {
        Self::General(r)
    }

    pub fn f(r: u8) -> Self {
        Self::Floating(r)
    }

    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let class = chars.next()?;
        let number: u8 = chars.as_str().parse().ok()?;
        if number >= 32 {
            return None;
        }

        match class {
            'R' | 'r' => Some(Self::General(number)),
            'F' | 'f' => Some(Self::Floating(number)),
            _ => None,
        }
    }
}
impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::General(r) => write!(f, "R{}", r),
            Self::Floating(r) => write!(f, "F{}", r),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCond {
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Load,
    Store,
    FpAdd,
    FpSub,
    FpMult,
    FpDiv,
    IntAlu(AluOp),
    Branch(BranchCond),
}
impl Op {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let op = match mnemonic {
            "L.D" | "LW" | "LD" | "L.S" => Op::Load,
            "S.D" | "SW" | "SD" | "S.S" => Op::Store,
            "ADD.D" | "ADD.S" => Op::FpAdd,
            "SUB.D" | "SUB.S" => Op::FpSub,
            "MUL" | "MUL.D" | "MUL.S" => Op::FpMult,
            "DIV" | "DIV.D" | "DIV.S" => Op::FpDiv,
            "ADD" | "ADDI" | "DADD" | "DADDI" => Op::IntAlu(AluOp::Add),
            "SUB" | "SUBI" | "DSUB" | "DSUBI" => Op::IntAlu(AluOp::Sub),
            "BEQ" | "BEQZ" => Op::Branch(BranchCond::Eq),
            "BNE" | "BNEZ" => Op::Branch(BranchCond::Ne),
            _ => return None,
        };
        Some(op)
    }

    pub fn unit_class(&self) -> UnitClass {
        match self {
            Op::FpAdd | Op::FpSub => UnitClass::Add,
            Op::FpMult | Op::FpDiv => UnitClass::Mult,
            Op::Load => UnitClass::Load,
            Op::Store => UnitClass::Store,
            Op::IntAlu(_) | Op::Branch(_) => UnitClass::Integer,
        }
    }

    pub fn is_mem(&self) -> bool {
        matches!(self, Op::Load | Op::Store)
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Op::Branch(_))
    }

    pub fn writes_register(&self) -> bool {
        !matches!(self, Op::Store | Op::Branch(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitClass {
    Add,
    Mult,
    Load,
    Store,
    Integer,
}
impl UnitClass {
    // fixed station-table order; all phase iteration follows it
    pub const ALL: [UnitClass; 5] = [
        UnitClass::Add,
        UnitClass::Mult,
        UnitClass::Load,
        UnitClass::Store,
        UnitClass::Integer,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            UnitClass::Add => "ADD",
            UnitClass::Mult => "MULT",
            UnitClass::Load => "LOAD",
            UnitClass::Store => "STORE",
            UnitClass::Integer => "INT",
        }
    }
}
impl fmt::Display for UnitClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Src {
    Reg(Register),
    Label(String),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text: String,
    pub op: Op,
    pub dest: Option<Register>,
    pub src1: Option<Register>,
    pub src2: Src,
    pub imm: Option<i64>,
    pub pc: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynInst {
    pub id: usize,
    pub index: usize, // static slot, pc_address == index * 4
    pub issue: Option<u64>,
    pub exec_start: Option<u64>,
    pub exec_end: Option<u64>,
    pub write: Option<u64>,
}
impl DynInst {
    pub fn new(id: usize, index: usize) -> Self {
        Self {
            id,
            index,
            issue: None,
            exec_start: None,
            exec_end: None,
            write: None,
        }
    }

    pub fn pc_address(&self) -> u32 {
        (self.index * 4) as u32
    }

    pub fn retired(&self) -> bool {
        self.write.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_parse() {
        assert_eq!(Register::parse("R2"), Some(Register::g(2)));
        assert_eq!(Register::parse("f31"), Some(Register::f(31)));
        assert_eq!(Register::parse("F32"), None);
        assert_eq!(Register::parse("X1"), None);
        assert_eq!(Register::parse("R"), None);
    }

    #[test]
    fn mnemonic_families() {
        assert_eq!(Op::from_mnemonic("L.D"), Some(Op::Load));
        assert_eq!(Op::from_mnemonic("DSUBI"), Some(Op::IntAlu(AluOp::Sub)));
        assert_eq!(Op::from_mnemonic("BNEZ"), Some(Op::Branch(BranchCond::Ne)));
        assert_eq!(Op::from_mnemonic("NOP"), None);
    }

    #[test]
    fn unit_classes() {
        assert_eq!(Op::FpSub.unit_class(), UnitClass::Add);
        assert_eq!(Op::FpDiv.unit_class(), UnitClass::Mult);
        assert_eq!(Op::Branch(BranchCond::Eq).unit_class(), UnitClass::Integer);
        assert!(!Op::Store.writes_register());
        assert!(!Op::Branch(BranchCond::Ne).writes_register());
        assert!(Op::Load.writes_register());
    }
}
