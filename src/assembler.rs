use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

use crate::instructions::{Decoded, Op, Register, Src};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: unknown opcode `{mnemonic}`")]
    UnknownOpcode { line: usize, mnemonic: String },
    #[error("line {line}: malformed operand `{token}`")]
    BadOperand { line: usize, token: String },
    #[error("line {line}: `{mnemonic}` is missing operands")]
    MissingOperands { line: usize, mnemonic: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub insts: Vec<Decoded>,
    pub labels: HashMap<String, u32>,
}
impl Program {
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let label_re = Regex::new(r"^([A-Za-z_]\w*):\s*(.*)$").unwrap();
    let mem_re = Regex::new(r"^(-?\d+)\((\w+)\)$").unwrap();

    let mut program = Program::default();
    let mut pc: u32 = 0;

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let mut line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = label_re.captures(line) {
            let label = caps.get(1).unwrap().as_str().to_string();
            program.labels.insert(label, pc);
            line = caps.get(2).unwrap().as_str().trim();
            if line.is_empty() {
                continue; // pure label line, no pc consumed
            }
        }

        let tokens: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();

        let Some(&first) = tokens.first() else {
            return Err(ParseError::BadOperand {
                line: line_no,
                token: line.to_string(),
            });
        };

        let mnemonic = first.to_uppercase();
        let op = Op::from_mnemonic(&mnemonic).ok_or_else(|| ParseError::UnknownOpcode {
            line: line_no,
            mnemonic: mnemonic.clone(),
        })?;

        let operands = &tokens[1..];
        let missing = || ParseError::MissingOperands {
            line: line_no,
            mnemonic: mnemonic.clone(),
        };
        let bad = |token: &str| ParseError::BadOperand {
            line: line_no,
            token: token.to_string(),
        };
        let reg = |token: &str| Register::parse(token).ok_or_else(|| bad(token));

        let mut inst = Decoded {
            text: line.to_string(),
            op,
            dest: None,
            src1: None,
            src2: Src::None,
            imm: None,
            pc,
        };

        match op {
            // OP D, OFFSET(BASE); a store's value register also sits in dest
            Op::Load | Op::Store => {
                if operands.len() < 2 {
                    return Err(missing());
                }
                inst.dest = Some(reg(operands[0])?);
                let caps = mem_re.captures(operands[1]).ok_or_else(|| bad(operands[1]))?;
                let offset: i64 = caps
                    .get(1)
                    .unwrap()
                    .as_str()
                    .parse()
                    .map_err(|_| bad(operands[1]))?;
                inst.imm = Some(offset);
                inst.src1 = Some(reg(caps.get(2).unwrap().as_str())?);
            }

            // target label stays a string, looked up at branch execution
            Op::Branch(_) => match operands {
                &[r1, r2, target] => {
                    inst.dest = Some(reg(r1)?);
                    inst.src1 = Some(reg(r2)?);
                    inst.src2 = Src::Label(target.to_string());
                }
                &[r1, target] => {
                    inst.dest = Some(reg(r1)?);
                    inst.src2 = Src::Label(target.to_string());
                }
                _ => return Err(missing()),
            },

            // OP D, S1, S2 with S2 a register or a decimal immediate
            _ => {
                if operands.len() < 3 {
                    return Err(missing());
                }
                inst.dest = Some(reg(operands[0])?);
                inst.src1 = Some(reg(operands[1])?);
                if let Ok(imm) = operands[2].parse::<i64>() {
                    inst.imm = Some(imm);
                } else {
                    inst.src2 = Src::Reg(reg(operands[2])?);
                }
            }
        }

        program.insts.push(inst);
        pc += 4;
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::{AluOp, BranchCond};

    #[test]
    fn parses_memory_form() {
        let program = parse("L.D F6, 0(R2)\nS.D F6, -8(R2)").unwrap();
        assert_eq!(program.insts.len(), 2);

        let ld = &program.insts[0];
        assert_eq!(ld.op, Op::Load);
        assert_eq!(ld.dest, Some(Register::f(6)));
        assert_eq!(ld.src1, Some(Register::g(2)));
        assert_eq!(ld.imm, Some(0));
        assert_eq!(ld.pc, 0);

        let sd = &program.insts[1];
        assert_eq!(sd.op, Op::Store);
        assert_eq!(sd.imm, Some(-8));
        assert_eq!(sd.pc, 4);
    }

    #[test]
    fn parses_register_and_immediate_forms() {
        let program = parse("ADD.D F6, F8, F2\nDADDI R1, R1, 24").unwrap();

        let fp = &program.insts[0];
        assert_eq!(fp.op, Op::FpAdd);
        assert_eq!(fp.src2, Src::Reg(Register::f(2)));
        assert_eq!(fp.imm, None);

        let int = &program.insts[1];
        assert_eq!(int.op, Op::IntAlu(AluOp::Add));
        assert_eq!(int.src2, Src::None);
        assert_eq!(int.imm, Some(24));
    }

    #[test]
    fn labels_bind_to_next_instruction() {
        let program = parse("DADDI R1, R1, 8\nLOOP: L.D F0, 0(R1)\nBNE R1, R2, LOOP").unwrap();
        assert_eq!(program.labels["LOOP"], 4);

        let bne = &program.insts[2];
        assert_eq!(bne.op, Op::Branch(BranchCond::Ne));
        assert_eq!(bne.dest, Some(Register::g(1)));
        assert_eq!(bne.src1, Some(Register::g(2)));
        assert_eq!(bne.src2, Src::Label("LOOP".to_string()));
    }

    #[test]
    fn label_on_own_line_consumes_no_pc() {
        let program = parse("LOOP:\nL.D F0, 0(R1)").unwrap();
        assert_eq!(program.labels["LOOP"], 0);
        assert_eq!(program.insts[0].pc, 0);
    }

    #[test]
    fn branch_zero_form() {
        let program = parse("BNEZ R4, DONE\nDONE: DADD R0, R0, R0").unwrap();
        let bnez = &program.insts[0];
        assert_eq!(bnez.dest, Some(Register::g(4)));
        assert_eq!(bnez.src1, None);
        assert_eq!(bnez.src2, Src::Label("DONE".to_string()));
    }

    #[test]
    fn opcode_is_case_insensitive() {
        let program = parse("l.d F1, 4(R3)").unwrap();
        assert_eq!(program.insts[0].op, Op::Load);
    }

    #[test]
    fn rejects_unknown_opcode() {
        let err = parse("XOR R1, R2, R3").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownOpcode {
                line: 1,
                mnemonic: "XOR".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_operand() {
        let err = parse("L.D F1, R2").unwrap_err();
        assert_eq!(
            err,
            ParseError::BadOperand {
                line: 1,
                token: "R2".to_string()
            }
        );

        let err = parse("ADD.D F1, F2").unwrap_err();
        assert!(matches!(err, ParseError::MissingOperands { line: 1, .. }));
    }

    #[test]
    fn empty_source_is_empty_program() {
        let program = parse("\n   \n").unwrap();
        assert!(program.is_empty());
        assert!(program.labels.is_empty());
    }
}
