use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::instructions::{Op, UnitClass};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RsSizes {
    pub add: usize,
    pub mult: usize,
    pub load: usize,
    pub store: usize,
    pub integer: usize,
}
impl Default for RsSizes {
    fn default() -> Self {
        Self {
            add: 3,
            mult: 2,
            load: 3,
            store: 3,
            integer: 4,
        }
    }
}
impl RsSizes {
    pub fn for_class(&self, class: UnitClass) -> usize {
        match class {
            UnitClass::Add => self.add,
            UnitClass::Mult => self.mult,
            UnitClass::Load => self.load,
            UnitClass::Store => self.store,
            UnitClass::Integer => self.integer,
        }
    }
}

// execute latency in cycles per opcode class
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Latencies {
    pub load: u64,
    pub store: u64,
    pub fp_add: u64,
    pub fp_sub: u64,
    pub fp_mult: u64,
    pub fp_div: u64,
    pub int_alu: u64,
    pub branch: u64,
}
impl Default for Latencies {
    fn default() -> Self {
        Self {
            load: 2,
            store: 2,
            fp_add: 2,
            fp_sub: 2,
            fp_mult: 10,
            fp_div: 40,
            int_alu: 1,
            branch: 1,
        }
    }
}
impl Latencies {
    pub fn for_op(&self, op: Op) -> u64 {
        match op {
            Op::Load => self.load,
            Op::Store => self.store,
            Op::FpAdd => self.fp_add,
            Op::FpSub => self.fp_sub,
            Op::FpMult => self.fp_mult,
            Op::FpDiv => self.fp_div,
            Op::IntAlu(_) => self.int_alu,
            Op::Branch(_) => self.branch,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheParams {
    pub enabled: bool,
    pub block_size: u32,
    pub cache_size: u32,
    pub miss_penalty: u64,
}
impl Default for CacheParams {
    fn default() -> Self {
        Self {
            enabled: true,
            block_size: 4,
            cache_size: 16,
            miss_penalty: 10,
        }
    }
}
impl CacheParams {
    pub fn block_size(&self) -> i64 {
        self.block_size.max(1) as i64
    }

    pub fn capacity(&self) -> usize {
        (self.cache_size / self.block_size.max(1)) as usize
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SimConfig {
    pub rs_sizes: RsSizes,
    pub latencies: Latencies,
    pub cache: CacheParams,
}
impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
