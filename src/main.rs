use std::fs;
use std::process;

use clap::Parser;

use tomasim::config::ConfigError;
use tomasim::instructions::Register;
use tomasim::stats::ScheduleTable;
use tomasim::{parse, SimConfig, State};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    pub asm_filename: String,

    // JSON machine configuration; the flags below override it
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long)]
    pub rs_add: Option<usize>,
    #[arg(long)]
    pub rs_mult: Option<usize>,
    #[arg(long)]
    pub rs_load: Option<usize>,
    #[arg(long)]
    pub rs_store: Option<usize>,
    #[arg(long)]
    pub rs_integer: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
    #[arg(long)]
    pub block_size: Option<u32>,
    #[arg(long)]
    pub cache_size: Option<u32>,
    #[arg(long)]
    pub miss_penalty: Option<u64>,

    // starting register values, e.g. --register R1=24 (repeatable)
    #[arg(short, long = "register", value_name = "REG=VALUE")]
    pub registers: Vec<String>,

    #[arg(long, default_value_t = 100_000)]
    pub max_cycles: u64,

    #[arg(short, long, default_value_t = false)]
    pub print_memory: bool,

    #[arg(long, default_value_t = false)]
    pub print_log: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = build_config(&args).unwrap_or_else(|err| die(&err.to_string()));

    let source = fs::read_to_string(&args.asm_filename)
        .unwrap_or_else(|err| die(&format!("cannot read {}: {}", args.asm_filename, err)));
    let program = parse(&source).unwrap_or_else(|err| die(&err.to_string()));

    let mut seeds = Vec::new();
    for spec in &args.registers {
        match parse_seed(spec) {
            Some(seed) => seeds.push(seed),
            None => die(&format!("bad register seed `{}`", spec)),
        }
    }

    let mut state = State::initialize(program, &config, &seeds);
    while !state.finished && state.cycle < args.max_cycles {
        state = state
            .step(&config)
            .unwrap_or_else(|err| die(&format!("engine error: {}", err)));
    }
    if !state.finished {
        eprintln!("gave up after {} cycles", state.cycle);
    }

    println!("{}", ScheduleTable::new(&state));

    let mut regs: Vec<(&Register, &f64)> = state
        .registers
        .registers
        .iter()
        .filter(|(_, v)| **v != 0.0)
        .collect();
    regs.sort_by(|a, b| a.0.cmp(b.0));
    for (reg, value) in regs {
        println!("{}: {}", reg, value);
    }

    if args.print_memory {
        let mut words: Vec<(&i64, &f64)> = state.memory.iter().collect();
        words.sort_by(|a, b| a.0.cmp(b.0));
        for (addr, value) in words {
            println!("[{}] = {}", addr, value);
        }
    }

    if args.print_log {
        for entry in &state.log {
            println!("{}", entry);
        }
    }
}

fn build_config(args: &Args) -> Result<SimConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    if let Some(n) = args.rs_add {
        config.rs_sizes.add = n;
    }
    if let Some(n) = args.rs_mult {
        config.rs_sizes.mult = n;
    }
    if let Some(n) = args.rs_load {
        config.rs_sizes.load = n;
    }
    if let Some(n) = args.rs_store {
        config.rs_sizes.store = n;
    }
    if let Some(n) = args.rs_integer {
        config.rs_sizes.integer = n;
    }

    if args.no_cache {
        config.cache.enabled = false;
    }
    if let Some(n) = args.block_size {
        config.cache.block_size = n;
    }
    if let Some(n) = args.cache_size {
        config.cache.cache_size = n;
    }
    if let Some(n) = args.miss_penalty {
        config.cache.miss_penalty = n;
    }

    Ok(config)
}

fn parse_seed(spec: &str) -> Option<(Register, f64)> {
    let (name, value) = spec.split_once('=')?;
    let reg = Register::parse(name.trim())?;
    let value: f64 = value.trim().parse().ok()?;
    Some((reg, value))
}

fn die(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}
