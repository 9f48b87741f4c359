mod model;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;

use mmcheck_core::{
    check_down, not_reached, require, require_type, set_check_depth, BuildProfile, CheckDepth,
    DiagnosticsConfig, SigError, SignatureTable, ACTIVE,
};
use mmcheck_modules_logging::{install_log_handler, ConsoleLogger, ConsoleLoggerConfig};

use model::{Arena, Chain, Format, GenParam, Pool, UNALIGNED, WORD};

const USAGE: &str = "usage: check-harness <well-formed|unaligned-pool|corrupt-signature|unreachable|tally> [--config <path>] [--profile <strict-off|critical-only|full>]";

const TEST_CHAIN: [GenParam; 3] = [
    GenParam {
        capacity_kb: 6000,
        mortality: 0.90,
    },
    GenParam {
        capacity_kb: 8000,
        mortality: 0.65,
    },
    GenParam {
        capacity_kb: 16000,
        mortality: 0.50,
    },
];

const ARENA_SIZE: usize = 32 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scenario {
    WellFormed,
    UnalignedPool,
    CorruptSignature,
    Unreachable,
    Tally,
}

impl Scenario {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "well-formed" => Some(Scenario::WellFormed),
            "unaligned-pool" => Some(Scenario::UnalignedPool),
            "corrupt-signature" => Some(Scenario::CorruptSignature),
            "unreachable" => Some(Scenario::Unreachable),
            "tally" => Some(Scenario::Tally),
            _ => None,
        }
    }
}

struct Args {
    scenario: Scenario,
    config: PathBuf,
    /// Profile the caller expects this binary to be built with.
    profile: Option<BuildProfile>,
}

impl Args {
    fn parse(mut it: impl Iterator<Item = String>) -> Result<Self> {
        let mut scenario = None;
        let mut config = PathBuf::from("mmcheck.json");
        let mut profile = None;

        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--config" => {
                    config = it.next().map(PathBuf::from).context("--config needs a path")?;
                }
                "--profile" => {
                    let name = it.next().context("--profile needs a name")?;
                    profile = Some(name.parse::<BuildProfile>().map_err(anyhow::Error::msg)?);
                }
                other => match Scenario::parse(other) {
                    Some(s) if scenario.is_none() => scenario = Some(s),
                    _ => bail!("unexpected argument '{other}'\n{USAGE}"),
                },
            }
        }

        Ok(Self {
            scenario: scenario.context(USAGE)?,
            config,
            profile,
        })
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("check-harness: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;
    if let Some(wanted) = args.profile {
        if wanted != ACTIVE {
            bail!("built with profile {ACTIVE}, {wanted} was requested");
        }
    }

    ConsoleLogger::new(ConsoleLoggerConfig::from_env()).init()?;

    let (config, report) = DiagnosticsConfig::load(&args.config)?;
    if let Some(file) = report.used_file() {
        info!(target: "check_harness", "diagnostics config: {}", file.display());
    }
    let _diagnostics = config.apply();

    mmcheck_abi::verify_layout()?;
    let mut signatures = SignatureTable::new();
    register_signatures(&mut signatures)?;
    info!(target: "check_harness", "profile={ACTIVE} scenario={:?}", args.scenario);

    match args.scenario {
        Scenario::WellFormed => well_formed(),
        Scenario::UnalignedPool => unaligned_pool(),
        Scenario::CorruptSignature => corrupt_signature(),
        Scenario::Unreachable => unreachable(),
        Scenario::Tally => tally(),
    }
}

/// Every signed model type must own a distinct signature.
fn register_signatures(table: &mut SignatureTable) -> Result<(), SigError> {
    table.register_type::<Arena>()?;
    table.register_type::<Pool>()?;
    table.register_type::<Format>()?;
    table.register_type::<Chain>()?;
    Ok(())
}

fn build_arena() -> Result<(Arc<Arena>, Arc<Pool>)> {
    let arena = Arena::create(ARENA_SIZE)?;
    let format = Format::create(WORD, 2 * WORD)?;
    let chain = Chain::create(&TEST_CHAIN)?;
    let pool = Pool::create(&arena, WORD, format, chain)?;
    Ok((arena, pool))
}

fn well_formed() -> Result<()> {
    set_check_depth(CheckDepth::Deep);
    let (arena, _pool) = build_arena()?;
    arena.commit(4096);

    require_type!(Arena, &*arena);
    println!("well-formed: ok ({} pool)", arena.pool_count());
    Ok(())
}

fn unaligned_pool() -> Result<()> {
    let arena = Arena::create(ARENA_SIZE)?;
    let format = Format::create(WORD, 2 * WORD)?;
    let chain = Chain::create(&TEST_CHAIN)?;

    // Only reached when the installed handler returns.
    Pool::create(&arena, UNALIGNED, format, chain).context("create pool")?;
    bail!("unaligned pool was accepted")
}

fn corrupt_signature() -> Result<()> {
    set_check_depth(CheckDepth::Shallow);
    let (arena, _pool) = build_arena()?;
    arena.destroy();

    if check_down!(Arena, &*arena) {
        println!("corrupt-signature: not detected");
    } else {
        println!("corrupt-signature: reported");
    }
    Ok(())
}

fn unreachable() -> Result<()> {
    if ACTIVE == BuildProfile::StrictOff {
        bail!("unreachable markers are compiled out under {ACTIVE}");
    }
    let (arena, _pool) = build_arena()?;
    match arena.pool_count() {
        0 | 1 => {
            not_reached!();
        }
        n => println!("unreachable: {n} pools"),
    }
    Ok(())
}

fn tally() -> Result<()> {
    let prev = install_log_handler(false);
    mmcheck_abi::api_v1();

    set_check_depth(CheckDepth::Shallow);
    let (arena, _pool) = build_arena()?;
    require!(arena.pool_count() == 2);
    arena.invalidate();
    let detected = !check_down!(Arena, &*arena);
    info!(target: "check_harness", "invalidated arena detected={detected}");

    let t = mmcheck_abi::tally_v1();
    println!(
        "standard={} critical={} type-check={} signature={} unreachable={}",
        t.standard, t.critical, t.type_check, t.signature, t.unreachable
    );

    mmcheck_core::handler::install(prev);
    Ok(())
}
