//! Cache-coherence simulator CLI.
//!
//! This binary replays a recorded memory trace through the simulator core
//! and prints the safety report. It performs:
//! 1. **Configuration:** Built-in defaults, an optional JSON config file,
//!    and per-flag overrides (geometry, site count, reverse transitions).
//! 2. **Replay:** Streams `<tid> <L|S> <addr> <len>` events into per-thread
//!    caches created on first sight of a thread id.
//! 3. **Reporting:** Per-cache access/safety table with the hottest
//!    downgraded lines, plus the directory-side entry classification;
//!    `--json` emits the same data as JSON.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process;

use rscsim_core::Simulator;
use rscsim_core::config::Config;
use rscsim_core::stats::{CacheStats, SiteReport};

#[derive(Parser, Debug)]
#[command(
    name = "rscsim",
    author,
    version,
    about = "Directory-based cache-coherence simulator for RSC-safe access measurement",
    long_about = "Replay a memory trace through per-thread caches backed by home-site \
directories and report, per cache, how many accesses touched lines that were still \
safe (private-to-one-core or globally read-only) and how often safe lines were \
flushed by other cores.\n\nTrace format: one `<tid> <L|S> <addr> <len>` event per \
line; `#` starts a comment.\n\nExamples:\n  rscsim run.trace\n  rscsim --ways 4 --sites 1 run.trace\n  rscsim --config sim.json --json -o report.json run.trace"
)]
struct Cli {
    /// Memory trace file to replay.
    trace: String,

    /// JSON configuration file; flags below override its values.
    #[arg(short, long)]
    config: Option<String>,

    /// Per-thread cache capacity in bytes.
    #[arg(long)]
    cache_size: Option<usize>,

    /// Coherence-line size in bytes (power of two).
    #[arg(long)]
    line_size: Option<usize>,

    /// Cache associativity (ways per set).
    #[arg(long)]
    ways: Option<usize>,

    /// Number of home-site directories.
    #[arg(long)]
    sites: Option<usize>,

    /// Allow reverse transitions (an entry whose sharers all write back
    /// forgets its history and can become safe again).
    #[arg(short = 'r', long)]
    reverse: bool,

    /// Emit the report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    output: Option<String>,

    /// Number of hottest downgraded lines to list per cache.
    #[arg(long, default_value_t = 3)]
    top: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);

    let mut sim = Simulator::new(&config).unwrap_or_else(|e| fatal(&format!("{e}")));

    let trace = File::open(&cli.trace)
        .unwrap_or_else(|e| fatal(&format!("could not open trace '{}': {e}", cli.trace)));
    let events = sim
        .replay(BufReader::new(trace))
        .unwrap_or_else(|e| fatal(&format!("replay failed: {e}")));

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path)
                .unwrap_or_else(|e| fatal(&format!("could not create '{path}': {e}"))),
        ),
        None => Box::new(io::stdout()),
    };

    let result = if cli.json {
        write_json(&mut out, &sim, events)
    } else {
        write_table(&mut out, &sim, &config, events, cli.top)
    };
    result.unwrap_or_else(|e| fatal(&format!("could not write report: {e}")));
}

/// Prints a fatal error and exits.
fn fatal(msg: &str) -> ! {
    eprintln!("[!] FATAL: {msg}");
    process::exit(1);
}

/// Merges defaults, the optional config file, and flag overrides.
fn build_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path)
                .unwrap_or_else(|e| fatal(&format!("could not open config '{path}': {e}")));
            serde_json::from_reader(BufReader::new(file))
                .unwrap_or_else(|e| fatal(&format!("bad config '{path}': {e}")))
        }
        None => Config::default(),
    };

    if let Some(size) = cli.cache_size {
        config.cache.size_bytes = size;
    }
    if let Some(line) = cli.line_size {
        config.cache.line_bytes = line;
    }
    if let Some(ways) = cli.ways {
        config.cache.ways = ways;
    }
    if let Some(sites) = cli.sites {
        config.directory.sites = sites;
    }
    if cli.reverse {
        config.directory.allow_reverse_transition = true;
    }
    config
}

/// Writes the fixed-width report table.
fn write_table(
    out: &mut dyn Write,
    sim: &Simulator,
    config: &Config,
    events: u64,
    top: usize,
) -> io::Result<()> {
    // Downgrade histogram keys are line numbers; shift back to addresses.
    let line_shift = config.cache.line_bytes.trailing_zeros();

    writeln!(out)?;
    writeln!(out, "Replayed {events} events")?;
    writeln!(out)?;
    writeln!(
        out,
        "{:<8}{:>15}{:>11}{:>12}{:>13}{:>13}",
        "", "Accesses", "Hit Rate", "Safe Rate", "Downgrades", "RSC Flushes"
    )?;

    let mut total = CacheStats::default();
    for tid in sim.thread_ids() {
        let Some(stats) = sim.cache_stats(tid) else {
            continue;
        };

        write!(
            out,
            "Cache {tid:<2}{:>15}{:>10.1}%{:>11.1}%{:>13}{:>13}",
            stats.accesses(),
            100.0 * stats.hit_rate(),
            100.0 * stats.safe_rate(),
            stats.downgrades,
            stats.rsc_flushes
        )?;
        for (line, count) in stats.top_downgrades(top) {
            let share = 100.0 * count as f64 / stats.downgrades.max(1) as f64;
            write!(out, " ({:#x} : {share:.1}%)", line << line_shift)?;
        }
        writeln!(out)?;

        total.hits += stats.hits;
        total.partial_hits += stats.partial_hits;
        total.misses += stats.misses;
        total.safe_accesses += stats.safe_accesses;
        total.multiline_accesses += stats.multiline_accesses;
        total.downgrades += stats.downgrades;
        total.rsc_flushes += stats.rsc_flushes;
        for (line, count) in &stats.downgrades_by_line {
            *total.downgrades_by_line.entry(*line).or_insert(0) += count;
        }
    }

    write!(
        out,
        "{:<8}{:>15}{:>10.1}%{:>11.1}%{:>13}{:>13}",
        "Totals",
        total.accesses(),
        100.0 * total.hit_rate(),
        100.0 * total.safe_rate(),
        total.downgrades,
        total.rsc_flushes
    )?;
    if let Some((line, count)) = total.top_downgrades(1).first() {
        let share = 100.0 * *count as f64 / total.downgrades.max(1) as f64;
        write!(out, " ({:#x} : {share:.1}%)", line << line_shift)?;
    }
    writeln!(out)?;

    let report = sim.directory_report();
    writeln!(out)?;
    writeln!(
        out,
        "{:<8}{:>9}{:>11}{:>8}{:>8}{:>8}{:>8}",
        "", "Entries", "Untouched", "P_RO", "P_RW", "S_RO", "S_RW"
    )?;
    for (i, site) in report.sites.iter().enumerate() {
        write_site_row(out, &format!("Site {i}"), site)?;
    }
    write_site_row(out, "Total", &report.total)?;
    Ok(())
}

/// Writes one row of the directory classification table.
fn write_site_row(out: &mut dyn Write, label: &str, site: &SiteReport) -> io::Result<()> {
    writeln!(
        out,
        "{label:<8}{:>9}{:>11}{:>8}{:>8}{:>8}{:>8}",
        site.entries(),
        site.untouched,
        site.private_read_only,
        site.private_read_write,
        site.shared_read_only,
        site.shared_read_write
    )
}

/// Writes the report as JSON.
fn write_json(out: &mut dyn Write, sim: &Simulator, events: u64) -> io::Result<()> {
    let caches: Vec<_> = sim
        .thread_ids()
        .into_iter()
        .filter_map(|tid| {
            sim.cache_stats(tid).map(|stats| {
                serde_json::json!({
                    "tid": tid,
                    "accesses": stats.accesses(),
                    "hit_rate": stats.hit_rate(),
                    "safe_rate": stats.safe_rate(),
                    "stats": stats,
                })
            })
        })
        .collect();

    let report = serde_json::json!({
        "events": events,
        "caches": caches,
        "directory": sim.directory_report(),
    });
    writeln!(out, "{report:#}")
}
