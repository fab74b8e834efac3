//! ring-runner: headless runner for the RingWatch engine.
//!
//! Usage:
//!   ring-runner --snapshot accounts.json --data-dir ./data --block 950 --review 800
//!   ring-runner --snapshot accounts.json --json
//!   ring-runner --snapshot accounts.json --ipc-mode

use anyhow::Result;
use ringwatch_core::{
    config::EngineConfig,
    engine::{RiskEngine, RunReport},
    snapshot::Snapshot,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetReport,
    Simulate { block: u16, review: u16 },
    Investigate { account_id: String },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let block = parse_arg(&args, "--block", 950u16);
    let review = parse_arg(&args, "--review", 800u16);
    let json_mode = args.iter().any(|a| a == "--json");
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = string_arg(&args, "--data-dir", "./data");
    let snapshot_path = string_arg(&args, "--snapshot", "./data/snapshots/demo_accounts.json");

    if !json_mode && !ipc_mode {
        println!("RingWatch ring-runner");
        println!("  snapshot:  {snapshot_path}");
        println!("  data_dir:  {data_dir}");
        println!("  policy:    block>={block} review>={review}");
        println!();
    }

    let config = EngineConfig::load(data_dir)?;
    let engine = RiskEngine::new(config)?;

    let content = std::fs::read_to_string(snapshot_path)
        .map_err(|e| anyhow::anyhow!("Cannot read {snapshot_path}: {e}"))?;
    let snapshot = Snapshot::from_json(&content)?;
    let report = engine.run(&snapshot);

    if ipc_mode {
        run_ipc_loop(&engine, &snapshot, &report)?;
    } else if json_mode {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&engine, &report, block, review)?;
    }
    Ok(())
}

fn run_ipc_loop(engine: &RiskEngine, snapshot: &Snapshot, report: &RunReport) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetReport => {
                writeln!(stdout, "{}", serde_json::to_string(report)?)?;
            }
            IpcCommand::Simulate { block, review } => {
                match engine.simulate_policy(report, block, review) {
                    Ok(impact) => writeln!(stdout, "{}", serde_json::to_string(&impact)?)?,
                    Err(e) => write_error(&mut stdout, &e.to_string())?,
                }
            }
            IpcCommand::Investigate { account_id } => {
                match engine.investigate(snapshot, &account_id) {
                    Some(view) => writeln!(stdout, "{}", serde_json::to_string(&view)?)?,
                    None => {
                        log::warn!("Unknown account: {account_id}");
                        write_error(&mut stdout, &format!("unknown account '{account_id}'"))?;
                    }
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn print_summary(engine: &RiskEngine, report: &RunReport, block: u16, review: u16) -> Result<()> {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {}", report.run_id);
    println!("  as_of:          {}", report.as_of.format("%Y-%m-%d %H:%M:%S"));
    println!("  accounts:       {}", report.assessments.len());
    println!("  rejected:       {}", report.rejected.len());
    println!("  rings:          {}", report.rings.len());
    println!("  avg score:      {:.1}", report.average_score());

    for rejected in &report.rejected {
        println!(
            "  ! record #{} ({}): {}",
            rejected.index,
            rejected.account_id.as_deref().unwrap_or("<no id>"),
            rejected.reason
        );
    }

    println!();
    println!("=== RINGS ===");
    if report.rings.is_empty() {
        println!("  (No rings detected)");
    }
    for ring in &report.rings {
        let shared: Vec<String> = ring
            .shared_attributes
            .iter()
            .map(|s| format!("{} x{}", s.attribute, s.account_count))
            .collect();
        println!(
            "  {} | {} members | severity {:.3} | {}",
            ring.ring_id,
            ring.size(),
            ring.severity,
            shared.join(", ")
        );
    }

    println!();
    println!("=== INVESTIGATION QUEUE ===");
    for entry in report.investigation_queue() {
        println!(
            "  {:<24} {:>4} {:<6} {}",
            entry.account_id,
            entry.score.value(),
            format!("{:?}", entry.band),
            entry.dominant_signal.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!("=== TOP THREATS ===");
    for threat in report.threat_summary() {
        println!("  {:<20} {}", threat.signal, threat.accounts);
    }

    println!();
    println!("=== POLICY SIMULATION ===");
    match engine.simulate_policy(report, block, review) {
        Ok(impact) => {
            println!("  fraud reduction:     {:.1}%", impact.projected_fraud_reduction * 100.0);
            println!("  false positive rate: {:.1}%", impact.projected_false_positive_rate * 100.0);
            println!("  blocked / reviewed:  {:.1}% / {:.1}%", impact.block_fraction * 100.0, impact.review_fraction * 100.0);
        }
        Err(e) => println!("  rejected: {e}"),
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
