//! Replay a YAML block script through the interpreter and print every emitted delta.

use anyhow::Result;
use clap::Parser;
use commonware_codec::Encode;
use commonware_utils::hex;
use strata_execution::replay::{run, Config};
use strata_types::Output;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay ledger transactions against an in-memory store")]
struct Args {
    /// Path to the YAML replay script.
    #[arg(short, long)]
    config: String,

    /// Overrides the script's `log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    let config = config.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let report = run(&config)?;
    for (height, block) in report.blocks.iter().enumerate() {
        println!("block {height} @ {}", block.timestamp);
        for output in &block.outputs {
            let tx = output.transaction();
            match output {
                Output::Accepted { deltas, .. } => {
                    println!(
                        "  accepted {} from {}",
                        tx.instruction.kind(),
                        hex(tx.sender.as_ref())
                    );
                    for delta in deltas {
                        println!("    {delta}");
                        println!("    0x{}", hex(&delta.encode()));
                    }
                }
                Output::Rejected(_) => {
                    println!(
                        "  rejected {} from {}",
                        tx.instruction.kind(),
                        hex(tx.sender.as_ref())
                    );
                }
            }
        }
    }

    println!("balances:");
    for (wallet, amount) in report.state.balances() {
        println!("  {} = {amount}", hex(wallet.as_ref()));
    }
    println!("swaps:");
    for swap in report.state.swaps() {
        println!(
            "  {} -> {} amount={} expiration={} hashlock={}",
            hex(swap.sender.as_ref()),
            hex(swap.receiver.as_ref()),
            swap.amount,
            swap.expiration,
            swap.hashlock,
        );
    }
    Ok(())
}
