use clap::Parser;
use eyre::Result;

use platform_tag::output::{self, OutputArgs};
use platform_tag::platform_tags::{self, compose_platform_tag, known_platform_tags, Shell};
use platform_tag::{ProbeArgs, WarnOnce};

/// Print the platform tag of the prebuilt native binaries this machine can run.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    output_args: OutputArgs,
    #[command(flatten)]
    probe: ProbeArgs,
    /// Print everything we found out about the host as JSON, not just the tag.
    #[arg(long)]
    json: bool,
    /// List every platform tag there are binaries for, and exit.
    #[arg(long, conflicts_with = "json")]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    output::init(&cli.output_args)?;

    if cli.list {
        for tag in known_platform_tags() {
            println!("{}", tag);
        }
        return Ok(());
    }

    let snapshot = cli.probe.snapshot();
    let resolved = platform_tags::resolve_host(&snapshot, &cli.probe.os_release, &Shell).await?;
    let tag = compose_platform_tag(&resolved, &WarnOnce);
    tag.check_published(&WarnOnce);

    if cli.json {
        let report = serde_json::json!({
            "host": resolved,
            "platform_tag": tag,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", tag);
    }
    Ok(())
}
