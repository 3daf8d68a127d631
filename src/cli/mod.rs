//! Command-line front end
//!
//! Each subcommand maps onto one facade call; results are printed to stdout
//! as pretty JSON and lifecycle events are forwarded to the log.

pub mod args;

pub use args::{Cli, Commands, CommonArgs};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, trace};

use crate::config::WrapperConfig;
use crate::duplicity::{Duplicity, Operation};
use crate::options::{
    CommonOptions, FullOptions, IncrOptions, ListCurrentFilesOptions, RemoveAllButNFullOptions,
    RemoveOlderThanOptions, VerifyOptions,
};
use crate::subprocess::{CommandEvent, EventSink};

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = WrapperConfig::load(cli.config.as_deref())?;
    if let Some(executable) = cli.executable {
        config.executable = executable;
    }
    debug!("Using duplicity at {}", config.executable);

    let duplicity = Duplicity::new(Some(&config.executable)).await?;

    match cli.command {
        Commands::Version => print_json(&serde_json::json!({
            "executable": duplicity.executable(),
            "version": duplicity.version(),
        })),
        Commands::Full {
            target,
            cwd,
            common,
        } => {
            let mut opts = FullOptions::new(&common.url, cwd, target);
            opts.common = common_options(&common, &config);
            execute(&duplicity, opts).await
        }
        Commands::Incr {
            target,
            cwd,
            full_if_older_than,
            common,
        } => {
            let mut opts = IncrOptions::new(&common.url, cwd, target);
            opts.common = common_options(&common, &config);
            opts.full_if_older_than = full_if_older_than;
            execute(&duplicity, opts).await
        }
        Commands::Verify {
            target,
            cwd,
            time,
            compare_data,
            file_to_restore,
            common,
        } => {
            let mut opts = VerifyOptions::new(&common.url, cwd, target).with_compare_data(compare_data);
            opts.common = common_options(&common, &config);
            opts.time = time;
            opts.file_to_restore = file_to_restore;
            execute(&duplicity, opts).await
        }
        Commands::ListCurrentFiles { time, common } => {
            let mut opts = ListCurrentFilesOptions::new(&common.url);
            opts.common = common_options(&common, &config);
            opts.time = time;
            execute(&duplicity, opts).await
        }
        Commands::RemoveOlderThan {
            time,
            force,
            common,
        } => {
            let mut opts = RemoveOlderThanOptions::new(&common.url, time).with_force(force);
            opts.common = common_options(&common, &config);
            execute(&duplicity, opts).await
        }
        Commands::RemoveAllButNFull {
            count,
            force,
            common,
        } => {
            let mut opts = RemoveAllButNFullOptions::new(&common.url, count).with_force(force);
            opts.common = common_options(&common, &config);
            execute(&duplicity, opts).await
        }
    }
}

/// Request fields from the command line, completed from the configuration.
fn common_options(common: &CommonArgs, config: &WrapperConfig) -> CommonOptions {
    let mut options = common.to_options();
    config.apply_defaults(&mut options);
    options
}

async fn execute<O>(duplicity: &Duplicity, op: O) -> Result<()>
where
    O: Operation,
    O::Output: Serialize,
{
    let (sink, rx) = EventSink::channel();
    let forwarder = tokio::spawn(forward_events(rx));

    let result = duplicity.execute(&op, Some(&sink)).await;
    drop(sink);
    if let Err(e) = forwarder.await {
        debug!("event forwarder stopped: {}", e);
    }

    let output = result?;
    print_json(&output)
}

async fn forward_events(mut rx: UnboundedReceiver<CommandEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            CommandEvent::Command(line) => debug!("command: {}", line),
            CommandEvent::Stdout(text) => trace!("stdout: {} bytes", text.len()),
            CommandEvent::Stderr(text) => trace!("stderr: {} bytes", text.len()),
            CommandEvent::Closed => trace!("process closed"),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", rendered);
    Ok(())
}
