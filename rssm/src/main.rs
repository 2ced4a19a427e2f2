//! rssm - run shell commands and copy files on EC2 instances through AWS
//! Systems Manager, then wait for and report the outcome.

#![forbid(unsafe_code)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::RunContext;
use rssm_common::{
    InvocationFailed, LogConfig, Settings, Target, classify, classify_anyhow, error_json,
    init_logging, render_error, render_report, report_json,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "rssm")]
#[command(author, version, about = "Run commands and copy files on EC2 instances via AWS SSM")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// AWS region [env: RSSM_REGION, default: ap-southeast-1]
    #[arg(long, global = true)]
    region: Option<String>,

    /// AWS named profile [env: RSSM_PROFILE]
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Print the final report (or error) as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a shell command on an instance
    Exec {
        /// EC2 instance ID
        #[arg(short, long)]
        target: String,

        /// Command to execute
        #[arg(short, long)]
        command: String,

        /// Prefix the command with sudo
        #[arg(long)]
        sudo: bool,

        /// Return right after submission
        #[arg(long)]
        no_wait: bool,
    },

    /// Copy a local file to a path on an instance
    Copy {
        /// EC2 instance ID
        #[arg(short, long)]
        target: String,

        /// Local file to send
        #[arg(short, long)]
        local_file: PathBuf,

        /// Destination path on the instance
        #[arg(short, long)]
        remote_file: String,

        /// Create the directory and write the file with sudo
        #[arg(long)]
        sudo: bool,

        /// Return right after submission
        #[arg(long)]
        no_wait: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Help and version are not failures; every usage error is.
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let json = cli.json;

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_failure(&err, json);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let (settings, env_errors) = Settings::from_env();
    let settings = settings.with_region(cli.region)?.with_profile(cli.profile);

    let mut log_config = LogConfig::from_settings(&settings).with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = init_logging(&log_config)?;

    for err in &env_errors {
        warn!("{err}; using default");
    }
    debug!(
        region = %settings.region.value,
        region_source = %settings.region.describe(),
        aws_bin = %settings.aws_bin.value,
        "Effective settings"
    );

    let ctx = RunContext::from_settings(&settings, cli.json);
    let mut stdout = std::io::stdout().lock();

    let report = match cli.command {
        Commands::Exec {
            target,
            command,
            sudo,
            no_wait,
        } => {
            ctx.exec(&mut stdout, &Target::new(target), &command, sudo, !no_wait)
                .await?
        }
        Commands::Copy {
            target,
            local_file,
            remote_file,
            sudo,
            no_wait,
        } => {
            ctx.copy(
                &mut stdout,
                &Target::new(target),
                &local_file,
                &remote_file,
                sudo,
                !no_wait,
            )
            .await?
        }
    };

    let failed = InvocationFailed::from_report(&report);

    if !cli.json {
        render_report(&mut stdout, &report)?;
        stdout.flush()?;
        return match failed {
            Some(failed) => Err(failed.into()),
            None => Ok(ExitCode::SUCCESS),
        };
    }

    // JSON mode prints a single document: the report, with the error inside.
    let failure = failed.as_ref().map(|f| (f.to_string(), classify(f)));
    if let Some((_, classification)) = &failure {
        debug!(error = %classification, "Run failed");
    }
    let body = report_json(
        &report,
        failure.as_ref().map(|(context, c)| (context.as_str(), c)),
    )?;
    serde_json::to_writer_pretty(&mut stdout, &body)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(if failed.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Classify the failure and print it: stderr in text mode, stdout in JSON mode.
fn report_failure(err: &anyhow::Error, json: bool) {
    let classification = classify_anyhow(err);
    let context = err.to_string();
    debug!(error = %classification, "Run failed");

    // Nothing else can be done if the terminal is gone.
    if json {
        let mut stdout = std::io::stdout().lock();
        let _ = serde_json::to_writer_pretty(&mut stdout, &error_json(&context, &classification));
        let _ = writeln!(stdout);
    } else {
        let _ = render_error(&mut std::io::stderr().lock(), &context, &classification);
    }
}
