#![allow(missing_docs)]

mod cmd;
mod error;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hessian", version, about = "Inspect, build and exchange Hessian 2 payloads")]
struct Cli {
	/// Raise log verbosity (-v debug, -vv trace); `RUST_LOG` wins when set.
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// List the types declared in a schema file.
	Schema(cmd::schema::Args),
	/// Decode a payload file and print its value graph.
	Decode(cmd::decode::Args),
	/// Build a value from JSON and encode it.
	Encode(cmd::encode::Args),
	/// Run one SayHello request/response exchange in-process.
	Hello(cmd::hello::Args),
}

fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	if let Err(err) = run(cli.command) {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run(command: Commands) -> error::Result<()> {
	match command {
		Commands::Schema(args) => cmd::schema::run(args),
		Commands::Decode(args) => cmd::decode::run(args),
		Commands::Encode(args) => cmd::encode::run(args),
		Commands::Hello(args) => cmd::hello::run(args),
	}
}

fn init_tracing(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
