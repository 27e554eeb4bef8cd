use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::OnceLock;

use hessian_testkit::{fixture_path as shared_fixture_path, target_dir as workspace_target_dir};

static HESSIAN_BIN: OnceLock<PathBuf> = OnceLock::new();

/// Fixture path as a command-line argument.
pub(crate) fn fixture_arg(name: &str) -> String {
	shared_fixture_path(name).display().to_string()
}

pub(crate) fn run_hessian(args: &[&str]) -> Output {
	Command::new(hessian_bin()).args(args).output().expect("hessian command executes")
}

pub(crate) fn run_hessian_json(args: &[&str]) -> serde_json::Value {
	let output = run_hessian(args);
	assert!(
		output.status.success(),
		"hessian command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

/// Run a command that must fail and return its stderr.
pub(crate) fn run_hessian_err(args: &[&str]) -> String {
	let output = run_hessian(args);
	assert!(!output.status.success(), "hessian {args:?} should fail");
	String::from_utf8_lossy(&output.stderr).into_owned()
}

fn hessian_bin() -> &'static PathBuf {
	HESSIAN_BIN.get_or_init(resolve_hessian_bin)
}

fn resolve_hessian_bin() -> PathBuf {
	if let Ok(path) = std::env::var("CARGO_BIN_EXE_hessian") {
		return PathBuf::from(path);
	}

	let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
	let target_dir = workspace_target_dir();

	let mut bin = target_dir.join("debug");
	bin.push(if cfg!(windows) { "hessian.exe" } else { "hessian" });

	let status = Command::new("cargo")
		.current_dir(&manifest_dir)
		.args(["build", "--quiet", "--bin", "hessian"])
		.status()
		.expect("cargo build executes");
	assert!(status.success(), "failed to build hessian binary at {}", bin.display());

	bin
}
