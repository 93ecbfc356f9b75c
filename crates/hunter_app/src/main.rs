use std::process::ExitCode;

mod platform;

fn main() -> anyhow::Result<ExitCode> {
    platform::run_app()
}
