use std::process::ExitCode;

fn main() -> ExitCode {
    stowaway_cli::run()
}
