use std::process::ExitCode;

fn main() -> ExitCode {
    dealbot_cli::run()
}
