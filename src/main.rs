use std::process::ExitCode;

fn main() -> ExitCode {
    docatlas::cli::run()
}
