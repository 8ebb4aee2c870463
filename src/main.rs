use std::process::ExitCode;

fn main() -> ExitCode {
    match neu_grades::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
