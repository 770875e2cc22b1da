use pragma::projects::cli::start_cli;
use pragma::runtime::with_interpreter_stack;
use saying::say;

fn main() {
    if let Err(e) = with_interpreter_stack(start_cli) {
        say!(Red "Could not start the interpreter thread: ", e.to_string());
        std::process::exit(1);
    }
}
