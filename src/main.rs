//! egit binary entry point.

fn main() {
    if let Err(e) = editor_git::cli::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
