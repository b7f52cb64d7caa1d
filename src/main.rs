fn main() {
    if let Err(err) = blueprint_events::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
