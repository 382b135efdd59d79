fn main() {
    if let Err(err) = event_advisor_lib::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
