use listing_search::CliError;

fn is_json_mode_args() -> bool {
    std::env::args().any(|arg| arg == "--json")
}

fn report(err: &CliError) -> ! {
    if is_json_mode_args() {
        eprintln!("{}", err.to_json());
    } else {
        eprintln!("{err}");
    }
    std::process::exit(err.code);
}

fn main() {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let parsed = match listing_search::parse_cli(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => report(&err),
    };

    if let Err(err) = listing_search::run(parsed) {
        report(&err);
    }
}
