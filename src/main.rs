fn main() {
    if let Err(err) = parley::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
