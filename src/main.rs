fn main() {
    if let Err(err) = stock_ledger::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
