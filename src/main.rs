fn main() {
    if let Err(e) = khatpatra::run() {
        eprintln!("khatpatra: {e}");
        std::process::exit(1);
    }
}
