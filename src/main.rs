fn main() {
    std::process::exit(azlin_cli::run());
}
