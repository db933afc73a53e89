fn main() {
    ctox::cli::run();
}
