fn main() -> Result<(), Box<dyn std::error::Error>> {
    nexus::cli::main()
}
