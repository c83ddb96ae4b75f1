fn main() -> Result<(), Box<dyn std::error::Error>> {
    meterplay::runtime::run()
}
