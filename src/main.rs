fn main() {
    if let Err(err) = influx_mapper::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
