use colored::Colorize;
use probe_scope::{client, config, sim};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let loaded = match args.get(2) {
        Some(path) => config::load_config(path),
        None => Ok(config::Config::default()),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.red());
            std::process::exit(1);
        }
    };

    let result = match args.get(1).map(String::as_str) {
        Some("traces") => client::traces::run(&config),
        Some("spikes") => client::spikes::run(&config),
        Some("sim") => sim::run(&config),
        _ => {
            println!("Usage: probe-scope <traces|spikes|sim> [config.yaml]");
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e.red());
        std::process::exit(1);
    }
}
