use anyhow::{Context, Result};
use colloquy::game::{self, Mode, SessionConfig};
use colloquy::scenario::{catelyn_scenario, Scenario};

const USAGE: &str = "Usage: colloquy [scenario.json|builtin] [seed] [auto [script-step ...]]\n\
     \n\
     Example:\n  colloquy builtin 7 auto children back present:pants\n\
     \n\
     Logging: set RUST_LOG=debug or RUST_LOG=trace for verbose output";

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   cargo run -- builtin   # visits, selections, playthrough results
    //   RUST_LOG=debug  cargo run -- builtin   # + frontier draws and input modes
    //   RUST_LOG=trace  cargo run -- builtin   # + every navigation request
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{USAGE}");
        return Ok(());
    }

    let (scenario, config) = parse_args(&args)?;
    if config.mode == Mode::Interactive {
        println!("Talking with {} NPC(s)", scenario.npcs.len());
        if let Some(seed) = config.seed {
            println!("  Seed : {seed}");
        }
    }

    game::run(scenario, config)
}

fn parse_args(args: &[String]) -> Result<(Scenario, SessionConfig)> {
    let mut rest = args.iter().peekable();

    let scenario = match rest.next_if(|a| *a != "auto") {
        None => catelyn_scenario(),
        Some(name) if name == "builtin" => catelyn_scenario(),
        Some(path) => Scenario::load(path)
            .with_context(|| format!("failed to load scenario {path}\n\n{USAGE}"))?,
    };

    let mut config = SessionConfig::default();
    if let Some(seed) = rest.next_if(|a| *a != "auto") {
        config.seed = Some(
            seed.parse()
                .with_context(|| format!("seed must be a number, got '{seed}'\n\n{USAGE}"))?,
        );
    }

    match rest.next() {
        None => {}
        Some(word) if word == "auto" => {
            config.mode = Mode::Automated {
                script: rest.cloned().collect(),
            };
        }
        Some(other) => anyhow::bail!("unexpected argument '{other}'\n\n{USAGE}"),
    }

    Ok((scenario, config))
}
