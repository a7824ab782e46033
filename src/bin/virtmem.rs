use std::process;

use virtmem::config::{Config, OutputFormat};
use virtmem::error::Result;
use virtmem::pager::replacer::Policy;
use virtmem::simulation::Simulation;
use virtmem::value_err;
use virtmem::workload::Program;

fn main() {
    let args = cli().get_matches();
    if let Err(err) = run(&args) {
        eprintln!("virtmem: {}", err);
        process::exit(1);
    }
}

fn arg<'a>(args: &'a clap::ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name).ok_or_else(|| value_err!("missing argument <{}>", name))
}

fn count(args: &clap::ArgMatches, name: &str) -> Result<usize> {
    args.get_one::<usize>(name).copied().ok_or_else(|| value_err!("missing argument <{}>", name))
}

fn cli() -> clap::Command {
    clap::command!()
        .about("Demand paging simulator")
        .arg(
            clap::Arg::new("npages")
                .help("Number of virtual pages")
                .required(true)
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("nframes")
                .help("Number of physical frames")
                .required(true)
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(clap::Arg::new("policy").help("Page replacement policy: rand|fifo|custom").required(true))
        .arg(clap::Arg::new("program").help("Workload: sort|scan|focus").required(true))
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file path")
                .default_value(""),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("Counter format, overrides the configuration: csv|summary"),
        )
}

fn simulation(args: &clap::ArgMatches) -> Result<Simulation> {
    let policy: Policy = arg(args, "policy")?.parse()?;
    let program: Program = arg(args, "program")?.parse()?;
    let npages = count(args, "npages")?;
    let nframes = count(args, "nframes")?;
    Ok(Simulation { npages, nframes, policy, program })
}

fn run(args: &clap::ArgMatches) -> Result<()> {
    // reject bad names before anything touches the disk
    let sim = simulation(args)?;

    let mut cfg = Config::new(arg(args, "config")?)?;
    if let Some(output) = args.get_one::<String>("output") {
        cfg.output = output.parse()?;
    }
    let loglevel = cfg.log_level.parse::<simplelog::LevelFilter>()?;
    let logconfig = simplelog::ConfigBuilder::new().build();
    simplelog::TermLogger::init(
        loglevel,
        logconfig,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let report = sim.run(&cfg)?;
    match cfg.output {
        OutputFormat::Csv => println!("{}", report.stats.csv()),
        OutputFormat::Summary => println!("{}", report.stats),
    }
    Ok(())
}
