use virtmem::config::{Config, OutputFormat};
use virtmem::error::Result;
use virtmem::pager::replacer::Policy;
use virtmem::simulation::Simulation;
use virtmem::storage::StorageType;
use virtmem::workload::Program;

fn config() -> Config {
    Config {
        log_level: "warn".into(),
        frame_size: 128,
        storage_type: StorageType::Memory,
        disk_path: String::new(),
        output: OutputFormat::Csv,
        seed: Some(5),
    }
}

#[test]
fn checksums_do_not_depend_on_paging() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let cfg = config();
    for program in [Program::Scan, Program::Sort, Program::Focus] {
        let identity = Simulation { npages: 8, nframes: 8, policy: Policy::Fifo, program };
        let expected = identity.run(&cfg)?;
        assert_eq!(8, expected.stats.faults);
        assert_eq!(0, expected.stats.writes);

        for policy in [Policy::Random, Policy::Fifo, Policy::Custom] {
            for nframes in [1, 3, 7] {
                let sim = Simulation { npages: 8, nframes, policy, program };
                let report = sim.run(&cfg)?;
                assert_eq!(expected.checksum, report.checksum, "{:?} {:?} {}", program, policy, nframes);
                assert!(report.stats.faults > 8);
                assert!(report.stats.writes <= report.stats.reads);
            }
        }
    }
    Ok(())
}

#[test]
fn custom_writes_back_no_more_than_fifo_on_scan() -> Result<()> {
    let cfg = config();
    let run = |policy| Simulation { npages: 8, nframes: 3, policy, program: Program::Scan }.run(&cfg);
    let fifo = run(Policy::Fifo)?;
    let custom = run(Policy::Custom)?;
    assert!(custom.stats.writes <= fifo.stats.writes);
    Ok(())
}
