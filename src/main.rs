use logsim::*;
use logsim::wavedump::Wavedump;

use anyhow::Context;
use clap::Parser;
use log::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    filename: String,

    /// Number of cycles to simulate.
    #[arg(short, long, default_value_t = 10)]
    cycles: usize,

    /// Override a switch before running, as `NAME=0` or `NAME=1`.
    #[arg(short, long)]
    switch: Vec<String>,

    /// Write the monitored signals to this VCD file.
    #[arg(long)]
    vcd: Option<String>,

    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug)?;

    let mut names = Names::new();
    let mut circuit = Circuit::new(&mut names);
    {
        let scanner = Scanner::open(&args.filename, &mut names).with_context(|| format!("Could not read {}", args.filename))?;
        let mut parser = logsim::Parser::new(scanner, &mut circuit);
        if !parser.parse() {
            for diagnostic in parser.diagnostics() {
                eprintln!("{}: {diagnostic}", args.filename);
                if let Some(underlined) = parser.source_info().underline(diagnostic.span) {
                    eprintln!("{underlined}");
                }
            }
            eprintln!("Circuit has {} errors.", parser.error_count());
            std::process::exit(1);
        }
    }

    circuit.cold_startup();
    circuit.reset_monitors();
    for switch in &args.switch {
        let (id, value) = parse_switch(&names, &circuit, switch)?;
        circuit.set_switch(id, value);
    }

    let result = circuit.continue_run(args.cycles);
    print_traces(&names, &circuit);

    match result {
        CycleResult::Ok => (),
        CycleResult::Oscillating => {
            eprintln!("Error: the circuit is oscillating");
            for feedback_loop in circuit.network().feedback_loops(circuit.devices()) {
                let loop_names: Vec<&str> = feedback_loop.iter().filter_map(|id| names.resolve(*id)).collect();
                eprintln!("    feedback loop: {}", loop_names.join(" "));
            }
        },
        CycleResult::InputsUnconnected => {
            eprintln!("Error: the network has unconnected inputs");
        },
    }

    if let Some(vcd_filename) = &args.vcd {
        let mut vcd = String::new();
        Wavedump::new(&names, &circuit).write(&mut vcd)?;
        std::fs::write(vcd_filename, vcd).with_context(|| format!("Could not write {vcd_filename}"))?;
        info!("Wrote {vcd_filename}");
    }

    if !result.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_switch(names: &Names, circuit: &Circuit, switch: &str) -> anyhow::Result<(DeviceId, Signal)> {
    let (name, value) = switch.split_once('=').with_context(|| format!("Expected NAME=0 or NAME=1, found {switch}"))?;
    let value = match value {
        "0" => Signal::Low,
        "1" => Signal::High,
        _ => anyhow::bail!("Switch value must be 0 or 1, found {value}"),
    };
    let id = names
        .query(name)
        .filter(|id| circuit.get_device(*id).map(|device| device.kind() == DeviceKind::Switch).unwrap_or(false))
        .with_context(|| format!("No switch named {name}"))?;
    Ok((id, value))
}

fn print_traces(names: &Names, circuit: &Circuit) {
    let traces: Vec<(String, &Vec<Sample>)> = circuit
        .monitors_dictionary()
        .iter()
        .filter_map(|((id, port), history)| {
            let name = circuit.devices().signal_name(names, *id, *port)?;
            Some((name, history))
        })
        .collect();

    let width = traces.iter().map(|(name, _history)| name.len()).max().unwrap_or(0);
    for (name, history) in traces {
        let waveform: String = history
            .iter()
            .map(|sample| match sample {
                Sample::Blank => ' ',
                Sample::Low => '_',
                Sample::High => '-',
            })
            .collect();
        println!("{name:>width$} | {waveform}");
    }
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    use chrono::{DateTime, Utc};

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let level = std::env::var("LEVEL").unwrap_or_default();

    if debug || level == "DEBUG" {
        dispatch = dispatch.level(log::LevelFilter::Debug);
    } else {
        dispatch = dispatch.level(log::LevelFilter::Error);
    }

    dispatch.apply()?;
    Ok(())
}
