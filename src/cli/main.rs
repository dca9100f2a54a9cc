/*!
A small command-line driver over the theory: reads a `.lra` fixture (see
[fixture]), guesses every literal the fixture names, propagates, and prints
any nogoods the checker derives along with its final counters (spec §6).

This binary exists to exercise the crate end-to-end; a real deployment drives
[Checker] directly from a host solver's grounder and search loop.
*/

mod fixture;
mod parse_args;

use std::process::ExitCode;

use clap::Parser;

use lra_theory::checker::Checker;
use lra_theory::host::{Host, HostEvent, SignedLiteral};
use lra_theory::types::err::ErrorKind;

use fixture::parse_fixture;
use parse_args::Cli;

/// Prints every accepted nogood to stdout and never rejects one: a CLI run
/// has no backtracking search to re-derive against.
struct CliHost;

impl Host for CliHost {
    fn add_nogood(&mut self, nogood: Vec<SignedLiteral>, _lock: bool) -> bool {
        let rendered: Vec<String> = nogood.iter().map(|lit| lit.to_string()).collect();
        println!("nogood: {{ {} }}", rendered.join(", "));
        true
    }
}

fn main() -> ExitCode {
    #[cfg(feature = "logging")]
    env_logger::init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ErrorKind> {
    let fixture = parse_fixture(&cli.path).map_err(ErrorKind::Parse)?;

    let mut checker = Checker::new(fixture.registry, cli.to_config());
    let mut host = CliHost;

    let events: Vec<HostEvent> = fixture
        .guesses
        .iter()
        .map(|&(sid, truth)| {
            if truth {
                HostEvent::AssignTrue(sid)
            } else {
                HostEvent::AssignFalse(sid)
            }
        })
        .collect();

    checker.propagate(&events, &mut host)?;

    if cli.show_lp_assignment {
        for (pid, (status, assignment)) in checker.optimize()? {
            println!("partition {pid}: {status:?}");
            let mut vars: Vec<_> = assignment.into_iter().collect();
            vars.sort_by(|a, b| a.0.cmp(&b.0));
            for (var, value) in vars {
                println!("  {var} = {value}");
            }
        }
    }

    println!("{}", checker.counters());
    Ok(())
}
