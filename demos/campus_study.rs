//! Runs the campus study and prints the report tables.
//!
//! ```text
//! cargo run --example campus_study [network.json study.json]
//! ```
//!
//! Without arguments the built-in campus network and its standard study
//! (base, heatwave, Feeder A outage) are used. Set `RUST_LOG=gridflow=debug`
//! to follow topology resolution and Newton iterations.

use std::env;
use std::error::Error;
use std::io;

use gridflow::prelude::*;
use gridflow::testcases::{campus_network, standard_study};
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (net, study) = match args.as_slice() {
        [network, study] => (load_network_json(network)?, load_study_json(study)?),
        [] => (campus_network()?, standard_study()),
        _ => return Err("usage: campus_study [network.json study.json]".into()),
    };
    info!(
        network = %net.name,
        buses = net.bus_count(),
        loads = net.loads().len(),
        demand_mw = net.total_demand_mva().re,
        "running study"
    );

    let engine = ScenarioEngine::from_study(net, study)?;
    for spec in engine.scenarios() {
        info!(network = %engine.base().name, scenario = %spec.name, "planned");
    }
    let results = engine.run()?;

    println!("{}", scenario_table(&results));
    for res in &results {
        println!("\n## {} ({})", res.scenario, res.status);
        if let Some(err) = res.first_error() {
            println!("error: {err}");
            continue;
        }
        println!("{}", bus_table(res));
        println!("{}", branch_table(res));
        for v in &res.violations {
            println!(
                "voltage violation at {}: {:.4} pu outside [{:.2}, {:.2}]",
                v.name, v.vm_pu, v.min_vm_pu, v.max_vm_pu
            );
        }
    }
    Ok(())
}
