use clap::Parser;
use rh_hash::Map;
use rh_hash::Options;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "entries", default_value_t = 100_000)]
    entries: usize,

    #[arg(short = 'c', long = "initial_capacity", default_value_t = 0)]
    initial_capacity: usize,

    #[arg(long)]
    shrinkable: bool,
}

fn main() {
    let args = Args::parse();

    let mut map: Map<u64> = Map::with_options(Options {
        initial_capacity: args.initial_capacity,
        shrinkable: args.shrinkable,
    });

    println!(
        "Filling a map of initial capacity {} with {} entries...",
        map.capacity(),
        args.entries
    );
    for i in 0..args.entries {
        map.set(format!("key_{}", i).as_bytes(), i as u64);
    }
    println!();
    map.probe_stats().print();

    println!();
    println!("Deleting every other entry...");
    for i in (0..args.entries).step_by(2) {
        map.delete(format!("key_{}", i).as_bytes());
    }
    println!();
    map.probe_stats().print();
}
