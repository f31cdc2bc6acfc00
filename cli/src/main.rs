mod args;

use args::Args;
use cellgen_lib::{Event, Grid};
use log::{info, warn};
use std::error::Error;

fn print_gen(generation: u64, grid: &Grid) {
    println!("!Generation {}", generation);
    print!("{}", grid);
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    info!(
        "Running {} with {} cell types",
        args.system.name.as_deref().unwrap_or("an unnamed cell system"),
        args.system.cell_type_count()
    );
    let generator = args.config.generator(args.system, args.grid)?;

    if !args.all {
        generator.run(args.generations)?;
        print_gen(generator.generation(), &generator.grid());
        return Ok(());
    }

    print_gen(0, &generator.grid());
    if args.generations == 0 {
        return Ok(());
    }
    let events = generator.subscribe();
    generator.play()?;
    for event in events.iter() {
        match event {
            Event::GridReplaced { generation, grid } => {
                print_gen(generation, &grid);
                if generation >= args.generations {
                    if let Err(e) = generator.stop() {
                        warn!("{}", e);
                    }
                    break;
                }
            }
            Event::Failed(error) => return Err(error.into()),
            Event::StateChanged(_) => (),
        }
    }
    generator.wait_idle();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let matches = args::command().get_matches();
    simple_logger::init_with_level(args::log_level(&matches))?;
    let args = Args::from_matches(&matches)?;
    run(args)
}
