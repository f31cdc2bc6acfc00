use cellgen_lib::{
    rules::life_like, CellSystem, Environment, Error, Event, Generator, GeneratorConfig, Grid,
    RunState,
};
use rand::{rngs::StdRng, SeedableRng};
use std::{error::Error as StdError, time::Duration};

const GLIDER: &str = "\
.o......
..o.....
ooo.....
........
........
........";

#[test]
fn glider() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = GLIDER.parse()?;
    let mut env = Environment::new(&CellSystem::conway(), grid.set_wrap(true))?;
    for _ in 0..4 {
        let next = env.next_grid();
        env = env.rebind(next)?;
    }
    let expected: Grid = "\
........
..o.....
...o....
.ooo....
........
........"
        .parse()?;
    assert_eq!(env.grid().cells(), expected.cells());
    assert!(env.grid().is_wrapping());
    Ok(())
}

#[test]
fn glider_one_step() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = GLIDER.parse()?;
    let generator = GeneratorConfig::new().generator(CellSystem::conway(), grid)?;
    generator.run(1)?;
    let expected: Grid = "\
........
o.o.....
.oo.....
.o......
........
........"
        .parse()?;
    assert_eq!(generator.generation(), 1);
    assert_eq!(generator.grid(), expected);
    Ok(())
}

#[test]
fn glider_wraps_around() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = GLIDER.parse()?;
    let generator = GeneratorConfig::new().generator(CellSystem::conway(), grid.clone().set_wrap(true))?;
    // After 4 generations a glider moves one cell diagonally,
    // so after 4 · 24 generations it is back on a 8x6 torus.
    generator.run(4 * 24)?;
    assert_eq!(generator.generation(), 96);
    assert_eq!(generator.grid().cells(), grid.cells());
    Ok(())
}

#[test]
fn parallel_matches_serial() -> Result<(), Box<dyn StdError>> {
    let mut rng = StdRng::seed_from_u64(2024);
    let grid = Grid::random(67, 41, 0.35, 2, &mut rng).set_wrap(true);
    let config = GeneratorConfig::new().set_threads(4).set_split_threshold(90);
    let generator = config.generator(CellSystem::conway(), grid.clone())?;

    let mut env = Environment::new(&CellSystem::conway(), grid)?;
    for generation in 1..=5 {
        generator.run(1)?;
        let next = env.next_grid();
        env = env.rebind(next)?;
        assert_eq!(generator.generation(), generation);
        assert_eq!(&generator.grid(), env.grid());
    }
    Ok(())
}

#[test]
fn grid_size_is_preserved() -> Result<(), Box<dyn StdError>> {
    let mut rng = StdRng::seed_from_u64(1);
    for &(width, height) in &[(1, 1), (1, 30), (30, 1), (17, 23)] {
        let grid = Grid::random(width, height, 0.5, 2, &mut rng);
        let config = GeneratorConfig::new().set_split_threshold(0);
        let generator = config.generator(CellSystem::conway(), grid)?;
        generator.run(3)?;
        let grid = generator.grid();
        assert_eq!((grid.width(), grid.height()), (width, height));
        assert_eq!(grid.len(), width * height);
    }
    Ok(())
}

#[test]
fn generations_rule() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = "....\n.oo.\n....\n....".parse()?;
    let generator = GeneratorConfig::new().generator(life_like("B2/S/C3")?, grid)?;
    generator.run(1)?;
    assert_eq!(generator.grid().to_string(), ".oo.\n.AA.\n.oo.\n....\n");
    generator.run(1)?;
    assert_eq!(generator.grid().census()[2], 4);
    Ok(())
}

#[test]
fn reset() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = GLIDER.parse()?;
    let generator = GeneratorConfig::new().generator(CellSystem::conway(), grid.clone())?;
    generator.run(3)?;
    assert_ne!(generator.grid(), grid);
    generator.reset()?;
    assert_eq!(generator.generation(), 0);
    assert_eq!(generator.grid(), grid);
    generator.run(2)?;
    assert_eq!(generator.generation(), 2);
    Ok(())
}

#[test]
fn events() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = GLIDER.parse()?;
    let generator = GeneratorConfig::new().generator(CellSystem::conway(), grid)?;
    let events = generator.subscribe();
    generator.step()?;
    generator.wait_idle();

    assert_eq!(events.recv()?, Event::StateChanged(RunState::Stepping));
    match events.recv()? {
        Event::GridReplaced { generation, grid } => {
            assert_eq!(generation, 1);
            assert_eq!(grid, generator.grid());
        }
        event => panic!("unexpected event: {:?}", event),
    }
    assert_eq!(events.recv()?, Event::StateChanged(RunState::Idle));

    generator.reset()?;
    assert!(matches!(
        events.recv()?,
        Event::GridReplaced { generation: 0, .. }
    ));
    Ok(())
}

#[test]
fn play_and_stop() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = GLIDER.parse()?;
    let config = GeneratorConfig::new().set_speed(-5);
    let generator = config.generator(CellSystem::conway(), grid.set_wrap(true))?;
    assert_eq!(generator.speed(), -5);
    let events = generator.subscribe();
    generator.play()?;
    assert_eq!(generator.state(), RunState::Playing);
    assert!(!generator.wait_idle_timeout(Duration::from_millis(1)));

    for event in events.iter() {
        if let Event::GridReplaced { generation, .. } = event {
            if generation >= 3 {
                break;
            }
        }
    }
    generator.stop()?;
    assert!(generator.wait_idle_timeout(Duration::from_secs(10)));
    assert_eq!(generator.state(), RunState::Idle);
    let generation = generator.generation();
    assert!(generation >= 3);

    // Nothing happens after stopping.
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(generator.generation(), generation);
    Ok(())
}

#[test]
fn slow_play_stops_promptly() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = GLIDER.parse()?;
    let generator = GeneratorConfig::new()
        .set_speed(60_000)
        .generator(CellSystem::conway(), grid)?;
    generator.play()?;
    std::thread::sleep(Duration::from_millis(50));
    generator.stop()?;
    assert!(generator.wait_idle_timeout(Duration::from_secs(10)));
    assert_eq!(generator.generation(), 1);
    Ok(())
}

#[test]
fn illegal_states() -> Result<(), Box<dyn StdError>> {
    let generator = GeneratorConfig::new()
        .set_speed(60_000)
        .generator(CellSystem::conway(), Grid::new(8, 8))?;
    assert_eq!(
        generator.stop(),
        Err(Error::IllegalState(RunState::Idle, RunState::Playing))
    );
    generator.play()?;
    assert_eq!(
        generator.play(),
        Err(Error::IllegalState(RunState::Playing, RunState::Idle))
    );
    generator.stop()?;
    let state = generator.state();
    assert!(state == RunState::Stopping || state == RunState::Idle);
    generator.wait_idle();
    generator.step()?;
    generator.wait_idle();
    generator.set_speed(0);
    assert_eq!(generator.speed(), 0);
    Ok(())
}

#[test]
fn invalid_initial_grid() -> Result<(), Box<dyn StdError>> {
    let grid: Grid = "..\n.B".parse()?;
    let result = GeneratorConfig::new().generator(CellSystem::conway(), grid);
    assert_eq!(result.err(), Some(Error::InvalidCellType(1, 1, 3)));
    Ok(())
}

/// Checks that the grid is the initial grid advanced by `generator.generation()`
/// serial steps.
fn assert_in_order(generator: &Generator, initial: &Grid, round: usize) -> Result<(), Box<dyn StdError>> {
    let mut env = Environment::new(generator.system(), initial.clone())?;
    for _ in 0..generator.generation() {
        let next = env.next_grid();
        env = env.rebind(next)?;
    }
    assert_eq!(
        &generator.grid(),
        env.grid(),
        "round {}: generation {}",
        round,
        generator.generation()
    );
    Ok(())
}

#[test]
fn restarting_keeps_generations_in_order() -> Result<(), Box<dyn StdError>> {
    let mut rng = StdRng::seed_from_u64(300);
    let config = GeneratorConfig::new().set_threads(2).set_speed(0);
    for round in 0..100 {
        let grid = Grid::random(24, 24, 0.4, 2, &mut rng).set_wrap(true);
        let generator = config.generator(CellSystem::conway(), grid.clone())?;

        generator.step()?;
        generator.wait_idle();
        generator.play()?;
        std::thread::sleep(Duration::from_millis(3));
        generator.stop()?;
        generator.wait_idle();
        assert_in_order(&generator, &grid, round)?;

        generator.play()?;
        std::thread::sleep(Duration::from_millis(1));
        generator.stop()?;
        generator.wait_idle();
        generator.step()?;
        generator.wait_idle();
        assert_in_order(&generator, &grid, round)?;
    }
    Ok(())
}
