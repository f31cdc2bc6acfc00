//! Running a cell system on a grid, generation by generation.
//!
//! A [`Generator`] owns the current grid and moves through the
//! [`RunState`]s:
//!
//! * `Idle → Stepping → Idle` for a single [`step`](Generator::step);
//! * `Idle → Playing → Stopping → Idle` for [`play`](Generator::play)
//!   and [`stop`](Generator::stop).
//!
//! Each generation is computed on a thread pool by splitting the grid into
//! quarters, recursively, until the pieces are small enough. The finished
//! grid is handed over to a single coordinator thread, which publishes it,
//! increments the generation counter, and notifies the subscribers.

use crate::{
    config::GeneratorConfig, environment::Environment, error::Error, grid::Grid,
    system::CellSystem,
};
use log::{debug, trace, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicI64, Ordering},
        mpsc::{self, Receiver, Sender, SyncSender},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// The state of a [`Generator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Nothing is being computed.
    Idle,
    /// A single generation is being computed.
    Stepping,
    /// Generations are computed one after another.
    Playing,
    /// Playing, but it will stop after the current generation.
    Stopping,
}

/// Something that happened to a [`Generator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The grid was replaced, either by a new generation or by a reset.
    GridReplaced {
        /// The generation of the new grid.
        generation: u64,
        /// The new grid.
        grid: Grid,
    },
    /// The state changed.
    StateChanged(RunState),
    /// A generation could not be computed. Nothing was published.
    Failed(Error),
}

/// State observed by the users of a generator.
struct Shared {
    state: RunState,
    /// Incremented by every step or play.
    run: u64,
    generation: u64,
    grid: Grid,
    failure: Option<Error>,
    listeners: Vec<Sender<Event>>,
}

impl Shared {
    fn emit(&mut self, event: Event) {
        self.listeners
            .retain(|listener| listener.send(event.clone()).is_ok());
    }

    fn set_state(&mut self, state: RunState) {
        debug!("State: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.emit(Event::StateChanged(state));
    }
}

/// Messages to the coordinator.
///
/// Every message except `Shutdown` carries a rendezvous channel,
/// which the coordinator uses to acknowledge that it has processed it.
enum Message {
    Publish { grid: Grid, ack: SyncSender<()> },
    Fail { error: Error, ack: SyncSender<()> },
    Halt { ack: SyncSender<()> },
    Shutdown,
}

struct Inner {
    shared: Mutex<Shared>,
    /// Notified whenever the state changes.
    changed: Condvar,
    speed: AtomicI64,
    environment: Environment,
    original: Grid,
    pool: ThreadPool,
    split_threshold: u64,
    coordinator: Mutex<Sender<Message>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, message: Message) -> Result<(), Error> {
        self.coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(message)
            .map_err(|_| Error::CoordinatorGone)
    }

    /// Sends a message to the coordinator, and waits until it is processed.
    fn hand_over<F: FnOnce(SyncSender<()>) -> Message>(&self, message: F) -> Result<(), Error> {
        let (ack, done) = mpsc::sync_channel(0);
        self.send(message(ack))?;
        done.recv().map_err(|_| Error::CoordinatorGone)
    }

    /// Computes the next generation on the thread pool.
    fn next_grid(&self, source: Grid) -> Grid {
        let (width, height) = (source.width(), source.height());
        let wrap = source.is_wrapping();
        let environment = self.environment.rebind_unchecked(source);
        let factor = environment.computation_factor() as u64;
        let mut cells = vec![0; width * height];
        if width > 0 {
            let rows: Vec<&mut [u8]> = cells.chunks_mut(width).collect();
            let threshold = self.split_threshold;
            self.pool
                .install(|| quarter(&environment, 0, 0, rows, factor, threshold));
        }
        Grid::from_parts(width, height, wrap, cells)
    }

    /// Waits between two generations of the play `run`.
    ///
    /// Returns whether to go on with the next generation.
    fn throttle(&self, run: u64, start: Instant) -> Result<bool, Error> {
        let period = Duration::from_millis(self.speed.load(Ordering::Relaxed).unsigned_abs());
        let deadline = start + period;
        let mut shared = self.lock();
        while shared.run == run && shared.state == RunState::Playing {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            shared = self
                .changed
                .wait_timeout(shared, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if shared.run != run {
            // Stopped after the last generation, and started again since.
            return Ok(false);
        }
        match shared.state {
            RunState::Playing => Ok(true),
            RunState::Stopping => {
                drop(shared);
                self.hand_over(|ack| Message::Halt { ack })?;
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}

/// Computes the next cell types of a rectangle whose upper left corner is
/// `(x0, y0)`, writing `rows[j][i]` for the cell `(x0 + i, y0 + j)`.
fn quarter(
    environment: &Environment,
    x0: usize,
    y0: usize,
    mut rows: Vec<&mut [u8]>,
    factor: u64,
    threshold: u64,
) {
    let height = rows.len();
    let width = rows.first().map_or(0, |row| row.len());
    if width == 0 || height == 0 {
        return;
    }
    if (width * height) as u64 * factor <= threshold || (width == 1 && height == 1) {
        environment.copy().compute_rows(x0, y0, &mut rows);
        return;
    }

    let (mid_x, mid_y) = (width / 2, height / 2);
    trace!("Splitting {}x{} at ({}, {})", width, height, x0, y0);
    let bottom = rows.split_off(mid_y);
    let (top_left, top_right) = split_columns(rows, mid_x);
    let (bottom_left, bottom_right) = split_columns(bottom, mid_x);
    rayon::join(
        || {
            rayon::join(
                || quarter(environment, x0, y0, top_left, factor, threshold),
                || quarter(environment, x0 + mid_x, y0, top_right, factor, threshold),
            )
        },
        || {
            rayon::join(
                || quarter(environment, x0, y0 + mid_y, bottom_left, factor, threshold),
                || quarter(environment, x0 + mid_x, y0 + mid_y, bottom_right, factor, threshold),
            )
        },
    );
}

fn split_columns(rows: Vec<&mut [u8]>, mid: usize) -> (Vec<&mut [u8]>, Vec<&mut [u8]>) {
    rows.into_iter().map(|row| row.split_at_mut(mid)).unzip()
}

/// The coordinator thread. The only place where generations are published.
fn coordinate(inner: &Inner, messages: Receiver<Message>) {
    for message in messages {
        let ack = {
            let mut shared = inner.lock();
            match message {
                Message::Publish { grid, ack } => {
                    shared.generation += 1;
                    shared.grid = grid.clone();
                    let generation = shared.generation;
                    debug!("Published generation {}", generation);
                    shared.emit(Event::GridReplaced { generation, grid });
                    if shared.state != RunState::Playing {
                        shared.set_state(RunState::Idle);
                    }
                    ack
                }
                Message::Fail { error, ack } => {
                    shared.failure = Some(error.clone());
                    shared.emit(Event::Failed(error));
                    shared.set_state(RunState::Idle);
                    ack
                }
                Message::Halt { ack } => {
                    if shared.state == RunState::Stopping {
                        shared.set_state(RunState::Idle);
                    }
                    ack
                }
                Message::Shutdown => break,
            }
        };
        inner.changed.notify_all();
        // The sender may have given up waiting.
        ack.send(()).ok();
    }
    debug!("Coordinator shut down");
}

/// The driver thread of the step or play `run`, started in `state`.
fn drive(inner: &Inner, run: u64, state: RunState) {
    loop {
        let start = Instant::now();
        let (source, generation) = {
            let shared = inner.lock();
            (shared.grid.clone(), shared.generation + 1)
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| inner.next_grid(source)))
            .map_err(|_| Error::WorkerPanicked(generation));
        let handed = match result {
            Ok(grid) => inner
                .hand_over(|ack| Message::Publish { grid, ack })
                .map(|_| true),
            Err(error) => {
                warn!("Failed to compute generation {}: {}", generation, error);
                inner
                    .hand_over(|ack| Message::Fail { error, ack })
                    .map(|_| false)
            }
        };
        let go_on = handed.and_then(|published| {
            Ok(published && state == RunState::Playing && inner.throttle(run, start)?)
        });
        match go_on {
            Ok(true) => continue,
            Ok(false) => return,
            Err(error) => {
                warn!("{}", error);
                return;
            }
        }
    }
}

/// Runs a cell system on a grid.
///
/// All methods take `&self`; the computation happens on other threads.
/// Dropping a generator stops it and waits for the current generation.
pub struct Generator {
    inner: Arc<Inner>,
    coordinator: Option<JoinHandle<()>>,
}

impl Generator {
    /// Creates a new generator.
    ///
    /// Fails if the cell system is invalid, or if the grid contains
    /// a cell of a nonexistent cell type.
    pub fn new(system: CellSystem, grid: Grid, config: &GeneratorConfig) -> Result<Self, Error> {
        let environment = Environment::new(&system, grid.clone())?;

        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("cellgen-worker-{}", i));
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().map_err(|e| Error::Thread(e.to_string()))?;

        let (sender, receiver) = mpsc::channel();
        let inner = Arc::new(Inner {
            shared: Mutex::new(Shared {
                state: RunState::Idle,
                run: 0,
                generation: 0,
                grid: grid.clone(),
                failure: None,
                listeners: Vec::new(),
            }),
            changed: Condvar::new(),
            speed: AtomicI64::new(config.speed),
            environment,
            original: grid,
            pool,
            split_threshold: config.split_threshold,
            coordinator: Mutex::new(sender),
        });

        let coordinator = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name(String::from("cellgen-coordinator"))
                .spawn(move || coordinate(&inner, receiver))
                .map_err(|e| Error::Thread(e.to_string()))?
        };
        debug!(
            "Created a generator for a {}x{} grid with {} threads",
            inner.original.width(),
            inner.original.height(),
            inner.pool.current_num_threads()
        );
        Ok(Generator {
            inner,
            coordinator: Some(coordinator),
        })
    }

    /// Computes a single generation.
    ///
    /// Returns immediately; the state is [`RunState::Stepping`] until the
    /// generation is published.
    pub fn step(&self) -> Result<(), Error> {
        self.start(RunState::Stepping)
    }

    /// Computes generations one after another until [`stop`](Self::stop)
    /// is called.
    pub fn play(&self) -> Result<(), Error> {
        self.start(RunState::Playing)
    }

    fn start(&self, state: RunState) -> Result<(), Error> {
        let run = {
            let mut shared = self.inner.lock();
            if shared.state != RunState::Idle {
                return Err(Error::IllegalState(shared.state, RunState::Idle));
            }
            shared.failure = None;
            shared.run += 1;
            shared.set_state(state);
            shared.run
        };
        self.inner.changed.notify_all();

        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name(String::from("cellgen-driver"))
            .spawn(move || drive(&inner, run, state));
        if let Err(e) = spawned {
            self.inner.lock().set_state(RunState::Idle);
            self.inner.changed.notify_all();
            return Err(Error::Thread(e.to_string()));
        }
        Ok(())
    }

    /// Asks a playing generator to stop after the current generation.
    ///
    /// Returns immediately; the state is [`RunState::Stopping`] until
    /// the generator is idle again.
    pub fn stop(&self) -> Result<(), Error> {
        {
            let mut shared = self.inner.lock();
            if shared.state != RunState::Playing {
                return Err(Error::IllegalState(shared.state, RunState::Playing));
            }
            shared.set_state(RunState::Stopping);
        }
        self.inner.changed.notify_all();
        Ok(())
    }

    /// Restores the initial grid, and sets the generation back to `0`.
    pub fn reset(&self) -> Result<(), Error> {
        let mut shared = self.inner.lock();
        if shared.state != RunState::Idle {
            return Err(Error::IllegalState(shared.state, RunState::Idle));
        }
        let grid = self.inner.original.clone();
        shared.grid = grid.clone();
        shared.generation = 0;
        shared.failure = None;
        debug!("Reset to generation 0");
        shared.emit(Event::GridReplaced {
            generation: 0,
            grid,
        });
        Ok(())
    }

    /// Steps `generations` times, waiting for each generation.
    pub fn run(&self, generations: u64) -> Result<(), Error> {
        for _ in 0..generations {
            self.step()?;
            self.wait_idle();
            if let Some(error) = self.inner.lock().failure.take() {
                return Err(error);
            }
        }
        Ok(())
    }

    /// The current grid.
    pub fn grid(&self) -> Grid {
        self.inner.lock().grid.clone()
    }

    /// The number of generations published since creation or the last reset.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// The current state.
    pub fn state(&self) -> RunState {
        self.inner.lock().state
    }

    /// The cell system.
    pub fn system(&self) -> &CellSystem {
        self.inner.environment.system()
    }

    /// Minimal time between two generations while playing, in milliseconds.
    pub fn speed(&self) -> i64 {
        self.inner.speed.load(Ordering::Relaxed)
    }

    /// Sets the minimal time between two generations while playing,
    /// in milliseconds. Only the absolute value matters.
    pub fn set_speed(&self, speed: i64) {
        self.inner.speed.store(speed, Ordering::Relaxed);
    }

    /// Subscribes to the [`Event`]s of this generator.
    ///
    /// The subscription ends when the receiver is dropped.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (sender, receiver) = mpsc::channel();
        self.inner.lock().listeners.push(sender);
        receiver
    }

    /// Blocks until the generator is idle.
    pub fn wait_idle(&self) {
        let shared = self.inner.lock();
        drop(
            self.inner
                .changed
                .wait_while(shared, |shared| shared.state != RunState::Idle)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    /// Blocks until the generator is idle, or the timeout elapses.
    ///
    /// Returns whether the generator is idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let shared = self.inner.lock();
        let (shared, _) = self
            .inner
            .changed
            .wait_timeout_while(shared, timeout, |shared| shared.state != RunState::Idle)
            .unwrap_or_else(PoisonError::into_inner);
        shared.state == RunState::Idle
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.stop().ok();
        self.wait_idle();
        self.inner.send(Message::Shutdown).ok();
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.join().ok();
        }
    }
}
