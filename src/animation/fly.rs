use crate::animation::tape::{FlyInstruction, FlyTape};
use crate::core::config::FlyConfig;
use crate::core::constants::{PAN_LIMIT, TILE_SIZE};
use crate::core::context::ViewportContext;
use crate::core::zoom::scale;
use instant::Instant;
use std::time::Duration;

/// Keeps the host awake while a tour plays (a wake lock or similar)
pub trait KeepAwake: Send {
    fn acquire(&mut self);
    fn release(&mut self);
}

/// Keep-awake resource for hosts that have none
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeepAwake;

impl KeepAwake for NoopKeepAwake {
    fn acquire(&mut self) {}

    fn release(&mut self) {}
}

/// Outcome of one [`FlySequencer::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlyTick {
    /// Tick again after the delay
    Continue(Duration),
    /// The sequence is not running
    Stopped,
}

/// Instruction being played over several ticks
#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Zoom { target_zoom: u32 },
    Pan { target_x: i32, target_y: i32 },
}

/// Plays a [`FlyTape`] against a viewport, one step per tick.
///
/// The camera only moves while the scheduler is idle, so it never runs
/// ahead of unrendered tiles.
pub struct FlySequencer {
    tape: FlyTape,
    config: FlyConfig,
    pc: usize,
    motion: Option<Motion>,
    running: bool,
    keep_awake: Box<dyn KeepAwake>,
    held: bool,
    started_at: Option<Instant>,
    elapsed: Duration,
    on_done: Option<Box<dyn FnMut() + Send>>,
}

impl FlySequencer {
    pub fn new(tape: FlyTape, config: FlyConfig, keep_awake: Box<dyn KeepAwake>) -> Self {
        Self {
            tape,
            config,
            pc: 0,
            motion: None,
            running: false,
            keep_awake,
            held: false,
            started_at: None,
            elapsed: Duration::ZERO,
            on_done: None,
        }
    }

    /// Call `on_done` every time a run ends
    pub fn with_on_done(mut self, on_done: impl FnMut() + Send + 'static) -> Self {
        self.on_done = Some(Box::new(on_done));
        self
    }

    pub fn set_tape(&mut self, tape: FlyTape) {
        self.stop();
        self.tape = tape;
    }

    pub fn tape(&self) -> &FlyTape {
        &self.tape
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Length of the current run, or of the last one once stopped
    pub fn elapsed(&self) -> Duration {
        match (self.running, self.started_at) {
            (true, Some(started_at)) => started_at.elapsed(),
            _ => self.elapsed,
        }
    }

    /// Rewind the tape and begin playing. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        if !self.held {
            self.keep_awake.acquire();
            self.held = true;
        }
        self.pc = 0;
        self.motion = None;
        self.running = true;
        self.started_at = Some(Instant::now());
        log::info!("fly sequence started ({} words)", self.tape.len());
        true
    }

    /// End the run, releasing the keep-awake resource
    pub fn stop(&mut self) {
        if self.held {
            self.keep_awake.release();
            self.held = false;
        }
        if !self.running {
            return;
        }
        self.running = false;
        self.motion = None;
        if let Some(started_at) = self.started_at.take() {
            self.elapsed = started_at.elapsed();
        }
        log::info!("fly sequence stopped after {:?}", self.elapsed);
        if let Some(on_done) = self.on_done.as_mut() {
            on_done();
        }
    }

    /// Advance the tour by one step
    pub fn tick(&mut self, ctx: &mut ViewportContext) -> FlyTick {
        if !self.running {
            return FlyTick::Stopped;
        }
        let interval = self.config.tick_interval();
        if ctx.scheduler().has_pending() {
            return FlyTick::Continue(interval);
        }

        if let Some(motion) = self.motion {
            if self.step(motion, ctx) {
                self.motion = None;
            }
            return FlyTick::Continue(interval);
        }

        loop {
            if self.pc >= self.tape.len() {
                log::debug!("fly tape exhausted");
                self.stop();
                return FlyTick::Stopped;
            }
            let (instruction, next) = match self.tape.decode_at(self.pc) {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::warn!("stopping fly sequence: {}", e);
                    self.stop();
                    return FlyTick::Stopped;
                }
            };
            self.pc = next;
            log::debug!("fly instruction {:?}", instruction);

            match instruction {
                FlyInstruction::Init {
                    target_zoom,
                    target,
                } => {
                    if let Err(e) = ctx.reset_to(target_zoom, target) {
                        log::warn!("stopping fly sequence: {}", e);
                        self.stop();
                        return FlyTick::Stopped;
                    }
                }
                FlyInstruction::Pan { target } => {
                    let (target_x, target_y) = target.to_pan(scale(ctx.zoom_level()));
                    // the view clamps its pan, so aim for a reachable offset
                    self.motion = Some(Motion::Pan {
                        target_x: target_x.clamp(-PAN_LIMIT, PAN_LIMIT),
                        target_y: target_y.clamp(-PAN_LIMIT, PAN_LIMIT),
                    });
                    return FlyTick::Continue(interval);
                }
                FlyInstruction::Zoom { target_zoom } => {
                    self.motion = Some(Motion::Zoom { target_zoom });
                    return FlyTick::Continue(interval);
                }
            }
        }
    }

    /// Move one step of `motion`. Returns true once it is finished.
    fn step(&self, motion: Motion, ctx: &mut ViewportContext) -> bool {
        match motion {
            Motion::Zoom { target_zoom } => {
                let level = ctx.zoom_level();
                let moved = if level < target_zoom {
                    ctx.zoom_in()
                } else if level > target_zoom {
                    ctx.zoom_out()
                } else {
                    false
                };
                !moved || ctx.zoom_level() == target_zoom
            }
            Motion::Pan { target_x, target_y } => {
                let (pan_x, pan_y) = ctx.pan();
                let dx = target_x as f64 - pan_x as f64;
                let dy = target_y as f64 - pan_y as f64;
                let dist_sq = dx * dx + dy * dy;
                if dist_sq < (TILE_SIZE * TILE_SIZE) as f64 {
                    ctx.pan_to(target_x, target_y);
                    return true;
                }
                let dist = dist_sq.sqrt();
                let step = (TILE_SIZE / self.config.pan_step_divisor) as f64;
                ctx.pan_to(
                    pan_x.saturating_add((dx / dist * step).round() as i32),
                    pan_y.saturating_add((dy / dist * step).round() as i32),
                );
                false
            }
        }
    }
}

impl Drop for FlySequencer {
    fn drop(&mut self) {
        self.stop();
    }
}
