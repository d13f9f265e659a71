//! Driving-thread façade tying the viewport, the fly sequencer and snapshot
//! export together.

use crate::animation::fly::{FlySequencer, FlyTick, KeepAwake, NoopKeepAwake};
use crate::animation::tape::FlyTape;
use crate::background::snapshot::{SnapshotGenerator, SnapshotPoll};
use crate::core::config::{ViewerConfig, ViewerProfile};
use crate::core::context::ViewportContext;
use crate::input::events::{Command, InputEvent};
use crate::input::handler::InputHandler;
use crate::prelude::Arc;
use crate::tiles::kernel::{MandelbrotKernel, TileKernel};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbaImage;
use std::time::Duration;

/// Delay `pump` asks for when nothing is animating
const IDLE_PUMP: Duration = Duration::from_millis(100);

/// Owns a [`ViewportContext`] and everything that steps it over time.
///
/// The host feeds commands through [`FractalViewer::apply`] and calls
/// [`FractalViewer::pump`] from its timer. Finished snapshots arrive on
/// [`FractalViewer::snapshots`].
pub struct FractalViewer {
    ctx: ViewportContext,
    fly: FlySequencer,
    input: InputHandler,
    snapshot: Option<SnapshotGenerator>,
    snapshot_tx: Sender<RgbaImage>,
    snapshot_rx: Receiver<RgbaImage>,
}

impl FractalViewer {
    pub fn new(
        config: ViewerConfig,
        kernel: Arc<dyn TileKernel>,
        keep_awake: Box<dyn KeepAwake>,
    ) -> Result<Self> {
        let fly = FlySequencer::new(FlyTape::demo(), config.fly.clone(), keep_awake);
        let ctx = ViewportContext::new(config, kernel)?;
        let (snapshot_tx, snapshot_rx) = unbounded();
        Ok(Self {
            ctx,
            fly,
            input: InputHandler::new(),
            snapshot: None,
            snapshot_tx,
            snapshot_rx,
        })
    }

    /// Mandelbrot viewer from a preset, without a keep-awake resource
    pub fn with_profile(profile: ViewerProfile) -> Result<Self> {
        Self::new(
            profile.resolve(),
            Arc::new(MandelbrotKernel::default()),
            Box::new(NoopKeepAwake),
        )
    }

    pub fn context(&self) -> &ViewportContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ViewportContext {
        &mut self.ctx
    }

    pub fn fly(&self) -> &FlySequencer {
        &self.fly
    }

    pub fn fly_mut(&mut self) -> &mut FlySequencer {
        &mut self.fly
    }

    pub fn input_mut(&mut self) -> &mut InputHandler {
        &mut self.input
    }

    /// Receiver of finished snapshot images
    pub fn snapshots(&self) -> Receiver<RgbaImage> {
        self.snapshot_rx.clone()
    }

    pub fn is_snapshot_running(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Translate a host event and apply the resulting commands
    pub fn handle_event(&mut self, event: InputEvent) -> Result<()> {
        let commands = self
            .input
            .handle_event(event, self.ctx.pan(), self.fly.is_running());
        for command in commands {
            self.apply(command)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, command: Command) -> Result<()> {
        log::debug!("command {:?}", command);
        match command {
            Command::PanTo { x, y } => self.ctx.pan_to(x, y),
            Command::PanStarted => self.ctx.set_panning(true),
            Command::PanFinished => self.ctx.set_panning(false),
            Command::ZoomIn => {
                self.ctx.zoom_in();
            }
            Command::ZoomOut => {
                self.ctx.zoom_out();
            }
            Command::ZoomTo(level) => self.ctx.zoom_to_level(level)?,
            Command::ClearCache => {
                self.ctx.clear_cache();
                self.ctx.update_all(true);
            }
            Command::StartFly => {
                self.fly.start();
            }
            Command::StopFly => self.fly.stop(),
            Command::StartSnapshot { width, height } => self.start_snapshot(width, height),
            Command::Resize { width, height } => self.ctx.on_size_changed(width, height),
            Command::PanToInterestingPlace => {
                self.ctx.pan_to_interesting_place();
            }
            Command::Pause(paused) => {
                if paused {
                    self.fly.stop();
                }
                self.ctx.pause(paused);
            }
        }
        Ok(())
    }

    /// Begin exporting a snapshot, replacing any unfinished one
    pub fn start_snapshot(&mut self, width: u32, height: u32) {
        let tx = self.snapshot_tx.clone();
        let generator = SnapshotGenerator::start(
            &self.ctx,
            width,
            height,
            Box::new(move |image| {
                if let Some(image) = image {
                    let _ = tx.send(image.clone());
                }
            }),
        );
        self.snapshot = Some(generator);
    }

    /// Step the fly sequencer and the snapshot. Returns when to pump again.
    pub fn pump(&mut self) -> Duration {
        let mut next = IDLE_PUMP;

        if let FlyTick::Continue(delay) = self.fly.tick(&mut self.ctx) {
            next = next.min(delay);
        }

        if let Some(snapshot) = self.snapshot.as_mut() {
            match snapshot.poll() {
                SnapshotPoll::Pending(delay) => next = next.min(delay),
                SnapshotPoll::Done => self.snapshot = None,
            }
        }
        next
    }

    /// Pump on the calling thread until the fly sequence and the snapshot
    /// are both finished
    pub fn run_until_idle(&mut self) {
        while self.fly.is_running() || self.snapshot.is_some() {
            let delay = self.pump();
            if self.fly.is_running() || self.snapshot.is_some() {
                std::thread::sleep(delay);
            }
        }
    }

    /// Stop everything and join the worker
    pub fn shutdown(&mut self) {
        self.fly.stop();
        self.snapshot = None;
        self.ctx.shutdown();
    }
}
