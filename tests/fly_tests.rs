use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tilebrot::prelude::*;

/// Fly sequencer driven against a live viewport
#[cfg(test)]
mod fly_tests {
    use super::*;

    struct TrackingKeepAwake {
        held: Arc<AtomicBool>,
        acquisitions: Arc<AtomicUsize>,
    }

    impl KeepAwake for TrackingKeepAwake {
        fn acquire(&mut self) {
            assert!(!self.held.swap(true, Ordering::SeqCst), "acquired twice");
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&mut self) {
            self.held.store(false, Ordering::SeqCst);
        }
    }

    fn small_view() -> ViewportContext {
        let mut ctx = ViewportContext::with_profile(ViewerProfile::Coarse).unwrap();
        ctx.on_size_changed(64, 64);
        ctx
    }

    /// Tick until the sequence stops, letting the worker drain in between
    fn play(fly: &mut FlySequencer, ctx: &mut ViewportContext) -> usize {
        let mut ticks = 0;
        while let FlyTick::Continue(_) = fly.tick(ctx) {
            ctx.scheduler().wait_idle(Duration::from_secs(30));
            ticks += 1;
            assert!(ticks < 10_000, "tour never finished");
        }
        ticks
    }

    /// INIT lands on its zoom level and pan offset in one step
    #[test]
    fn test_init_scenario() {
        let mut ctx = small_view();
        ctx.scheduler().wait_idle(Duration::from_secs(30));
        let tape = FlyTape::new(vec![0.0, 64.0, -1.40771, 0.0]);
        let mut fly = FlySequencer::new(tape, FlyConfig::default(), Box::new(NoopKeepAwake));
        fly.start();
        play(&mut fly, &mut ctx);

        assert_eq!(ctx.zoom_level(), 64);
        let expected = RealPoint::new(-1.40771, 0.0).to_pan(scale(64));
        assert_eq!(ctx.pan(), expected);
        assert_eq!(expected.0, (-1.40771 * -scale(64)) as i32);
    }

    /// The demo tour reaches its last point and releases the keep-awake
    #[test]
    fn test_demo_tour_runs_to_end() {
        let mut ctx = small_view();
        let held = Arc::new(AtomicBool::new(false));
        let acquisitions = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let done = finished.clone();
        let mut fly = FlySequencer::new(
            FlyTape::demo(),
            FlyConfig::default(),
            Box::new(TrackingKeepAwake {
                held: held.clone(),
                acquisitions: acquisitions.clone(),
            }),
        )
        .with_on_done(move || {
            done.fetch_add(1, Ordering::SeqCst);
        });

        assert!(fly.start());
        assert!(held.load(Ordering::SeqCst));
        let ticks = play(&mut fly, &mut ctx);
        assert!(ticks > 4);

        assert!(!fly.is_running());
        assert!(!held.load(Ordering::SeqCst));
        assert_eq!(acquisitions.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.zoom_level(), 64);
        assert_eq!(
            ctx.pan(),
            RealPoint::new(-0.91699, 0.27222).to_pan(scale(64))
        );
        assert!(fly.elapsed() > Duration::ZERO);
    }

    /// Stopping mid-tour releases the resource and a restart rewinds
    #[test]
    fn test_stop_and_restart() {
        let mut ctx = small_view();
        let mut fly = FlySequencer::new(FlyTape::demo(), FlyConfig::default(), Box::new(NoopKeepAwake));
        fly.start();
        fly.tick(&mut ctx);
        fly.stop();
        assert_eq!(fly.tick(&mut ctx), FlyTick::Stopped);
        assert!(fly.start());
        assert!(fly.is_running());
    }

    /// A tape word that is not an opcode ends the run
    #[test]
    fn test_bad_opcode_after_valid_instruction() {
        let mut ctx = small_view();
        let tape = FlyTape::new(vec![2.0, 1.0, 5.0]);
        let mut fly = FlySequencer::new(tape, FlyConfig::default(), Box::new(NoopKeepAwake));
        fly.start();
        play(&mut fly, &mut ctx);
        assert!(!fly.is_running());
        assert_eq!(ctx.zoom_level(), 1);
    }
}
