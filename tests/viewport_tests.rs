use image::imageops;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tilebrot::prelude::*;

/// End-to-end tests of the cache protocol and viewport maintenance
#[cfg(test)]
mod viewport_tests {
    use super::*;

    /// Mandelbrot kernel that counts how often it runs
    struct CountingKernel {
        inner: MandelbrotKernel,
        renders: Arc<AtomicUsize>,
    }

    impl TileKernel for CountingKernel {
        fn render(&self, tile: &Tile) -> TileRaster {
            self.renders.fetch_add(1, Ordering::SeqCst);
            self.inner.render(tile)
        }
    }

    fn context(paused: bool) -> (ViewportContext, Arc<AtomicUsize>) {
        let renders = Arc::new(AtomicUsize::new(0));
        let kernel = CountingKernel {
            inner: MandelbrotKernel::default(),
            renders: renders.clone(),
        };
        let config = ViewerConfig {
            scheduler: SchedulerConfig {
                start_paused: paused,
                ..SchedulerConfig::default()
            },
            ..ViewerConfig::default()
        };
        (ViewportContext::new(config, Arc::new(kernel)).unwrap(), renders)
    }

    /// 256x256 view at the origin covers tiles -2..=1 on both axes
    #[test]
    fn test_viewport_grid_scenario() {
        let (mut ctx, _) = context(true);
        ctx.on_size_changed(256, 256);
        assert_eq!(ctx.zoom_level(), 0);
        assert_eq!(ctx.pan(), (0, 0));

        let visible = ctx.visible_tiles();
        assert_eq!(visible.len(), 16);
        for (n, slot) in visible.iter().enumerate() {
            let tile = slot.as_ref().unwrap();
            assert_eq!(tile.i(), n as i32 % 4 - 2);
            assert_eq!(tile.j(), n as i32 / 4 - 2);
        }
        assert_eq!(ctx.scheduler().pending_count(), 16);
    }

    /// Repeated requests share one instance
    #[test]
    fn test_request_tile_returns_same_instance() {
        let (ctx, _) = context(true);
        let a = ctx.requester().request_tile(4, -7, 3, 10);
        let b = ctx.requester().request_tile(4, -7, 3, 99);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.max_iter(), 10);
    }

    /// Completing one tile fills its mirror without a second computation
    #[test]
    fn test_mirror_completion() {
        let (mut ctx, renders) = context(true);
        ctx.zoom_to_level(2).unwrap();
        ctx.scheduler().clear();

        let tile = ctx.request_tile(-3, 1);
        let mirror = ctx.request_tile(-3, -2);
        assert_eq!(tile.mirror_key(), mirror.key());
        assert_eq!(ctx.scheduler().pending_count(), 2);

        ctx.pause(false);
        assert!(ctx.scheduler().wait_idle(Duration::from_secs(10)));
        assert!(tile.is_completed());
        assert!(mirror.is_completed());
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        let original = tile.raster().unwrap();
        let reflected = mirror.raster().unwrap();
        assert_eq!(imageops::flip_vertical(&original), reflected);
        assert_eq!(MandelbrotKernel::default().render(&mirror), reflected);
    }

    /// Completions for a level we left do not touch the new level
    #[test]
    fn test_stale_completion_is_not_mirrored() {
        let (mut ctx, _) = context(true);
        let tile = ctx.requester().request_tile(8, 0, 0, 20);
        let mirror = ctx.requester().request_tile(8, 0, -1, 20);
        ctx.scheduler().clear();
        ctx.scheduler().schedule(&tile);

        ctx.pause(false);
        assert!(ctx.scheduler().wait_idle(Duration::from_secs(10)));
        assert!(tile.is_completed());
        assert!(!mirror.is_completed());
    }

    /// Zooming in N times from 0 reaches 2^(N-1), zooming back returns to 0
    #[test]
    fn test_zoom_sequence() {
        let (mut ctx, _) = context(true);
        ctx.on_size_changed(128, 128);
        for n in 1..=6u32 {
            ctx.zoom_in();
            assert_eq!(ctx.zoom_level(), 1 << (n - 1));
        }
        for _ in 0..6 {
            ctx.zoom_out();
        }
        assert_eq!(ctx.zoom_level(), 0);
    }

    /// Equal levels give equal budgets whatever the path
    #[test]
    fn test_max_iter_path_independent() {
        let (mut ctx, _) = context(true);
        ctx.change_zoom_by(5);
        let direct = ctx.max_iter();
        ctx.change_zoom_by(-2);
        ctx.change_zoom_by(2);
        assert_eq!(ctx.max_iter(), direct);
        ctx.zoom_to_level(0).unwrap();
        ctx.zoom_to_level(16).unwrap();
        assert_eq!(ctx.max_iter(), direct);

        let mut last = 0;
        for level in [0, 1, 2, 4, 8, 16, 32, 64, 128] {
            let budget = IterationProfile::Fine.max_iter(level);
            assert!(budget >= last);
            last = budget;
        }
    }

    /// Clearing empties the queue and later requests get fresh tiles
    #[test]
    fn test_clear_cache() {
        let (mut ctx, _) = context(true);
        ctx.on_size_changed(256, 256);
        let before = ctx.request_tile(0, 0);
        assert!(ctx.scheduler().pending_count() > 0);

        ctx.clear_cache();
        assert_eq!(ctx.scheduler().pending_count(), 0);
        assert!(!before.is_queued());

        let after = ctx.request_tile(0, 0);
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!after.is_completed());
    }

    /// Zooming far past the deepest level keeps the view centred and sane
    #[test]
    fn test_deep_zoom_stays_in_range() {
        let (mut ctx, _) = context(true);
        ctx.on_size_changed(256, 256);
        ctx.pan_to_real(RealPoint::new(-1.40771, 0.0));
        let center = ctx.center();

        for _ in 0..32 {
            ctx.zoom_in();
        }
        assert_eq!(ctx.zoom_level(), MAX_ZOOM_LEVEL);
        assert_eq!(ctx.center(), center);
        assert_eq!(ctx.visible_tiles().len(), 16);

        ctx.pan_to(i32::MAX, i32::MIN);
        assert_eq!(ctx.pan(), (PAN_LIMIT, -PAN_LIMIT));
        assert!(ctx.visible_tiles().iter().all(Option::is_some));
        ctx.zoom_out();
        assert_eq!(ctx.zoom_level(), MAX_ZOOM_LEVEL / 2);
    }

    /// Every completion reaches the attached surface
    #[test]
    fn test_completions_invalidate_surface() {
        let (mut ctx, _) = context(true);
        let (surface, rx) = ChannelSurface::new();
        ctx.set_surface(Arc::new(surface));
        ctx.on_size_changed(128, 128);
        while rx.try_recv().is_ok() {}

        ctx.pause(false);
        assert!(ctx.scheduler().wait_idle(Duration::from_secs(10)));
        let regions = rx
            .try_iter()
            .filter(|event| matches!(event, Invalidation::Region { .. }))
            .count();
        assert_eq!(regions, ctx.visible_tiles().len());
    }

    /// Zoom and pan traffic while the worker runs neither deadlocks nor
    /// lets a stale completion repaint the live level
    #[test]
    fn test_concurrent_zoom_and_completions() {
        let (mut ctx, _) = context(false);
        let (surface, rx) = ChannelSurface::new();
        ctx.set_surface(Arc::new(surface));
        ctx.on_size_changed(256, 256);

        for n in 0..200i32 {
            match n % 5 {
                0 | 1 => {
                    ctx.zoom_in();
                }
                2 => ctx.pan_to((n * 37) % 500 - 250, (n * 53) % 300 - 150),
                _ => {
                    ctx.zoom_out();
                }
            }
        }
        // the last change is a zoom, so its repaint marks the live level
        assert!(ctx.zoom_in());
        assert!(ctx.scheduler().wait_idle(Duration::from_secs(60)));

        let events: Vec<_> = rx.try_iter().collect();
        let last_full = events
            .iter()
            .rposition(|event| *event == Invalidation::All)
            .unwrap();
        let (pan_x, pan_y) = ctx.pan();
        let (width, height) = ctx.view_size();
        for event in &events[last_full + 1..] {
            let Invalidation::Region { x1, y1, .. } = *event else {
                panic!("unexpected {:?}", event);
            };
            let vx = x1 - TILE_SIZE - width / 2 - pan_x;
            let vy = y1 - TILE_SIZE - height / 2 - pan_y;
            assert_eq!(vx % TILE_SIZE, 0, "region off the live grid");
            assert_eq!(vy % TILE_SIZE, 0, "region off the live grid");
            let tile = ctx.request_tile(vx / TILE_SIZE, vy / TILE_SIZE);
            assert!(tile.is_completed());
        }
        assert!(ctx
            .visible_tiles()
            .iter()
            .flatten()
            .all(|tile| tile.is_completed() && tile.zoom_level() == ctx.zoom_level()));

        ctx.shutdown();
        assert!(ctx.scheduler().is_stopped());
    }
}
