use cyberfield::field::{reduced_count, FieldParams, ParticleField};
use cyberfield::perf::{FrameRateMonitor, PerfParams};
use cyberfield::render::connection_opacity;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn field(seed: u64) -> ParticleField {
    ParticleField::new(FieldParams::default(), StdRng::seed_from_u64(seed)).unwrap()
}

fn assert_in_bounds(f: &ParticleField) {
    let (w, h) = f.bounds();
    for p in f.particles() {
        assert!(p.x >= 0.0 && p.x < w, "x={} outside [0,{w})", p.x);
        assert!(p.y >= 0.0 && p.y < h, "y={} outside [0,{h})", p.y);
    }
}

#[test]
fn configure_spawns_exactly_n_inside_bounds() {
    let mut f = field(1);
    for (n, w, h) in [(0, 10.0, 10.0), (1, 100.0, 100.0), (60, 1280.0, 720.0), (30, 3.0, 500.0)] {
        f.configure(n, w, h);
        assert_eq!(f.len(), n);
        assert_in_bounds(&f);
    }
}

#[test]
fn positions_and_velocities_stay_bounded_over_many_ticks() {
    let mut f = field(2);
    f.configure(60, 800.0, 600.0);
    let mut rng = StdRng::seed_from_u64(99);
    let max_speed = f.params().max_speed;

    for i in 0..1000 {
        let pointer = rng
            .gen_bool(0.7)
            .then(|| (rng.gen_range(-50.0..850.0), rng.gen_range(-50.0..650.0)));
        f.tick(i as f32 / 60.0, pointer);
        assert_in_bounds(&f);
        for p in f.particles() {
            assert!(p.vx.abs() <= max_speed && p.vy.abs() <= max_speed);
        }
    }
}

#[test]
fn pointer_exactly_on_a_particle_exerts_no_pull() {
    let mut on = field(3);
    on.configure(1, 100.0, 100.0);
    {
        let p = &mut on.particles_mut()[0];
        p.x = 40.0;
        p.y = 40.0;
        p.vx = 0.0;
        p.vy = 0.0;
    }
    on.tick(0.0, Some((40.0, 40.0)));
    let p = &on.particles()[0];
    assert_eq!((p.vx, p.vy), (0.0, 0.0));
    assert_eq!(p.proximity, 0.0);
}

#[test]
fn proximity_only_decays_when_the_pointer_is_far_away() {
    let mut f = field(4);
    f.configure(1, 100.0, 100.0);
    // Warm it up so there is something to decay.
    let (x, y) = (f.particles()[0].x, f.particles()[0].y);
    f.tick(0.0, Some((x + 10.0, y)));
    let mut last = f.particles()[0].proximity;
    assert!(last > 0.0);

    for i in 1..=1000 {
        f.tick(i as f32 / 60.0, Some((1000.0, 1000.0)));
        let now = f.particles()[0].proximity;
        assert!(now <= last);
        assert!(now >= 0.0);
        last = now;
    }
    assert!(last < 1e-6);
}

#[test]
fn connections_fade_with_distance_and_stop_at_the_threshold() {
    assert_eq!(connection_opacity(0.0, 120.0, 0.15), Some(0.15));
    let near_edge = connection_opacity(119.0, 120.0, 0.15).unwrap();
    assert!((near_edge - 0.00125).abs() < 1e-5);
    assert_eq!(connection_opacity(120.0, 120.0, 0.15), None);
    assert_eq!(connection_opacity(500.0, 120.0, 0.15), None);

    let mut prev = f32::INFINITY;
    for d in 0..120 {
        let o = connection_opacity(d as f32, 120.0, 0.15).unwrap();
        assert!(o < prev);
        prev = o;
    }
}

#[test]
fn slow_frames_shrink_sixty_particles_to_forty_eight() {
    let mut monitor = FrameRateMonitor::new(PerfParams::default(), 60).unwrap();
    let mut signal = None;
    // 20 fps for a little over a second.
    for i in 0..=21 {
        if let Some(s) = monitor.record_frame(i as f32 * 0.05) {
            signal = Some(s);
        }
    }
    let signal = signal.expect("a slow window should ask for fewer particles");

    let mut f = field(5);
    f.configure(60, 1280.0, 720.0);
    let n = reduced_count(f.len(), signal);
    f.configure(n, 1280.0, 720.0);
    assert_eq!(f.len(), 48);
}

#[test]
fn pacing_at_a_low_cap_keeps_the_full_field() {
    let mut monitor = FrameRateMonitor::new(PerfParams::default(), 24).unwrap();
    let mut count = 60;
    for i in 1..=(24 * 5) {
        if let Some(s) = monitor.record_frame(i as f32 / 24.0) {
            count = reduced_count(count, s);
        }
    }
    assert_eq!(count, 60);
}
