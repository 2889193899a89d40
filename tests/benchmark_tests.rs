//! Performance benchmarks for critical movement systems

use client::camera::Camera;
use client::game::Reconciler;
use shared::{
    decode_snapshot, encode_snapshot, probe_footprint, CollisionIndex, Direction, EntityView,
    LinearScan, Point, Rect, SimConfig, SnapshotEntry,
};
use std::time::{Duration, Instant};

fn snapshot_entries(players: u32, npcs: u32) -> Vec<SnapshotEntry> {
    let mut entries: Vec<SnapshotEntry> = (1..=players)
        .map(|id| {
            SnapshotEntry::Player(EntityView {
                id,
                x: (id as i32 * 37) % 1200,
                y: (id as i32 * 53) % 900,
                direction: Direction::Right,
                frame: (id % 2) as u8,
                moving: id % 3 == 0,
            })
        })
        .collect();
    entries.extend((0..npcs).map(|i| SnapshotEntry::Npc {
        view: EntityView {
            id: 1000 + i,
            x: (i as i32 * 64) % 1200,
            y: (i as i32 * 96) % 900,
            direction: Direction::Down,
            frame: 0,
            moving: false,
        },
        npc_type: "villager".to_string(),
    }));
    entries
}

/// Benchmarks collision scanning against a realistic collider count
#[test]
fn benchmark_collision_scan() {
    let config = SimConfig::default();
    let colliders: Vec<Rect> = (0..200)
        .map(|i| Rect::new((i % 20) * 64, (i / 20) * 96, 32, 32))
        .collect();
    let index = LinearScan::new(&colliders, config.collider_margin_px);

    let iterations = 10_000;
    let start = Instant::now();

    let mut blocked = 0;
    for i in 0..iterations {
        let probe = probe_footprint(Point::new((i * 7) % 1230, (i * 13) % 910), &config);
        if index.blocks(&probe) {
            blocked += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Collision scan: {} probes x {} colliders in {:?} ({} blocked)",
        iterations,
        index.len(),
        duration,
        blocked
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks snapshot encoding and decoding
#[test]
fn benchmark_snapshot_codec() {
    let entries = snapshot_entries(64, 50);

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let line = encode_snapshot(&entries);
        let decoded = decode_snapshot(&line);
        assert_eq!(decoded.entries.len(), entries.len());
    }

    let duration = start.elapsed();
    println!(
        "Snapshot codec: {} round trips of {} entries in {:?} ({:.2} μs/iter)",
        iterations,
        entries.len(),
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks the client reconcile + interpolate cycle
#[test]
fn benchmark_reconciler_frames() {
    let config = SimConfig::default();
    let camera = Camera::new((800, 600), (1280, 960), &config);
    let mut reconciler = Reconciler::new(Some(1), camera, config);

    let lines: Vec<String> = (0..10)
        .map(|shift| {
            let mut entries = snapshot_entries(64, 50);
            for entry in &mut entries {
                if let SnapshotEntry::Player(view) = entry {
                    view.x += shift * 2;
                }
            }
            encode_snapshot(&entries)
        })
        .collect();

    let iterations = 1_000;
    let t0 = Instant::now();
    let start = Instant::now();

    for i in 0..iterations {
        let now = t0 + Duration::from_millis(16 * i as u64);
        reconciler.apply_snapshot_line(&lines[i % lines.len()], now);
        reconciler.interpolate();
        let frame = reconciler.frame();
        assert_eq!(frame.entities.len(), 114);
    }

    let duration = start.elapsed();
    println!(
        "Reconciler: {} frames in {:?} ({:.2} μs/frame)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}
