//! Load-once guarantees of the shared caches under concurrent access.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use aion_trellis::tilegrid::{TileGridCache, TileGridTable};
use aion_trellis::{
    Database, DatabaseResult, DeviceLocator, TileBitDatabase, TileBitDatabaseLoader, TileLocator,
};
use rayon::prelude::*;

/// Counts loads and stalls each one so that concurrent callers pile up on
/// the cache lock.
struct CountingLoader {
    loads: Arc<AtomicUsize>,
}

impl TileBitDatabaseLoader for CountingLoader {
    fn load(&self, _path: &Path) -> DatabaseResult<TileBitDatabase> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        TileBitDatabase::parse(".fixed_conn A B\n")
    }
}

fn open(root: &Path) -> (Arc<AtomicUsize>, Database) {
    fs::write(
        root.join("devices.json"),
        r#"{ "families": { "ECP5": { "devices": {
            "LFE5U-25F": { "idcode": "0x41111043", "frames": 7562 }
        } } } }"#,
    )
    .unwrap();
    let dev = root.join("ECP5").join("LFE5U-25F");
    fs::create_dir_all(&dev).unwrap();
    fs::write(
        dev.join("tilegrid.json"),
        r#"{
            "R2C2:PLC2": { "cols": 48, "rows": 94, "start_bit": 0, "start_frame": 0, "type": "PLC2", "sites": [] },
            "R2C3:PLC2": { "cols": 48, "rows": 94, "start_bit": 0, "start_frame": 48, "type": "PLC2", "sites": [] }
        }"#,
    )
    .unwrap();

    let loads = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader {
        loads: Arc::clone(&loads),
    };
    let db = Database::with_loader(root, Box::new(loader)).unwrap();
    (loads, db)
}

#[test]
fn concurrent_requests_share_one_handle() {
    let dir = tempfile::tempdir().unwrap();
    let (loads, db) = open(dir.path());
    let key = TileLocator::new("ECP5", "PLC2");

    const THREADS: usize = 8;
    let barrier = Barrier::new(THREADS);
    let handles: Vec<Arc<TileBitDatabase>> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    db.tile_bit_database(&key).unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    for h in &handles[1..] {
        assert!(Arc::ptr_eq(&handles[0], h));
    }
}

#[test]
fn parallel_requests_over_several_keys() {
    let dir = tempfile::tempdir().unwrap();
    let (loads, db) = open(dir.path());
    let tiletypes = ["PLC2", "CIB", "TAP_DRIVE", "MIB_EBR0"];

    let handles: Vec<(usize, Arc<TileBitDatabase>)> = (0..64)
        .into_par_iter()
        .map(|i| {
            let key = TileLocator::new("ECP5", tiletypes[i % tiletypes.len()]);
            (i % tiletypes.len(), db.tile_bit_database(&key).unwrap())
        })
        .collect();

    assert_eq!(loads.load(Ordering::SeqCst), tiletypes.len());
    for (idx, handle) in &handles {
        let again = db
            .tile_bit_database(&TileLocator::new("ECP5", tiletypes[*idx]))
            .unwrap();
        assert!(Arc::ptr_eq(handle, &again));
    }
    assert_eq!(loads.load(Ordering::SeqCst), tiletypes.len());
}

#[test]
fn concurrent_tile_grid_requests_agree() {
    let dir = tempfile::tempdir().unwrap();
    let (_loads, db) = open(dir.path());
    let loc = DeviceLocator::new("ECP5", "LFE5U-25F");

    let grids: Vec<_> = (0..16)
        .into_par_iter()
        .map(|_| db.tile_grid(&loc).unwrap())
        .collect();

    assert_eq!(grids[0].len(), 2);
    assert!(grids.iter().all(|g| *g == grids[0]));

    // Served from the cache from here on.
    fs::remove_file(dir.path().join("ECP5/LFE5U-25F/tilegrid.json")).unwrap();
    assert_eq!(db.tile_grid(&loc).unwrap(), grids[0]);
}

#[test]
fn concurrent_first_tile_grid_requests_load_once() {
    let cache = TileGridCache::new();
    let loc = DeviceLocator::new("ECP5", "LFE5U-25F");
    let loads = AtomicUsize::new(0);

    const THREADS: usize = 8;
    let barrier = Barrier::new(THREADS);
    let tables: Vec<Arc<TileGridTable>> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache
                        .get_or_load(&loc, || {
                            loads.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            TileGridTable::from_json(
                                r#"{ "R2C2:PLC2": { "cols": 48, "rows": 94, "start_bit": 0, "start_frame": 0, "type": "PLC2" } }"#,
                            )
                        })
                        .unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
    for t in &tables[1..] {
        assert!(Arc::ptr_eq(&tables[0], t));
    }
}
