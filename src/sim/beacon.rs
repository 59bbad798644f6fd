//! World billboards that cycle through images on a timer
//!
//! Beacons are built once at world init from a [`BeaconSpec`] after their
//! images resolve, then advanced by [`WorldBeacons::tick`] every frame.

use std::future::Future;

use futures::future::join_all;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::layout::BeaconSpec;
use crate::error::{BeaconError, LoadError, SettingsError};
use crate::planar_distance;
use crate::settings::{Settings, validate_proximity_range, validate_rotation_period};

/// Resolves an image source into a displayable handle
pub trait ImageLoader {
    type Handle: Clone;

    fn load(&self, source: &str) -> impl Future<Output = Result<Self::Handle, LoadError>>;
}

/// Stable beacon identity, assigned in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeaconId(pub u32);

/// A beacon whose images have resolved but which is not yet in a world.
///
/// Only [`load_beacon`] builds one.
#[derive(Debug, Clone)]
pub struct LoadedBeacon<H> {
    spec: BeaconSpec,
    /// Successfully loaded images, in source order
    images: Vec<H>,
    /// Sources that failed (partial failure)
    failures: Vec<LoadError>,
}

/// Load every source of `spec` concurrently and keep the ones that resolve.
///
/// Waits for all attempts to settle. Fails only if no image loaded.
pub async fn load_beacon<L: ImageLoader>(
    loader: &L,
    spec: BeaconSpec,
) -> Result<LoadedBeacon<L::Handle>, BeaconError> {
    if spec.sources.is_empty() {
        log::error!("Beacon `{}` has no image sources", spec.label);
        return Err(BeaconError::NoSources { label: spec.label });
    }

    let results = join_all(spec.sources.iter().map(|source| loader.load(source))).await;

    let mut images = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(handle) => images.push(handle),
            Err(e) => {
                log::warn!("Beacon `{}`: {}", spec.label, e);
                failures.push(e);
            }
        }
    }

    if images.is_empty() {
        log::error!("Beacon `{}` omitted: no image could be loaded", spec.label);
        return Err(BeaconError::AllSourcesFailed {
            label: spec.label,
            failures,
        });
    }

    Ok(LoadedBeacon {
        spec,
        images,
        failures,
    })
}

/// A world-anchored billboard with a non-empty image sequence
#[derive(Debug, Clone)]
pub struct Beacon<H> {
    id: BeaconId,
    spec: BeaconSpec,
    images: Vec<H>,
    failures: Vec<LoadError>,
    cursor: usize,
    last_rotation_ms: f64,
}

impl<H> Beacon<H> {
    pub fn id(&self) -> BeaconId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    /// Ground-plane anchor as (x, z)
    pub fn anchor(&self) -> Vec2 {
        self.spec.anchor
    }

    pub fn facing(&self) -> f32 {
        self.spec.facing
    }

    pub fn elevation(&self) -> f32 {
        self.spec.elevation
    }

    pub fn size(&self) -> Vec2 {
        self.spec.size
    }

    pub fn link(&self) -> Option<&str> {
        self.spec.link.as_deref()
    }

    pub fn images(&self) -> &[H] {
        &self.images
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The image currently on display
    pub fn active_image(&self) -> &H {
        // images is non-empty by construction (load_beacon rejects empty sets)
        &self.images[self.cursor]
    }

    pub fn last_rotation_ms(&self) -> f64 {
        self.last_rotation_ms
    }

    /// Sources that failed while this beacon was loading
    pub fn failed_sources(&self) -> &[LoadError] {
        &self.failures
    }

    /// Advance to the next image if a full period has elapsed
    fn rotate_if_due(&mut self, now_ms: f64, period_ms: f64) -> bool {
        if now_ms - self.last_rotation_ms < period_ms {
            return false;
        }
        self.cursor = (self.cursor + 1) % self.images.len();
        self.last_rotation_ms = now_ms;
        true
    }
}

/// Outcome of loading a whole layout
#[derive(Debug, Default)]
pub struct PopulateReport {
    /// Beacons added to the world, in layout order
    pub created: Vec<BeaconId>,
    /// Beacons that could not be built
    pub failed: Vec<BeaconError>,
}

impl PopulateReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The set of beacons in the scene
#[derive(Debug, Clone)]
pub struct WorldBeacons<H> {
    beacons: Vec<Beacon<H>>,
    rotation_period_ms: f64,
    proximity_range: f32,
    next_id: u32,
}

impl<H> WorldBeacons<H> {
    /// Both values must be positive and finite
    pub fn new(rotation_period_ms: f64, proximity_range: f32) -> Result<Self, SettingsError> {
        validate_rotation_period(rotation_period_ms)?;
        validate_proximity_range(proximity_range)?;
        Ok(Self {
            beacons: Vec::new(),
            rotation_period_ms,
            proximity_range,
            next_id: 1,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        Self::new(settings.rotation_period_ms, settings.proximity_range)
    }

    pub fn rotation_period_ms(&self) -> f64 {
        self.rotation_period_ms
    }

    pub fn proximity_range(&self) -> f32 {
        self.proximity_range
    }

    /// Materialize a loaded beacon. Its rotation clock starts at `now_ms`.
    pub fn insert(
        &mut self,
        loaded: LoadedBeacon<H>,
        now_ms: f64,
    ) -> Result<BeaconId, BeaconError> {
        if loaded.images.is_empty() {
            log::error!("Beacon `{}` omitted: no images", loaded.spec.label);
            return Err(BeaconError::AllSourcesFailed {
                label: loaded.spec.label,
                failures: loaded.failures,
            });
        }

        let id = BeaconId(self.next_id);
        self.next_id += 1;

        log::info!(
            "Beacon `{}` ready with {} image(s)",
            loaded.spec.label,
            loaded.images.len()
        );

        self.beacons.push(Beacon {
            id,
            spec: loaded.spec,
            images: loaded.images,
            failures: loaded.failures,
            cursor: 0,
            last_rotation_ms: now_ms,
        });
        Ok(id)
    }

    /// Load one beacon and add it to the world on success
    pub async fn create_beacon<L>(
        &mut self,
        loader: &L,
        spec: BeaconSpec,
        now_ms: f64,
    ) -> Result<BeaconId, BeaconError>
    where
        L: ImageLoader<Handle = H>,
    {
        let loaded = load_beacon(loader, spec).await?;
        self.insert(loaded, now_ms)
    }

    /// Load every beacon of a layout concurrently.
    ///
    /// Failed beacons are reported and skipped; the rest are inserted in
    /// layout order.
    pub async fn populate<L>(
        &mut self,
        loader: &L,
        specs: Vec<BeaconSpec>,
        now_ms: f64,
    ) -> PopulateReport
    where
        L: ImageLoader<Handle = H>,
    {
        let results = join_all(specs.into_iter().map(|spec| load_beacon(loader, spec))).await;

        let mut report = PopulateReport::default();
        for result in results {
            match result.and_then(|loaded| self.insert(loaded, now_ms)) {
                Ok(id) => report.created.push(id),
                Err(e) => report.failed.push(e),
            }
        }

        log::info!(
            "World beacons loaded: {} created, {} failed",
            report.created.len(),
            report.failed.len()
        );
        report
    }

    /// Rotate every beacon whose period has elapsed. Returns the number rotated.
    pub fn tick(&mut self, now_ms: f64) -> usize {
        let period = self.rotation_period_ms;
        let mut rotated = 0;
        for beacon in &mut self.beacons {
            if beacon.rotate_if_due(now_ms, period) {
                log::debug!(
                    "Beacon `{}` now showing image {}/{}",
                    beacon.spec.label,
                    beacon.cursor + 1,
                    beacon.images.len()
                );
                rotated += 1;
            }
        }
        rotated
    }

    /// Nearest beacon strictly closer than `range`; first inserted wins ties
    pub fn find_nearest(&self, position: Vec2, range: f32) -> Option<&Beacon<H>> {
        let mut nearest = None;
        let mut min_dist = f32::INFINITY;

        for beacon in &self.beacons {
            let dist = planar_distance(beacon.anchor(), position);
            if dist < range && dist < min_dist {
                min_dist = dist;
                nearest = Some(beacon);
            }
        }

        nearest
    }

    /// [`Self::find_nearest`] with the configured proximity range
    pub fn find_nearest_default(&self, position: Vec2) -> Option<&Beacon<H>> {
        self.find_nearest(position, self.proximity_range)
    }

    pub fn get(&self, id: BeaconId) -> Option<&Beacon<H>> {
        self.beacons.iter().find(|b| b.id == id)
    }

    pub fn active_image(&self, id: BeaconId) -> Option<&H> {
        self.get(id).map(Beacon::active_image)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Beacon<H>> {
        self.beacons.iter()
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::task::Poll;

    const PERIOD: f64 = 30_000.0;

    /// Resolves immediately; sources listed in `fail` reject
    #[derive(Default)]
    struct MockLoader {
        fail: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl MockLoader {
        fn failing(fail: &[&'static str]) -> Self {
            Self {
                fail: fail.to_vec(),
                ..Default::default()
            }
        }
    }

    impl ImageLoader for MockLoader {
        type Handle = String;

        fn load(&self, source: &str) -> impl Future<Output = Result<String, LoadError>> {
            self.calls.borrow_mut().push(source.to_string());
            let result = if self.fail.iter().any(|f| *f == source) {
                Err(LoadError::new(source, "404"))
            } else {
                Ok(source.to_string())
            };
            futures::future::ready(result)
        }
    }

    /// Each source stays pending for a set number of polls
    struct DelayedLoader {
        delays: HashMap<&'static str, u32>,
        events: Rc<RefCell<Vec<String>>>,
    }

    impl ImageLoader for DelayedLoader {
        type Handle = String;

        fn load(&self, source: &str) -> impl Future<Output = Result<String, LoadError>> {
            let events = self.events.clone();
            let name = source.to_string();
            let mut remaining = self.delays.get(source).copied().unwrap_or(0);
            events.borrow_mut().push(format!("start {name}"));
            futures::future::poll_fn(move |cx| {
                if remaining == 0 {
                    events.borrow_mut().push(format!("done {name}"));
                    Poll::Ready(Ok(name.clone()))
                } else {
                    remaining -= 1;
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            })
        }
    }

    fn world() -> WorldBeacons<String> {
        WorldBeacons::new(PERIOD, 50.0).unwrap()
    }

    fn spec(label: &str, x: f32, z: f32, sources: &[&str]) -> BeaconSpec {
        BeaconSpec::new(label, Vec2::new(x, z), sources.iter().copied())
    }

    fn add(world: &mut WorldBeacons<String>, spec: BeaconSpec, now: f64) -> BeaconId {
        block_on(world.create_beacon(&MockLoader::default(), spec, now)).unwrap()
    }

    #[test]
    fn test_create_beacon_all_sources() {
        let mut w = world();
        let id = add(&mut w, spec("north", 0.0, -215.0, &["/1.jpeg", "/2.jpeg"]), 0.0);
        let b = w.get(id).unwrap();
        assert_eq!(b.images(), ["/1.jpeg", "/2.jpeg"]);
        assert_eq!(b.active_image(), "/1.jpeg");
        assert!(b.failed_sources().is_empty());
    }

    #[test]
    fn test_create_beacon_partial_failure() {
        let mut w = world();
        let loader = MockLoader::failing(&["/1.jpeg"]);
        let id = block_on(w.create_beacon(&loader, spec("north", 0.0, 0.0, &["/1.jpeg", "/2.jpeg"]), 0.0))
            .unwrap();
        let b = w.get(id).unwrap();
        assert_eq!(b.images().len(), 1);
        assert_eq!(b.active_image(), "/2.jpeg");
        assert_eq!(b.failed_sources(), [LoadError::new("/1.jpeg", "404")]);
        // every source was still attempted
        assert_eq!(loader.calls.borrow().len(), 2);
    }

    #[test]
    fn test_create_beacon_total_failure() {
        let mut w = world();
        let loader = MockLoader::failing(&["/1.jpeg", "/2.jpeg"]);
        let err = block_on(w.create_beacon(&loader, spec("north", 0.0, 0.0, &["/1.jpeg", "/2.jpeg"]), 0.0))
            .unwrap_err();
        match &err {
            BeaconError::AllSourcesFailed { label, failures } => {
                assert_eq!(label, "north");
                assert_eq!(failures.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(w.is_empty());
    }

    #[test]
    fn test_create_beacon_without_sources() {
        let mut w = world();
        let err = block_on(w.create_beacon(&MockLoader::default(), spec("bare", 0.0, 0.0, &[]), 0.0))
            .unwrap_err();
        assert_eq!(err, BeaconError::NoSources { label: "bare".into() });
        assert!(w.is_empty());
    }

    #[test]
    fn test_loads_are_concurrent_and_keep_source_order() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let loader = DelayedLoader {
            delays: HashMap::from([("/slow", 3), ("/fast", 0)]),
            events: events.clone(),
        };
        let loaded = block_on(load_beacon(&loader, spec("b", 0.0, 0.0, &["/slow", "/fast"]))).unwrap();

        assert_eq!(loaded.images, ["/slow", "/fast"]);
        assert_eq!(
            *events.borrow(),
            ["start /slow", "start /fast", "done /fast", "done /slow"]
        );
    }

    #[test]
    fn test_populate_isolates_failures() {
        let mut w = world();
        let loader = MockLoader::failing(&["/dead1", "/dead2", "/w1"]);
        let report = block_on(w.populate(
            &loader,
            vec![
                spec("north", 0.0, -215.0, &["/n1", "/n2"]),
                spec("broken", 100.0, 0.0, &["/dead1", "/dead2"]),
                spec("west", -215.0, 0.0, &["/w1", "/w2"]),
            ],
            0.0,
        ));

        assert!(!report.is_complete());
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].label(), "broken");

        let labels: Vec<_> = w.iter().map(Beacon::label).collect();
        assert_eq!(labels, ["north", "west"]);
        assert_eq!(w.active_image(report.created[1]).map(String::as_str), Some("/w2"));
    }

    #[test]
    fn test_tick_rotates_after_period() {
        let mut w = world();
        let id = add(&mut w, spec("b", 0.0, 0.0, &["a", "b"]), 0.0);
        let initial = w.active_image(id).cloned();

        assert_eq!(w.tick(29_999.0), 0);
        assert_eq!(w.active_image(id).cloned(), initial);

        assert_eq!(w.tick(30_000.0), 1);
        assert_ne!(w.active_image(id).cloned(), initial);

        assert_eq!(w.tick(59_999.0), 0);
        assert_eq!(w.tick(60_000.0), 1);
        assert_eq!(w.active_image(id).cloned(), initial);
    }

    #[test]
    fn test_tick_same_instant_rotates_once() {
        let mut w = world();
        let id = add(&mut w, spec("b", 0.0, 0.0, &["a", "b", "c"]), 0.0);
        assert_eq!(w.tick(30_000.0), 1);
        assert_eq!(w.tick(30_000.0), 0);
        assert_eq!(w.tick(30_000.0), 0);
        assert_eq!(w.get(id).unwrap().cursor(), 1);
    }

    #[test]
    fn test_tick_every_frame() {
        let mut w = world();
        let id = add(&mut w, spec("b", 0.0, 0.0, &["a", "b"]), 0.0);
        let mut rotations = 0;
        let mut last_rotation = 0.0;
        let mut t = 0.0;
        while t <= 125_000.0 {
            if w.tick(t) > 0 {
                assert!(t - last_rotation >= PERIOD);
                last_rotation = t;
                rotations += 1;
            }
            t += 1000.0 / 60.0;
        }
        assert_eq!(rotations, 4);
        assert_eq!(w.get(id).unwrap().cursor(), 0);
    }

    #[test]
    fn test_late_tick_restarts_period() {
        let mut w = world();
        let id = add(&mut w, spec("b", 0.0, 0.0, &["a", "b"]), 0.0);
        assert_eq!(w.tick(45_000.0), 1);
        // drift carries forward: next rotation is a full period after 45s
        assert_eq!(w.tick(60_000.0), 0);
        assert_eq!(w.tick(74_999.0), 0);
        assert_eq!(w.tick(75_000.0), 1);
        assert_eq!(w.get(id).unwrap().last_rotation_ms(), 75_000.0);
    }

    #[test]
    fn test_tick_ignores_time_going_backward() {
        let mut w = world();
        add(&mut w, spec("b", 0.0, 0.0, &["a", "b"]), 10_000.0);
        assert_eq!(w.tick(0.0), 0);
        assert_eq!(w.tick(-50_000.0), 0);
    }

    #[test]
    fn test_beacons_rotate_independently() {
        let mut w = world();
        let early = add(&mut w, spec("early", 0.0, 0.0, &["a", "b"]), 0.0);
        let late = add(&mut w, spec("late", 0.0, 0.0, &["x", "y"]), 10_000.0);

        assert_eq!(w.tick(30_000.0), 1);
        assert_eq!(w.get(early).unwrap().cursor(), 1);
        assert_eq!(w.get(late).unwrap().cursor(), 0);

        assert_eq!(w.tick(40_000.0), 1);
        assert_eq!(w.get(late).unwrap().cursor(), 1);
    }

    #[test]
    fn test_single_image_stays_put() {
        let mut w = world();
        let id = add(&mut w, spec("b", 0.0, 0.0, &["only"]), 0.0);
        w.tick(30_000.0);
        w.tick(60_000.0);
        assert_eq!(w.active_image(id).map(String::as_str), Some("only"));
    }

    #[test]
    fn test_find_nearest_strict_range() {
        let mut w = world();
        let id = add(&mut w, spec("b", 30.0, 40.0, &["a"]), 0.0);

        assert!(w.find_nearest(Vec2::ZERO, 50.0).is_none());
        let hit = w.find_nearest(Vec2::ZERO, 50.0 + 1e-3).unwrap();
        assert_eq!(hit.id(), id);
        assert!(w.find_nearest_default(Vec2::new(30.0, 0.0)).is_some());
    }

    #[test]
    fn test_find_nearest_picks_minimum() {
        let mut w = world();
        add(&mut w, spec("far", 0.0, 40.0, &["a"]), 0.0);
        let near = add(&mut w, spec("near", 10.0, 0.0, &["a"]), 0.0);
        add(&mut w, spec("out", 500.0, 500.0, &["a"]), 0.0);
        assert_eq!(w.find_nearest(Vec2::ZERO, 50.0).map(Beacon::id), Some(near));
    }

    #[test]
    fn test_find_nearest_tie_is_first_inserted() {
        let mut w = world();
        let first = add(&mut w, spec("east", 10.0, 0.0, &["a"]), 0.0);
        add(&mut w, spec("west", -10.0, 0.0, &["a"]), 0.0);
        for _ in 0..3 {
            assert_eq!(w.find_nearest(Vec2::ZERO, 50.0).map(Beacon::id), Some(first));
        }
    }

    #[test]
    fn test_find_nearest_empty_world() {
        let w = world();
        assert!(w.find_nearest(Vec2::ZERO, f32::INFINITY).is_none());
    }

    #[test]
    fn test_insert_rejects_empty_image_set() {
        let mut w = world();
        let empty = LoadedBeacon::<String> {
            spec: spec("hollow", 0.0, 0.0, &["/gone"]),
            images: Vec::new(),
            failures: vec![LoadError::new("/gone", "404")],
        };
        let err = w.insert(empty, 0.0).unwrap_err();
        assert_eq!(err.label(), "hollow");
        assert!(w.is_empty());

        // The world keeps ticking and querying safely
        assert_eq!(w.tick(30_000.0), 0);
        assert!(w.find_nearest(Vec2::ZERO, 50.0).is_none());
    }

    #[test]
    fn test_new_rejects_bad_period() {
        for period in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = WorldBeacons::<String>::new(period, 50.0).unwrap_err();
            assert!(matches!(
                err,
                SettingsError::Invalid {
                    field: "rotation_period_ms",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_new_rejects_bad_range() {
        for range in [0.0, -5.0, f32::NAN] {
            assert!(WorldBeacons::<String>::new(PERIOD, range).is_err());
        }
    }

    #[test]
    fn test_from_settings_validates() {
        let settings = Settings {
            rotation_period_ms: 0.0,
            ..Settings::default()
        };
        assert!(WorldBeacons::<String>::from_settings(&settings).is_err());
        assert!(WorldBeacons::<String>::from_settings(&Settings::default()).is_ok());
    }
}
