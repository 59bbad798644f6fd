//! Per-frame simulation state
//!
//! Both components are polled by the frame loop on one thread:
//! - `input`: key transitions in, normalized movement out
//! - `beacon`: timed image rotation and proximity queries
//! - `layout`: where the beacons stand

pub mod beacon;
pub mod input;
pub mod layout;

pub use beacon::{
    Beacon, BeaconId, ImageLoader, LoadedBeacon, PopulateReport, WorldBeacons, load_beacon,
};
pub use input::{ActionCallback, Direction, InputState, MovementSample, PhysicalKey};
pub use layout::{BILLBOARD_LINK, BeaconSpec, metropolis_billboards};
