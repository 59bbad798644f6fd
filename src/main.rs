//! SomiVerse entry point
//!
//! Wires the input and billboard systems into a frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_scene {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::HtmlImageElement;

    use somiverse::Settings;
    use somiverse::consts::MAP_LIMIT;
    use somiverse::platform::InputBinding;
    use somiverse::platform::web::{HtmlImageLoader, WindowKeySource, now_ms, open_link};
    use somiverse::sim::{BeaconId, InputState, WorldBeacons, metropolis_billboards};

    /// Scene state owned by the frame loop
    struct Scene {
        input: InputBinding<WindowKeySource>,
        beacons: WorldBeacons<HtmlImageElement>,
        player: Vec2,
        /// Beacon currently showing the interaction prompt
        prompt: Option<BeaconId>,
        /// Set by the Enter callback, consumed next frame
        interact: Rc<Cell<bool>>,
    }

    impl Scene {
        fn frame(&mut self, time: f64) {
            let step = self.input.sample_movement();
            if step.is_moving {
                self.player = (self.player + step.as_vec2())
                    .clamp(Vec2::splat(-MAP_LIMIT), Vec2::splat(MAP_LIMIT));
            }

            self.beacons.tick(time);

            let nearest = self
                .beacons
                .find_nearest_default(self.player)
                .map(|b| b.id());
            if nearest != self.prompt {
                match nearest.and_then(|id| self.beacons.get(id)) {
                    Some(b) => log::info!("Near billboard `{}` - press Enter", b.label()),
                    None => log::info!("Left billboard range"),
                }
                self.prompt = nearest;
            }

            if self.interact.replace(false) {
                if let Some(link) = self
                    .prompt
                    .and_then(|id| self.beacons.get(id))
                    .and_then(|b| b.link())
                {
                    open_link(link);
                }
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");
        log::info!("SomiVerse starting...");

        let settings = Settings::load();
        let Some(keys) = WindowKeySource::new() else {
            log::error!("No window available");
            return;
        };

        let interact = Rc::new(Cell::new(false));
        let mut input = InputState::from_settings(&settings);
        {
            let interact = interact.clone();
            input.bind_action_trigger(move || interact.set(true));
        }
        // Keys are live while billboards load
        let input = InputBinding::new(keys, input);

        let mut beacons = match WorldBeacons::from_settings(&settings) {
            Ok(beacons) => beacons,
            Err(e) => {
                log::error!("Invalid billboard settings: {}", e);
                return;
            }
        };
        let report = beacons
            .populate(&HtmlImageLoader, metropolis_billboards(MAP_LIMIT), now_ms())
            .await;
        for failure in &report.failed {
            log::error!("{}", failure);
        }

        let scene = Rc::new(RefCell::new(Scene {
            input,
            beacons,
            player: Vec2::ZERO,
            prompt: None,
            interact,
        }));

        log::info!("SomiVerse running!");
        request_animation_frame(scene);
    }

    fn request_animation_frame(scene: Rc<RefCell<Scene>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            scene.borrow_mut().frame(time);
            request_animation_frame(scene);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_scene::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("SomiVerse (native) starting...");
    log::info!("Native mode runs a scripted walk - run with `trunk serve` for the web scene");

    native::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::cell::Cell;
    use std::future::Future;
    use std::rc::Rc;

    use futures::executor::block_on;
    use glam::Vec2;

    use somiverse::consts::MAP_LIMIT;
    use somiverse::platform::{InputBinding, ManualKeySource};
    use somiverse::sim::{ImageLoader, InputState, WorldBeacons, metropolis_billboards};
    use somiverse::{LoadError, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Uses the source path itself as the image handle
    struct PathLoader;

    impl ImageLoader for PathLoader {
        type Handle = String;

        fn load(&self, source: &str) -> impl Future<Output = Result<String, LoadError>> {
            futures::future::ready(Ok(source.to_string()))
        }
    }

    /// Walk north to the billboard, interact, then wait for a rotation
    pub fn run() {
        let settings = Settings::load();
        let keys = ManualKeySource::new();
        let interact = Rc::new(Cell::new(0u32));

        let mut input = InputState::from_settings(&settings);
        {
            let interact = interact.clone();
            input.bind_action_trigger(move || interact.set(interact.get() + 1));
        }
        let input = InputBinding::new(keys.clone(), input);

        let mut beacons = match WorldBeacons::from_settings(&settings) {
            Ok(beacons) => beacons,
            Err(e) => {
                log::error!("Invalid billboard settings: {}", e);
                return;
            }
        };
        let report = block_on(beacons.populate(&PathLoader, metropolis_billboards(MAP_LIMIT), 0.0));
        if !report.is_complete() {
            log::warn!("{} billboard(s) missing", report.failed.len());
        }

        let mut player = Vec2::ZERO;
        let mut prompt = None;
        let frames = ((settings.rotation_period_ms + 2_000.0) / FRAME_MS) as u32;

        keys.press("w");
        for frame in 0..frames {
            let now = frame as f64 * FRAME_MS;

            let step = input.sample_movement();
            player = (player + step.as_vec2()).clamp(Vec2::splat(-MAP_LIMIT), Vec2::splat(MAP_LIMIT));

            if beacons.tick(now) > 0 {
                for b in beacons.iter() {
                    log::info!("t={:.1}s `{}` showing {}", now / 1000.0, b.label(), b.active_image());
                }
            }

            let nearest = beacons.find_nearest_default(player).map(|b| b.id());
            if nearest != prompt {
                if let Some(b) = nearest.and_then(|id| beacons.get(id)) {
                    log::info!("t={:.1}s near `{}` at {:?}", now / 1000.0, b.label(), player);
                    keys.release("w");
                    keys.press("Enter");
                    keys.press("Enter");
                    keys.release("Enter");
                }
                prompt = nearest;
            }
        }

        log::info!(
            "Session done: player at {:?}, {} interaction(s)",
            player,
            interact.get()
        );
    }
}
