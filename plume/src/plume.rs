use crate::{color, drawer, fluid, pointer, render, rng, settings};
use color::Color;
use drawer::Drawer;
use fluid::Fluid;
use pointer::Pointer;
use settings::Settings;

use std::rc::Rc;
use thiserror::Error;

// The longest step the physics will take, regardless of how much wall time
// passed since the last tick. A stalled window catching up must not inject
// one giant, destabilising step.
const MAX_TIMESTEP: f32 = 1.0 / 60.0;

// Click splats brighten the pointer color and kick the field harder than a
// drag would.
const CLICK_COLOR_SCALE: f32 = 10.0;
const CLICK_FORCE_X: f32 = 10.0;
const CLICK_FORCE_Y: f32 = 30.0;

#[derive(Error, Debug)]
pub enum Problem {
    #[error(transparent)]
    InvalidSettings(#[from] settings::InvalidSettings),

    #[error(transparent)]
    Render(#[from] render::Problem),
}

// A splat requested by an input event, applied on the next tick.
struct QueuedSplat {
    position: [f32; 2],
    force: [f32; 2],
    color: Color,
}

pub struct Plume {
    settings: Rc<Settings>,

    fluid: Fluid,
    drawer: Drawer,

    pointers: Vec<Pointer>,
    splat_queue: Vec<QueuedSplat>,

    width: u32,
    height: u32,

    last_timestamp: f64,
    color_update_timer: f32,
    running: bool,
}

impl Plume {
    pub fn new(
        context: &render::Context,
        width: u32,
        height: u32,
        settings: &Rc<Settings>,
    ) -> Result<Plume, Problem> {
        log::info!("Initialising the fluid surface at {}x{}", width, height);

        settings.validate()?;
        rng::init_from_seed(&settings.seed);

        let capabilities = render::GpuCapabilities::detect(context)?;
        let fluid = Fluid::new(context, &capabilities, width, height, settings)?;
        let drawer = Drawer::new(context, width, height, settings)?;

        Ok(Plume {
            settings: Rc::clone(settings),

            fluid,
            drawer,

            pointers: vec![Pointer::default()],
            splat_queue: Vec::new(),

            width,
            height,

            last_timestamp: 0.0,
            color_update_timer: 0.0,
            running: true,
        })
    }

    pub fn update(&mut self, settings: &Rc<Settings>) -> Result<(), Problem> {
        settings.validate()?;
        self.settings = Rc::clone(settings);
        self.fluid.update(settings)?;
        self.drawer.update(settings)?;

        Ok(())
    }

    // Record the drawable's new pixel size. The GPU targets are rebuilt at
    // the start of the next tick, not here: input callbacks return
    // immediately.
    pub fn resize(&mut self, width: u32, height: u32) {
        // A minimised window reports a zero size.
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn pointer_down(&mut self, id: i64, x: f64, y: f64) {
        let texcoord = pointer::window_to_texcoord(x, y, self.width, self.height);
        let color = color::generate_color();
        self.pointer_mut(id).record_down(id, texcoord, color);

        let click_color = color::generate_color().scale(CLICK_COLOR_SCALE);
        let force = [
            CLICK_FORCE_X * (rng::gen::<f32>() - 0.5),
            CLICK_FORCE_Y * (rng::gen::<f32>() - 0.5),
        ];
        self.splat_queue.push(QueuedSplat {
            position: texcoord,
            force,
            color: click_color,
        });
    }

    pub fn pointer_move(&mut self, id: i64, x: f64, y: f64) {
        let texcoord = pointer::window_to_texcoord(x, y, self.width, self.height);
        let aspect_ratio = self.width as f32 / self.height as f32;
        self.pointer_mut(id).record_move(texcoord, aspect_ratio);
    }

    pub fn pointer_up(&mut self, id: i64) {
        self.pointer_mut(id).record_up();
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    // Halting the tick loop is the teardown path: once `animate` reports
    // false the host stops scheduling frames, and dropping the instance
    // releases the GPU resources.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // Run one frame. Returns whether the host should schedule another.
    pub fn animate(&mut self, timestamp: f64) -> bool {
        if !self.running {
            return false;
        }

        let timestep = clamp_timestep(0.001 * (timestamp - self.last_timestamp) as f32);
        self.last_timestamp = timestamp;

        if self.fluid.drawable_size() != (self.width, self.height) {
            if let Err(problem) = self.fluid.resize(self.width, self.height) {
                log::error!("Cannot resize the simulation fields: {}", problem);
            }
            self.drawer.resize(self.width, self.height);
        }

        self.update_colors(timestep);

        self.fluid.prepare_pass();
        self.apply_inputs();

        self.fluid.compute_curl();
        self.fluid.apply_vorticity(timestep);
        self.fluid.compute_divergence();
        self.fluid.clear_pressure();
        self.fluid.solve_pressure();
        self.fluid.subtract_gradient();
        self.fluid.advect_velocity(timestep);
        self.fluid.advect_dye(timestep);

        self.drawer.draw(&self.fluid.dye());

        true
    }

    // One active pointer in this design; every identifier maps onto it.
    fn pointer_mut(&mut self, _id: i64) -> &mut Pointer {
        &mut self.pointers[0]
    }

    fn update_colors(&mut self, timestep: f32) {
        let (timer, wrapped) = advance_color_timer(
            self.color_update_timer,
            timestep,
            self.settings.color_update_speed,
        );
        self.color_update_timer = timer;

        if wrapped {
            for pointer in self.pointers.iter_mut() {
                pointer.color = color::generate_color();
            }
        }
    }

    fn apply_inputs(&mut self) {
        let aspect_ratio = self.width as f32 / self.height as f32;

        for splat in self.splat_queue.drain(..) {
            self.fluid
                .splat(splat.position, splat.force, splat.color.into(), aspect_ratio);
        }

        let splat_force = self.settings.splat_force;
        for pointer in self.pointers.iter_mut() {
            if pointer.moved {
                pointer.moved = false;
                self.fluid.splat(
                    pointer.texcoord,
                    [
                        pointer.delta[0] * splat_force,
                        pointer.delta[1] * splat_force,
                    ],
                    pointer.color.into(),
                    aspect_ratio,
                );
            }
        }
    }
}

fn clamp_timestep(elapsed_seconds: f32) -> f32 {
    elapsed_seconds.clamp(0.0, MAX_TIMESTEP)
}

// Returns the advanced timer, wrapped back into [0, 1), and whether it
// wrapped on this tick.
fn advance_color_timer(timer: f32, timestep: f32, speed: f32) -> (f32, bool) {
    let timer = timer + timestep * speed;
    if timer >= 1.0 {
        (timer % 1.0, true)
    } else {
        (timer, false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stalled_frames_are_clamped_to_the_maximum_timestep() {
        // Five seconds in a background tab still steps by a sixtieth.
        assert_relative_eq!(clamp_timestep(5.0), MAX_TIMESTEP);
    }

    #[test]
    fn fast_frames_keep_their_measured_timestep() {
        assert_relative_eq!(clamp_timestep(0.008), 0.008);
    }

    #[test]
    fn backwards_clocks_do_not_reverse_the_simulation() {
        assert_relative_eq!(clamp_timestep(-0.25), 0.0);
    }

    #[test]
    fn color_timer_accumulates_without_wrapping() {
        let (timer, wrapped) = advance_color_timer(0.1, 0.016, 10.0);
        assert_relative_eq!(timer, 0.26);
        assert!(!wrapped);
    }

    #[test]
    fn color_timer_wraps_back_into_the_unit_interval() {
        let (timer, wrapped) = advance_color_timer(0.95, 0.016, 10.0);
        assert!(wrapped);
        assert_relative_eq!(timer, 0.11, epsilon = 1e-6);
        assert!((0.0..1.0).contains(&timer));
    }
}
