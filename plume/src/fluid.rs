use crate::{data, render, settings};
use render::{
    Buffer, Context, DoubleFramebuffer, Framebuffer, GpuCapabilities, TextureOptions, Uniform,
    UniformValue, VertexArrayObject,
};
use settings::Settings;

use glow::HasContext;
use half::f16;
use std::cell::Ref;
use std::rc::Rc;

static BASE_VERT_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/base.vert"));
static SPLAT_FRAG_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/splat.frag"));
static CURL_FRAG_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/curl.frag"));
static VORTICITY_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/vorticity.frag"));
static DIVERGENCE_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/divergence.frag"));
static CLEAR_FRAG_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/clear.frag"));
static PRESSURE_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/pressure.frag"));
static SUBTRACT_GRADIENT_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/subtract_gradient.frag"));
static ADVECTION_FRAG_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/shaders/advection.frag"));

pub struct Fluid {
    context: Context,
    settings: Rc<Settings>,
    capabilities: GpuCapabilities,

    drawable_size: (u32, u32),

    vertex_buffer: VertexArrayObject,
    #[allow(unused)]
    plane_vertices: Buffer,
    #[allow(unused)]
    plane_indices: Buffer,

    velocity_textures: DoubleFramebuffer,
    dye_textures: DoubleFramebuffer,
    pressure_textures: DoubleFramebuffer,
    divergence_texture: Framebuffer,
    curl_texture: Framebuffer,

    splat_pass: render::Program,
    curl_pass: render::Program,
    vorticity_pass: render::Program,
    divergence_pass: render::Program,
    clear_pressure_pass: render::Program,
    pressure_pass: render::Program,
    subtract_gradient_pass: render::Program,
    advection_pass: render::Program,
}

impl Fluid {
    pub fn new(
        context: &Context,
        capabilities: &GpuCapabilities,
        width: u32,
        height: u32,
        settings: &Rc<Settings>,
    ) -> Result<Self, render::Problem> {
        let simulation_size = compute_field_size(settings.sim_resolution, width, height);
        let dye_size = compute_field_size(settings.dye_resolution, width, height);

        let (velocity_textures, dye_textures, pressure_textures, divergence_texture, curl_texture) =
            create_field_textures(context, capabilities, simulation_size, dye_size)?;

        // Geometry
        let plane_vertices = Buffer::from_f32(
            context,
            &data::PLANE_VERTICES,
            glow::ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;
        let plane_indices = Buffer::from_u16(
            context,
            &data::PLANE_INDICES,
            glow::ELEMENT_ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;

        let splat_pass = render::Program::new(context, (BASE_VERT_SHADER, SPLAT_FRAG_SHADER))?;
        let curl_pass = render::Program::new(context, (BASE_VERT_SHADER, CURL_FRAG_SHADER))?;
        let vorticity_pass =
            render::Program::new(context, (BASE_VERT_SHADER, VORTICITY_FRAG_SHADER))?;
        let divergence_pass =
            render::Program::new(context, (BASE_VERT_SHADER, DIVERGENCE_FRAG_SHADER))?;
        let clear_pressure_pass =
            render::Program::new(context, (BASE_VERT_SHADER, CLEAR_FRAG_SHADER))?;
        let pressure_pass = render::Program::new(context, (BASE_VERT_SHADER, PRESSURE_FRAG_SHADER))?;
        let subtract_gradient_pass =
            render::Program::new(context, (BASE_VERT_SHADER, SUBTRACT_GRADIENT_FRAG_SHADER))?;
        let advection_pass =
            render::Program::new(context, (BASE_VERT_SHADER, ADVECTION_FRAG_SHADER))?;

        // Samplers are bound to fixed texture units; assign them once.
        splat_pass.set_uniform(&Uniform {
            name: "targetTexture",
            value: UniformValue::Texture2D(0),
        });
        curl_pass.set_uniform(&Uniform {
            name: "velocityTexture",
            value: UniformValue::Texture2D(0),
        });
        vorticity_pass.set_uniforms(&[
            &Uniform {
                name: "velocityTexture",
                value: UniformValue::Texture2D(0),
            },
            &Uniform {
                name: "curlTexture",
                value: UniformValue::Texture2D(1),
            },
        ]);
        divergence_pass.set_uniform(&Uniform {
            name: "velocityTexture",
            value: UniformValue::Texture2D(0),
        });
        clear_pressure_pass.set_uniform(&Uniform {
            name: "pressureTexture",
            value: UniformValue::Texture2D(0),
        });
        pressure_pass.set_uniforms(&[
            &Uniform {
                name: "divergenceTexture",
                value: UniformValue::Texture2D(0),
            },
            &Uniform {
                name: "pressureTexture",
                value: UniformValue::Texture2D(1),
            },
        ]);
        subtract_gradient_pass.set_uniforms(&[
            &Uniform {
                name: "pressureTexture",
                value: UniformValue::Texture2D(0),
            },
            &Uniform {
                name: "velocityTexture",
                value: UniformValue::Texture2D(1),
            },
        ]);
        advection_pass.set_uniforms(&[
            &Uniform {
                name: "velocityTexture",
                value: UniformValue::Texture2D(0),
            },
            &Uniform {
                name: "sourceTexture",
                value: UniformValue::Texture2D(1),
            },
        ]);

        let vertex_buffer = VertexArrayObject::new(
            context,
            &advection_pass,
            &[(
                &plane_vertices,
                render::VertexBufferLayout {
                    name: "position",
                    size: 2,
                    type_: glow::FLOAT,
                    ..Default::default()
                },
            )],
            Some(&plane_indices),
        )?;

        Ok(Self {
            context: Rc::clone(context),
            settings: Rc::clone(settings),
            capabilities: *capabilities,

            drawable_size: (width, height),

            vertex_buffer,
            plane_vertices,
            plane_indices,

            velocity_textures,
            dye_textures,
            pressure_textures,
            divergence_texture,
            curl_texture,

            splat_pass,
            curl_pass,
            vorticity_pass,
            divergence_pass,
            clear_pressure_pass,
            pressure_pass,
            subtract_gradient_pass,
            advection_pass,
        })
    }

    pub fn update(&mut self, settings: &Rc<Settings>) -> Result<(), render::Problem> {
        self.settings = Rc::clone(settings);

        // A new configuration may ask for different field resolutions.
        let (width, height) = self.drawable_size;
        self.resize(width, height)
    }

    // Reallocate every field for a new drawable size. The previous contents
    // are discarded; stretching a velocity field to a new aspect ratio bends
    // the simulation visibly.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), render::Problem> {
        self.drawable_size = (width, height);

        let simulation_size = compute_field_size(self.settings.sim_resolution, width, height);
        let dye_size = compute_field_size(self.settings.dye_resolution, width, height);

        if simulation_size == self.simulation_size() && dye_size == self.dye_size() {
            return Ok(());
        }

        let (velocity_textures, dye_textures, pressure_textures, divergence_texture, curl_texture) =
            create_field_textures(&self.context, &self.capabilities, simulation_size, dye_size)?;

        self.velocity_textures = velocity_textures;
        self.dye_textures = dye_textures;
        self.pressure_textures = pressure_textures;
        self.divergence_texture = divergence_texture;
        self.curl_texture = curl_texture;

        Ok(())
    }

    pub fn drawable_size(&self) -> (u32, u32) {
        self.drawable_size
    }

    pub fn simulation_size(&self) -> (u32, u32) {
        (self.velocity_textures.width, self.velocity_textures.height)
    }

    pub fn dye_size(&self) -> (u32, u32) {
        (self.dye_textures.width, self.dye_textures.height)
    }

    pub fn dye(&self) -> Ref<Framebuffer> {
        self.dye_textures.read()
    }

    // Bind the shared quad and switch off blending before running the pass
    // chain. Every pass renders the full target; blending would mix in stale
    // texels.
    pub fn prepare_pass(&self) {
        unsafe {
            self.context.disable(glow::BLEND);
        }
        self.vertex_buffer.bind();
    }

    // Add a Gaussian impulse to the velocity field and a blob of color to the
    // dye field at the given texture coordinate.
    pub fn splat(&self, position: [f32; 2], force: [f32; 2], color: [f32; 3], aspect_ratio: f32) {
        let radius = correct_radius(self.settings.splat_radius / 100.0, aspect_ratio);

        self.splat_pass.use_program();
        self.splat_pass.set_uniforms(&[
            &Uniform {
                name: "aspectRatio",
                value: UniformValue::Float(aspect_ratio),
            },
            &Uniform {
                name: "point",
                value: UniformValue::Vec2(&position),
            },
            &Uniform {
                name: "radius",
                value: UniformValue::Float(radius),
            },
        ]);

        let velocity_texel_size = self.velocity_textures.texel_size();
        self.velocity_textures
            .draw_to(&self.context, |velocity| unsafe {
                self.splat_pass.set_uniforms(&[
                    &Uniform {
                        name: "texelSize",
                        value: UniformValue::Vec2(&velocity_texel_size),
                    },
                    &Uniform {
                        name: "color",
                        value: UniformValue::Vec3(&[force[0], force[1], 0.0]),
                    },
                ]);
                velocity.attach(0);
                self.context
                    .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
            });

        let dye_texel_size = self.dye_textures.texel_size();
        self.dye_textures.draw_to(&self.context, |dye| unsafe {
            self.splat_pass.set_uniforms(&[
                &Uniform {
                    name: "texelSize",
                    value: UniformValue::Vec2(&dye_texel_size),
                },
                &Uniform {
                    name: "color",
                    value: UniformValue::Vec3(&color),
                },
            ]);
            dye.attach(0);
            self.context
                .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
        });
    }

    pub fn compute_curl(&self) {
        let texel_size = self.velocity_textures.texel_size();

        self.curl_texture.draw_to(&self.context, || unsafe {
            self.curl_pass.use_program();
            self.curl_pass.set_uniform(&Uniform {
                name: "texelSize",
                value: UniformValue::Vec2(&texel_size),
            });
            self.velocity_textures.read().attach(0);
            self.context
                .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
        });
    }

    pub fn apply_vorticity(&self, timestep: f32) {
        let texel_size = self.velocity_textures.texel_size();

        self.vorticity_pass.use_program();
        self.vorticity_pass.set_uniforms(&[
            &Uniform {
                name: "texelSize",
                value: UniformValue::Vec2(&texel_size),
            },
            &Uniform {
                name: "curl",
                value: UniformValue::Float(self.settings.curl),
            },
            &Uniform {
                name: "deltaTime",
                value: UniformValue::Float(timestep),
            },
        ]);

        self.velocity_textures
            .draw_to(&self.context, |velocity| unsafe {
                velocity.attach(0);
                self.curl_texture.attach(1);
                self.context
                    .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
            });
    }

    pub fn compute_divergence(&self) {
        let texel_size = self.velocity_textures.texel_size();

        self.divergence_texture.draw_to(&self.context, || unsafe {
            self.divergence_pass.use_program();
            self.divergence_pass.set_uniform(&Uniform {
                name: "texelSize",
                value: UniformValue::Vec2(&texel_size),
            });
            self.velocity_textures.read().attach(0);
            self.context
                .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
        });
    }

    // Seed the next Jacobi solve with a faded copy of the previous pressure
    // field rather than a hard clear.
    pub fn clear_pressure(&self) {
        self.clear_pressure_pass.use_program();
        self.clear_pressure_pass.set_uniform(&Uniform {
            name: "value",
            value: UniformValue::Float(self.settings.pressure),
        });

        self.pressure_textures
            .draw_to(&self.context, |pressure| unsafe {
                pressure.attach(0);
                self.context
                    .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
            });
    }

    pub fn solve_pressure(&self) {
        let texel_size = self.velocity_textures.texel_size();

        self.pressure_pass.use_program();
        self.pressure_pass.set_uniform(&Uniform {
            name: "texelSize",
            value: UniformValue::Vec2(&texel_size),
        });
        self.divergence_texture.attach(0);

        for _ in 0..self.settings.pressure_iterations {
            self.pressure_textures
                .draw_to(&self.context, |pressure| unsafe {
                    pressure.attach(1);
                    self.context
                        .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
                });
        }
    }

    pub fn subtract_gradient(&self) {
        let texel_size = self.velocity_textures.texel_size();

        self.subtract_gradient_pass.use_program();
        self.subtract_gradient_pass.set_uniform(&Uniform {
            name: "texelSize",
            value: UniformValue::Vec2(&texel_size),
        });

        self.velocity_textures
            .draw_to(&self.context, |velocity| unsafe {
                self.pressure_textures.read().attach(0);
                velocity.attach(1);
                self.context
                    .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
            });
    }

    pub fn advect_velocity(&self, timestep: f32) {
        let texel_size = self.velocity_textures.texel_size();

        self.advection_pass.use_program();
        self.advection_pass.set_uniforms(&[
            &Uniform {
                name: "texelSize",
                value: UniformValue::Vec2(&texel_size),
            },
            &Uniform {
                name: "sourceTexelSize",
                value: UniformValue::Vec2(&texel_size),
            },
            &Uniform {
                name: "deltaTime",
                value: UniformValue::Float(timestep),
            },
            &Uniform {
                name: "dissipation",
                value: UniformValue::Float(self.settings.velocity_dissipation),
            },
        ]);

        self.velocity_textures
            .draw_to(&self.context, |velocity| unsafe {
                // The velocity field advects itself.
                velocity.attach(0);
                velocity.attach(1);
                self.context
                    .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
            });
    }

    pub fn advect_dye(&self, timestep: f32) {
        let texel_size = self.velocity_textures.texel_size();
        let dye_texel_size = self.dye_textures.texel_size();

        self.advection_pass.use_program();
        self.advection_pass.set_uniforms(&[
            &Uniform {
                name: "texelSize",
                value: UniformValue::Vec2(&texel_size),
            },
            &Uniform {
                name: "sourceTexelSize",
                value: UniformValue::Vec2(&dye_texel_size),
            },
            &Uniform {
                name: "deltaTime",
                value: UniformValue::Float(timestep),
            },
            &Uniform {
                name: "dissipation",
                value: UniformValue::Float(self.settings.density_dissipation),
            },
        ]);

        self.dye_textures.draw_to(&self.context, |dye| unsafe {
            self.velocity_textures.read().attach(0);
            dye.attach(1);
            self.context
                .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
        });
    }
}

type FieldTextures = (
    DoubleFramebuffer,
    DoubleFramebuffer,
    DoubleFramebuffer,
    Framebuffer,
    Framebuffer,
);

fn create_field_textures(
    context: &Context,
    capabilities: &GpuCapabilities,
    simulation_size: (u32, u32),
    dye_size: (u32, u32),
) -> Result<FieldTextures, render::Problem> {
    let (sim_width, sim_height) = simulation_size;
    let (dye_width, dye_height) = dye_size;
    let filter = capabilities.filter();

    let half_float_zero = f16::from_f32(0.0);
    let sim_cells = (sim_width * sim_height) as usize;
    let dye_cells = (dye_width * dye_height) as usize;

    let zero_array_velocity =
        vec![half_float_zero; capabilities.format_rg.components() * sim_cells];
    let zero_array_dye = vec![half_float_zero; capabilities.format_rgba.components() * dye_cells];
    let zero_array_scalar = vec![half_float_zero; capabilities.format_r.components() * sim_cells];

    let velocity_textures = DoubleFramebuffer::new(
        context,
        sim_width,
        sim_height,
        TextureOptions::with_filter(capabilities.format_rg, filter),
    )?;
    velocity_textures.with_data(Some(&zero_array_velocity))?;

    let dye_textures = DoubleFramebuffer::new(
        context,
        dye_width,
        dye_height,
        TextureOptions::with_filter(capabilities.format_rgba, filter),
    )?;
    dye_textures.with_data(Some(&zero_array_dye))?;

    let pressure_textures = DoubleFramebuffer::new(
        context,
        sim_width,
        sim_height,
        TextureOptions::with_filter(capabilities.format_r, glow::NEAREST),
    )?;
    pressure_textures.with_data(Some(&zero_array_scalar))?;

    let divergence_texture = Framebuffer::new(
        context,
        sim_width,
        sim_height,
        TextureOptions::with_filter(capabilities.format_r, glow::NEAREST),
    )?;
    divergence_texture.with_data(Some(&zero_array_scalar))?;

    let curl_texture = Framebuffer::new(
        context,
        sim_width,
        sim_height,
        TextureOptions::with_filter(capabilities.format_r, glow::NEAREST),
    )?;
    curl_texture.with_data(Some(&zero_array_scalar))?;

    Ok((
        velocity_textures,
        dye_textures,
        pressure_textures,
        divergence_texture,
        curl_texture,
    ))
}

// The smaller dimension of the drawable gets the base resolution; the larger
// gets the base scaled by the aspect ratio.
fn compute_field_size(resolution: u32, width: u32, height: u32) -> (u32, u32) {
    let mut aspect_ratio = width as f32 / height as f32;
    if aspect_ratio < 1.0 {
        aspect_ratio = 1.0 / aspect_ratio;
    }

    let min = resolution;
    let max = (resolution as f32 * aspect_ratio).round() as u32;

    if width > height {
        (max, min)
    } else {
        (min, max)
    }
}

// Texture space squeezes the splat on non-square drawables; widen the radius
// to compensate.
fn correct_radius(radius: f32, aspect_ratio: f32) -> f32 {
    if aspect_ratio > 1.0 {
        radius * aspect_ratio
    } else {
        radius
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn landscape_drawables_scale_the_width() {
        assert_eq!(compute_field_size(128, 800, 600), (171, 128));
        assert_eq!(compute_field_size(1440, 1920, 1080), (2560, 1440));
    }

    #[test]
    fn portrait_drawables_scale_the_height() {
        assert_eq!(compute_field_size(128, 600, 800), (128, 171));
    }

    #[test]
    fn square_drawables_keep_the_base_resolution() {
        assert_eq!(compute_field_size(128, 1024, 1024), (128, 128));
    }

    #[test]
    fn doubling_the_width_doubles_the_field_aspect_ratio() {
        let (width_before, height_before) = compute_field_size(128, 800, 600);
        let (width_after, height_after) = compute_field_size(128, 1600, 600);

        assert_eq!((width_after, height_after), (341, 128));

        let ratio_before = width_before as f32 / height_before as f32;
        let ratio_after = width_after as f32 / height_after as f32;
        assert_relative_eq!(ratio_after / ratio_before, 2.0, epsilon = 0.01);
    }

    #[test]
    fn splat_radius_is_widened_on_landscape_drawables() {
        assert_relative_eq!(correct_radius(0.002, 2.0), 0.004);
        assert_relative_eq!(correct_radius(0.002, 1.0), 0.002);
        assert_relative_eq!(correct_radius(0.002, 0.5), 0.002);
    }
}
