use crate::{data, render, settings};
use render::{Buffer, Context, Framebuffer, Uniform, UniformValue, VertexArrayObject};
use settings::Settings;

use glow::HasContext;
use std::rc::Rc;

static BASE_VERT_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/base.vert"));
static DISPLAY_FRAG_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/display.frag"));

// Composites the dye field onto the drawable surface.
pub struct Drawer {
    context: Context,
    settings: Rc<Settings>,

    width: u32,
    height: u32,

    plane_vertices: Buffer,
    plane_indices: Buffer,
    vertex_buffer: VertexArrayObject,
    display_pass: render::Program,
}

impl Drawer {
    pub fn new(
        context: &Context,
        width: u32,
        height: u32,
        settings: &Rc<Settings>,
    ) -> Result<Self, render::Problem> {
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

        let display_pass = build_display_pass(context, settings)?;
        let vertex_buffer = VertexArrayObject::new(
            context,
            &display_pass,
            &[(&plane_vertices, plane_layout())],
            Some(&plane_indices),
        )?;

        Ok(Self {
            context: Rc::clone(context),
            settings: Rc::clone(settings),
            width,
            height,
            plane_vertices,
            plane_indices,
            vertex_buffer,
            display_pass,
        })
    }

    pub fn update(&mut self, settings: &Rc<Settings>) -> Result<(), render::Problem> {
        // The shading switch is a compile-time keyword, so the display
        // program has to be rebuilt when it flips.
        let rebuild_display = settings.shading != self.settings.shading;
        self.settings = Rc::clone(settings);

        if rebuild_display {
            self.display_pass = build_display_pass(&self.context, settings)?;
            self.vertex_buffer.update(
                &self.display_pass,
                &[(&self.plane_vertices, plane_layout())],
                Some(&self.plane_indices),
            )?;
        }

        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    // Draw the dye's read side over the background with premultiplied alpha.
    pub fn draw(&self, dye: &Framebuffer) {
        unsafe {
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.context
                .viewport(0, 0, self.width as i32, self.height as i32);

            if self.settings.transparent {
                self.context.clear_color(0.0, 0.0, 0.0, 0.0);
            } else {
                let [r, g, b] = self.settings.back_color;
                self.context.clear_color(r, g, b, 1.0);
            }
            self.context.clear(glow::COLOR_BUFFER_BIT);

            self.context.enable(glow::BLEND);
            self.context.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
        }

        self.display_pass.use_program();
        self.vertex_buffer.bind();

        let texel_size = [1.0 / self.width as f32, 1.0 / self.height as f32];
        self.display_pass.set_uniform(&Uniform {
            name: "texelSize",
            value: UniformValue::Vec2(&texel_size),
        });
        dye.attach(0);

        unsafe {
            self.context
                .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
            self.context.disable(glow::BLEND);
        }
    }
}

fn build_display_pass(
    context: &Context,
    settings: &Rc<Settings>,
) -> Result<render::Program, render::Problem> {
    let display_pass = if settings.shading {
        render::Program::new_with_variables(
            context,
            (BASE_VERT_SHADER, DISPLAY_FRAG_SHADER),
            &[("SHADING", "1")],
        )?
    } else {
        render::Program::new(context, (BASE_VERT_SHADER, DISPLAY_FRAG_SHADER))?
    };

    display_pass.set_uniform(&Uniform {
        name: "dyeTexture",
        value: UniformValue::Texture2D(0),
    });

    Ok(display_pass)
}

fn plane_layout() -> render::VertexBufferLayout {
    render::VertexBufferLayout {
        name: "position",
        size: 2,
        type_: glow::FLOAT,
        ..Default::default()
    }
}
