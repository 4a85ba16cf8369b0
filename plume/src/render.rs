use glow::HasContext;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use thiserror::Error;

pub type Context = Rc<glow::Context>;
type GlDataType = u32;
type Result<T> = std::result::Result<T, Problem>;

#[derive(Error, Debug)]
pub enum Problem {
    #[error("Cannot create buffer")]
    CannotCreateBuffer,

    #[error("Cannot create texture")]
    CannotCreateTexture,

    #[error("Cannot create framebuffer")]
    CannotCreateFramebuffer,

    #[error("Cannot create vertex array")]
    CannotCreateVertexArray,

    #[error("{}", match .0 {
        Some(log) => format!("Cannot create shader: {}", log),
        None => "Cannot create shader".to_string(),
    })]
    CannotCreateShader(Option<String>),

    #[error("Cannot create program")]
    CannotCreateProgram,

    #[error("Cannot link program: {0}")]
    CannotLinkProgram(String),

    #[error("No renderable floating-point texture format")]
    NoRenderableFloatFormat,

    #[error("Unexpected data size. Expected: {expected:?}. Actual: {actual:?}")]
    WrongDataSize { expected: usize, actual: usize },

    #[error("Vertex attribute type is not supported")]
    CannotBindUnsupportedVertexType,
}

// The channel layouts the simulation asks for. The pressure, divergence, and
// curl fields are scalar, velocity is two-component, and the dye carries
// color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    R,
    Rg,
    Rgba,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelFormat {
    pub internal_format: GlDataType,
    pub format: GlDataType,
    pub type_: GlDataType,
    // Set when the requested channel layout had to be widened to find a
    // format the device can render into.
    pub degraded: bool,
}

impl PixelFormat {
    pub fn components(&self) -> usize {
        match self.format {
            glow::RED => 1,
            glow::RG => 2,
            glow::RGB => 3,
            _ => 4,
        }
    }
}

// Walk from the requested layout to progressively wider ones until the
// device reports a framebuffer-renderable format. The probe is injected so
// the search order can be exercised without a live context.
pub fn resolve_format<F>(request: ChannelLayout, mut is_renderable: F) -> Option<PixelFormat>
where
    F: FnMut(GlDataType) -> bool,
{
    let search: &[(GlDataType, GlDataType)] = match request {
        ChannelLayout::R => &[
            (glow::R16F, glow::RED),
            (glow::RG16F, glow::RG),
            (glow::RGBA16F, glow::RGBA),
        ],
        ChannelLayout::Rg => &[(glow::RG16F, glow::RG), (glow::RGBA16F, glow::RGBA)],
        ChannelLayout::Rgba => &[(glow::RGBA16F, glow::RGBA)],
    };

    for (step, &(internal_format, format)) in search.iter().enumerate() {
        if is_renderable(internal_format) {
            return Some(PixelFormat {
                internal_format,
                format,
                type_: glow::HALF_FLOAT,
                degraded: step > 0,
            });
        }
    }

    None
}

#[derive(Clone, Copy, Debug)]
pub struct GpuCapabilities {
    pub format_rgba: PixelFormat,
    pub format_rg: PixelFormat,
    pub format_r: PixelFormat,
    pub linear_filtering: bool,
}

impl GpuCapabilities {
    pub fn detect(context: &Context) -> Result<Self> {
        let version = context.version();

        let linear_filtering = if version.is_embedded || cfg!(target_arch = "wasm32") {
            let extensions = context.supported_extensions();
            extensions.contains("OES_texture_float_linear")
                || extensions.contains("GL_OES_texture_float_linear")
        } else {
            // Linear filtering of float textures is core in desktop GL 3.0+.
            version.major >= 3
        };

        let mut probe = |internal_format| is_renderable(context, internal_format);
        let format_rgba =
            resolve_format(ChannelLayout::Rgba, &mut probe).ok_or(Problem::NoRenderableFloatFormat)?;
        let format_rg =
            resolve_format(ChannelLayout::Rg, &mut probe).ok_or(Problem::NoRenderableFloatFormat)?;
        let format_r =
            resolve_format(ChannelLayout::R, &mut probe).ok_or(Problem::NoRenderableFloatFormat)?;

        if format_rg.degraded || format_r.degraded {
            log::warn!("Narrow half-float formats are not renderable; widening the channel layout");
        }
        if !linear_filtering {
            log::warn!("Linear filtering of half-float textures is unsupported; falling back to nearest-neighbour sampling");
        }

        unsafe {
            context.clear_color(0.0, 0.0, 0.0, 1.0);
        }

        Ok(Self {
            format_rgba,
            format_rg,
            format_r,
            linear_filtering,
        })
    }

    pub fn filter(&self) -> GlDataType {
        if self.linear_filtering {
            glow::LINEAR
        } else {
            glow::NEAREST
        }
    }
}

// Allocate a tiny texture, attach it to a throwaway framebuffer, and ask the
// driver whether it would render into it.
fn is_renderable(context: &Context, internal_format: GlDataType) -> bool {
    let format = match internal_format {
        glow::R16F => glow::RED,
        glow::RG16F => glow::RG,
        _ => glow::RGBA,
    };

    unsafe {
        let texture = match context.create_texture() {
            Ok(texture) => texture,
            Err(_) => return false,
        };
        context.bind_texture(glow::TEXTURE_2D, Some(texture));
        context.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::NEAREST as i32,
        );
        context.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MAG_FILTER,
            glow::NEAREST as i32,
        );
        context.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_S,
            glow::CLAMP_TO_EDGE as i32,
        );
        context.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_T,
            glow::CLAMP_TO_EDGE as i32,
        );
        context.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            internal_format as i32,
            4,
            4,
            0,
            format,
            glow::HALF_FLOAT,
            None,
        );

        let framebuffer = match context.create_framebuffer() {
            Ok(framebuffer) => framebuffer,
            Err(_) => {
                context.delete_texture(texture);
                return false;
            }
        };
        context.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
        context.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(texture),
            0,
        );
        let status = context.check_framebuffer_status(glow::FRAMEBUFFER);

        context.bind_framebuffer(glow::FRAMEBUFFER, None);
        context.bind_texture(glow::TEXTURE_2D, None);
        context.delete_framebuffer(framebuffer);
        context.delete_texture(texture);

        status == glow::FRAMEBUFFER_COMPLETE
    }
}

#[derive(Debug)]
pub struct Buffer {
    context: Context,
    pub id: glow::Buffer,
    pub size: usize,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_buffer(self.id);
        }
    }
}

impl Buffer {
    pub fn from_bytes(
        context: &Context,
        data: &[u8],
        buffer_type: u32,
        usage: u32,
    ) -> Result<Self> {
        let buffer = unsafe {
            let buffer = context
                .create_buffer()
                .map_err(|_| Problem::CannotCreateBuffer)?;

            context.bind_buffer(buffer_type, Some(buffer));
            context.buffer_data_u8_slice(buffer_type, data, usage);
            context.bind_buffer(buffer_type, None);

            buffer
        };

        Ok(Self {
            context: Rc::clone(context),
            id: buffer,
            size: data.len(),
        })
    }

    pub fn from_f32(context: &Context, data: &[f32], buffer_type: u32, usage: u32) -> Result<Self> {
        Self::from_bytes(context, bytemuck::cast_slice(data), buffer_type, usage)
    }

    pub fn from_u16(context: &Context, data: &[u16], buffer_type: u32, usage: u32) -> Result<Self> {
        Self::from_bytes(context, bytemuck::cast_slice(data), buffer_type, usage)
    }
}

#[derive(Clone, Copy)]
pub struct TextureOptions {
    pub mag_filter: GlDataType,
    pub min_filter: GlDataType,
    pub wrap_s: GlDataType,
    pub wrap_t: GlDataType,
    pub pixel_format: PixelFormat,
}

impl TextureOptions {
    pub fn with_filter(pixel_format: PixelFormat, filter: GlDataType) -> Self {
        Self {
            mag_filter: filter,
            min_filter: filter,
            wrap_s: glow::CLAMP_TO_EDGE,
            wrap_t: glow::CLAMP_TO_EDGE,
            pixel_format,
        }
    }
}

pub struct Framebuffer {
    context: Context,
    pub id: glow::Framebuffer,
    pub width: u32,
    pub height: u32,
    pub texture: glow::Texture,
    pub options: TextureOptions,
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.context
                .bind_framebuffer(glow::FRAMEBUFFER, Some(self.id));
            self.context.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                None,
                0,
            );
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.context.delete_framebuffer(self.id);
            self.context.delete_texture(self.texture);
        }
    }
}

impl Framebuffer {
    pub fn new(
        context: &Context,
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> Result<Self> {
        let (framebuffer, texture) = unsafe {
            let texture = context
                .create_texture()
                .map_err(|_| Problem::CannotCreateTexture)?;

            context.bind_texture(glow::TEXTURE_2D, Some(texture));
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                options.mag_filter as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                options.min_filter as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                options.wrap_s as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                options.wrap_t as i32,
            );
            context.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                options.pixel_format.internal_format as i32,
                width as i32,
                height as i32,
                0,
                options.pixel_format.format,
                options.pixel_format.type_,
                None,
            );
            context.bind_texture(glow::TEXTURE_2D, None);

            let framebuffer = context
                .create_framebuffer()
                .map_err(|_| Problem::CannotCreateFramebuffer)?;
            context.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            context.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            context.bind_framebuffer(glow::FRAMEBUFFER, None);

            (framebuffer, texture)
        };

        Ok(Self {
            context: Rc::clone(context),
            id: framebuffer,
            width,
            height,
            texture,
            options,
        })
    }

    pub fn with_data<T: bytemuck::Pod>(&self, data: Option<&[T]>) -> Result<()> {
        let expected_size =
            self.options.pixel_format.components() * ((self.width * self.height) as usize);
        if let Some(buffer) = data {
            if buffer.len() != expected_size {
                return Err(Problem::WrongDataSize {
                    expected: expected_size,
                    actual: buffer.len(),
                });
            }
        }

        unsafe {
            self.context
                .bind_texture(glow::TEXTURE_2D, Some(self.texture));
            self.context.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                self.options.pixel_format.internal_format as i32,
                self.width as i32,
                self.height as i32,
                0,
                self.options.pixel_format.format,
                self.options.pixel_format.type_,
                data.map(|buffer| bytemuck::cast_slice(buffer)),
            );
            self.context.bind_texture(glow::TEXTURE_2D, None);
        }

        Ok(())
    }

    // Bind this target's texture to the given sampler unit. Returns the unit
    // for convenient uniform assignment.
    pub fn attach(&self, unit: u32) -> u32 {
        unsafe {
            self.context.active_texture(glow::TEXTURE0 + unit);
            self.context
                .bind_texture(glow::TEXTURE_2D, Some(self.texture));
        }
        unit
    }

    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }

    pub fn draw_to<T>(&self, context: &Context, draw_call: T)
    where
        T: Fn(),
    {
        unsafe {
            context.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.id));
            context.viewport(0, 0, self.width as i32, self.height as i32);
            draw_call();
            context.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        }
    }
}

// Two identically shaped render targets behind `read`/`write` role labels.
// `swap` exchanges the labels; the underlying textures never move.
pub struct DoubleFramebuffer {
    pub width: u32,
    pub height: u32,
    front: RefCell<Framebuffer>,
    back: RefCell<Framebuffer>,
}

impl DoubleFramebuffer {
    pub fn new(
        context: &Context,
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> Result<Self> {
        let front = Framebuffer::new(context, width, height, options)?;
        let back = Framebuffer::new(context, width, height, options)?;
        Ok(Self {
            width,
            height,
            front: RefCell::new(front),
            back: RefCell::new(back),
        })
    }

    pub fn with_data<T: bytemuck::Pod>(&self, data: Option<&[T]>) -> Result<()> {
        self.read().with_data(data)?;
        self.write().with_data(data)?;

        Ok(())
    }

    pub fn read(&self) -> Ref<Framebuffer> {
        self.front.borrow()
    }

    pub fn write(&self) -> Ref<Framebuffer> {
        self.back.borrow()
    }

    pub fn swap(&self) {
        self.front.swap(&self.back);
    }

    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }

    // Run a pass that samples the read side and renders into the write side,
    // then swap the roles. The same target is never bound as both input and
    // output of a draw call.
    pub fn draw_to<T>(&self, context: &Context, draw_call: T)
    where
        T: Fn(&Framebuffer),
    {
        let framebuffer = self.write();

        unsafe {
            context.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(framebuffer.id));
            context.viewport(0, 0, framebuffer.width as i32, framebuffer.height as i32);
            draw_call(&self.read());
            context.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        }

        drop(framebuffer);
        self.swap();
    }
}

pub struct Program {
    context: Context,
    pub program: glow::Program,
    attributes: FxHashMap<String, AttributeInfo>,
    uniforms: FxHashMap<String, UniformInfo>,
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_program(self.program);
        }
    }
}

impl Program {
    pub fn new(context: &Context, shaders: (&str, &str)) -> Result<Self> {
        Self::new_impl(context, shaders, None)
    }

    pub fn new_with_variables(
        context: &Context,
        shaders: (&str, &str),
        variables: &[(&'static str, &str)],
    ) -> Result<Self> {
        Self::new_impl(context, shaders, Some(variables))
    }

    fn new_impl(
        context: &Context,
        shaders: (&str, &str),
        optional_variables: Option<&[(&'static str, &str)]>,
    ) -> Result<Self> {
        let vertex_shader = compile_shader(
            context,
            glow::VERTEX_SHADER,
            &preprocess_shader(shaders.0, optional_variables),
        )?;
        let fragment_shader = compile_shader(
            context,
            glow::FRAGMENT_SHADER,
            &preprocess_shader(shaders.1, optional_variables),
        )?;

        let program = unsafe {
            let program = context
                .create_program()
                .map_err(|_| Problem::CannotCreateProgram)?;
            context.attach_shader(program, vertex_shader);
            context.attach_shader(program, fragment_shader);
            context.link_program(program);

            if !context.get_program_link_status(program) {
                return Err(Problem::CannotLinkProgram(
                    context.get_program_info_log(program),
                ));
            }

            // Delete the shaders to free up memory
            context.detach_shader(program, vertex_shader);
            context.detach_shader(program, fragment_shader);
            context.delete_shader(vertex_shader);
            context.delete_shader(fragment_shader);

            program
        };

        // Get attribute locations
        let mut attributes = FxHashMap::default();
        unsafe {
            let attribute_count = context.get_active_attributes(program);
            for num in 0..attribute_count {
                if let Some(info) = context.get_active_attribute(program, num) {
                    if let Some(location) = context.get_attrib_location(program, &info.name) {
                        attributes.insert(
                            info.name,
                            AttributeInfo {
                                type_: info.atype,
                                size: info.size as u32,
                                location,
                            },
                        );
                    }
                }
            }
        }

        // Get uniform locations. The map is immutable from here on; setting
        // a name that didn't survive the link is a no-op.
        let mut uniforms = FxHashMap::default();
        unsafe {
            let uniform_count = context.get_active_uniforms(program);
            for num in 0..uniform_count {
                if let Some(info) = context.get_active_uniform(program, num) {
                    if let Some(location) = context.get_uniform_location(program, &info.name) {
                        uniforms.insert(
                            info.name,
                            UniformInfo {
                                type_: info.utype,
                                size: info.size,
                                location,
                            },
                        );
                    }
                }
            }
        }

        Ok(Program {
            context: Rc::clone(context),
            program,
            attributes,
            uniforms,
        })
    }

    pub fn use_program(&self) {
        unsafe {
            self.context.use_program(Some(self.program));
        }
    }

    pub fn set_uniforms(&self, uniforms: &[&Uniform]) {
        for uniform in uniforms.iter() {
            self.set_uniform(uniform);
        }
    }

    pub fn set_uniform(&self, uniform: &Uniform) {
        let context = &self.context;
        self.use_program();

        unsafe {
            match uniform.value {
                UniformValue::SignedInt(value) => {
                    context.uniform_1_i32(self.get_uniform_location(uniform.name).as_ref(), value)
                }

                UniformValue::Float(value) => {
                    context.uniform_1_f32(self.get_uniform_location(uniform.name).as_ref(), value)
                }

                UniformValue::Vec2(value) => context.uniform_2_f32(
                    self.get_uniform_location(uniform.name).as_ref(),
                    value[0],
                    value[1],
                ),

                UniformValue::Vec3(value) => context.uniform_3_f32(
                    self.get_uniform_location(uniform.name).as_ref(),
                    value[0],
                    value[1],
                    value[2],
                ),

                UniformValue::Texture2D(unit) => {
                    context.uniform_1_i32(
                        self.get_uniform_location(uniform.name).as_ref(),
                        unit as i32,
                    );
                }
            }
        }
    }

    pub fn get_attrib_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).map(|info| info.location)
    }

    pub fn get_uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        self.uniforms.get(name).map(|info| info.location.clone())
    }
}

fn preprocess_shader<'a>(
    source: &'a str,
    optional_variables: Option<&[(&'static str, &str)]>,
) -> Cow<'a, str> {
    if let Some(variables) = optional_variables {
        let preamble = variables.iter().fold(String::new(), |vars, (name, value)| {
            vars + &format!("#define {} {}\n", name, value)
        });

        if source.starts_with("#version") {
            let (version, source_rest) = source.split_once('\n').unwrap_or((source, ""));
            format!("{}\n{}{}", version, preamble, source_rest).into()
        } else {
            (preamble + source).into()
        }
    } else {
        source.into()
    }
}

#[allow(dead_code)]
#[derive(Clone)]
struct AttributeInfo {
    type_: u32,
    size: u32,
    location: u32,
}

#[allow(dead_code)]
#[derive(Clone)]
struct UniformInfo {
    type_: u32,
    size: i32,
    location: glow::UniformLocation,
}

pub struct Uniform<'a> {
    pub name: &'static str,
    pub value: UniformValue<'a>,
}

#[allow(dead_code)]
#[derive(Clone)]
pub enum UniformValue<'a> {
    SignedInt(i32),
    Float(f32),
    Vec2(&'a [f32; 2]),
    Vec3(&'a [f32; 3]),
    Texture2D(u32),
}

pub fn compile_shader(context: &Context, shader_type: u32, source: &str) -> Result<glow::Shader> {
    unsafe {
        let shader = context
            .create_shader(shader_type)
            .map_err(|_| Problem::CannotCreateShader(None))?;
        context.shader_source(shader, source);
        context.compile_shader(shader);

        if context.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            Err(Problem::CannotCreateShader(Some(
                context.get_shader_info_log(shader),
            )))
        }
    }
}

#[derive(Default)]
pub struct VertexBufferLayout {
    pub name: &'static str,
    pub size: u32,
    pub type_: u32,
    pub stride: u32,
    pub offset: u32,
}

pub struct VertexArrayObject {
    context: Context,
    pub id: glow::VertexArray,
}

impl Drop for VertexArrayObject {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_vertex_array(self.id);
        }
    }
}

impl VertexArrayObject {
    pub fn empty(context: &Context) -> Result<Self> {
        let id = unsafe {
            context
                .create_vertex_array()
                .map_err(|_| Problem::CannotCreateVertexArray)?
        };

        Ok(Self {
            id,
            context: Rc::clone(context),
        })
    }

    pub fn new(
        context: &Context,
        program: &Program,
        vertices: &[(&Buffer, VertexBufferLayout)],
        indices: Option<&Buffer>,
    ) -> Result<Self> {
        let vao = Self::empty(context)?;
        vao.update(program, vertices, indices)?;
        Ok(vao)
    }

    pub fn update(
        &self,
        program: &Program,
        vertices: &[(&Buffer, VertexBufferLayout)],
        indices: Option<&Buffer>,
    ) -> Result<()> {
        unsafe {
            self.context.bind_vertex_array(Some(self.id));

            for (vertex, attribute) in vertices.iter() {
                bind_attributes(&self.context, program, vertex, attribute)?;
            }

            if indices.is_some() {
                self.context
                    .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, indices.map(|buffer| buffer.id));
            }

            self.context.bind_vertex_array(None);
        }

        Ok(())
    }

    pub fn bind(&self) {
        unsafe {
            self.context.bind_vertex_array(Some(self.id));
        }
    }
}

pub fn bind_attributes(
    context: &Context,
    program: &Program,
    buffer: &Buffer,
    buffer_layout: &VertexBufferLayout,
) -> Result<()> {
    unsafe {
        context.bind_buffer(glow::ARRAY_BUFFER, Some(buffer.id));

        if let Some(location) = program.get_attrib_location(buffer_layout.name) {
            context.enable_vertex_attrib_array(location);

            match buffer_layout.type_ {
                glow::FLOAT => context.vertex_attrib_pointer_f32(
                    location,
                    buffer_layout.size as i32,
                    buffer_layout.type_,
                    false,
                    buffer_layout.stride as i32,
                    buffer_layout.offset as i32,
                ),
                _ => return Err(Problem::CannotBindUnsupportedVertexType),
            };
        }

        context.bind_buffer(glow::ARRAY_BUFFER, None);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn native_formats_are_not_degraded() {
        let format = resolve_format(ChannelLayout::R, |_| true).unwrap();
        assert_eq!(format.internal_format, glow::R16F);
        assert_eq!(format.format, glow::RED);
        assert!(!format.degraded);

        let format = resolve_format(ChannelLayout::Rg, |_| true).unwrap();
        assert_eq!(format.internal_format, glow::RG16F);
        assert!(!format.degraded);
    }

    #[test]
    fn narrow_formats_widen_to_rgba() {
        // A device that can only render into four-channel float textures.
        let rgba_only = |internal_format| internal_format == glow::RGBA16F;

        let format = resolve_format(ChannelLayout::R, rgba_only).unwrap();
        assert_eq!(format.internal_format, glow::RGBA16F);
        assert_eq!(format.format, glow::RGBA);
        assert_eq!(format.components(), 4);
        assert!(format.degraded);

        let format = resolve_format(ChannelLayout::Rg, rgba_only).unwrap();
        assert_eq!(format.internal_format, glow::RGBA16F);
        assert!(format.degraded);
    }

    #[test]
    fn single_channel_requests_try_rg_before_rgba() {
        let mut probed = Vec::new();
        let result = resolve_format(ChannelLayout::R, |internal_format| {
            probed.push(internal_format);
            false
        });

        assert!(result.is_none());
        assert_eq!(probed, vec![glow::R16F, glow::RG16F, glow::RGBA16F]);
    }

    #[test]
    fn unrenderable_devices_resolve_to_nothing() {
        assert!(resolve_format(ChannelLayout::Rgba, |_| false).is_none());
    }

    #[test]
    fn shader_defines_are_injected_after_the_version_directive() {
        let source = "#version 330\nvoid main() {}\n";
        let processed = preprocess_shader(source, Some(&[("SHADING", "1")]));
        assert_eq!(
            processed,
            "#version 330\n#define SHADING 1\nvoid main() {}\n"
        );

        let bare = preprocess_shader("void main() {}", Some(&[("SHADING", "1")]));
        assert_eq!(bare, "#define SHADING 1\nvoid main() {}");

        let untouched = preprocess_shader(source, None);
        assert_eq!(untouched, source);
    }
}
