use nalgebra::{Matrix4, Point3};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlImageElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext, WebGlTexture, WebGlUniformLocation};

use crate::engine::camera::CameraRig;
use crate::engine::mesh::{Mesh, VERTEX_STRIDE};
use crate::engine::pass::{Blend, DrawStyle, ScenePass, Viewport};
use crate::engine::{rgb, Rgb};

const VERTEX_SHADER: &str = r#"
    attribute vec3 aPosition;
    attribute vec3 aColor;
    attribute vec2 aTexCoord;
    uniform mat4 uModel;
    uniform mat4 uViewProjection;
    uniform float uPointSize;
    varying vec3 vColor;
    varying vec2 vTexCoord;
    varying vec3 vWorldPos;
    varying vec3 vNormal;
    void main() {
        vec4 world = uModel * vec4(aPosition, 1.0);
        gl_Position = uViewProjection * world;
        gl_PointSize = max(1.0, uPointSize / gl_Position.w);
        vWorldPos = world.xyz;
        vNormal = (uModel * vec4(aPosition, 0.0)).xyz;
        vColor = aColor;
        vTexCoord = aTexCoord;
    }
"#;

const FRAGMENT_SHADER: &str = r#"
    precision mediump float;
    varying vec3 vColor;
    varying vec2 vTexCoord;
    varying vec3 vWorldPos;
    varying vec3 vNormal;
    uniform sampler2D uTexture;
    uniform bool uUseTexture;
    uniform bool uUseVertexColor;
    uniform vec3 uColor;
    uniform vec3 uEmissive;
    uniform float uOpacity;
    uniform bool uLit;
    uniform vec3 uAmbient;
    uniform vec3 uLightPosition;
    uniform float uLightIntensity;
    uniform float uLightRange;

    void main() {
        vec3 color = uUseVertexColor ? vColor * uColor : uColor;
        float alpha = uOpacity;

        if (uUseTexture) {
            vec4 texColor = texture2D(uTexture, vTexCoord);
            color *= texColor.rgb;
            alpha *= texColor.a;
        }

        if (uLit) {
            vec3 toLight = uLightPosition - vWorldPos;
            float dist = length(toLight);
            float falloff = clamp(1.0 - dist / uLightRange, 0.0, 1.0);
            float diffuse = max(dot(normalize(vNormal), toLight / max(dist, 0.0001)), 0.0);
            color = color * (uAmbient + vec3(diffuse * uLightIntensity * falloff * falloff));
        }

        gl_FragColor = vec4(color + uEmissive, alpha);
    }
"#;

struct Uniforms {
    model: WebGlUniformLocation,
    view_projection: WebGlUniformLocation,
    point_size: WebGlUniformLocation,
    use_texture: WebGlUniformLocation,
    use_vertex_color: WebGlUniformLocation,
    color: WebGlUniformLocation,
    emissive: WebGlUniformLocation,
    opacity: WebGlUniformLocation,
    lit: WebGlUniformLocation,
    ambient: WebGlUniformLocation,
    light_position: WebGlUniformLocation,
    light_intensity: WebGlUniformLocation,
    light_range: WebGlUniformLocation,
}

impl Uniforms {
    fn locate(gl: &WebGlRenderingContext, program: &WebGlProgram) -> Result<Self, JsValue> {
        let find = |name: &str| {
            gl.get_uniform_location(program, name)
                .ok_or_else(|| JsValue::from_str(&format!("Failed to get {name} location")))
        };
        Ok(Uniforms {
            model: find("uModel")?,
            view_projection: find("uViewProjection")?,
            point_size: find("uPointSize")?,
            use_texture: find("uUseTexture")?,
            use_vertex_color: find("uUseVertexColor")?,
            color: find("uColor")?,
            emissive: find("uEmissive")?,
            opacity: find("uOpacity")?,
            lit: find("uLit")?,
            ambient: find("uAmbient")?,
            light_position: find("uLightPosition")?,
            light_intensity: find("uLightIntensity")?,
            light_range: find("uLightRange")?,
        })
    }
}

/// Point light used by lit materials.
pub struct Lighting {
    pub ambient: Rgb,
    pub position: Point3<f32>,
    pub intensity: f32,
    pub range: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Lighting { ambient: rgb(0x404040), position: Point3::origin(), intensity: 2.0, range: 300.0 }
    }
}

pub struct Renderer {
    pub gl: WebGlRenderingContext,
    uniforms: Uniforms,
    position_attrib: u32,
    color_attrib: u32,
    tex_coord_attrib: u32,
    dynamic_vertex_buffer: WebGlBuffer,
    dynamic_index_buffer: WebGlBuffer,
    view_projection: Matrix4<f32>,
    point_scale: f32,
}

impl Renderer {
    pub fn new(gl: WebGlRenderingContext) -> Result<Self, JsValue> {
        let program = create_program(&gl)?;
        gl.use_program(Some(&program));

        let dynamic_vertex_buffer = gl.create_buffer().ok_or("Failed to create buffer")?;
        let dynamic_index_buffer = gl.create_buffer().ok_or("Failed to create buffer")?;
        let uniforms = Uniforms::locate(&gl, &program)?;

        let position_attrib = attrib_location(&gl, &program, "aPosition")?;
        let color_attrib = attrib_location(&gl, &program, "aColor")?;
        let tex_coord_attrib = attrib_location(&gl, &program, "aTexCoord")?;

        gl.uniform1i(Some(&uniforms.use_texture), 0);
        gl.enable(WebGlRenderingContext::DEPTH_TEST);

        let renderer = Renderer {
            gl,
            uniforms,
            position_attrib,
            color_attrib,
            tex_coord_attrib,
            dynamic_vertex_buffer,
            dynamic_index_buffer,
            view_projection: Matrix4::identity(),
            point_scale: 1.0,
        };
        renderer.set_lighting(&Lighting::default());
        Ok(renderer)
    }

    pub fn set_lighting(&self, lighting: &Lighting) {
        let u = &self.uniforms;
        let (r, g, b) = lighting.ambient;
        self.gl.uniform3f(Some(&u.ambient), r, g, b);
        let p = lighting.position;
        self.gl.uniform3f(Some(&u.light_position), p.x, p.y, p.z);
        self.gl.uniform1f(Some(&u.light_intensity), lighting.intensity);
        self.gl.uniform1f(Some(&u.light_range), lighting.range);
    }

    pub fn clear(&self, r: f32, g: f32, b: f32) {
        self.gl.clear_color(r, g, b, 1.0);
        self.gl.clear(WebGlRenderingContext::COLOR_BUFFER_BIT | WebGlRenderingContext::DEPTH_BUFFER_BIT);
    }

    pub fn canvas(&self) -> Option<HtmlCanvasElement> {
        self.gl.canvas()?.dyn_into::<HtmlCanvasElement>().ok()
    }

    fn set_blend(&self, blend: Blend) {
        match blend {
            Blend::Opaque => {
                self.gl.disable(WebGlRenderingContext::BLEND);
                self.gl.depth_mask(true);
            }
            Blend::Alpha => {
                self.gl.enable(WebGlRenderingContext::BLEND);
                self.gl.blend_func(WebGlRenderingContext::SRC_ALPHA, WebGlRenderingContext::ONE_MINUS_SRC_ALPHA);
                self.gl.depth_mask(false);
            }
            Blend::Additive => {
                self.gl.enable(WebGlRenderingContext::BLEND);
                self.gl.blend_func(WebGlRenderingContext::SRC_ALPHA, WebGlRenderingContext::ONE);
                self.gl.depth_mask(false);
            }
        }
    }

    fn set_model(&self, model: &Matrix4<f32>) {
        self.gl.uniform_matrix4fv_with_f32_array(Some(&self.uniforms.model), false, model.as_slice());
    }

    fn upload_vertices(&self, vertices: &[f32], usage: u32) {
        self.gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&self.dynamic_vertex_buffer));
        // SAFETY: the view is consumed by buffer_data before any allocation can move `vertices`.
        unsafe {
            let vert_array = js_sys::Float32Array::view(vertices);
            self.gl.buffer_data_with_array_buffer_view(WebGlRenderingContext::ARRAY_BUFFER, &vert_array, usage);
        }
    }

    /// Binds positions only, for line and point draws from flat xyz data.
    fn bind_positions_only(&self) {
        let gl = &self.gl;
        gl.vertex_attrib_pointer_with_i32(self.position_attrib, 3, WebGlRenderingContext::FLOAT, false, 0, 0);
        gl.enable_vertex_attrib_array(self.position_attrib);
        gl.disable_vertex_attrib_array(self.color_attrib);
        gl.disable_vertex_attrib_array(self.tex_coord_attrib);
        gl.uniform1i(Some(&self.uniforms.use_vertex_color), 0);
        gl.uniform1i(Some(&self.uniforms.use_texture), 0);
        gl.uniform1i(Some(&self.uniforms.lit), 0);
        gl.uniform3f(Some(&self.uniforms.emissive), 0.0, 0.0, 0.0);
        self.set_model(&Matrix4::identity());
    }

    pub fn create_texture(&self) -> Result<WebGlTexture, JsValue> {
        let texture = self.gl.create_texture().ok_or("Failed to create texture")?;
        self.gl.bind_texture(WebGlRenderingContext::TEXTURE_2D, Some(&texture));
        Ok(texture)
    }

    /// Uploads a decoded image. Non power-of-two images are clamped and
    /// filtered linearly since WebGL 1 cannot mipmap them.
    pub fn texture_from_image(&self, img: &HtmlImageElement) -> Result<WebGlTexture, JsValue> {
        let texture = self.create_texture()?;
        // rows go up top first, matching the sphere's v = 0 at the north pole
        self.gl.pixel_storei(WebGlRenderingContext::UNPACK_FLIP_Y_WEBGL, 0);
        self.gl.tex_image_2d_with_u32_and_u32_and_image(
            WebGlRenderingContext::TEXTURE_2D,
            0,
            WebGlRenderingContext::RGBA as i32,
            WebGlRenderingContext::RGBA,
            WebGlRenderingContext::UNSIGNED_BYTE,
            img,
        )?;
        self.finish_texture(img.natural_width(), img.natural_height());
        Ok(texture)
    }

    /// Uploads raw RGBA pixels.
    pub fn texture_from_pixels(&self, width: u32, height: u32, pixels: &[u8]) -> Result<WebGlTexture, JsValue> {
        let texture = self.create_texture()?;
        self.gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            WebGlRenderingContext::TEXTURE_2D,
            0,
            WebGlRenderingContext::RGBA as i32,
            width as i32,
            height as i32,
            0,
            WebGlRenderingContext::RGBA,
            WebGlRenderingContext::UNSIGNED_BYTE,
            Some(pixels),
        )?;
        self.finish_texture(width, height);
        Ok(texture)
    }

    fn finish_texture(&self, width: u32, height: u32) {
        let gl = &self.gl;
        if is_power_of_2(width) && is_power_of_2(height) {
            gl.generate_mipmap(WebGlRenderingContext::TEXTURE_2D);
        } else {
            gl.tex_parameteri(WebGlRenderingContext::TEXTURE_2D, WebGlRenderingContext::TEXTURE_WRAP_S, WebGlRenderingContext::CLAMP_TO_EDGE as i32);
            gl.tex_parameteri(WebGlRenderingContext::TEXTURE_2D, WebGlRenderingContext::TEXTURE_WRAP_T, WebGlRenderingContext::CLAMP_TO_EDGE as i32);
            gl.tex_parameteri(WebGlRenderingContext::TEXTURE_2D, WebGlRenderingContext::TEXTURE_MIN_FILTER, WebGlRenderingContext::LINEAR as i32);
        }
    }
}

impl ScenePass for Renderer {
    type Texture = WebGlTexture;

    /// Resizes the drawing buffer and the GL viewport together.
    fn resize(&mut self, viewport: Viewport) {
        if let Some(canvas) = self.canvas() {
            canvas.set_width(viewport.width);
            canvas.set_height(viewport.height);
        }
        self.gl.viewport(0, 0, viewport.width as i32, viewport.height as i32);
    }

    fn begin(&mut self, camera: &CameraRig, viewport: Viewport) {
        self.clear(0.0, 0.0, 0.0);
        self.set_blend(Blend::Opaque);

        self.view_projection = camera.view_projection();
        self.gl.uniform_matrix4fv_with_f32_array(
            Some(&self.uniforms.view_projection),
            false,
            self.view_projection.as_slice(),
        );
        // pixels per world unit at distance 1, for distance-attenuated points
        let half_fov = (camera.fov_degrees.to_radians() / 2.0).tan();
        self.point_scale = viewport.height as f32 / 2.0 / half_fov;
    }

    fn draw_mesh(&mut self, mesh: &Mesh, model: &Matrix4<f32>, style: &DrawStyle<'_, WebGlTexture>) {
        let gl = &self.gl;
        let u = &self.uniforms;

        self.set_blend(style.blend);
        match style.texture {
            Some(tex) => {
                gl.active_texture(WebGlRenderingContext::TEXTURE0);
                gl.bind_texture(WebGlRenderingContext::TEXTURE_2D, Some(tex));
                gl.uniform1i(Some(&u.use_texture), 1);
            }
            None => gl.uniform1i(Some(&u.use_texture), 0),
        }
        let (r, g, b) = style.color;
        gl.uniform3f(Some(&u.color), r, g, b);
        let (er, eg, eb) = style.emissive.unwrap_or((0.0, 0.0, 0.0));
        gl.uniform3f(Some(&u.emissive), er, eg, eb);
        gl.uniform1f(Some(&u.opacity), style.opacity);
        gl.uniform1i(Some(&u.lit), style.lit as i32);
        gl.uniform1i(Some(&u.use_vertex_color), 1);

        // rings and sprites are seen from both sides
        if style.blend == Blend::Opaque {
            gl.enable(WebGlRenderingContext::CULL_FACE);
        } else {
            gl.disable(WebGlRenderingContext::CULL_FACE);
        }

        self.upload_vertices(&mesh.vertices, WebGlRenderingContext::STATIC_DRAW);
        gl.bind_buffer(WebGlRenderingContext::ELEMENT_ARRAY_BUFFER, Some(&self.dynamic_index_buffer));
        // SAFETY: as in upload_vertices.
        unsafe {
            let idx_array = js_sys::Uint16Array::view(&mesh.indices);
            gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ELEMENT_ARRAY_BUFFER,
                &idx_array,
                WebGlRenderingContext::STATIC_DRAW,
            );
        }

        let stride = (VERTEX_STRIDE * 4) as i32;
        gl.vertex_attrib_pointer_with_i32(self.position_attrib, 3, WebGlRenderingContext::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(self.position_attrib);
        gl.vertex_attrib_pointer_with_i32(self.color_attrib, 3, WebGlRenderingContext::FLOAT, false, stride, 12);
        gl.enable_vertex_attrib_array(self.color_attrib);
        gl.vertex_attrib_pointer_with_i32(self.tex_coord_attrib, 2, WebGlRenderingContext::FLOAT, false, stride, 24);
        gl.enable_vertex_attrib_array(self.tex_coord_attrib);

        self.set_model(model);

        gl.draw_elements_with_i32(
            WebGlRenderingContext::TRIANGLES,
            mesh.indices.len() as i32,
            WebGlRenderingContext::UNSIGNED_SHORT,
            0,
        );
    }

    fn draw_line_strip(&mut self, points: &[f32], color: Rgb, opacity: f32) {
        self.set_blend(if opacity < 1.0 { Blend::Alpha } else { Blend::Opaque });
        self.upload_vertices(points, WebGlRenderingContext::DYNAMIC_DRAW);
        self.bind_positions_only();

        let (r, g, b) = color;
        self.gl.uniform3f(Some(&self.uniforms.color), r, g, b);
        self.gl.uniform1f(Some(&self.uniforms.opacity), opacity);

        self.gl.draw_arrays(WebGlRenderingContext::LINE_STRIP, 0, (points.len() / 3) as i32);
    }

    fn draw_points(&mut self, points: &[f32], color: Rgb, size: f32) {
        self.set_blend(Blend::Alpha);
        self.upload_vertices(points, WebGlRenderingContext::DYNAMIC_DRAW);
        self.bind_positions_only();

        let (r, g, b) = color;
        self.gl.uniform3f(Some(&self.uniforms.color), r, g, b);
        self.gl.uniform1f(Some(&self.uniforms.opacity), 1.0);
        self.gl.uniform1f(Some(&self.uniforms.point_size), size * self.point_scale);

        self.gl.draw_arrays(WebGlRenderingContext::POINTS, 0, (points.len() / 3) as i32);
        self.gl.uniform1f(Some(&self.uniforms.point_size), 0.0);
    }
}

fn is_power_of_2(value: u32) -> bool {
    value != 0 && (value & (value - 1)) == 0
}

fn attrib_location(gl: &WebGlRenderingContext, program: &WebGlProgram, name: &str) -> Result<u32, JsValue> {
    let location = gl.get_attrib_location(program, name);
    if location < 0 {
        Err(JsValue::from_str(&format!("Failed to get {name} attribute")))
    } else {
        Ok(location as u32)
    }
}

fn create_program(gl: &WebGlRenderingContext) -> Result<WebGlProgram, JsValue> {
    let vert_shader = compile_shader(gl, WebGlRenderingContext::VERTEX_SHADER, VERTEX_SHADER)?;
    let frag_shader = compile_shader(gl, WebGlRenderingContext::FRAGMENT_SHADER, FRAGMENT_SHADER)?;

    let program = gl.create_program().ok_or("Unable to create program")?;
    gl.attach_shader(&program, &vert_shader);
    gl.attach_shader(&program, &frag_shader);
    gl.link_program(&program);

    if gl.get_program_parameter(&program, WebGlRenderingContext::LINK_STATUS).as_bool().unwrap_or(false) {
        Ok(program)
    } else {
        Err(JsValue::from_str(&gl.get_program_info_log(&program).unwrap_or_default()))
    }
}

fn compile_shader(gl: &WebGlRenderingContext, shader_type: u32, source: &str) -> Result<web_sys::WebGlShader, JsValue> {
    let shader = gl.create_shader(shader_type).ok_or("Unable to create shader")?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl.get_shader_parameter(&shader, WebGlRenderingContext::COMPILE_STATUS).as_bool().unwrap_or(false) {
        Ok(shader)
    } else {
        Err(JsValue::from_str(&gl.get_shader_info_log(&shader).unwrap_or_default()))
    }
}
