use glutin::dpi::PhysicalPosition;
use glutin::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use glutin::event_loop::{ControlFlow, EventLoop};
use glutin::window::Window;
use glutin::PossiblyCurrent;
use plume::{Plume, Settings, MOUSE_POINTER_ID};
use std::rc::Rc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Rc::new(read_settings());

    let logical_size = glutin::dpi::LogicalSize::new(1280, 800);
    let (context, window, event_loop) = get_rendering_context(logical_size);
    let physical_size = logical_size.to_physical(window.window().scale_factor());

    let context = Rc::new(context);
    let mut plume = match Plume::new(&context, physical_size.width, physical_size.height, &settings)
    {
        Ok(plume) => plume,
        Err(problem) => {
            log::error!("{}", problem);
            std::process::exit(1);
        }
    };

    let start = std::time::Instant::now();
    let mut cursor_position = PhysicalPosition::new(0.0, 0.0);

    event_loop.run(move |event, _, control_flow| {
        let next_frame_time =
            std::time::Instant::now() + std::time::Duration::from_nanos(16_666_667);
        *control_flow = ControlFlow::WaitUntil(next_frame_time);

        match event {
            Event::MainEventsCleared => {
                window.window().request_redraw();
            }

            Event::RedrawRequested(_) => {
                if !plume.animate(start.elapsed().as_secs_f64() * 1000.0) {
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                window.swap_buffers().unwrap();
            }

            Event::WindowEvent { ref event, .. } => match event {
                WindowEvent::Resized(physical_size) => {
                    window.resize(*physical_size);
                    plume.resize(physical_size.width, physical_size.height);
                }

                WindowEvent::CursorMoved { position, .. } => {
                    cursor_position = *position;
                    plume.pointer_move(MOUSE_POINTER_ID, position.x, position.y);
                }

                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => {
                        plume.pointer_down(MOUSE_POINTER_ID, cursor_position.x, cursor_position.y)
                    }
                    ElementState::Released => plume.pointer_up(MOUSE_POINTER_ID),
                },

                WindowEvent::Touch(touch) => {
                    let id = touch.id as i64;
                    match touch.phase {
                        TouchPhase::Started => {
                            plume.pointer_down(id, touch.location.x, touch.location.y)
                        }
                        TouchPhase::Moved => {
                            plume.pointer_move(id, touch.location.x, touch.location.y)
                        }
                        TouchPhase::Ended | TouchPhase::Cancelled => plume.pointer_up(id),
                    }
                }

                WindowEvent::CloseRequested => {
                    plume.stop();
                    *control_flow = ControlFlow::Exit;
                }

                _ => (),
            },

            _ => (),
        }
    });
}

// Settings come from an optional JSON file passed as the first argument; a
// missing or broken file falls back to the defaults.
fn read_settings() -> Settings {
    match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(problem) => {
                    log::error!("Cannot parse the settings file {}: {}", path, problem);
                    Settings::default()
                }
            },
            Err(problem) => {
                log::error!("Cannot read the settings file {}: {}", path, problem);
                Settings::default()
            }
        },
        None => Settings::default(),
    }
}

pub fn get_rendering_context(
    logical_size: glutin::dpi::LogicalSize<u32>,
) -> (
    glow::Context,
    glutin::ContextWrapper<PossiblyCurrent, Window>,
    EventLoop<()>,
) {
    let event_loop = glutin::event_loop::EventLoop::new();
    let window_builder = glutin::window::WindowBuilder::new()
        .with_title("Plume")
        .with_resizable(true)
        .with_inner_size(logical_size);

    let window = glutin::ContextBuilder::new()
        .with_vsync(true)
        .build_windowed(window_builder, &event_loop)
        .unwrap();
    let window = unsafe { window.make_current().unwrap() };

    let gl =
        unsafe { glow::Context::from_loader_function(|s| window.get_proc_address(s) as *const _) };

    (gl, window, event_loop)
}
