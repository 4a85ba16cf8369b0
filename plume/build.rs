use std::{env, error::Error, fs, path::Path};

// Stamp the GLSL sources with the right #version for the build target before
// they get embedded with include_str!.
fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = env::var_os("OUT_DIR").unwrap();
    let target = env::var("TARGET").unwrap();

    let version = match target.as_str() {
        "wasm32-unknown-unknown" => "300 es",
        "aarch64-apple-darwin" | "x86_64-apple-darwin" => "330",
        _ => "460", // `precision sampler2D` was added to core much later
    };

    let stamped_dir = Path::new(&out_dir).join("shaders");
    fs::create_dir_all(&stamped_dir)?;

    for entry in fs::read_dir("shaders")? {
        let path = entry?.path();
        let source = fs::read_to_string(&path)?;

        if let Some(file_name) = path.file_name() {
            fs::write(
                stamped_dir.join(file_name),
                format!("#version {}\n{}", version, source),
            )?;
        }
    }

    println!("cargo:rerun-if-changed=shaders");

    Ok(())
}
