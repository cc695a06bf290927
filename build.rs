use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();

    // Bake the config directory path in so the binary finds its network
    // definitions regardless of where it is launched from.
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let config_dir = format!("{manifest_dir}/configs");

    let dest_path = Path::new(&out_dir).join("build_constants.rs");
    fs::write(
        &dest_path,
        format!("pub const CONFIG_DIR: &str = {:?};", config_dir),
    )
    .unwrap();
}
