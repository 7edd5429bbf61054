// build.rs - stamps the build date into build_info.rs for the startup banner

use chrono::Utc;
use std::{env, fs, path::Path};

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("build_info.rs");

    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    fs::write(&dest_path, format!("pub const BUILD_DATE: &str = \"{build_date}\";\n"))
        .expect("writing build_info.rs");

    println!("cargo:rerun-if-changed=build.rs");
}
