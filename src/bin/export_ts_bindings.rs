use blog_narrator::bindings::{DEFAULT_BINDINGS_DIR, export_ts_bindings};
use std::path::Path;

fn main() {
    let out_dir = Path::new(DEFAULT_BINDINGS_DIR);
    if let Err(err) = export_ts_bindings(out_dir) {
        eprintln!("failed to export TS bindings: {err:#}");
        std::process::exit(1);
    }
    println!("exported TS bindings to {}", out_dir.display());
}
