use std::fs;

fn main() {
    // Keep the VERSION file and Cargo.toml in lockstep.
    let version_file = fs::read_to_string("VERSION")
        .expect("VERSION file not found - run: echo '0.1.0' > VERSION");

    let version = version_file.trim();
    let cargo_version = env!("CARGO_PKG_VERSION");

    if version != cargo_version {
        panic!(
            "\n\nVERSION mismatch!\nVERSION file: {}\nCargo.toml:   {}\n\nUpdate both before releasing.\n\n",
            version, cargo_version
        );
    }

    println!("cargo:rerun-if-changed=VERSION");
}
