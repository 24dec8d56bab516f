use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };

    // Header generation is best-effort: a cbindgen parse failure must not
    // break the library build.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("HOMEGUARD_FFI_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("homeguard_ffi.h"));
        }
        Err(err) => println!("cargo:warning=cbindgen: {err}"),
    }
}
