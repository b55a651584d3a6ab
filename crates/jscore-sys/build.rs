use std::env;

// WebKitGTK ships the C API as a shared library; the 4.1 ABI is the one most
// distributions package today.
const DEFAULT_LINUX_LIB: &str = "javascriptcoregtk-4.1";

fn main() {
    println!("cargo:rerun-if-env-changed=JSCORE_JSC_LIB");
    println!("cargo:rerun-if-env-changed=JSCORE_JSC_LIB_DIR");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    if let Ok(dir) = env::var("JSCORE_JSC_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }

    match target_os.as_str() {
        "macos" | "ios" => configure_apple(),
        "linux" | "freebsd" | "netbsd" | "openbsd" => configure_shared(DEFAULT_LINUX_LIB),
        "windows" => configure_shared("JavaScriptCore"),
        other => panic!("Unsupported OS for JavaScriptCore: {}", other),
    }
}

fn configure_apple() {
    // The system framework exports the whole C API.
    if let Ok(lib) = env::var("JSCORE_JSC_LIB") {
        println!("cargo:rustc-link-lib=dylib={}", lib);
        return;
    }
    println!("cargo:rustc-link-lib=framework=JavaScriptCore");

    if let Ok(output) = std::process::Command::new("xcrun")
        .args(["--show-sdk-path"])
        .output()
    {
        let sdk_path = String::from_utf8_lossy(&output.stdout);
        let sdk_path = sdk_path.trim();
        if !sdk_path.is_empty() {
            println!(
                "cargo:rustc-link-search=framework={}/System/Library/Frameworks",
                sdk_path
            );
        }
    }
}

fn configure_shared(default_lib: &str) {
    let lib = env::var("JSCORE_JSC_LIB").unwrap_or_else(|_| default_lib.to_string());
    println!("cargo:rustc-link-lib=dylib={}", lib);
}
