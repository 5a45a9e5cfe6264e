use std::env;
use std::path::PathBuf;

/// Point Windows builds at a vcpkg FFmpeg when `FFMPEG_DIR` is unset.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows"
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framecount needs the FFmpeg development libraries; set FFMPEG_DIR (or VCPKG_ROOT) on Windows."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let ffmpeg_dir = PathBuf::from(vcpkg_root).join("installed").join(triplet);

    if ffmpeg_dir.join("include").join("libavcodec").exists() {
        println!(
            "cargo:warning=Using vcpkg FFmpeg headers under {}; export FFMPEG_DIR={} to silence this.",
            ffmpeg_dir.display(),
            ffmpeg_dir.display(),
        );
    } else {
        println!(
            "cargo:warning=VCPKG_ROOT is set but {} has no FFmpeg install.",
            ffmpeg_dir.display(),
        );
    }
}
