//! Build script for avbridge
//!
//! Handles:
//! 1. Compiling the C accessor library via `cc`
//! 2. Linking FFmpeg (static when `lib*.a` is available, dynamic otherwise)
//!
//! Both steps only run with the `ffmpeg` feature enabled.

use std::env;
use std::path::{Path, PathBuf};

fn main() {
  println!("cargo:rerun-if-changed=build.rs");
  println!("cargo:rerun-if-env-changed=FFMPEG_DIR");

  if env::var_os("CARGO_FEATURE_FFMPEG").is_none() {
    return;
  }

  // Get target information
  let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
  let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

  // Get FFmpeg directory
  let ffmpeg_dir = get_ffmpeg_dir(&target_os, &target_arch);

  // Compile C accessor library
  compile_accessors(&ffmpeg_dir);

  // Link FFmpeg libraries
  link_ffmpeg(&ffmpeg_dir, &target_os);
}

/// Get FFmpeg installation directory
fn get_ffmpeg_dir(target_os: &str, target_arch: &str) -> PathBuf {
  // Check for custom FFMPEG_DIR environment variable
  if let Ok(dir) = env::var("FFMPEG_DIR") {
    return PathBuf::from(dir);
  }

  // Check for pkg-config on Unix systems
  #[cfg(unix)]
  {
    if let Ok(output) = std::process::Command::new("pkg-config")
      .args(["--variable=prefix", "libavcodec"])
      .output()
    {
      if output.status.success() {
        let prefix = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(prefix.trim());
        if path.exists() {
          return path;
        }
      }
    }
  }

  // Try common installation paths
  let common_paths = match target_os {
    "macos" => vec![
      "/opt/homebrew", // Apple Silicon Homebrew
      "/usr/local",    // Intel Homebrew / manual install
      "/opt/local",    // MacPorts
    ],
    "linux" => vec!["/usr", "/usr/local", "/opt/ffmpeg"],
    "windows" => vec!["C:\\ffmpeg", "C:\\Program Files\\ffmpeg"],
    _ => vec![],
  };

  for path in common_paths {
    let p = PathBuf::from(path);
    if p.join("include/libavcodec/avcodec.h").exists() {
      return p;
    }
  }

  // Try bundled FFmpeg in project directory
  let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
  let platform = match (target_os, target_arch) {
    ("macos", "aarch64") => "darwin-arm64",
    ("macos", "x86_64") => "darwin-x64",
    ("linux", "x86_64") => "linux-x64",
    ("linux", "aarch64") => "linux-arm64",
    ("windows", "x86_64") => "win32-x64",
    _ => "unknown",
  };

  let bundled = manifest_dir.join("ffmpeg").join(platform);
  if bundled.exists() {
    return bundled;
  }

  // Fallback: assume FFmpeg is in system paths
  println!(
    "cargo:warning=FFmpeg not found. Set FFMPEG_DIR environment variable or install FFmpeg."
  );
  PathBuf::from("/usr/local")
}

/// Compile the C accessor library
fn compile_accessors(ffmpeg_dir: &Path) {
  let include_dir = ffmpeg_dir.join("include");

  let mut build = cc::Build::new();
  build
    .file("src/ffi/accessors.c")
    .include(&include_dir)
    .warnings(true)
    .extra_warnings(true);

  // Platform-specific flags
  #[cfg(target_os = "macos")]
  {
    build.flag("-Wno-deprecated-declarations");
  }

  build.compile("ffmpeg_accessors");

  println!("cargo:rerun-if-changed=src/ffi/accessors.c");
}

/// Link FFmpeg libraries
fn link_ffmpeg(ffmpeg_dir: &Path, target_os: &str) {
  let lib_dir = ffmpeg_dir.join("lib");

  // Order matters for static linking: dependents first
  let ffmpeg_libs = ["avdevice", "avformat", "avcodec", "swscale", "avutil"];

  let fully_static = ffmpeg_libs
    .iter()
    .all(|lib| lib_dir.join(format!("lib{}.a", lib)).exists());

  if fully_static {
    for lib in &ffmpeg_libs {
      // Use link-arg to specify full path - this forces static linking
      let static_lib = lib_dir.join(format!("lib{}.a", lib));
      println!("cargo:rustc-link-arg={}", static_lib.display());
    }
    link_static_codec_libraries(target_os);
  } else {
    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    for lib in &ffmpeg_libs {
      println!("cargo:rustc-link-lib=dylib={}", lib);
    }
  }

  // Platform-specific system libraries
  link_platform_libraries(target_os, fully_static);
}

/// Link the external codec libraries a static FFmpeg build may depend on
fn link_static_codec_libraries(target_os: &str) {
  let codec_lib_paths = get_codec_library_paths(target_os);

  // Decoding only needs what FFmpeg was configured with; all optional
  let codec_libs = [
    "x264",     // H.264
    "dav1d",    // AV1 decoder
    "vpx",      // VP8/VP9
    "fdk-aac",  // AAC
    "opus",     // Opus audio
    "vorbis",   // Vorbis audio
    "ogg",      // Ogg container (required by vorbis)
    "soxr",     // SoX resampler
    "zimg",     // Z image processing library
  ];

  for lib in &codec_libs {
    if let Some(path) = find_static_lib_path(lib, &codec_lib_paths) {
      println!("cargo:rustc-link-arg={}", path.display());
    }
    // Missing optional libraries are silently skipped
  }
}

/// Get codec library search paths
fn get_codec_library_paths(target_os: &str) -> Vec<PathBuf> {
  let mut paths = Vec::new();

  // Add paths from LIBRARY_PATH environment variable
  if let Ok(lib_path) = env::var("LIBRARY_PATH") {
    for path in lib_path.split(':') {
      paths.push(PathBuf::from(path));
    }
  }

  // Add common paths based on OS
  match target_os {
    "macos" => {
      paths.push(PathBuf::from("/opt/homebrew/lib"));
      paths.push(PathBuf::from("/usr/local/lib"));
      paths.push(PathBuf::from("/opt/local/lib"));
    }
    "linux" => {
      paths.push(PathBuf::from("/usr/lib"));
      paths.push(PathBuf::from("/usr/local/lib"));
      paths.push(PathBuf::from("/usr/lib/x86_64-linux-gnu"));
      paths.push(PathBuf::from("/usr/lib/aarch64-linux-gnu"));
    }
    _ => {}
  }

  if let Ok(brew_prefix) = env::var("HOMEBREW_PREFIX") {
    paths.push(PathBuf::from(brew_prefix).join("lib"));
  }

  // Add FFmpeg lib dir if set
  if let Ok(ffmpeg_dir) = env::var("FFMPEG_DIR") {
    paths.push(PathBuf::from(ffmpeg_dir).join("lib"));
  }

  paths
}

/// Find static library path if it exists
fn find_static_lib_path(name: &str, paths: &[PathBuf]) -> Option<PathBuf> {
  let static_name = format!("lib{}.a", name);

  for path in paths {
    let full_path = path.join(&static_name);
    if full_path.exists() {
      return Some(full_path);
    }
  }
  None
}

/// Link platform-specific system libraries
fn link_platform_libraries(target_os: &str, fully_static: bool) {
  match target_os {
    "macos" => {
      // avfoundation input device and VideoToolbox-enabled builds
      let frameworks = [
        "AVFoundation",
        "CoreMedia",
        "CoreVideo",
        "CoreGraphics",
        "CoreFoundation",
        "Foundation",
        "VideoToolbox",
        "AudioToolbox",
        "Security",
      ];

      for framework in &frameworks {
        println!("cargo:rustc-link-lib=framework={}", framework);
      }

      if fully_static {
        println!("cargo:rustc-link-lib=bz2");
        println!("cargo:rustc-link-lib=iconv");
        println!("cargo:rustc-link-lib=lzma");
      }
    }

    "linux" => {
      println!("cargo:rustc-link-lib=m");
      println!("cargo:rustc-link-lib=pthread");
      println!("cargo:rustc-link-lib=dl");
    }

    "windows" => {
      // dshow input device
      let libs = [
        "bcrypt", "ole32", "oleaut32", "user32", "ws2_32", "secur32", "advapi32", "strmiids",
        "shlwapi",
      ];

      for lib in &libs {
        println!("cargo:rustc-link-lib={}", lib);
      }
    }

    _ => {
      println!("cargo:warning=Unknown target OS: {}", target_os);
    }
  }
}
