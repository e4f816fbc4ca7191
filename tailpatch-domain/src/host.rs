//! Host architecture detection, normalized to the `{os}-{cpu}` target naming.

/// The architecture of the running host, e.g. `linux-x64` or `macos-arm64`.
pub fn host_architecture() -> String {
    normalize_host(std::env::consts::OS, std::env::consts::ARCH)
}

/// Normalize an OS-kernel name and CPU identifier.
///
/// CPUs are bucketed into `x64`, `arm64`, `arm` and `unknown`.
pub fn normalize_host(os: &str, cpu: &str) -> String {
    format!("{}-{}", normalize_os(os), normalize_cpu(cpu))
}

fn normalize_os(os: &str) -> String {
    let os = os.trim().to_ascii_lowercase();
    match os.as_str() {
        "linux" => "linux".to_string(),
        "darwin" | "macos" | "osx" => "macos".to_string(),
        "windows" | "win32" => "windows".to_string(),
        other if other.starts_with("mingw") || other.starts_with("cygwin") || other.starts_with("msys") => {
            "windows".to_string()
        }
        "" => "unknown".to_string(),
        other => other.to_string(),
    }
}

fn normalize_cpu(cpu: &str) -> &'static str {
    match cpu.trim().to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" => "x64",
        "aarch64" | "arm64" | "armv8" | "armv8l" => "arm64",
        "arm" | "armv7" | "armv7l" | "armv6l" | "armhf" => "arm",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_hosts() {
        assert_eq!(normalize_host("Linux", "x86_64"), "linux-x64");
        assert_eq!(normalize_host("Darwin", "arm64"), "macos-arm64");
        assert_eq!(normalize_host("linux", "aarch64"), "linux-arm64");
        assert_eq!(normalize_host("linux", "armv7l"), "linux-arm");
        assert_eq!(normalize_host("windows", "x86_64"), "windows-x64");
        assert_eq!(normalize_host("MINGW64_NT-10.0", "x86_64"), "windows-x64");
    }

    #[test]
    fn unknown_cpu_is_bucketed() {
        assert_eq!(normalize_host("linux", "riscv64"), "linux-unknown");
        assert_eq!(normalize_host("freebsd", "x86_64"), "freebsd-x64");
    }

    #[test]
    fn current_host_has_two_parts() {
        let host = host_architecture();
        assert!(host.split_once('-').is_some(), "{host}");
    }
}
