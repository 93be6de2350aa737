/// Version line printed by the `version` command
#[must_use]
pub fn get_version_info() -> String {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    tracing::debug!(
        package_name = name,
        package_version = version,
        "Gathering package information"
    );

    format!("{name} Version: {version}")
}

/// Print the version to stdout
#[allow(clippy::print_stdout)]
pub fn execute_version() {
    println!("{}", get_version_info());
}
