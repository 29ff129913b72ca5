use tracing_subscriber::{fmt, EnvFilter};

/// Log filter directives for the CLI flags. The scanner's own spans step
/// from `warn` up to `trace` with repeated `-v`; dependencies stay quiet
/// unless `RUST_LOG` overrides the whole filter.
fn directives(verbose: u8, quiet: bool) -> String {
    if quiet {
        return "off".to_string();
    }
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("godet={level}")
}

/// Installs the global subscriber. Diagnostics go to stderr so report
/// output on stdout stays machine-readable; at `-vv` and above the
/// rule-error and loader logs carry source locations.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(verbose, quiet)));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    if verbose >= 2 {
        builder.with_file(true).with_line_number(true).init();
    } else {
        builder.without_time().init();
    }
}
