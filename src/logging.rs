//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Directive used for a given `-v` count when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "postsift=info,postsift_filter=info",
        1 => "postsift=debug,postsift_filter=debug",
        _ => "postsift=trace,postsift_filter=trace",
    }
}

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `verbosity`. Stdout is left free for
/// operator status lines. Calling this twice is harmless; the second
/// install is ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert!(default_directive(0).contains("=info"));
        assert!(default_directive(1).contains("=debug"));
        assert!(default_directive(2).contains("=trace"));
        assert_eq!(default_directive(5), default_directive(2));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(0);
        init(1);
    }
}
