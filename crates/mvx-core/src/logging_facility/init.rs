//! Subscriber installation
//!
//! Output goes to stderr; stdout belongs to the host.

use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use super::test_capture::init_test_capture;

/// Logging profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// No subscriber; the host installs its own or stays silent
    Quiet,
    /// Human-readable boundary events and debug records
    Development,
    /// Development plus the trace records of the tree, notifier and stack
    Trace,
    /// JSON boundary events only
    Production,
    /// In-memory capture, see [`init_test_capture`]
    Test,
}

impl Profile {
    /// Profile for a repeated `-v` flag: none, `-v`, `-vv`
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => Profile::Quiet,
            1 => Profile::Development,
            _ => Profile::Trace,
        }
    }

    /// Filter used when `RUST_LOG` is unset
    pub fn default_filter(self) -> &'static str {
        match self {
            Profile::Development => "mvx=debug",
            Profile::Trace => "mvx=trace",
            Profile::Quiet | Profile::Production | Profile::Test => "mvx=info",
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_filter()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the subscriber for `profile`; only the first call has an effect
///
/// # Example
///
/// ```
/// use mvx_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// init(Profile::Production); // ignored
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        // A subscriber installed elsewhere wins; try_init reports it and
        // leaves it in place.
        let _ = match profile {
            Profile::Quiet => Ok(()),
            Profile::Development | Profile::Trace => tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(profile.filter())
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(profile.filter())
                .finish()
                .try_init(),
            Profile::Test => {
                init_test_capture();
                Ok(())
            }
        };
    });
}
