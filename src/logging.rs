use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "MP3FEED_LOG";

// Decoder warnings (upstream failures, swallowed feed errors) are shown by default.
const DEFAULT_DIRECTIVES: &str = "mp3feed=warn";

/// Initialize JSON logging on stderr for applications embedding the decoder.
///
/// Filtering comes from `MP3FEED_LOG` (for example `MP3FEED_LOG=mp3feed=trace` to see every
/// poll), falling back to warnings from this crate. Event fields are flattened into each JSON
/// line; the decoder emits no spans. Calling this more than once, or after another subscriber
/// was installed, does nothing.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}
