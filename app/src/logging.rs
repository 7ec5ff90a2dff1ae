use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber, filtered by RUST_LOG (defaults to info)
/// Spans are additionally exported to stdout, if `export_spans` is set
pub fn init_tracing(export_spans: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));

    if export_spans {
        let provider = TracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("senser");
        opentelemetry::global::set_tracer_provider(provider);
        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        registry.init();
    }
}

pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
