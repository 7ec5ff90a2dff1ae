pub mod observer;


pub use observer::controller::SensorObserver;
pub use observer::reader::TelemetryReader;
pub use observer::report::AggregationReporter;
pub use observer::writer::TelemetryWriter;
pub use observer::ConcurrentObserver;
