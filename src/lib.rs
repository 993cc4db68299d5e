// Flightstage Library - single-flight background computation and staged
// resource transitions for frame-driven applications

pub mod cancellation;
pub mod config;
pub mod observability;
pub mod shutdown;
pub mod simulation;
pub mod single_flight;
pub mod telemetry;
pub mod transition;

// Re-export key types for easy access
pub use cancellation::CancelToken;
pub use config::{config, FlightstageConfig};
pub use observability::{FlightMetrics, FlightStats, OperationTimer};
pub use shutdown::ShutdownCoordinator;
pub use single_flight::{ComputationProvider, FlightError, FlightTicket, SingleFlight};
pub use telemetry::{init_telemetry, shutdown_telemetry, generate_correlation_id};
pub use transition::{
    CurtainResource, StagedTransitionSequencer, TransitionError, TransitionPlan,
    TransitionReport, TransitionableResource,
};
