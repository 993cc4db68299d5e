// Single-flight computation gate
//
// At most one expensive computation per owner is outstanding; callers poll
// without blocking and pick up the artifact once the worker hands it over.

pub mod errors;
pub mod gate;
pub mod slot;
pub mod traits;

pub use errors::FlightError;
pub use gate::SingleFlight;
pub use slot::{ComputationSlot, FlightTicket, SlotPoll};
pub use traits::ComputationProvider;
