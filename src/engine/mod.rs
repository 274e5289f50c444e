// 12.0: allocation engine. coordinates the compliance gate, capacity sizing,
// tier progression, fund routing, and the end-of-day settlement cycle.
// per-account state is serialized behind a mutex; the settlement cycle runs
// accounts in parallel since no operation touches two accounts at once.

mod core;
mod cycle;
mod results;
mod trading;
mod transfers;

pub use core::Engine;
pub use results::{CycleResult, EngineError, TradeResult, TransferResult};
pub use trading::TradeIntent;
