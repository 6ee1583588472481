// Pure order-flow computations. Nothing here does I/O; time comes in as `now_ms`.
pub mod cooldown; // per-key alert gate
pub mod cvd;      // cumulative volume delta over a trade window
pub mod obi;      // depth-weighted order book imbalance
pub mod ofi;      // top-of-book order flow imbalance
pub mod spread;   // best cross-venue bid/ask pairing
pub mod tape;     // trade/snapshot windows and the tape detectors
pub mod types;
