// margin-core: margin trading and lending engine.
// ledger-first architecture: every token the protocol touches moves through one
// explicit balance book, and each operation either fully commits or fully fails.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AssetId, AccountId, Price, Leverage, Ppm
//   2.x  ledger.rs: multi-asset balance book, asset registry
//   3.x  rate_model.rs: utilization -> rate curves, pluggable per pool
//   4.x  pool.rs: lending pool: shares, borrow records, lazy accrual
//   5.x  router.rs: pool registry, caps, whitelist, borrow brokering
//   6.x  oracle.rs: price feeds with staleness bounds
//   7.x  swap.rs: swap venue interface + oracle-priced venue
//   8.x  position.rs: position state machine and margin math
//   9.x  market.rs: market params + position registry (ownable tokens)
//   10.x events.rs: state transition events for audit
//   11.x config.rs: fees, fee cap, engine limits
//   12.x trading/: the engine: open/close/add-margin, TP/SL, liquidation

// lending modules
pub mod ledger;
pub mod pool;
pub mod rate_model;
pub mod router;

// trading modules
pub mod market;
pub mod position;
pub mod trading;
pub mod types;

// integration modules
pub mod config;
pub mod events;
pub mod oracle;
pub mod swap;

// re exports for convenience
pub use config::*;
pub use events::*;
pub use ledger::*;
pub use market::*;
pub use oracle::*;
pub use pool::*;
pub use position::*;
pub use rate_model::*;
pub use router::*;
pub use swap::*;
pub use trading::*;
pub use types::*;
