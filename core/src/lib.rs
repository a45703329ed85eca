//! The scanning engine behind `reachr`.
//!
//! * [`scanner`]: the coordinator that feeds candidate addresses from a
//!   bounded queue to a fixed pool of probing workers.
//! * [`probe`]: the per-address HTTPS check and failure classification.
//! * [`ledger`]: the durable, de-duplicated record of good addresses.
//! * [`recorder`]: where workers put the addresses that answered.
//! * [`verify`]: re-checking a previously recorded set.

pub mod ledger;
pub mod metrics;
pub mod probe;
pub mod recorder;
pub mod scanner;
pub mod verify;
