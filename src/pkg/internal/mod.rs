pub mod adaptors;
pub mod ai;
pub mod digest;
pub mod error;
pub mod flow;
pub mod ledger;
pub mod lookup;
pub mod wallet;

#[cfg(test)]
pub mod testing;
