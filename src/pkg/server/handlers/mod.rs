pub mod flows;
pub mod ledger;
pub mod probes;
