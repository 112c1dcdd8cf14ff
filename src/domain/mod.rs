mod balance;
mod expense;
mod ledger;
mod money;
mod participant;
mod settle_up;
mod settlement;

pub use balance::*;
pub use expense::*;
pub use ledger::*;
pub use money::*;
pub use participant::*;
pub use settle_up::*;
pub use settlement::*;
