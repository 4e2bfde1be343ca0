mod codec;
mod reconcile;
mod resolve;

pub use codec::{run_decode, run_encode};
pub use reconcile::run_reconcile;
pub use resolve::run_resolve;
