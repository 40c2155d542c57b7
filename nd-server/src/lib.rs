//! The navigation-display terrain server: a dedicated render worker fed by
//! simulator messages, plus the control-plane endpoints consumers pull
//! frame data from.

pub mod messages;
pub mod server;
pub mod side;
pub mod worker;
