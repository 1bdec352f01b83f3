//! Test suites for the daemon bootstrap and the socket dispatch loop.

mod dispatch_behaviour;
mod socket_behaviour;
mod support;
