pub mod reservation;

pub use reservation::{is_fingerprint, Reservation};
