//! Hardware keypad adapters.

mod tcp;

pub use tcp::KeypadListener;
