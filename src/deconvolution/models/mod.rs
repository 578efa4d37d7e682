//! Model layer: the penalized g-modeling likelihood.
pub mod deconv;

pub use self::deconv::{DeconvData, DeconvModel};
