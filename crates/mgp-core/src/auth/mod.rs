//! Login handshake: phone identifier, login code, optional account password.

mod controller;
pub mod factor;

pub use controller::{AuthController, AuthState};
pub use factor::{factor_channel, FactorInputs, FactorSource};
