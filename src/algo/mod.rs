pub mod bandpass;
pub mod cusum;

// Re-exports for convenience
pub use bandpass::DualEmaBandpass;
pub use cusum::OneSidedCusum;
