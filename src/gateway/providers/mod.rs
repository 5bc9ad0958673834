//! Concrete gateway client implementations.

pub mod razorpay;

pub use razorpay::RazorpayClient;
