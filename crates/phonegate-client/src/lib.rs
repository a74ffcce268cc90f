pub mod client;

pub use client::WorkerClient;
