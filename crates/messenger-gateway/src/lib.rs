/// In-process change-notification hub. Every store write is published once to
/// the dispatcher; subscribers get filtered, cancellable streams.

pub mod dispatcher;
pub mod subscription;

pub use dispatcher::Dispatcher;
