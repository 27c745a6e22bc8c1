pub mod push_socket_notifier;
pub mod stdout_notifier;
