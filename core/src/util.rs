/// Log a collection-scoped action at info level: `collection → action (context)`.
/// The collection name is rendered bold blue, the action green and the context dimmed.
#[macro_export]
macro_rules! collection_info {
    ($collection:expr, $action:expr) => {
        tracing::info!("\x1b[1;34m{}\x1b[0m → \x1b[32m{}\x1b[0m", $collection, $action)
    };
    ($collection:expr, $action:expr, $($arg:tt)+) => {
        tracing::info!("\x1b[1;34m{}\x1b[0m → \x1b[32m{}\x1b[0m \x1b[2m{}\x1b[0m", $collection, $action, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! collection_debug {
    ($collection:expr, $action:expr) => {
        tracing::debug!("\x1b[1;34m{}\x1b[0m → \x1b[32m{}\x1b[0m", $collection, $action)
    };
    ($collection:expr, $action:expr, $($arg:tt)+) => {
        tracing::debug!("\x1b[1;34m{}\x1b[0m → \x1b[32m{}\x1b[0m \x1b[2m{}\x1b[0m", $collection, $action, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! collection_warn {
    ($collection:expr, $action:expr) => {
        tracing::warn!("\x1b[1;34m{}\x1b[0m → \x1b[33m{}\x1b[0m", $collection, $action)
    };
    ($collection:expr, $action:expr, $($arg:tt)+) => {
        tracing::warn!("\x1b[1;34m{}\x1b[0m → \x1b[33m{}\x1b[0m \x1b[2m{}\x1b[0m", $collection, $action, format_args!($($arg)+))
    };
}
