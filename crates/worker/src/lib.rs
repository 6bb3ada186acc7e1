pub mod handlers;
pub mod notification;
pub mod ports;
pub mod signing;
pub mod worker;

pub use handlers::{build_handler_set, HandlerDeps, HandlerError, JobHandler};
pub use notification::{build_operator_delivery, format_operator_message, NotificationSettings};
pub use ports::{
    ChannelSender, DeliveryError, FetchedMedia, HttpChannelSender, MediaFetcher,
    MemoryObjectStore, ObjectStore, RecordingSender, StaticFetcher,
};
pub use signing::MediaUrlSigner;
pub use worker::{JobWorker, WorkerSettings};
