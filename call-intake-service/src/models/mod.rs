pub mod call_media;
pub mod notification;
pub mod subscription;

pub use call_media::{CallMediaDescriptor, MediaStream, MediaStreamType};
pub use notification::{NotificationEnvelope, NotificationItem, ResourceData};
pub use subscription::{CreateSubscriptionRequest, Subscription, SubscriptionResponse};
