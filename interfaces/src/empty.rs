use crate::defs::NotificationSink;
use crate::defs::SourceFailureNotice;

pub struct EmptyNotificationSink;

impl NotificationSink for EmptyNotificationSink {
    fn notify(&self, _notice: SourceFailureNotice) {
        // Nobody is listening.
    }
}
