use crate::tools::types::{Notification, NotificationSink};

/// Emits notifications as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            channel = %notification.channel,
            workflow_id = %notification.workflow_id,
            execution_id = %notification.execution_id,
            recipients = ?notification.recipients,
            "{}",
            notification.message
        );
    }
}
