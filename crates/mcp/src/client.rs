//! Client-side handler for messages the server sends on its own.

use rmcp::ClientHandler;
use rmcp::model::{ClientInfo, Implementation};
use rmcp::service::{NotificationContext, RoleClient};
use tokio::sync::mpsc;

/// Name this client reports during `initialize`.
pub const CLIENT_NAME: &str = "tiller";

/// A notification the server sent outside any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub method: String,
}

/// Forwards server notifications to the session's receiver.
pub(crate) struct NotificationForwarder {
    notifications: mpsc::UnboundedSender<Notification>,
}

impl NotificationForwarder {
    pub(crate) fn new(notifications: mpsc::UnboundedSender<Notification>) -> Self {
        Self { notifications }
    }

    fn forward(&self, method: &str) {
        // Nobody listening is fine.
        let _ = self.notifications.send(Notification {
            method: method.to_string(),
        });
    }
}

impl ClientHandler for NotificationForwarder {
    fn on_tool_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        std::future::ready(self.forward("notifications/tools/list_changed"))
    }

    fn on_resource_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        std::future::ready(self.forward("notifications/resources/list_changed"))
    }

    fn on_prompt_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        std::future::ready(self.forward("notifications/prompts/list_changed"))
    }

    fn get_info(&self) -> ClientInfo {
        let mut info = ClientInfo::default();
        info.client_info = Implementation {
            name: CLIENT_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        };
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_client_name() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let info = NotificationForwarder::new(tx).get_info();
        assert_eq!(info.client_info.name, "tiller");
    }

    #[test]
    fn forward_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        NotificationForwarder::new(tx).forward("notifications/tools/list_changed");
    }
}
