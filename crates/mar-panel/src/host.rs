use async_trait::async_trait;
use mar_core::commands::{FileFilter, HostServices};
use mar_core::panel::PanelHost;
use mar_core::view::PanelView;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// What the serving loop asks of the terminal UI.
#[derive(Debug)]
pub enum HostRequest {
    Render(PanelView),
    PickFile {
        filter: FileFilter,
        open_label: String,
        reply: oneshot::Sender<Option<PathBuf>>,
    },
    OpenSettings {
        namespace: String,
        reply: oneshot::Sender<()>,
    },
    SetContext {
        key: String,
        value: bool,
    },
    Notify(String),
}

pub type RequestSender = mpsc::UnboundedSender<HostRequest>;

/// Forwards rendered views to the UI loop.
pub struct ChannelHost {
    tx: RequestSender,
}

impl ChannelHost {
    pub fn new(tx: RequestSender) -> Self {
        Self { tx }
    }
}

impl PanelHost for ChannelHost {
    fn render(&mut self, view: &PanelView) {
        if self.tx.send(HostRequest::Render(view.clone())).is_err() {
            debug!("ui loop gone; dropping render");
        }
    }
}

pub struct TerminalServices {
    tx: RequestSender,
}

impl TerminalServices {
    pub fn new(tx: RequestSender) -> Self {
        Self { tx }
    }

    fn send(&self, request: HostRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

#[async_trait]
impl HostServices for TerminalServices {
    async fn pick_file(&mut self, filter: &FileFilter, open_label: &str) -> Option<PathBuf> {
        let (reply, rx) = oneshot::channel();
        let sent = self.send(HostRequest::PickFile {
            filter: *filter,
            open_label: open_label.to_string(),
            reply,
        });
        if !sent {
            return None;
        }
        // A dropped reply counts as a dismissed dialog.
        rx.await.ok().flatten()
    }

    async fn open_settings(&mut self, namespace: &str) {
        let (reply, rx) = oneshot::channel();
        if self.send(HostRequest::OpenSettings {
            namespace: namespace.to_string(),
            reply,
        }) {
            let _ = rx.await;
        }
    }

    fn set_context(&mut self, key: &str, value: bool) {
        self.send(HostRequest::SetContext {
            key: key.to_string(),
            value,
        });
    }

    fn notify(&mut self, message: &str) {
        self.send(HostRequest::Notify(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mar_core::commands::YAML_FILTER;

    #[tokio::test]
    async fn pick_file_waits_for_reply() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut services = TerminalServices::new(tx);

        let ui = tokio::spawn(async move {
            match rx.recv().await {
                Some(HostRequest::PickFile {
                    filter,
                    open_label,
                    reply,
                }) => {
                    assert_eq!(filter, YAML_FILTER);
                    assert_eq!(open_label, "Select YAML");
                    let _ = reply.send(Some(PathBuf::from("plan.yaml")));
                }
                other => panic!("unexpected request {other:?}"),
            }
        });

        let picked = services.pick_file(&YAML_FILTER, "Select YAML").await;
        assert_eq!(picked, Some(PathBuf::from("plan.yaml")));
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_reply_is_a_dismissal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut services = TerminalServices::new(tx);
        let ui = tokio::spawn(async move {
            drop(rx.recv().await);
        });
        assert_eq!(services.pick_file(&YAML_FILTER, "Open").await, None);
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn closed_ui_does_not_block() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut services = TerminalServices::new(tx.clone());
        assert_eq!(services.pick_file(&YAML_FILTER, "Open").await, None);
        services.open_settings("multi-agent-runner").await;
        services.notify("ignored");

        let mut host = ChannelHost::new(tx);
        host.render(&PanelView::Empty);
    }
}
