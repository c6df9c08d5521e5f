//! Clipboard accessor exposed to the hosted page.
//!
//! `read_text` goes through the native channel, which works where the
//! embedded browser cannot reach the system clipboard itself (e.g. Wayland).
//! Everything else passes straight through to the platform implementation.

use crate::transport::adapters::IpcAdapter;
use crate::types::BridgeError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

/// One clipboard entry as exposed by the asynchronous clipboard API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Asynchronous clipboard accessor
#[async_trait]
pub trait PlatformClipboard: Send + Sync {
    async fn read_text(&self) -> Result<String, BridgeError>;

    async fn write_text(&self, text: &str) -> Result<(), BridgeError>;

    async fn read(&self) -> Result<Vec<ClipboardItem>, BridgeError>;

    async fn write(&self, items: Vec<ClipboardItem>) -> Result<(), BridgeError>;
}

/// Clipboard polyfill routing `read_text` through the native host
pub struct NativeClipboard {
    ipc: Arc<IpcAdapter>,
    platform: Option<Arc<dyn PlatformClipboard>>,
}

impl NativeClipboard {
    pub fn new(ipc: Arc<IpcAdapter>, platform: Option<Arc<dyn PlatformClipboard>>) -> Self {
        Self { ipc, platform }
    }

    async fn read_native(&self) -> Result<String, BridgeError> {
        self.ipc.read_clipboard()?.recv().await
    }
}

#[async_trait]
impl PlatformClipboard for NativeClipboard {
    /// Never fails: a native failure falls back to the platform read, and a
    /// failing or missing platform clipboard yields an empty string.
    async fn read_text(&self) -> Result<String, BridgeError> {
        match self.read_native().await {
            Ok(text) => Ok(text),
            Err(e) => {
                error!("Native clipboard read failed, falling back: {}", e);
                let Some(platform) = &self.platform else {
                    return Ok(String::new());
                };
                Ok(platform.read_text().await.unwrap_or_else(|e| {
                    warn!("Platform clipboard read failed: {}", e);
                    String::new()
                }))
            }
        }
    }

    async fn write_text(&self, text: &str) -> Result<(), BridgeError> {
        match &self.platform {
            Some(platform) => platform.write_text(text).await,
            None => Ok(()),
        }
    }

    async fn read(&self) -> Result<Vec<ClipboardItem>, BridgeError> {
        match &self.platform {
            Some(platform) => platform.read().await,
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, items: Vec<ClipboardItem>) -> Result<(), BridgeError> {
        match &self.platform {
            Some(platform) => platform.write(items).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::ClipboardCorrelator;
    use crate::transport::testing::RecordingHost;
    use crate::transport::MessageBus;
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryClipboard {
        text: Mutex<String>,
        fail_reads: bool,
    }

    #[async_trait]
    impl PlatformClipboard for MemoryClipboard {
        async fn read_text(&self) -> Result<String, BridgeError> {
            if self.fail_reads {
                return Err(BridgeError::Clipboard("denied".into()));
            }
            Ok(self.text.lock().clone())
        }

        async fn write_text(&self, text: &str) -> Result<(), BridgeError> {
            *self.text.lock() = text.to_string();
            Ok(())
        }

        async fn read(&self) -> Result<Vec<ClipboardItem>, BridgeError> {
            Ok(vec![ClipboardItem {
                mime_type: "text/plain".into(),
                data: self.text.lock().clone().into_bytes(),
            }])
        }

        async fn write(&self, _items: Vec<ClipboardItem>) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    fn setup(
        timeout: Option<Duration>,
        platform: Option<Arc<dyn PlatformClipboard>>,
    ) -> (Arc<RecordingHost>, Arc<ClipboardCorrelator>, NativeClipboard) {
        let host = Arc::new(RecordingHost::default());
        let bus = Arc::new(MessageBus::new(host.clone()));
        let correlator = Arc::new(ClipboardCorrelator::new(timeout));
        let ipc = Arc::new(IpcAdapter::new(bus, correlator.clone()));
        (host, correlator, NativeClipboard::new(ipc, platform))
    }

    #[tokio::test]
    async fn test_read_text_uses_native_channel() {
        let (host, correlator, clipboard) = setup(None, None);

        let read = tokio::spawn(async move { clipboard.read_text().await });
        while correlator.pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        correlator.resolve("from host".to_string());

        assert_eq!(read.await.unwrap().unwrap(), "from host");
        assert_eq!(host.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_read_text_falls_back_when_host_unavailable() {
        let platform = Arc::new(MemoryClipboard::default());
        platform.write_text("local").await.unwrap();
        let (host, _correlator, clipboard) = setup(None, Some(platform));
        host.unavailable.store(true, Ordering::SeqCst);

        assert_eq!(clipboard.read_text().await.unwrap(), "local");
    }

    #[tokio::test]
    async fn test_read_text_falls_back_on_timeout() {
        let platform = Arc::new(MemoryClipboard::default());
        platform.write_text("local").await.unwrap();
        let (_host, _correlator, clipboard) =
            setup(Some(Duration::from_millis(10)), Some(platform));

        assert_eq!(clipboard.read_text().await.unwrap(), "local");
    }

    #[tokio::test]
    async fn test_read_text_never_surfaces_errors() {
        let platform = Arc::new(MemoryClipboard {
            fail_reads: true,
            ..Default::default()
        });
        let (host, _correlator, clipboard) = setup(None, Some(platform));
        host.unavailable.store(true, Ordering::SeqCst);
        assert_eq!(clipboard.read_text().await.unwrap(), "");

        let (host, _correlator, clipboard) = setup(None, None);
        host.unavailable.store(true, Ordering::SeqCst);
        assert_eq!(clipboard.read_text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_other_operations_pass_through() {
        let platform = Arc::new(MemoryClipboard::default());
        let (host, _correlator, clipboard) = setup(None, Some(platform.clone()));

        clipboard.write_text("copied").await.unwrap();
        assert_eq!(*platform.text.lock(), "copied");

        let items = clipboard.read().await.unwrap();
        assert_eq!(items[0].data, b"copied".to_vec());
        assert!(host.sent().is_empty());
    }
}
