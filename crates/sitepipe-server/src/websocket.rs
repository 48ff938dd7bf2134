//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use sitepipe_graph::{ReloadEvent, ReloadSink};
use tokio::sync::broadcast;

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Swap the listed stylesheets without reloading
    InjectCss {
        /// Stylesheet paths relative to the site root
        paths: Vec<String>,
    },
}

impl From<ReloadEvent> for ReloadMessage {
    fn from(event: ReloadEvent) -> Self {
        if event.is_css_only() {
            ReloadMessage::InjectCss { paths: event.files }
        } else {
            ReloadMessage::Reload
        }
    }
}

/// Hub broadcasting reload messages to every connected client.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is open
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Number of connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadSink for ReloadHub {
    fn notify(&self, event: ReloadEvent) {
        tracing::debug!(task = %event.task, files = event.files.len(), "reload");
        self.send(event.into());
    }
}

/// Client-side script connecting to the reload endpoint at `ws_path`.
pub fn reload_client_script(ws_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const protocol = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(protocol + location.host + '{}');

  function swapStylesheets(paths) {{
    const stamp = Date.now();
    let swapped = 0;
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {{
      const url = new URL(link.href, location.href);
      const match = paths.some(function(p) {{
        return url.pathname === '/' + p.replace(/^\/+/, '');
      }});
      if (match) {{
        url.searchParams.set('v', stamp);
        link.href = url.toString();
        swapped++;
      }}
    }});
    return swapped;
  }}

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'inject_css':
        if (swapStylesheets(msg.paths) === 0) {{
          console.log('[sitepipe] no matching stylesheet linked');
        }}
        break;

      case 'connected':
        console.log('[sitepipe] live reload connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[sitepipe] disconnected, retrying');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#,
        ws_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Reload);
    }

    #[test]
    fn stylesheet_events_become_css_injection() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.notify(ReloadEvent::new(
            "css",
            vec!["css/style.css".into(), "css/style.min.css".into()],
        ));
        hub.notify(ReloadEvent::new("html", vec!["index.html".into()]));

        assert_eq!(
            rx.try_recv().unwrap(),
            ReloadMessage::InjectCss {
                paths: vec!["css/style.css".into(), "css/style.min.css".into()]
            }
        );
        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Reload);
    }

    #[test]
    fn serializes_with_snake_case_tag() {
        let json = serde_json::to_string(&ReloadMessage::InjectCss {
            paths: vec!["css/style.css".into()],
        })
        .unwrap();

        assert_eq!(json, r#"{"type":"inject_css","paths":["css/style.css"]}"#);
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Connected).unwrap(),
            r#"{"type":"connected"}"#
        );
    }

    #[test]
    fn client_script_targets_endpoint() {
        let script = reload_client_script("/__reload");

        assert!(script.contains("location.host + '/__reload'"));
        assert!(script.contains("case 'inject_css'"));
    }
}
